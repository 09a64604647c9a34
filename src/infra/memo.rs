// ============================================================
// Layer 6 — Memo Cell
// ============================================================
// A compute-once, cache-forever slot owned by whoever needs
// the value (a loader, a vocabulary store, a client map
// cache). Replaces "if global is None: build it" singletons.
//
//   empty ──get_or_try_init(ok)──▶ filled ──get_or_try_init──▶ same Arc
//     ▲                               │
//     └────────── invalidate ─────────┘
//
// A failed build leaves the slot empty so the next call
// tries again. The Mutex makes the build happen at most once
// even if shards are constructed from several threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct Memo<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        // A panic while building leaves the slot untouched, so a
        // poisoned lock still guards a consistent value.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached value, if one has been built
    pub fn get(&self) -> Option<Arc<T>> {
        self.lock().clone()
    }

    /// Return the cached value, building it with `init` on first use.
    /// `init` runs at most once per filled slot.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut slot = self.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(init()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Fill the slot with a value built elsewhere, replacing any cached one
    pub fn set(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.lock() = Some(Arc::clone(&value));
        value
    }

    /// Drop the cached value so the next access rebuilds it
    pub fn invalidate(&self) {
        *self.lock() = None;
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_builds_once() {
        let memo: Memo<u32> = Memo::new();
        let calls = Cell::new(0);
        let build = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(42)
        };

        let first = memo.get_or_try_init(build).unwrap();
        let second = memo.get_or_try_init(build).unwrap();
        assert_eq!(*first, 42);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failed_build_leaves_slot_empty() {
        let memo: Memo<u32> = Memo::new();
        let err = memo.get_or_try_init(|| Err::<u32, _>("unreadable"));
        assert_eq!(err, Err("unreadable"));
        assert!(memo.get().is_none());

        let ok = memo.get_or_try_init(|| Ok::<_, &str>(7)).unwrap();
        assert_eq!(*ok, 7);
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let memo: Memo<u32> = Memo::new();
        memo.set(1);
        memo.invalidate();
        let rebuilt = memo.get_or_try_init(|| Ok::<_, ()>(2)).unwrap();
        assert_eq!(*rebuilt, 2);
    }
}
