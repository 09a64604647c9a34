// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Loaders never open files themselves. They ask an
// ArchiveSource for the train or test archive, so the same
// loader works over JSON files on disk or archives held in
// memory.
//
// Implementations:
//   - JsonArchiveStore   → one JSON file per split
//   - MemoryArchiveStore → archives already in memory

use crate::domain::archive::Archive;
use crate::domain::client_map::Split;
use crate::error::DataResult;

// ─── ArchiveSource ────────────────────────────────────────────────────────────
/// Any component that can open one split of a federated dataset.
///
/// Every call reads the split afresh and hands ownership to the caller.
/// Loaders keep what they open until `release_archives`.
pub trait ArchiveSource<A: Archive> {
    /// Open and validate the archive for `split`.
    fn open(&self, split: Split) -> DataResult<A>;
}

impl<A: Archive, S: ArchiveSource<A> + ?Sized> ArchiveSource<A> for &S {
    fn open(&self, split: Split) -> DataResult<A> {
        (**self).open(split)
    }
}
