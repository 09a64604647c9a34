// ============================================================
// Layer 4 — Client Partitioner
// ============================================================
// Assigns every distinct example ID of one split to one of
// `client_num` synthetic clients.
//
//   ids (distinct, sorted)   a b c d e f g h i j
//   after shuffle            g c j a e b i d h f
//   client = position % 3    0 1 2 0 1 2 0 1 2 0
//
//   client 0 → {a, f, g, i}
//   client 1 → {c, d, e}
//   client 2 → {b, h, j}
//
// Round-robin over a shuffled list gives client sizes that
// differ by at most one. Sorting before the shuffle makes a
// seeded partition independent of the order IDs were read in.
//
// ClientMapCache memoizes the result: the first build wins and
// every later request gets the identical map. The client count
// is fixed per cache; `resize` is the only way to change it,
// and it throws the old map away.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::client_map::{ClientMap, Split};
use crate::error::{DataError, DataResult};
use crate::infra::memo::Memo;

/// Shuffle `ids` and deal them round-robin to `client_num` clients.
///
/// Duplicate IDs are collapsed. Uses Fisher-Yates via
/// rand::seq::SliceRandom, so every permutation is equally likely.
pub fn partition<K, R>(ids: Vec<K>, client_num: usize, rng: &mut R) -> DataResult<ClientMap<K>>
where
    K: Ord,
    R: Rng + ?Sized,
{
    if client_num == 0 {
        return Err(DataError::InvalidClientCount);
    }

    let mut ids = ids;
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Err(DataError::EmptyUniverse);
    }

    ids.shuffle(rng);

    let mut shards: Vec<BTreeSet<K>> = (0..client_num).map(|_| BTreeSet::new()).collect();
    for (position, id) in ids.into_iter().enumerate() {
        shards[position % client_num].insert(id);
    }

    Ok(ClientMap::from_shards(shards))
}

/// Memoized client map for one split of one dataset.
pub struct ClientMapCache<K> {
    split: Split,
    client_num: Mutex<usize>,
    seed: Option<u64>,
    map: Memo<ClientMap<K>>,
}

impl<K: Ord> ClientMapCache<K> {
    /// `seed = None` draws the shuffle from OS entropy, so each
    /// process gets a different partition.
    pub fn new(split: Split, client_num: usize, seed: Option<u64>) -> Self {
        Self {
            split,
            client_num: Mutex::new(client_num),
            seed,
            map: Memo::new(),
        }
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn client_num(&self) -> usize {
        *self.client_num.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached map, if one has been built or preloaded
    pub fn get(&self) -> Option<Arc<ClientMap<K>>> {
        self.map.get()
    }

    /// Return the cached map, building it from `universe` on first use.
    ///
    /// `universe` is only called when no map is cached.
    pub fn get_or_build<F>(&self, universe: F) -> DataResult<Arc<ClientMap<K>>>
    where
        F: FnOnce() -> DataResult<Vec<K>>,
    {
        let client_num = self.client_num();
        self.map.get_or_try_init(|| {
            let ids = universe()?;
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let map = partition(ids, client_num, &mut rng)?;
            tracing::info!(
                "Partitioned {} {} ids across {} clients",
                map.id_count(),
                self.split,
                client_num
            );
            Ok(map)
        })
    }

    /// Install a map built elsewhere, e.g. read back from disk.
    ///
    /// The map must have this cache's client count and must split
    /// `universe`, the split's current IDs, into disjoint client sets.
    pub fn preload(&self, map: ClientMap<K>, universe: &[K]) -> DataResult<Arc<ClientMap<K>>>
    where
        K: fmt::Debug,
    {
        let expected = self.client_num();
        if map.client_num() != expected {
            return Err(DataError::ClientCountMismatch {
                expected,
                found: map.client_num(),
            });
        }
        map.verify_cover(self.split, universe)?;
        Ok(self.map.set(map))
    }

    /// Change the client count. A cached map for a different count
    /// is dropped, so the next request reshuffles.
    pub fn resize(&self, client_num: usize) {
        let mut current = self.client_num.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != client_num {
            tracing::warn!(
                "Resizing {} client map from {} to {} clients; the partition will be rebuilt",
                self.split,
                *current,
                client_num
            );
            *current = client_num;
            self.map.invalidate();
        }
    }
}
