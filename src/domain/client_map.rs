// ============================================================
// Layer 3 — Client Map Domain Types
// ============================================================
// A federated dataset is split into a population of synthetic
// clients. Each client owns a set of global example IDs:
//
//   client 0 → {ids...}
//   client 1 → {ids...}
//   ...
//
// The map is a partition: every ID belongs to exactly one
// client, and the union of all client sets is the full ID set.
//
// Sets are BTreeSets so iterating a client's IDs is always in
// ascending order, which is the row order shards are built in.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Which half of a federated dataset an archive or map belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rows a loader should serve.
///
/// `Global` and `Local` are separate code paths in every loader;
/// nothing computed for one is visible to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSelection {
    /// Every row of the train and test archives
    Global,
    /// Only the rows owned by client `k`
    Local(usize),
}

impl ClientSelection {
    /// Selection for a distributed process rank:
    /// rank 0 serves the global dataset, rank r serves client r - 1.
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0 => ClientSelection::Global,
            r => ClientSelection::Local(r - 1),
        }
    }
}

/// Client index → set of example IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize",
    deserialize = "K: Deserialize<'de> + Ord"
))]
pub struct ClientMap<K> {
    shards: Vec<BTreeSet<K>>,
}

impl<K: Ord> ClientMap<K> {
    pub fn from_shards(shards: Vec<BTreeSet<K>>) -> Self {
        Self { shards }
    }

    /// Number of clients, including any empty ones
    pub fn client_num(&self) -> usize {
        self.shards.len()
    }

    /// The IDs owned by one client, or None past the last client
    pub fn shard(&self, client_idx: usize) -> Option<&BTreeSet<K>> {
        self.shards.get(client_idx)
    }

    /// Size of every client's set, in client order
    pub fn sizes(&self) -> Vec<usize> {
        self.shards.iter().map(BTreeSet::len).collect()
    }

    /// Total number of IDs across all clients
    pub fn id_count(&self) -> usize {
        self.shards.iter().map(BTreeSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<K>)> {
        self.shards.iter().enumerate()
    }

    /// Check that the client sets are disjoint and that their union
    /// is exactly `universe`, the distinct IDs of the `split` archive.
    pub fn verify_cover(&self, split: Split, universe: &[K]) -> DataResult<()>
    where
        K: fmt::Debug,
    {
        let mismatch = |reason: String| DataError::ClientMapMismatch { split, reason };

        let mut assigned: BTreeSet<&K> = BTreeSet::new();
        for (client_idx, ids) in self.iter() {
            for id in ids {
                if !assigned.insert(id) {
                    return Err(mismatch(format!(
                        "id {id:?} is assigned again to client {client_idx}"
                    )));
                }
            }
        }

        let expected: BTreeSet<&K> = universe.iter().collect();
        let mut unassigned = expected.difference(&assigned);
        if let Some(first) = unassigned.next() {
            return Err(mismatch(format!(
                "{} archive ids belong to no client (first: {first:?})",
                1 + unassigned.count()
            )));
        }
        let mut unknown = assigned.difference(&expected);
        if let Some(first) = unknown.next() {
            return Err(mismatch(format!(
                "{} assigned ids are not in the archive (first: {first:?})",
                1 + unknown.count()
            )));
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn two_clients() -> ClientMap<i64> {
        ClientMap::from_shards(vec![BTreeSet::from([1, 4]), BTreeSet::from([2, 3])])
    }

    #[test]
    fn test_verify_cover_accepts_exact_partition() {
        assert!(two_clients().verify_cover(Split::Train, &[4, 3, 2, 1]).is_ok());
    }

    #[test]
    fn test_verify_cover_rejects_unassigned_ids() {
        // The archive grew after the map was saved
        let err = two_clients()
            .verify_cover(Split::Train, &[1, 2, 3, 4, 5, 6])
            .unwrap_err();
        match err {
            DataError::ClientMapMismatch { split, reason } => {
                assert_eq!(split, Split::Train);
                assert!(reason.starts_with("2 archive ids belong to no client"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_verify_cover_rejects_unknown_ids() {
        assert!(matches!(
            two_clients().verify_cover(Split::Test, &[1, 2, 3]),
            Err(DataError::ClientMapMismatch { split: Split::Test, .. })
        ));
    }

    #[test]
    fn test_verify_cover_rejects_shared_ids() {
        let map = ClientMap::from_shards(vec![BTreeSet::from([1, 2]), BTreeSet::from([2, 3])]);
        let err = map.verify_cover(Split::Train, &[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("id 2 is assigned again to client 1"));
    }

    #[test]
    fn test_rank_selection() {
        assert_eq!(ClientSelection::for_rank(0), ClientSelection::Global);
        assert_eq!(ClientSelection::for_rank(1), ClientSelection::Local(0));
        assert_eq!(ClientSelection::for_rank(7), ClientSelection::Local(6));
    }

    #[test]
    fn test_client_map_accessors() {
        let map = ClientMap::from_shards(vec![
            BTreeSet::from([3, 1]),
            BTreeSet::from([2]),
            BTreeSet::new(),
        ]);
        assert_eq!(map.client_num(), 3);
        assert_eq!(map.sizes(), vec![2, 1, 0]);
        assert_eq!(map.id_count(), 3);
        // BTreeSet iteration is ascending regardless of insertion order
        let first: Vec<i32> = map.shard(0).into_iter().flatten().copied().collect();
        assert_eq!(first, vec![1, 3]);
        assert!(map.shard(3).is_none());
    }

    #[test]
    fn test_client_map_json_shape() {
        let map = ClientMap::from_shards(vec![
            BTreeSet::from(["b".to_string(), "a".to_string()]),
            BTreeSet::from(["c".to_string()]),
        ]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"shards":[["a","b"],["c"]]}"#);
        let back: ClientMap<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
