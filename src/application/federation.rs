// ============================================================
// Layer 2 — Federation Orchestration
// ============================================================
// Two ways of asking a FederatedDataset for its shards:
//
//   load_partition_data              one process builds them all:
//                                    the global shard, then a local
//                                    shard for every client
//
//   load_partition_data_distributed  one process per rank:
//                                    rank 0 → global shard
//                                    rank r → shard of client r - 1
//
// Both work over any FederatedDataset, so the same code drives
// CIFAR-100 and the two StackOverflow tasks. Archives stay open
// across the loads of one call and are released when it ends.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::data::loader::{FederatedDataset, ShardLoaders};
use crate::domain::client_map::{ClientSelection, Split};

// ─── Single-process federation ────────────────────────────────────────────────
/// Every shard of a federated dataset, built in one process.
pub struct FederatedData<O> {
    /// Rows in the global train split
    pub train_data_num: usize,
    /// Rows in the global test split
    pub test_data_num: usize,
    pub global: ShardLoaders<O>,
    /// Client index → that client's shard
    pub local: BTreeMap<usize, ShardLoaders<O>>,
    pub output_dim: usize,
}

impl<O> FederatedData<O> {
    pub fn client_num(&self) -> usize {
        self.local.len()
    }

    /// Client index → train plus test rows of that client
    pub fn local_sample_counts(&self) -> BTreeMap<usize, usize> {
        self.local
            .iter()
            .map(|(&idx, shard)| (idx, shard.sample_count()))
            .collect()
    }
}

/// Build the global shard and one local shard per client.
///
/// A `client_num` different from the dataset's train client count
/// resizes the train partition first, which discards any cached map.
pub fn load_partition_data<D: FederatedDataset>(dataset: &D, client_num: usize) -> Result<FederatedData<D::Batch>> {
    let train_map = dataset.client_map(Split::Train);
    if train_map.client_num() != client_num {
        train_map.resize(client_num);
    }

    let global = dataset
        .load(ClientSelection::Global)
        .with_context(|| format!("Failed to load global {} shard", dataset.name()))?;
    tracing::info!(
        "{} global shard: {} train / {} test samples",
        dataset.name(),
        global.train_samples,
        global.test_samples
    );

    let mut local = BTreeMap::new();
    for client_idx in 0..client_num {
        let shard = dataset
            .load(ClientSelection::Local(client_idx))
            .with_context(|| format!("Failed to load {} shard of client {}", dataset.name(), client_idx))?;
        tracing::info!(
            "client_idx = {}, local_sample_number = {}, batch_num_train_local = {}, batch_num_test_local = {}",
            client_idx,
            shard.sample_count(),
            shard.train_batches(),
            shard.test_batches()
        );
        local.insert(client_idx, shard);
    }

    let output_dim = dataset.output_dim()?;
    dataset.release_archives();
    Ok(FederatedData {
        train_data_num: global.train_samples,
        test_data_num: global.test_samples,
        global,
        local,
        output_dim,
    })
}

// ─── Distributed federation ───────────────────────────────────────────────────
/// The one shard a distributed rank trains or evaluates on.
pub struct RankData<O> {
    pub rank: usize,
    pub selection: ClientSelection,
    pub shard: ShardLoaders<O>,
    pub output_dim: usize,
}

impl<O> RankData<O> {
    /// The server rank holds the global data
    pub fn is_server(&self) -> bool {
        self.selection == ClientSelection::Global
    }
}

pub fn load_partition_data_distributed<D: FederatedDataset>(dataset: &D, rank: usize) -> Result<RankData<D::Batch>> {
    let selection = ClientSelection::for_rank(rank);

    let shard = match selection {
        ClientSelection::Global => {
            let shard = dataset
                .load(ClientSelection::Global)
                .with_context(|| format!("Rank 0 failed to load global {} shard", dataset.name()))?;
            tracing::info!(
                "rank 0: global {} shard, train_batch_num = {}, test_batch_num = {}",
                dataset.name(),
                shard.train_batches(),
                shard.test_batches()
            );
            shard
        }
        ClientSelection::Local(client_idx) => {
            let shard = dataset
                .load(ClientSelection::Local(client_idx))
                .with_context(|| format!("Rank {} failed to load {} shard of client {}", rank, dataset.name(), client_idx))?;
            tracing::info!(
                "rank = {}, client_idx = {}, local_sample_number = {}, batch_num_train_local = {}",
                rank,
                client_idx,
                shard.sample_count(),
                shard.train_batches()
            );
            shard
        }
    };

    let output_dim = dataset.output_dim()?;
    dataset.release_archives();
    Ok(RankData {
        rank,
        selection,
        shard,
        output_dim,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cifar100::Cifar100Loader;
    use crate::data::loader::{ClientCounts, ShardConfig};
    use crate::domain::archive::ImageArchive;
    use crate::infra::archive_store::{CountingArchiveStore, MemoryArchiveStore};
    use burn::backend::NdArray;

    type TestLoader = Cifar100Loader<NdArray, MemoryArchiveStore<ImageArchive>>;

    fn archive(rows: usize, ids: i64) -> ImageArchive {
        ImageArchive {
            image: vec![vec![0.25; 3]; rows],
            image_shape: [1, 1, 3],
            label: (0..rows as i64).map(|r| r % 4).collect(),
            id: (0..rows as i64).map(|r| r % ids).collect(),
        }
    }

    fn dataset(clients: usize) -> TestLoader {
        let config = ShardConfig {
            train_batch_size: 5,
            test_batch_size: 5,
            clients: ClientCounts::uniform(clients),
            seed: Some(3),
        };
        let store = MemoryArchiveStore::new(archive(40, 8), archive(16, 4));
        Cifar100Loader::new(store, config, Default::default()).unwrap()
    }

    #[test]
    fn test_load_partition_data_totals() {
        let data = load_partition_data(&dataset(4), 4).unwrap();
        assert_eq!(data.train_data_num, 40);
        assert_eq!(data.test_data_num, 16);
        assert_eq!(data.client_num(), 4);
        assert_eq!(data.output_dim, 4);

        // 8 train ids over 4 clients → 2 ids of 5 rows each;
        // 4 test ids over 4 clients → 1 id of 4 rows each
        let counts = data.local_sample_counts();
        assert!(counts.values().all(|&n| n == 14), "{counts:?}");
        let local_test: usize = data.local.values().map(|shard| shard.test_samples).sum();
        assert_eq!(local_test, 16);
    }

    #[test]
    fn test_load_partition_data_resizes() {
        let loader = dataset(4);
        let data = load_partition_data(&loader, 2).unwrap();
        assert_eq!(data.client_num(), 2);
        assert_eq!(loader.client_map(Split::Train).get().unwrap().client_num(), 2);
        // Only the train partition is resized; the test one keeps 4 clients
        let train: usize = data.local.values().map(|shard| shard.train_samples).sum();
        assert_eq!(train, 40);
        let counts = data.local_sample_counts();
        assert_eq!(counts.values().sum::<usize>(), 40 + 8);
    }

    #[test]
    fn test_many_clients_open_each_archive_once() {
        let store = CountingArchiveStore::new(archive(100, 50), archive(20, 10));
        let config = ShardConfig {
            train_batch_size: 5,
            test_batch_size: 5,
            clients: ClientCounts::uniform(50),
            seed: Some(3),
        };
        let loader: Cifar100Loader<NdArray, _> = Cifar100Loader::new(&store, config, Default::default()).unwrap();

        let data = load_partition_data(&loader, 50).unwrap();
        assert_eq!(data.client_num(), 50);
        assert_eq!(store.opens(), 2);

        // The run released its archives; a rank load reopens them
        load_partition_data_distributed(&loader, 1).unwrap();
        assert_eq!(store.opens(), 4);
    }

    #[test]
    fn test_distributed_ranks() {
        let loader = dataset(4);
        let server = load_partition_data_distributed(&loader, 0).unwrap();
        assert!(server.is_server());
        assert_eq!(server.shard.train_samples, 40);
        assert!(loader.client_map(Split::Train).get().is_none());

        let client = load_partition_data_distributed(&loader, 4).unwrap();
        assert_eq!(client.selection, ClientSelection::Local(3));
        assert_eq!(client.shard.train_samples, 10);

        assert!(load_partition_data_distributed(&loader, 5).is_err());
    }
}
