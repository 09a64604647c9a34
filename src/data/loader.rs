// ============================================================
// Layer 4 — Shard Loading
// ============================================================
// Pieces shared by the CIFAR-100 and StackOverflow loaders.
//
// Every loader answers one question:
//
//   load(selection) → train DataLoader + test DataLoader
//
//   Global    → all rows of each split
//   Local(k)  → rows owned by client k in each split's
//               client map (built on first use)
//
// DataLoaders are burn's: items are shuffled with a seed and
// served batch_size at a time, and the final short batch is
// kept. Iterating a DataLoader again starts a new pass.
//
// Each split's archive is opened once per loader and kept in
// an ArchiveCache until release_archives(), so loading every
// client costs two opens rather than two per client.

use std::fmt::Debug;
use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::data::dataset::ShardDataset;
use crate::data::partitioner::ClientMapCache;
use crate::domain::client_map::{ClientSelection, Split};
use crate::error::{DataError, DataResult};
use crate::infra::memo::Memo;

/// Number of synthetic clients in each split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCounts {
    pub train: usize,
    pub test: usize,
}

impl ClientCounts {
    pub fn uniform(client_num: usize) -> Self {
        Self { train: client_num, test: client_num }
    }
}

/// Batching and partitioning settings shared by every loader.
#[derive(Debug, Clone, Copy)]
pub struct ShardConfig {
    pub train_batch_size: usize,
    pub test_batch_size: usize,
    pub clients: ClientCounts,
    /// Seeds the partition shuffle and the batch shuffle.
    /// None means fresh randomness in every process.
    pub seed: Option<u64>,
}

impl ShardConfig {
    pub fn validate(&self) -> DataResult<()> {
        if self.train_batch_size == 0 || self.test_batch_size == 0 {
            return Err(DataError::InvalidConfig(format!(
                "batch sizes must be positive (train={}, test={})",
                self.train_batch_size, self.test_batch_size
            )));
        }
        if self.clients.train == 0 || self.clients.test == 0 {
            return Err(DataError::InvalidClientCount);
        }
        Ok(())
    }

    pub fn batch_size(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train_batch_size,
            Split::Test => self.test_batch_size,
        }
    }

    /// One client map cache per split, sized from `clients`
    pub fn client_map_caches<K: Ord>(&self) -> (ClientMapCache<K>, ClientMapCache<K>) {
        (
            ClientMapCache::new(Split::Train, self.clients.train, self.seed),
            ClientMapCache::new(Split::Test, self.clients.test, self.seed),
        )
    }
}

/// One lazily opened archive (or a value derived from it) per split.
pub(crate) struct ArchiveCache<T> {
    train: Memo<T>,
    test: Memo<T>,
}

impl<T> ArchiveCache<T> {
    pub fn new() -> Self {
        Self { train: Memo::new(), test: Memo::new() }
    }

    /// The cached value of `split`, running `open` only when none is held.
    pub fn get_or_open<F>(&self, split: Split, open: F) -> DataResult<Arc<T>>
    where
        F: FnOnce() -> DataResult<T>,
    {
        let slot = match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        };
        slot.get_or_try_init(open)
    }

    pub fn is_open(&self, split: Split) -> bool {
        match split {
            Split::Train => self.train.get().is_some(),
            Split::Test => self.test.get().is_some(),
        }
    }

    /// Drop both splits; the next access reopens them
    pub fn release(&self) {
        self.train.invalidate();
        self.test.invalidate();
    }
}

/// The batched train and test views of one shard.
pub struct ShardLoaders<O> {
    pub train: Arc<dyn DataLoader<O>>,
    pub test: Arc<dyn DataLoader<O>>,
    pub train_samples: usize,
    pub test_samples: usize,
    train_batch_size: usize,
    test_batch_size: usize,
}

impl<O> ShardLoaders<O> {
    /// Rows in the train and test splits together
    pub fn sample_count(&self) -> usize {
        self.train_samples + self.test_samples
    }

    pub fn train_batches(&self) -> usize {
        self.train_samples.div_ceil(self.train_batch_size)
    }

    pub fn test_batches(&self) -> usize {
        self.test_samples.div_ceil(self.test_batch_size)
    }
}

/// A federated dataset that can serve global and per-client shards.
pub trait FederatedDataset {
    /// Client identifier type stored in the client maps
    type Key: Ord + Clone + Debug + Serialize + DeserializeOwned;
    /// What one iteration of the DataLoaders yields
    type Batch: Send + Clone + Debug + 'static;

    fn name(&self) -> &'static str;

    /// Client counts the partitions are built with
    fn client_counts(&self) -> ClientCounts;

    /// The memoized client map of one split
    fn client_map(&self, split: Split) -> &ClientMapCache<Self::Key>;

    /// Every distinct client ID present in one split's archive
    fn id_universe(&self, split: Split) -> DataResult<Vec<Self::Key>>;

    /// Drop the archives held open between loads.
    /// Client maps and built DataLoaders are unaffected.
    fn release_archives(&self);

    /// Build the train and test DataLoaders for `selection`
    fn load(&self, selection: ClientSelection) -> DataResult<ShardLoaders<Self::Batch>>;

    /// Width of the model output this dataset trains:
    /// classes, tags, or token IDs
    fn output_dim(&self) -> DataResult<usize>;
}

/// Reject local shards for clients the train partition does not have.
pub(crate) fn check_selection(selection: ClientSelection, counts: ClientCounts) -> DataResult<()> {
    match selection {
        ClientSelection::Local(index) if index >= counts.train => Err(DataError::ClientOutOfRange {
            index,
            client_num: counts.train,
        }),
        _ => Ok(()),
    }
}

/// The IDs client `index` owns in one split, ascending.
/// Empty when the split has fewer clients than `index + 1`.
pub(crate) fn client_ids<K, F>(cache: &ClientMapCache<K>, index: usize, universe: F) -> DataResult<Vec<K>>
where
    K: Ord + Clone,
    F: FnOnce() -> DataResult<Vec<K>>,
{
    let map = cache.get_or_build(universe)?;
    Ok(map
        .shard(index)
        .map(|ids| ids.iter().cloned().collect())
        .unwrap_or_default())
}

/// Seed for one DataLoader's batch shuffle
fn shuffle_seed(seed: Option<u64>, split: Split) -> u64 {
    match (seed, split) {
        (Some(seed), Split::Train) => seed,
        (Some(seed), Split::Test) => seed.wrapping_add(1),
        (None, _) => rand::random(),
    }
}

/// Wrap `items` in a shuffled, non-dropping burn DataLoader.
pub(crate) fn shuffled_loader<I, O, Bt>(
    batcher: Bt,
    items: Vec<I>,
    batch_size: usize,
    seed: Option<u64>,
    split: Split,
) -> Arc<dyn DataLoader<O>>
where
    Bt: Batcher<I, O> + Clone + 'static,
    I: Send + Sync + Clone + Debug + 'static,
    O: Send + Clone + Debug + 'static,
{
    DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .shuffle(shuffle_seed(seed, split))
        .build(ShardDataset::new(items))
}

/// Assemble ShardLoaders from the items of both splits.
pub(crate) fn shard_loaders<I, O, Bt>(
    config: &ShardConfig,
    train: (Bt, Vec<I>),
    test: (Bt, Vec<I>),
) -> ShardLoaders<O>
where
    Bt: Batcher<I, O> + Clone + 'static,
    I: Send + Sync + Clone + Debug + 'static,
    O: Send + Clone + Debug + 'static,
{
    let (train_batcher, train_items) = train;
    let (test_batcher, test_items) = test;
    let train_samples = train_items.len();
    let test_samples = test_items.len();

    ShardLoaders {
        train: shuffled_loader(
            train_batcher,
            train_items,
            config.train_batch_size,
            config.seed,
            Split::Train,
        ),
        test: shuffled_loader(
            test_batcher,
            test_items,
            config.test_batch_size,
            config.seed,
            Split::Test,
        ),
        train_samples,
        test_samples,
        train_batch_size: config.train_batch_size,
        test_batch_size: config.test_batch_size,
    }
}
