// ============================================================
// Layer 4 — Federated CIFAR-100 Loader
// ============================================================
// Image rows carry an explicit numeric client `id` column.
// A local shard is built by:
//
//   1. partitioning the distinct ids of the split (once)
//   2. looking up every row whose id is in client k's set
//   3. sorting those row positions ascending
//   4. batching the selected rows
//
// The global shard is every row in archive order. Each split
// is opened and indexed by id once, then shared by every load
// until release_archives().

use std::collections::HashMap;
use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::data::batcher::{ImageBatch, ImageBatcher};
use crate::data::dataset::ImageItem;
use crate::data::loader::{
    check_selection, client_ids, shard_loaders, ArchiveCache, ClientCounts, FederatedDataset,
    ShardConfig, ShardLoaders,
};
use crate::data::partitioner::ClientMapCache;
use crate::domain::archive::{Archive, ImageArchive};
use crate::domain::client_map::{ClientSelection, Split};
use crate::domain::traits::ArchiveSource;
use crate::error::DataResult;

/// Train clients when no count is configured
pub const DEFAULT_TRAIN_CLIENTS_NUM: usize = 500;
/// Test clients when no count is configured
pub const DEFAULT_TEST_CLIENTS_NUM: usize = 100;

/// An opened split with its id → row positions index
struct IndexedArchive {
    archive: ImageArchive,
    rows_by_id: HashMap<i64, Vec<usize>>,
}

impl IndexedArchive {
    fn new(archive: ImageArchive) -> Self {
        let rows_by_id = archive.rows_by_id();
        Self { archive, rows_by_id }
    }
}

pub struct Cifar100Loader<B: Backend, S> {
    source: S,
    config: ShardConfig,
    device: B::Device,
    archives: ArchiveCache<IndexedArchive>,
    train_map: ClientMapCache<i64>,
    test_map: ClientMapCache<i64>,
}

impl<B: Backend, S: ArchiveSource<ImageArchive>> Cifar100Loader<B, S> {
    pub fn new(source: S, config: ShardConfig, device: B::Device) -> DataResult<Self> {
        config.validate()?;
        let (train_map, test_map) = config.client_map_caches();
        Ok(Self {
            source,
            config,
            device,
            archives: ArchiveCache::new(),
            train_map,
            test_map,
        })
    }

    fn archive(&self, split: Split) -> DataResult<Arc<IndexedArchive>> {
        self.archives
            .get_or_open(split, || Ok(IndexedArchive::new(self.source.open(split)?)))
    }

    /// Row positions of `split` served for `selection`, ascending
    fn select_rows(
        &self,
        indexed: &IndexedArchive,
        split: Split,
        selection: ClientSelection,
    ) -> DataResult<Vec<usize>> {
        match selection {
            ClientSelection::Global => Ok((0..indexed.archive.row_count()).collect()),
            ClientSelection::Local(index) => {
                let ids = client_ids(self.client_map(split), index, || Ok(indexed.archive.client_ids()))?;

                let mut rows: Vec<usize> = ids
                    .iter()
                    .filter_map(|id| indexed.rows_by_id.get(id))
                    .flatten()
                    .copied()
                    .collect();
                rows.sort_unstable();
                Ok(rows)
            }
        }
    }

    /// Pick the rows of one split that `selection` covers
    fn split_items(
        &self,
        split: Split,
        selection: ClientSelection,
    ) -> DataResult<(ImageBatcher<B>, Vec<ImageItem>)> {
        let indexed = self.archive(split)?;
        let rows = self.select_rows(&indexed, split, selection)?;

        let archive = &indexed.archive;
        let items: Vec<ImageItem> = rows
            .into_iter()
            .map(|row| ImageItem {
                pixels: archive.image[row].clone(),
                label: archive.label[row],
            })
            .collect();

        tracing::debug!("cifar100 {} {:?}: {} rows", split, selection, items.len());
        Ok((ImageBatcher::new(self.device.clone(), archive.image_shape), items))
    }
}

impl<B: Backend, S: ArchiveSource<ImageArchive>> FederatedDataset for Cifar100Loader<B, S> {
    type Key = i64;
    type Batch = ImageBatch<B>;

    fn name(&self) -> &'static str {
        "cifar100"
    }

    fn client_counts(&self) -> ClientCounts {
        ClientCounts {
            train: self.train_map.client_num(),
            test: self.test_map.client_num(),
        }
    }

    fn client_map(&self, split: Split) -> &ClientMapCache<i64> {
        match split {
            Split::Train => &self.train_map,
            Split::Test => &self.test_map,
        }
    }

    fn id_universe(&self, split: Split) -> DataResult<Vec<i64>> {
        Ok(self.archive(split)?.archive.client_ids())
    }

    fn release_archives(&self) {
        self.archives.release();
    }

    fn load(&self, selection: ClientSelection) -> DataResult<ShardLoaders<ImageBatch<B>>> {
        check_selection(selection, self.client_counts())?;
        let train = self.split_items(Split::Train, selection)?;
        let test = self.split_items(Split::Test, selection)?;
        Ok(shard_loaders(&self.config, train, test))
    }

    /// Distinct labels in the train split
    fn output_dim(&self) -> DataResult<usize> {
        Ok(self.archive(Split::Train)?.archive.class_num())
    }
}
