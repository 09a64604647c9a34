// ============================================================
// Layer 4 — Federated StackOverflow Loaders
// ============================================================
// Posts are grouped by client key (a user id string). The
// partition runs over those keys, not over posts, so every
// post of a user lands on the same synthetic client.
//
//   StackOverflowTagLoader — body + title → multi-hot tags
//   StackOverflowNwpLoader — body         → shifted token IDs
//
// Both read the same archive layout and share TextShards for
// partitioning and group selection. Vocabularies come from a
// shared VocabularyStore so each count file is read once, and
// each split's archive is opened once per loader.

use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::data::batcher::{SequenceBatch, SequenceBatcher, TagBatch, TagBatcher};
use crate::data::dataset::{SequenceItem, TagItem};
use crate::data::encoder::{shift_for_language_model, TextEncoder};
use crate::data::loader::{
    check_selection, client_ids, shard_loaders, ArchiveCache, ClientCounts, FederatedDataset,
    ShardConfig, ShardLoaders,
};
use crate::data::partitioner::ClientMapCache;
use crate::domain::archive::{ClientExamples, TextArchive};
use crate::domain::client_map::{ClientSelection, Split};
use crate::domain::traits::ArchiveSource;
use crate::error::{DataError, DataResult};
use crate::infra::vocab_store::VocabularyStore;

/// Train clients when no count is configured
pub const DEFAULT_TRAIN_CLIENTS_NUM: usize = 342_477;
/// Test clients when no count is configured
pub const DEFAULT_TEST_CLIENTS_NUM: usize = 204_088;

/// Encoding settings shared by both StackOverflow tasks.
#[derive(Clone)]
pub struct TextOptions {
    pub vocab: Arc<VocabularyStore>,
    pub max_seq_len: usize,
    pub num_oov_buckets: usize,
}

// ─── Shared core ──────────────────────────────────────────────────────────────
struct TextShards<S> {
    source: S,
    config: ShardConfig,
    options: TextOptions,
    archives: ArchiveCache<TextArchive>,
    train_map: ClientMapCache<String>,
    test_map: ClientMapCache<String>,
}

impl<S: ArchiveSource<TextArchive>> TextShards<S> {
    fn new(source: S, config: ShardConfig, options: TextOptions) -> DataResult<Self> {
        config.validate()?;
        if options.max_seq_len == 0 {
            return Err(DataError::InvalidConfig("max_seq_len must be at least 1".into()));
        }
        if options.num_oov_buckets == 0 {
            return Err(DataError::InvalidConfig("num_oov_buckets must be at least 1".into()));
        }
        let (train_map, test_map) = config.client_map_caches();
        Ok(Self {
            source,
            config,
            options,
            archives: ArchiveCache::new(),
            train_map,
            test_map,
        })
    }

    fn archive(&self, split: Split) -> DataResult<Arc<TextArchive>> {
        self.archives.get_or_open(split, || self.source.open(split))
    }

    fn id_universe(&self, split: Split) -> DataResult<Vec<String>> {
        Ok(self.archive(split)?.client_keys())
    }

    fn encoder(&self) -> DataResult<TextEncoder> {
        TextEncoder::new(
            self.options.vocab.words()?,
            self.options.max_seq_len,
            self.options.num_oov_buckets,
        )
    }

    fn client_counts(&self) -> ClientCounts {
        ClientCounts {
            train: self.train_map.client_num(),
            test: self.test_map.client_num(),
        }
    }

    fn client_map(&self, split: Split) -> &ClientMapCache<String> {
        match split {
            Split::Train => &self.train_map,
            Split::Test => &self.test_map,
        }
    }

    /// Build items from every client group `selection` covers in one split.
    ///
    /// Global walks the groups in ascending key order. Local(k) looks up
    /// the keys client k owns; keys missing from the archive are skipped.
    fn collect_items<T, F>(&self, split: Split, selection: ClientSelection, mut to_items: F) -> DataResult<Vec<T>>
    where
        F: FnMut(&ClientExamples) -> DataResult<Vec<T>>,
    {
        let archive = self.archive(split)?;
        let mut items = Vec::new();

        match selection {
            ClientSelection::Global => {
                for group in archive.examples.values() {
                    items.extend(to_items(group)?);
                }
            }
            ClientSelection::Local(index) => {
                let keys = client_ids(self.client_map(split), index, || Ok(archive.client_keys()))?;
                for group in keys.iter().filter_map(|key| archive.examples.get(key)) {
                    items.extend(to_items(group)?);
                }
            }
        }

        tracing::debug!("stackoverflow {} {:?}: {} posts", split, selection, items.len());
        Ok(items)
    }
}

// ─── Tag prediction ───────────────────────────────────────────────────────────
pub struct StackOverflowTagLoader<B: Backend, S> {
    shards: TextShards<S>,
    device: B::Device,
}

impl<B: Backend, S: ArchiveSource<TextArchive>> StackOverflowTagLoader<B, S> {
    pub fn new(source: S, config: ShardConfig, options: TextOptions, device: B::Device) -> DataResult<Self> {
        Ok(Self {
            shards: TextShards::new(source, config, options)?,
            device,
        })
    }

    fn split_items(&self, split: Split, selection: ClientSelection) -> DataResult<(TagBatcher<B>, Vec<TagItem>)> {
        let encoder = self.shards.encoder()?;
        let tags = self.shards.options.vocab.tags()?;

        let items = self.shards.collect_items(split, selection, |group| {
            let rows = encoder.encode(&group.token_title_pairs());
            Ok(rows
                .into_iter()
                .zip(&group.tags)
                .map(|(tokens, post_tags)| TagItem {
                    tokens,
                    tags: tags.multi_hot(post_tags),
                })
                .collect())
        })?;

        Ok((TagBatcher::new(self.device.clone()), items))
    }
}

impl<B: Backend, S: ArchiveSource<TextArchive>> FederatedDataset for StackOverflowTagLoader<B, S> {
    type Key = String;
    type Batch = TagBatch<B>;

    fn name(&self) -> &'static str {
        "stackoverflow_lr"
    }

    fn client_counts(&self) -> ClientCounts {
        self.shards.client_counts()
    }

    fn client_map(&self, split: Split) -> &ClientMapCache<String> {
        self.shards.client_map(split)
    }

    fn id_universe(&self, split: Split) -> DataResult<Vec<String>> {
        self.shards.id_universe(split)
    }

    fn release_archives(&self) {
        self.shards.archives.release();
    }

    fn load(&self, selection: ClientSelection) -> DataResult<ShardLoaders<TagBatch<B>>> {
        check_selection(selection, self.client_counts())?;
        let train = self.split_items(Split::Train, selection)?;
        let test = self.split_items(Split::Test, selection)?;
        Ok(shard_loaders(&self.shards.config, train, test))
    }

    fn output_dim(&self) -> DataResult<usize> {
        Ok(self.shards.options.vocab.tags()?.len())
    }
}

// ─── Next-word prediction ─────────────────────────────────────────────────────
pub struct StackOverflowNwpLoader<B: Backend, S> {
    shards: TextShards<S>,
    device: B::Device,
}

impl<B: Backend, S: ArchiveSource<TextArchive>> StackOverflowNwpLoader<B, S> {
    pub fn new(source: S, config: ShardConfig, options: TextOptions, device: B::Device) -> DataResult<Self> {
        Ok(Self {
            shards: TextShards::new(source, config, options)?,
            device,
        })
    }

    fn split_items(
        &self,
        split: Split,
        selection: ClientSelection,
    ) -> DataResult<(SequenceBatcher<B>, Vec<SequenceItem>)> {
        let encoder = self.shards.encoder()?;

        let items = self.shards.collect_items(split, selection, |group| {
            let (inputs, targets) = shift_for_language_model(&encoder.encode(&group.tokens))?;
            Ok(inputs
                .into_iter()
                .zip(targets)
                .map(|(inputs, targets)| SequenceItem { inputs, targets })
                .collect())
        })?;

        Ok((SequenceBatcher::new(self.device.clone()), items))
    }
}

impl<B: Backend, S: ArchiveSource<TextArchive>> FederatedDataset for StackOverflowNwpLoader<B, S> {
    type Key = String;
    type Batch = SequenceBatch<B>;

    fn name(&self) -> &'static str {
        "stackoverflow_nwp"
    }

    fn client_counts(&self) -> ClientCounts {
        self.shards.client_counts()
    }

    fn client_map(&self, split: Split) -> &ClientMapCache<String> {
        self.shards.client_map(split)
    }

    fn id_universe(&self, split: Split) -> DataResult<Vec<String>> {
        self.shards.id_universe(split)
    }

    fn release_archives(&self) {
        self.shards.archives.release();
    }

    fn load(&self, selection: ClientSelection) -> DataResult<ShardLoaders<SequenceBatch<B>>> {
        check_selection(selection, self.client_counts())?;
        let train = self.split_items(Split::Train, selection)?;
        let test = self.split_items(Split::Test, selection)?;
        Ok(shard_loaders(&self.shards.config, train, test))
    }

    /// Vocabulary plus OOV buckets
    fn output_dim(&self) -> DataResult<usize> {
        Ok(self.shards.encoder()?.id_space())
    }
}
