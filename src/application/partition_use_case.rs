// ============================================================
// Layer 2 — PartitionUseCase
// ============================================================
// Builds the shards of one federated dataset end to end:
//
//   Step 1: Pick the loader for the configured dataset   (Layer 4)
//   Step 2: Restore saved client maps, if any            (Layer 6)
//   Step 3: Build the global + local shards, or one rank (Layer 2)
//   Step 4: Save the client maps for the next run        (Layer 6)
//   Step 5: Write the shard size report                  (Layer 6)
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §4 (Datasets and Dataloaders)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use burn::backend::NdArray;
use serde::{Deserialize, Serialize};

use crate::application::federation::{load_partition_data, load_partition_data_distributed};
use crate::data::cifar100::{self, Cifar100Loader};
use crate::data::encoder::{DEFAULT_MAX_SEQ_LEN, DEFAULT_NUM_OOV_BUCKETS};
use crate::data::loader::{ClientCounts, FederatedDataset, ShardConfig};
use crate::data::stackoverflow::{self, StackOverflowNwpLoader, StackOverflowTagLoader, TextOptions};
use crate::domain::client_map::{ClientSelection, Split};
use crate::infra::archive_store::JsonArchiveStore;
use crate::infra::partition_store::PartitionStore;
use crate::infra::shard_report::{ShardReport, ShardSizes};
use crate::infra::vocab_store::{VocabularyStore, DEFAULT_TAG_SIZE, DEFAULT_VOCAB_SIZE};

/// Shards are built on the CPU; nothing here runs a model.
type ShardBackend = NdArray;

// ─── Dataset kind ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Federated CIFAR-100 image classification
    Cifar100,
    /// StackOverflow tag prediction
    StackoverflowLr,
    /// StackOverflow next-word prediction
    StackoverflowNwp,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Cifar100 => "cifar100",
            DatasetKind::StackoverflowLr => "stackoverflow_lr",
            DatasetKind::StackoverflowNwp => "stackoverflow_nwp",
        }
    }

    /// Archive file names inside the data directory
    fn archive_files(&self) -> (&'static str, &'static str) {
        match self {
            DatasetKind::Cifar100 => ("fed_cifar100_train.json", "fed_cifar100_test.json"),
            DatasetKind::StackoverflowLr | DatasetKind::StackoverflowNwp => {
                ("stackoverflow_train.json", "stackoverflow_test.json")
            }
        }
    }

    fn default_clients(&self) -> ClientCounts {
        match self {
            DatasetKind::Cifar100 => ClientCounts {
                train: cifar100::DEFAULT_TRAIN_CLIENTS_NUM,
                test: cifar100::DEFAULT_TEST_CLIENTS_NUM,
            },
            DatasetKind::StackoverflowLr | DatasetKind::StackoverflowNwp => ClientCounts {
                train: stackoverflow::DEFAULT_TRAIN_CLIENTS_NUM,
                test: stackoverflow::DEFAULT_TEST_CLIENTS_NUM,
            },
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cifar100" | "fed_cifar100" => Ok(DatasetKind::Cifar100),
            "stackoverflow_lr" => Ok(DatasetKind::StackoverflowLr),
            "stackoverflow_nwp" => Ok(DatasetKind::StackoverflowNwp),
            other => Err(format!(
                "unknown dataset '{other}' (expected cifar100, stackoverflow_lr or stackoverflow_nwp)"
            )),
        }
    }
}

// ─── Federated Configuration ──────────────────────────────────────────────────
// Everything one run needs. Serialisable so a run can be
// described in a JSON file instead of on the command line;
// fields missing from the file take their default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederatedConfig {
    pub dataset:          DatasetKind,
    /// Directory holding the archives and count files
    pub data_dir:         String,
    pub vocab_size:       usize,
    pub tag_size:         usize,
    pub max_seq_len:      usize,
    pub num_oov_buckets:  usize,
    pub train_batch_size: usize,
    pub test_batch_size:  usize,
    /// Clients in both splits. None uses the dataset's defaults.
    pub client_num:       Option<usize>,
    pub seed:             Option<u64>,
    /// Where client maps are restored from and saved to
    pub partition_dir:    Option<String>,
    /// Where shards.csv is written
    pub report_dir:       Option<String>,
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            dataset:          DatasetKind::Cifar100,
            data_dir:         "data".to_string(),
            vocab_size:       DEFAULT_VOCAB_SIZE,
            tag_size:         DEFAULT_TAG_SIZE,
            max_seq_len:      DEFAULT_MAX_SEQ_LEN,
            num_oov_buckets:  DEFAULT_NUM_OOV_BUCKETS,
            train_batch_size: 20,
            test_batch_size:  20,
            client_num:       None,
            seed:             None,
            partition_dir:    None,
            report_dir:       None,
        }
    }
}

impl FederatedConfig {
    /// Read a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Config '{}' is not valid JSON", path.display()))
    }

    pub fn clients(&self) -> ClientCounts {
        self.client_num
            .map(ClientCounts::uniform)
            .unwrap_or_else(|| self.dataset.default_clients())
    }

    pub fn shard_config(&self) -> ShardConfig {
        ShardConfig {
            train_batch_size: self.train_batch_size,
            test_batch_size: self.test_batch_size,
            clients: self.clients(),
            seed: self.seed,
        }
    }

    pub fn archive_store(&self) -> JsonArchiveStore {
        let (train, test) = self.dataset.archive_files();
        let dir = PathBuf::from(&self.data_dir);
        JsonArchiveStore::new(dir.join(train), dir.join(test))
    }

    pub fn word_counts(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("stackoverflow.word_count")
    }

    pub fn tag_counts(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("stackoverflow.tag_count")
    }

    fn text_options(&self) -> TextOptions {
        TextOptions {
            vocab: Arc::new(VocabularyStore::new(
                self.word_counts(),
                self.vocab_size,
                self.tag_counts(),
                self.tag_size,
            )),
            max_seq_len: self.max_seq_len,
            num_oov_buckets: self.num_oov_buckets,
        }
    }
}

// ─── Summaries ────────────────────────────────────────────────────────────────
/// What a `partition` run produced, for the CLI to print.
#[derive(Debug, Clone)]
pub struct PartitionSummary {
    pub dataset: DatasetKind,
    pub train_data_num: usize,
    pub test_data_num: usize,
    pub client_num: usize,
    pub output_dim: usize,
}

/// What a `rank` run produced.
#[derive(Debug, Clone)]
pub struct RankSummary {
    pub dataset: DatasetKind,
    pub rank: usize,
    pub selection: ClientSelection,
    pub sizes: ShardSizes,
    pub output_dim: usize,
}

// ─── PartitionUseCase ─────────────────────────────────────────────────────────
pub struct PartitionUseCase {
    config: FederatedConfig,
}

impl PartitionUseCase {
    pub fn new(config: FederatedConfig) -> Self {
        Self { config }
    }

    /// Build the global shard and every client shard
    pub fn execute(&self) -> Result<PartitionSummary> {
        let cfg = &self.config;
        let device = Default::default();
        tracing::info!(
            "Partitioning {} from '{}' ({} train / {} test clients)",
            cfg.dataset,
            cfg.data_dir,
            cfg.clients().train,
            cfg.clients().test
        );

        match cfg.dataset {
            DatasetKind::Cifar100 => self.partition_all(&Cifar100Loader::<ShardBackend, _>::new(
                cfg.archive_store(),
                cfg.shard_config(),
                device,
            )?),
            DatasetKind::StackoverflowLr => self.partition_all(&StackOverflowTagLoader::<ShardBackend, _>::new(
                cfg.archive_store(),
                cfg.shard_config(),
                cfg.text_options(),
                device,
            )?),
            DatasetKind::StackoverflowNwp => self.partition_all(&StackOverflowNwpLoader::<ShardBackend, _>::new(
                cfg.archive_store(),
                cfg.shard_config(),
                cfg.text_options(),
                device,
            )?),
        }
    }

    /// Build only the shard owned by `rank`
    pub fn execute_rank(&self, rank: usize) -> Result<RankSummary> {
        let cfg = &self.config;
        let device = Default::default();

        match cfg.dataset {
            DatasetKind::Cifar100 => self.partition_rank(
                &Cifar100Loader::<ShardBackend, _>::new(cfg.archive_store(), cfg.shard_config(), device)?,
                rank,
            ),
            DatasetKind::StackoverflowLr => self.partition_rank(
                &StackOverflowTagLoader::<ShardBackend, _>::new(
                    cfg.archive_store(),
                    cfg.shard_config(),
                    cfg.text_options(),
                    device,
                )?,
                rank,
            ),
            DatasetKind::StackoverflowNwp => self.partition_rank(
                &StackOverflowNwpLoader::<ShardBackend, _>::new(
                    cfg.archive_store(),
                    cfg.shard_config(),
                    cfg.text_options(),
                    device,
                )?,
                rank,
            ),
        }
    }

    fn partition_all<D: FederatedDataset>(&self, dataset: &D) -> Result<PartitionSummary> {
        self.restore_partitions(dataset)?;

        let client_num = dataset.client_counts().train;
        let data = load_partition_data(dataset, client_num)?;
        self.save_partitions(dataset)?;

        if let Some(dir) = &self.config.report_dir {
            let report = ShardReport::create(dir)?;
            report.log(None, ShardSizes::from(&data.global))?;
            for (&idx, shard) in &data.local {
                report.log(Some(idx), ShardSizes::from(shard))?;
            }
            tracing::info!("Shard report written to '{}'", report.csv_path().display());
        }

        Ok(PartitionSummary {
            dataset: self.config.dataset,
            train_data_num: data.train_data_num,
            test_data_num: data.test_data_num,
            client_num: data.client_num(),
            output_dim: data.output_dim,
        })
    }

    fn partition_rank<D: FederatedDataset>(&self, dataset: &D, rank: usize) -> Result<RankSummary> {
        self.restore_partitions(dataset)?;
        let data = load_partition_data_distributed(dataset, rank)?;
        self.save_partitions(dataset)?;

        Ok(RankSummary {
            dataset: self.config.dataset,
            rank: data.rank,
            selection: data.selection,
            sizes: ShardSizes::from(&data.shard),
            output_dim: data.output_dim,
        })
    }

    fn partition_store(&self) -> Option<PartitionStore> {
        self.config.partition_dir.as_ref().map(PartitionStore::new)
    }

    /// Install any client maps saved by an earlier run.
    ///
    /// A saved map must still partition the archive's current IDs;
    /// one built for another client count or another ID set is refused.
    fn restore_partitions<D: FederatedDataset>(&self, dataset: &D) -> Result<()> {
        let Some(store) = self.partition_store() else {
            return Ok(());
        };
        for split in [Split::Train, Split::Test] {
            if let Some(map) = store.load::<D::Key>(split)? {
                let universe = dataset.id_universe(split)?;
                dataset.client_map(split).preload(map, &universe).with_context(|| {
                    format!(
                        "Saved {} client map in '{}' does not fit the current {} archive",
                        split,
                        store.dir().display(),
                        dataset.name()
                    )
                })?;
            }
        }
        Ok(())
    }

    /// Save every client map this run built or restored
    fn save_partitions<D: FederatedDataset>(&self, dataset: &D) -> Result<()> {
        let Some(store) = self.partition_store() else {
            return Ok(());
        };
        for split in [Split::Train, Split::Test] {
            if let Some(map) = dataset.client_map(split).get() {
                store.save(split, &*map)?;
            }
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::archive::{ClientExamples, ImageArchive, TextArchive};
    use crate::domain::client_map::ClientMap;
    use crate::error::DataError;
    use std::collections::BTreeMap;

    fn write_json<T: Serialize>(path: PathBuf, value: &T) {
        fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
    }

    fn image_archive(rows: usize, ids: i64) -> ImageArchive {
        ImageArchive {
            image: vec![vec![0.0; 3]; rows],
            image_shape: [1, 1, 3],
            label: (0..rows as i64).map(|r| r % 3).collect(),
            id: (0..rows as i64).map(|r| r % ids).collect(),
        }
    }

    fn cifar_config(dir: &Path) -> FederatedConfig {
        write_json(dir.join("fed_cifar100_train.json"), &image_archive(24, 6));
        write_json(dir.join("fed_cifar100_test.json"), &image_archive(9, 3));
        FederatedConfig {
            dataset: DatasetKind::Cifar100,
            data_dir: dir.display().to_string(),
            train_batch_size: 4,
            test_batch_size: 4,
            client_num: Some(3),
            seed: Some(11),
            partition_dir: Some(dir.join("partitions").display().to_string()),
            report_dir: Some(dir.join("report").display().to_string()),
            ..FederatedConfig::default()
        }
    }

    #[test]
    fn test_dataset_kind_parse() {
        assert_eq!("stackoverflow_nwp".parse::<DatasetKind>(), Ok(DatasetKind::StackoverflowNwp));
        assert_eq!("fed_cifar100".parse::<DatasetKind>(), Ok(DatasetKind::Cifar100));
        assert!("mnist".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"dataset": "stackoverflow_lr", "seed": 5}"#).unwrap();

        let cfg = FederatedConfig::load(&path).unwrap();
        assert_eq!(cfg.dataset, DatasetKind::StackoverflowLr);
        assert_eq!(cfg.seed, Some(5));
        assert_eq!(cfg.vocab_size, DEFAULT_VOCAB_SIZE);
        assert_eq!(cfg.clients(), ClientCounts { train: 342_477, test: 204_088 });
    }

    #[test]
    fn test_partition_writes_maps_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cifar_config(dir.path());
        let summary = PartitionUseCase::new(cfg).execute().unwrap();

        assert_eq!(summary.train_data_num, 24);
        assert_eq!(summary.test_data_num, 9);
        assert_eq!(summary.client_num, 3);
        assert_eq!(summary.output_dim, 3);

        let store = PartitionStore::new(dir.path().join("partitions"));
        let train: ClientMap<i64> = store.load(Split::Train).unwrap().unwrap();
        assert_eq!(train.sizes(), vec![2, 2, 2]);

        let csv = fs::read_to_string(dir.path().join("report").join("shards.csv")).unwrap();
        // header + global + 3 clients
        assert_eq!(csv.lines().count(), 5);
        assert!(csv.lines().nth(1).unwrap().starts_with("global,24,9,"));
    }

    #[test]
    fn test_saved_partition_is_reused_by_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cifar_config(dir.path());
        PartitionUseCase::new(cfg.clone()).execute().unwrap();

        let store = PartitionStore::new(dir.path().join("partitions"));
        let saved: ClientMap<i64> = store.load(Split::Train).unwrap().unwrap();

        // A different seed would reshuffle if the map were not restored
        let rank_cfg = FederatedConfig { seed: Some(999), ..cfg };
        let summary = PartitionUseCase::new(rank_cfg).execute_rank(2).unwrap();
        assert_eq!(summary.selection, ClientSelection::Local(1));

        let owned = saved.shard(1).unwrap().len();
        assert_eq!(summary.sizes.train_samples, owned * 4);
    }

    #[test]
    fn test_mismatched_saved_partition_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cifar_config(dir.path());
        PartitionUseCase::new(cfg.clone()).execute().unwrap();

        let resized = FederatedConfig { client_num: Some(2), ..cfg };
        let err = PartitionUseCase::new(resized).execute().unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<DataError>(),
            Some(DataError::ClientCountMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_saved_partition_of_a_grown_archive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cifar_config(dir.path());
        PartitionUseCase::new(cfg.clone()).execute().unwrap();

        // Six new client ids appear after the train map was saved
        write_json(dir.path().join("fed_cifar100_train.json"), &image_archive(48, 12));

        let err = PartitionUseCase::new(cfg).execute_rank(1).unwrap_err();
        match err.root_cause().downcast_ref::<DataError>() {
            Some(DataError::ClientMapMismatch { split, reason }) => {
                assert_eq!(*split, Split::Train);
                assert!(reason.starts_with("6 archive ids belong to no client"), "{reason}");
            }
            other => panic!("unexpected error: {other:?} ({err:#})"),
        }
    }

    #[test]
    fn test_stackoverflow_rank_zero() {
        let dir = tempfile::tempdir().unwrap();
        let group = ClientExamples {
            tokens: vec!["how to borrow".to_string()],
            title: vec!["borrow checker".to_string()],
            tags: vec!["rust".to_string()],
        };
        let archive = TextArchive {
            examples: BTreeMap::from([
                ("u1".to_string(), group.clone()),
                ("u2".to_string(), group),
            ]),
        };
        write_json(dir.path().join("stackoverflow_train.json"), &archive);
        write_json(dir.path().join("stackoverflow_test.json"), &archive);
        fs::write(dir.path().join("stackoverflow.word_count"), "how 9\nto 8\nborrow 7\n").unwrap();
        fs::write(dir.path().join("stackoverflow.tag_count"), "rust 3\npython 2\n").unwrap();

        let cfg = FederatedConfig {
            dataset: DatasetKind::StackoverflowNwp,
            data_dir: dir.path().display().to_string(),
            vocab_size: 3,
            tag_size: 2,
            max_seq_len: 4,
            client_num: Some(2),
            seed: Some(1),
            ..FederatedConfig::default()
        };
        let summary = PartitionUseCase::new(cfg.clone()).execute_rank(0).unwrap();
        assert_eq!(summary.selection, ClientSelection::Global);
        assert_eq!(summary.sizes.train_samples, 2);
        // 3 words + 3 specials + 1 OOV bucket
        assert_eq!(summary.output_dim, 7);

        let lr = FederatedConfig { dataset: DatasetKind::StackoverflowLr, ..cfg };
        let summary = PartitionUseCase::new(lr).execute_rank(1).unwrap();
        assert_eq!(summary.sizes.train_samples, 1);
        assert_eq!(summary.output_dim, 2);
    }
}
