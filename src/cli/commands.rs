// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `partition`, `rank` and
// `encode`, and all their configurable flags.
//
// `partition` and `rank` share one flag set (DatasetArgs),
// which converts into the application-layer FederatedConfig.
// Passing --config reads the whole FederatedConfig from JSON
// instead and ignores the other dataset flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::partition_use_case::{DatasetKind, FederatedConfig};
use crate::data::encoder::{DEFAULT_MAX_SEQ_LEN, DEFAULT_NUM_OOV_BUCKETS};
use crate::infra::vocab_store::{DEFAULT_TAG_SIZE, DEFAULT_VOCAB_SIZE};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the global shard and one shard per client
    Partition(PartitionArgs),

    /// Build the shard owned by one distributed rank
    Rank(RankArgs),

    /// Encode sentences with a word count file and print the IDs
    Encode(EncodeArgs),
}

/// Flags describing the dataset and how to shard it.
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// JSON FederatedConfig file; overrides every flag below
    #[arg(long)]
    pub config: Option<String>,

    /// cifar100, stackoverflow_lr or stackoverflow_nwp
    #[arg(long, default_value = "cifar100")]
    pub dataset: DatasetKind,

    /// Directory holding the archives and count files
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Frequent words kept in the vocabulary
    #[arg(long, default_value_t = DEFAULT_VOCAB_SIZE)]
    pub vocab_size: usize,

    /// Frequent tags kept in the tag vocabulary
    #[arg(long, default_value_t = DEFAULT_TAG_SIZE)]
    pub tag_size: usize,

    /// Tokens kept per sentence before <bos>/<eos>
    #[arg(long, default_value_t = DEFAULT_MAX_SEQ_LEN)]
    pub max_seq_len: usize,

    /// Hash buckets for out-of-vocabulary tokens
    #[arg(long, default_value_t = DEFAULT_NUM_OOV_BUCKETS)]
    pub num_oov_buckets: usize,

    #[arg(long, default_value_t = 20)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub test_batch_size: usize,

    /// Clients in both splits; the dataset's defaults when omitted
    #[arg(long)]
    pub client_num: Option<usize>,

    /// Fixes the partition and batch shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Restore client maps from, and save them to, this directory
    #[arg(long)]
    pub partition_dir: Option<String>,

    /// Write shards.csv into this directory
    #[arg(long)]
    pub report_dir: Option<String>,
}

impl DatasetArgs {
    /// The run configuration: the --config file if given, else the flags
    pub fn resolve(self) -> Result<FederatedConfig> {
        if let Some(path) = &self.config {
            return FederatedConfig::load(path);
        }
        Ok(self.into())
    }
}

/// The boundary between Layer 1 and Layer 2:
/// the application layer never sees clap types.
impl From<DatasetArgs> for FederatedConfig {
    fn from(a: DatasetArgs) -> Self {
        FederatedConfig {
            dataset:          a.dataset,
            data_dir:         a.data_dir,
            vocab_size:       a.vocab_size,
            tag_size:         a.tag_size,
            max_seq_len:      a.max_seq_len,
            num_oov_buckets:  a.num_oov_buckets,
            train_batch_size: a.train_batch_size,
            test_batch_size:  a.test_batch_size,
            client_num:       a.client_num,
            seed:             a.seed,
            partition_dir:    a.partition_dir,
            report_dir:       a.report_dir,
        }
    }
}

#[derive(Args, Debug)]
pub struct PartitionArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    /// 0 is the server (global data); r > 0 is client r - 1
    #[arg(long)]
    pub rank: usize,

    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Ranked "<word> <count>" file
    #[arg(long, default_value = "data/stackoverflow.word_count")]
    pub word_counts: String,

    #[arg(long, default_value_t = DEFAULT_VOCAB_SIZE)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_SEQ_LEN)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = DEFAULT_NUM_OOV_BUCKETS)]
    pub num_oov_buckets: usize,

    /// Also print the next-word input/target pair
    #[arg(long)]
    pub shift: bool,

    /// Sentences to encode
    #[arg(required = true)]
    pub sentences: Vec<String>,
}
