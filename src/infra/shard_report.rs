// ============================================================
// Layer 6 — Shard Report
// ============================================================
// Records the size of every shard built in a run to a CSV
// file, one row per client plus a row for the global shard.
//
// Output file: <report_dir>/shards.csv
//
// Example CSV output:
//   client_idx,train_samples,test_samples,train_batches,test_batches
//   global,30,12,8,4
//   0,10,4,3,2
//   1,10,4,3,2
//
// A skewed train_samples column means the ID universe had
// very uneven row counts per ID; the partition itself is
// balanced by ID count, not by rows.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::data::loader::ShardLoaders;

const HEADER: &str = "client_idx,train_samples,test_samples,train_batches,test_batches";

/// Sizes of one shard, as written to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSizes {
    pub train_samples: usize,
    pub test_samples: usize,
    pub train_batches: usize,
    pub test_batches: usize,
}

impl<O> From<&ShardLoaders<O>> for ShardSizes {
    fn from(shard: &ShardLoaders<O>) -> Self {
        Self {
            train_samples: shard.train_samples,
            test_samples: shard.test_samples,
            train_batches: shard.train_batches(),
            test_batches: shard.test_batches(),
        }
    }
}

pub struct ShardReport {
    csv_path: PathBuf,
}

impl ShardReport {
    /// Start a fresh report, replacing any earlier one in `dir`.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("shards.csv");
        let mut f = fs::File::create(&csv_path)?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created shard report: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one row. `client` is None for the global shard.
    pub fn log(&self, client: Option<usize>, sizes: ShardSizes) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        let label = client.map_or_else(|| "global".to_string(), |idx| idx.to_string());

        writeln!(
            f,
            "{},{},{},{},{}",
            label, sizes.train_samples, sizes.test_samples, sizes.train_batches, sizes.test_batches,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
