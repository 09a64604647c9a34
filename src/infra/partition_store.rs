// ============================================================
// Layer 6 — Partition Store
// ============================================================
// Saves and restores client maps as JSON so several processes
// (or several runs) can share one partition instead of each
// drawing its own.
//
// File naming convention:
//   partitions/
//     client_map_train.json   ← [[ids of client 0], [ids of client 1], ...]
//     client_map_test.json
//
// A missing file is not an error: the loader builds the map
// itself and the caller saves it afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::client_map::{ClientMap, Split};

pub struct PartitionStore {
    dir: PathBuf,
}

impl PartitionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("client_map_{split}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one split's client map, creating the directory if needed.
    pub fn save<K: Ord + Serialize>(&self, split: Split, map: &ClientMap<K>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create partition dir '{}'", self.dir.display()))?;

        let path = self.path(split);
        let json = serde_json::to_string(map)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write client map to '{}'", path.display()))?;

        tracing::info!(
            "Saved {} client map ({} clients) to '{}'",
            split,
            map.client_num(),
            path.display()
        );
        Ok(())
    }

    /// Read one split's client map. `Ok(None)` when nothing was saved.
    pub fn load<K: Ord + DeserializeOwned>(&self, split: Split) -> Result<Option<ClientMap<K>>> {
        let path = self.path(split);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read client map from '{}'", path.display()))?;
        let map: ClientMap<K> = serde_json::from_str(&json)
            .with_context(|| format!("Client map '{}' is not valid JSON", path.display()))?;

        tracing::debug!("Loaded {} client map from '{}'", split, path.display());
        Ok(Some(map))
    }
}
