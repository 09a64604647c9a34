// ============================================================
// Layer 6 — Archive Stores
// ============================================================
// Two ArchiveSource implementations:
//
//   JsonArchiveStore   — train and test archives are JSON
//                        files on disk, decoded with serde_json
//   MemoryArchiveStore — archives already in memory; every
//                        open() hands out a fresh copy
//
// Tests also get CountingArchiveStore, which tallies open()
// calls so loaders can be checked for redundant reads.
//
// Both validate the archive before returning it, so loaders
// can index columns without re-checking lengths.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::domain::archive::Archive;
use crate::domain::client_map::Split;
use crate::domain::traits::ArchiveSource;
use crate::error::DataResult;

// ─── JsonArchiveStore ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct JsonArchiveStore {
    train: PathBuf,
    test: PathBuf,
}

impl JsonArchiveStore {
    pub fn new(train: impl Into<PathBuf>, test: impl Into<PathBuf>) -> Self {
        Self { train: train.into(), test: test.into() }
    }

    pub fn path(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }
}

impl<A: Archive> ArchiveSource<A> for JsonArchiveStore {
    fn open(&self, split: Split) -> DataResult<A> {
        let path = self.path(split);
        // The file handle is dropped as soon as decoding finishes
        let archive: A = {
            let file = File::open(path)?;
            serde_json::from_reader(BufReader::new(file))?
        };
        archive.validate()?;

        tracing::debug!(
            "Opened {} archive '{}' ({} rows)",
            split,
            path.display(),
            archive.row_count()
        );
        Ok(archive)
    }
}

// ─── MemoryArchiveStore ───────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MemoryArchiveStore<A> {
    train: A,
    test: A,
}

impl<A> MemoryArchiveStore<A> {
    pub fn new(train: A, test: A) -> Self {
        Self { train, test }
    }
}

impl<A: Archive + Clone> ArchiveSource<A> for MemoryArchiveStore<A> {
    fn open(&self, split: Split) -> DataResult<A> {
        let archive = match split {
            Split::Train => self.train.clone(),
            Split::Test => self.test.clone(),
        };
        archive.validate()?;
        Ok(archive)
    }
}

// ─── CountingArchiveStore ─────────────────────────────────────────────────────
/// A MemoryArchiveStore that records how many times it was opened.
#[cfg(test)]
pub struct CountingArchiveStore<A> {
    inner: MemoryArchiveStore<A>,
    opens: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl<A> CountingArchiveStore<A> {
    pub fn new(train: A, test: A) -> Self {
        Self {
            inner: MemoryArchiveStore::new(train, test),
            opens: Default::default(),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl<A: Archive + Clone> ArchiveSource<A> for CountingArchiveStore<A> {
    fn open(&self, split: Split) -> DataResult<A> {
        self.opens.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.open(split)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::archive::{ImageArchive, TextArchive};
    use crate::error::DataError;
    use std::fs;

    fn archive(rows: usize) -> ImageArchive {
        ImageArchive {
            image: vec![vec![0.5; 3]; rows],
            image_shape: [1, 1, 3],
            label: vec![1; rows],
            id: (0..rows as i64).collect(),
        }
    }

    #[test]
    fn test_json_store_opens_each_split() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("cifar100_train.json");
        let test = dir.path().join("cifar100_test.json");
        fs::write(&train, serde_json::to_string(&archive(4)).unwrap()).unwrap();
        fs::write(&test, serde_json::to_string(&archive(2)).unwrap()).unwrap();

        let store = JsonArchiveStore::new(&train, &test);
        let opened: ImageArchive = store.open(Split::Train).unwrap();
        assert_eq!(opened.row_count(), 4);
        let opened: ImageArchive = store.open(Split::Test).unwrap();
        assert_eq!(opened.row_count(), 2);
    }

    #[test]
    fn test_json_store_missing_file() {
        let store = JsonArchiveStore::new("/nonexistent/train.json", "/nonexistent/test.json");
        let result: DataResult<TextArchive> = store.open(Split::Train);
        assert!(matches!(result, Err(DataError::Io(_))));
    }

    #[test]
    fn test_json_store_rejects_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("bad.json");
        let mut bad = archive(3);
        bad.label.pop();
        fs::write(&train, serde_json::to_string(&bad).unwrap()).unwrap();

        let store = JsonArchiveStore::new(&train, &train);
        let result: DataResult<ImageArchive> = store.open(Split::Train);
        assert!(matches!(result, Err(DataError::MalformedArchive(_))));
    }

    #[test]
    fn test_counting_store_counts_opens() {
        let store = CountingArchiveStore::new(archive(2), archive(1));
        let _: ImageArchive = store.open(Split::Train).unwrap();
        let _: ImageArchive = store.open(Split::Test).unwrap();
        assert_eq!(store.opens(), 2);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryArchiveStore::new(archive(5), archive(1));
        let test: ImageArchive = store.open(Split::Test).unwrap();
        assert_eq!(test.row_count(), 1);
    }
}
