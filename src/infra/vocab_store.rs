// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Owns the word and tag vocabularies for one StackOverflow
// loader. Each is read from its ranked count file the first
// time it is needed and reused for every later shard, so
// building thousands of client shards reads each file once.

use std::path::PathBuf;
use std::sync::Arc;

use crate::data::tag_vocabulary::TagVocabulary;
use crate::data::vocabulary::Vocabulary;
use crate::error::DataResult;
use crate::infra::memo::Memo;

/// Frequent words kept when no size is configured
pub const DEFAULT_VOCAB_SIZE: usize = 100;

/// Frequent tags kept when no size is configured
pub const DEFAULT_TAG_SIZE: usize = 500;

pub struct VocabularyStore {
    word_counts: PathBuf,
    vocab_size: usize,
    tag_counts: PathBuf,
    tag_size: usize,
    words: Memo<Vocabulary>,
    tags: Memo<TagVocabulary>,
}

impl VocabularyStore {
    pub fn new(
        word_counts: impl Into<PathBuf>,
        vocab_size: usize,
        tag_counts: impl Into<PathBuf>,
        tag_size: usize,
    ) -> Self {
        Self {
            word_counts: word_counts.into(),
            vocab_size,
            tag_counts: tag_counts.into(),
            tag_size,
            words: Memo::new(),
            tags: Memo::new(),
        }
    }

    /// A store whose vocabularies are already built; the count
    /// files are never read.
    pub fn prebuilt(words: Vocabulary, tags: TagVocabulary) -> Self {
        let store = Self::new(PathBuf::new(), words.len().saturating_sub(3), PathBuf::new(), tags.len());
        store.words.set(words);
        store.tags.set(tags);
        store
    }

    /// Load the word vocabulary, reading the count file on first use
    pub fn words(&self) -> DataResult<Arc<Vocabulary>> {
        self.words.get_or_try_init(|| {
            tracing::info!(
                "Building vocabulary (vocab_size={}) from '{}'",
                self.vocab_size,
                self.word_counts.display()
            );
            Vocabulary::from_file(&self.word_counts, self.vocab_size)
        })
    }

    /// Load the tag vocabulary, reading the count file on first use
    pub fn tags(&self) -> DataResult<Arc<TagVocabulary>> {
        self.tags.get_or_try_init(|| {
            tracing::info!(
                "Building tag vocabulary (tag_size={}) from '{}'",
                self.tag_size,
                self.tag_counts.display()
            );
            TagVocabulary::from_file(&self.tag_counts, self.tag_size)
        })
    }
}
