// ============================================================
// Layer 4 — Tag Vocabulary
// ============================================================
// Turns StackOverflow tag strings into dense multi-label
// targets for tag prediction.
//
// The tag list uses the same ranked `<tag> <count>` format as
// the word list. The first `tag_size` tags get indices
// 0..tag_size; every post's '|'-joined tag string becomes a
// 0/1 vector of that length:
//
//   tags = [rust, python, serde]
//   "rust|serde"   → [1, 0, 1]
//   "haskell"      → [0, 0, 0]   (unknown tags are dropped)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::data::vocabulary::read_ranked_words;
use crate::error::{DataError, DataResult};

/// Separator between tags of one post
pub const TAG_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVocabulary {
    index: HashMap<String, usize>,
    tags: Vec<String>,
}

impl TagVocabulary {
    pub fn from_tags<I>(tags: I) -> DataResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let tags: Vec<String> = tags.into_iter().collect();
        let mut index = HashMap::with_capacity(tags.len());
        for (idx, tag) in tags.iter().enumerate() {
            if index.insert(tag.clone(), idx).is_some() {
                return Err(DataError::MalformedWordCount {
                    line: idx + 1,
                    reason: format!("tag '{tag}' appears more than once"),
                });
            }
        }
        Ok(Self { index, tags })
    }

    pub fn from_reader<R: BufRead>(reader: R, tag_size: usize) -> DataResult<Self> {
        Self::from_tags(read_ranked_words(reader, tag_size)?)
    }

    pub fn from_file(path: impl AsRef<Path>, tag_size: usize) -> DataResult<Self> {
        let file = File::open(path.as_ref())?;
        let tags = Self::from_reader(BufReader::new(file), tag_size)?;
        tracing::info!(
            "Tag vocabulary built from '{}': {} tags",
            path.as_ref().display(),
            tags.len()
        );
        Ok(tags)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn index(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    /// 0/1 target vector for one post's '|'-joined tags
    pub fn multi_hot(&self, tags: &str) -> Vec<f32> {
        let mut target = vec![0.0; self.tags.len()];
        for tag in tags.split(TAG_SEPARATOR) {
            if let Some(idx) = self.index(tag.trim()) {
                target[idx] = 1.0;
            }
        }
        target
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tags() -> TagVocabulary {
        TagVocabulary::from_reader(Cursor::new("rust 50\npython 40\nserde 30\nc 20"), 3).unwrap()
    }

    #[test]
    fn test_indices_follow_rank() {
        let vocab = tags();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.index("rust"), Some(0));
        assert_eq!(vocab.index("serde"), Some(2));
        assert_eq!(vocab.index("c"), None);
    }

    #[test]
    fn test_multi_hot() {
        let vocab = tags();
        assert_eq!(vocab.multi_hot("rust|serde"), vec![1.0, 0.0, 1.0]);
        assert_eq!(vocab.multi_hot("python"), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_and_empty_tags_ignored() {
        let vocab = tags();
        assert_eq!(vocab.multi_hot("haskell|c"), vec![0.0; 3]);
        assert_eq!(vocab.multi_hot(""), vec![0.0; 3]);
    }
}
