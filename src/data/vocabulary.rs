// ============================================================
// Layer 4 — Word Vocabulary
// ============================================================
// Builds the fixed-size token vocabulary for StackOverflow
// text from a frequency-ranked word list.
//
// Source format, one entry per line, most frequent first:
//
//   the 1000
//   a 900
//   is 800
//
// Vocabulary layout for vocab_size = K:
//
//   <pad>      → 0
//   word_1     → 1
//   ...
//   word_K     → K
//   <bos>      → K + 1
//   <eos>      → K + 2
//
// Only the first K lines are read. A source with fewer than K
// words is an error rather than a silently smaller vocabulary.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DataError, DataResult};

/// Padding symbol, always ID 0
pub const PAD: &str = "<pad>";
/// Begin-of-sentence symbol
pub const BOS: &str = "<bos>";
/// End-of-sentence symbol
pub const EOS: &str = "<eos>";

/// Read the first `limit` words of a `<word> <count>` ranked list.
///
/// Stops reading as soon as `limit` words have been collected.
/// Shared by the word and tag vocabularies.
pub fn read_ranked_words<R: BufRead>(reader: R, limit: usize) -> DataResult<Vec<String>> {
    let mut words = Vec::with_capacity(limit);
    if limit == 0 {
        return Ok(words);
    }

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();

        let (word, count) = match (fields.next(), fields.next(), fields.next()) {
            (Some(word), Some(count), None) => (word, count),
            _ => {
                return Err(DataError::MalformedWordCount {
                    line: idx + 1,
                    reason: format!("expected '<word> <count>', got '{line}'"),
                })
            }
        };
        if count.parse::<u64>().is_err() {
            return Err(DataError::MalformedWordCount {
                line: idx + 1,
                reason: format!("count '{count}' is not an unsigned integer"),
            });
        }

        words.push(word.to_string());
        if words.len() == limit {
            break;
        }
    }

    if words.len() < limit {
        return Err(DataError::VocabularyShortfall {
            requested: limit,
            available: words.len(),
        });
    }
    Ok(words)
}

/// Immutable token ↔ ID mapping with dense IDs `0..len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    ids: HashMap<String, u32>,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// `<pad>`, then `words` in order, then `<bos>`, `<eos>`.
    ///
    /// Word `i` of the list is reported as line `i + 1` when it repeats
    /// an earlier word. A reserved symbol in the list is refused.
    pub fn from_words<I>(words: I) -> DataResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut tokens = vec![PAD.to_string()];
        let mut ids = HashMap::new();

        for (position, word) in words.into_iter().enumerate() {
            if [PAD, BOS, EOS].contains(&word.as_str()) {
                return Err(DataError::ReservedWord { word });
            }
            if ids.insert(word.clone(), tokens.len() as u32).is_some() {
                return Err(DataError::MalformedWordCount {
                    line: position + 1,
                    reason: format!("word '{word}' appears more than once"),
                });
            }
            tokens.push(word);
        }

        let bos = tokens.len();
        tokens.push(BOS.to_string());
        tokens.push(EOS.to_string());
        for (symbol, id) in [(PAD, 0), (BOS, bos), (EOS, bos + 1)] {
            ids.insert(symbol.to_string(), id as u32);
        }

        Ok(Self { ids, tokens })
    }

    /// Build from the first `vocab_size` words of a ranked list.
    pub fn from_reader<R: BufRead>(reader: R, vocab_size: usize) -> DataResult<Self> {
        Self::from_words(read_ranked_words(reader, vocab_size)?)
    }

    /// Build from a ranked word count file on disk.
    pub fn from_file(path: impl AsRef<Path>, vocab_size: usize) -> DataResult<Self> {
        let file = File::open(path.as_ref())?;
        let vocab = Self::from_reader(BufReader::new(file), vocab_size)?;
        tracing::info!(
            "Vocabulary built from '{}': {} frequent words, {} ids",
            path.as_ref().display(),
            vocab_size,
            vocab.len()
        );
        Ok(vocab)
    }

    /// Number of IDs, including the three reserved symbols
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Never true: the reserved symbols are always present
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn pad_id(&self) -> u32 {
        0
    }

    pub fn bos_id(&self) -> u32 {
        (self.tokens.len() - 2) as u32
    }

    pub fn eos_id(&self) -> u32 {
        (self.tokens.len() - 1) as u32
    }

    /// Tokens in ID order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const WORD_COUNTS: &str = "the 100\na 90\nis 80";

    #[test]
    fn test_reserved_layout() {
        let vocab = Vocabulary::from_reader(Cursor::new(WORD_COUNTS), 3).unwrap();
        let expected = [(PAD, 0), ("the", 1), ("a", 2), ("is", 3), (BOS, 4), (EOS, 5)];
        for (token, id) in expected {
            assert_eq!(vocab.id(token), Some(id), "token {token}");
            assert_eq!(vocab.token(id), Some(token));
        }
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.pad_id(), 0);
        assert_eq!(vocab.bos_id(), 4);
        assert_eq!(vocab.eos_id(), 5);
    }

    #[test]
    fn test_deterministic() {
        let a = Vocabulary::from_reader(Cursor::new(WORD_COUNTS), 2).unwrap();
        let b = Vocabulary::from_reader(Cursor::new(WORD_COUNTS), 2).unwrap();
        assert_eq!(a, b);
        // Only the first two words are taken
        assert_eq!(a.id("is"), None);
        assert_eq!(a.tokens(), &[PAD, "the", "a", BOS, EOS]);
    }

    #[test]
    fn test_shortfall_is_an_error() {
        let err = Vocabulary::from_reader(Cursor::new(WORD_COUNTS), 5).unwrap_err();
        assert!(matches!(
            err,
            DataError::VocabularyShortfall { requested: 5, available: 3 }
        ));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = Vocabulary::from_reader(Cursor::new("the 100\nbroken\nis 80"), 3).unwrap_err();
        assert!(matches!(err, DataError::MalformedWordCount { line: 2, .. }));

        let err = Vocabulary::from_reader(Cursor::new("the lots"), 1).unwrap_err();
        assert!(matches!(err, DataError::MalformedWordCount { line: 1, .. }));
    }

    #[test]
    fn test_stops_reading_after_limit() {
        // The malformed third line is never reached
        let vocab = Vocabulary::from_reader(Cursor::new("the 100\na 90\n???"), 2).unwrap();
        assert_eq!(vocab.len(), 5);
    }

    #[test]
    fn test_duplicate_word_rejected() {
        let err = Vocabulary::from_reader(Cursor::new("the 100\na 95\nthe 90"), 3).unwrap_err();
        assert!(matches!(err, DataError::MalformedWordCount { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_reserved_word_rejected() {
        let err = Vocabulary::from_reader(Cursor::new("the 100\n<eos> 90"), 2).unwrap_err();
        assert!(matches!(&err, DataError::ReservedWord { word } if word == "<eos>"));
        assert!(!err.to_string().contains("line"));

        let err = Vocabulary::from_words(["<pad>".to_string()]).unwrap_err();
        assert!(matches!(err, DataError::ReservedWord { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{WORD_COUNTS}").unwrap();
        let vocab = Vocabulary::from_file(file.path(), 3).unwrap();
        assert_eq!(vocab.id("is"), Some(3));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Vocabulary::from_file("/nonexistent/stackoverflow.word_count", 3).unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }
}
