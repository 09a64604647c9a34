// ============================================================
// Layer 4 — Text Encoder
// ============================================================
// Converts raw sentences into fixed-length token ID rows.
//
// For each sentence, with L = max_seq_len:
//   1. split on whitespace, keep the first L tokens
//   2. look each token up in the vocabulary; unknown tokens go
//      to an out-of-vocabulary bucket past the vocabulary:
//          hash(token) % num_oov_buckets + vocab.len()
//   3. append <eos> only if fewer than L tokens were kept
//   4. prepend <bos>
//   5. right-pad with <pad> (0) to L + 1
//
// Example (vocab: <pad>=0 the=1 a=2 is=3 <bos>=4 <eos>=5, L=5):
//   "the a is" → [4, 1, 2, 3, 5, 0]
//
// A sentence that fills all L slots is cut, not finished,
// so it carries no <eos>.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::data::vocabulary::Vocabulary;
use crate::error::{DataError, DataResult};

/// Tokens kept per sentence when no length is configured
pub const DEFAULT_MAX_SEQ_LEN: usize = 120;

/// Out-of-vocabulary buckets when none is configured
pub const DEFAULT_NUM_OOV_BUCKETS: usize = 1;

#[derive(Debug, Clone)]
pub struct TextEncoder {
    vocab: Arc<Vocabulary>,
    max_seq_len: usize,
    num_oov_buckets: usize,
}

impl TextEncoder {
    pub fn new(vocab: Arc<Vocabulary>, max_seq_len: usize, num_oov_buckets: usize) -> DataResult<Self> {
        if max_seq_len == 0 {
            return Err(DataError::InvalidConfig("max_seq_len must be at least 1".into()));
        }
        if num_oov_buckets == 0 {
            return Err(DataError::InvalidConfig(
                "num_oov_buckets must be at least 1".into(),
            ));
        }
        Ok(Self { vocab, max_seq_len, num_oov_buckets })
    }

    pub fn with_defaults(vocab: Arc<Vocabulary>) -> Self {
        Self {
            vocab,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            num_oov_buckets: DEFAULT_NUM_OOV_BUCKETS,
        }
    }

    /// Length of every encoded row: max_seq_len + 1
    pub fn row_len(&self) -> usize {
        self.max_seq_len + 1
    }

    /// Size of the ID space, vocabulary plus OOV buckets
    pub fn id_space(&self) -> usize {
        self.vocab.len() + self.num_oov_buckets
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// ID of a single token, bucketing unknown tokens
    pub fn token_id(&self, token: &str) -> u32 {
        match self.vocab.id(token) {
            Some(id) => id,
            None => {
                let mut hasher = DefaultHasher::new();
                token.hash(&mut hasher);
                let bucket = hasher.finish() % self.num_oov_buckets as u64;
                (bucket as usize + self.vocab.len()) as u32
            }
        }
    }

    /// Encode one sentence into exactly `row_len()` IDs
    pub fn encode_one(&self, sentence: &str) -> Vec<u32> {
        let mut row = Vec::with_capacity(self.row_len());
        row.push(self.vocab.bos_id());

        let mut kept = 0usize;
        for token in sentence.split_whitespace().take(self.max_seq_len) {
            row.push(self.token_id(token));
            kept += 1;
        }
        if kept < self.max_seq_len {
            row.push(self.vocab.eos_id());
        }

        row.resize(self.row_len(), self.vocab.pad_id());
        row
    }

    /// Encode a batch of sentences
    pub fn encode<S: AsRef<str>>(&self, sentences: &[S]) -> Vec<Vec<u32>> {
        sentences
            .iter()
            .map(|sentence| self.encode_one(sentence.as_ref()))
            .collect()
    }
}

/// Next-token shift: inputs drop the last column, targets drop the first.
///
/// Every row must have the same length, at least 2.
pub fn shift_for_language_model(batch: &[Vec<u32>]) -> DataResult<(Vec<Vec<u32>>, Vec<Vec<u32>>)> {
    let width = match batch.first() {
        Some(row) => row.len(),
        None => return Ok((Vec::new(), Vec::new())),
    };
    if width < 2 {
        return Err(DataError::RaggedBatch(format!(
            "rows need at least 2 ids to shift, got {width}"
        )));
    }
    if let Some((idx, row)) = batch.iter().enumerate().find(|(_, row)| row.len() != width) {
        return Err(DataError::RaggedBatch(format!(
            "row {} has {} ids, row 0 has {}",
            idx,
            row.len(),
            width
        )));
    }

    let inputs = batch.iter().map(|row| row[..width - 1].to_vec()).collect();
    let targets = batch.iter().map(|row| row[1..].to_vec()).collect();
    Ok((inputs, targets))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn vocab() -> Arc<Vocabulary> {
        Arc::new(Vocabulary::from_reader(Cursor::new("the 100\na 90\nis 80"), 3).unwrap())
    }

    #[test]
    fn test_reference_sentence() {
        let enc = TextEncoder::new(vocab(), 5, 1).unwrap();
        assert_eq!(enc.encode_one("the a is"), vec![4, 1, 2, 3, 5, 0]);
    }

    #[test]
    fn test_length_invariant() {
        let sentences = ["", "the", "the a is the a is the a is", "  spaced   out  "];
        for max_seq_len in [1, 2, 5, 120] {
            let enc = TextEncoder::new(vocab(), max_seq_len, 1).unwrap();
            for row in enc.encode(&sentences) {
                assert_eq!(row.len(), max_seq_len + 1);
            }
        }
    }

    #[test]
    fn test_truncated_sentence_has_no_eos() {
        let enc = TextEncoder::new(vocab(), 3, 1).unwrap();
        let row = enc.encode_one("the a is the a");
        assert_eq!(row, vec![4, 1, 2, 3]);
        assert!(!row.contains(&5));
    }

    #[test]
    fn test_exact_length_sentence_has_no_eos() {
        // Filling the limit exactly counts as truncation
        let enc = TextEncoder::new(vocab(), 3, 1).unwrap();
        assert_eq!(enc.encode_one("the a is"), vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_short_sentence_has_one_eos_after_tokens() {
        let enc = TextEncoder::new(vocab(), 6, 1).unwrap();
        let row = enc.encode_one("is a");
        assert_eq!(row.iter().filter(|&&id| id == 5).count(), 1);
        assert_eq!(row[3], 5);
        assert_eq!(&row[4..], &[0, 0, 0]);
    }

    #[test]
    fn test_oov_tokens_land_in_buckets() {
        let enc = TextEncoder::new(vocab(), 4, 3).unwrap();
        let id = enc.token_id("serde");
        assert!((6..9).contains(&id));
        // Deterministic within a build
        assert_eq!(id, enc.token_id("serde"));

        let single = TextEncoder::new(vocab(), 4, 1).unwrap();
        assert_eq!(single.token_id("anything"), 6);
        assert_eq!(single.id_space(), 7);
    }

    #[test]
    fn test_zero_max_seq_len_rejected() {
        let err = TextEncoder::new(vocab(), 0, 1).unwrap_err();
        assert!(matches!(&err, DataError::InvalidConfig(msg) if msg.contains("max_seq_len")));
    }

    #[test]
    fn test_zero_oov_buckets_rejected() {
        assert!(matches!(
            TextEncoder::new(vocab(), 4, 0),
            Err(DataError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let enc = TextEncoder::with_defaults(vocab());
        assert_eq!(enc.row_len(), 121);
    }

    #[test]
    fn test_shift_contract() {
        let enc = TextEncoder::new(vocab(), 5, 1).unwrap();
        let batch = enc.encode(&["the a is", "is", "the the the the the the"]);
        let (inputs, targets) = shift_for_language_model(&batch).unwrap();

        assert_eq!(inputs.len(), 3);
        for (x, y) in inputs.iter().zip(&targets) {
            assert_eq!(x.len(), 5);
            assert_eq!(y.len(), 5);
            for i in 0..x.len() - 1 {
                assert_eq!(y[i], x[i + 1]);
            }
        }
        assert_eq!(inputs[0], vec![4, 1, 2, 3, 5]);
        assert_eq!(targets[0], vec![1, 2, 3, 5, 0]);
    }

    #[test]
    fn test_shift_rejects_ragged_and_short_rows() {
        assert!(matches!(
            shift_for_language_model(&[vec![1, 2, 3], vec![1, 2]]),
            Err(DataError::RaggedBatch(_))
        ));
        assert!(shift_for_language_model(&[vec![1]]).is_err());

        let (x, y) = shift_for_language_model(&[]).unwrap();
        assert!(x.is_empty() && y.is_empty());
    }
}
