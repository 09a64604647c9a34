// ============================================================
// Layer 2 — Encode Use Case
// ============================================================
// Encodes ad-hoc sentences with a ranked word count file, for
// checking what a StackOverflow model would actually see.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::data::encoder::{shift_for_language_model, TextEncoder};
use crate::data::vocabulary::Vocabulary;

/// One encoded sentence: the full row, plus the shifted
/// input/target pair when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSentence {
    pub sentence: String,
    pub ids: Vec<u32>,
    pub shifted: Option<(Vec<u32>, Vec<u32>)>,
}

pub struct EncodeUseCase {
    encoder: TextEncoder,
}

impl EncodeUseCase {
    pub fn new(
        word_counts: impl AsRef<Path>,
        vocab_size: usize,
        max_seq_len: usize,
        num_oov_buckets: usize,
    ) -> Result<Self> {
        let path = word_counts.as_ref();
        let vocab = Vocabulary::from_file(path, vocab_size)
            .with_context(|| format!("Cannot build vocabulary from '{}'", path.display()))?;
        let encoder = TextEncoder::new(Arc::new(vocab), max_seq_len, num_oov_buckets)?;
        Ok(Self { encoder })
    }

    pub fn encode(&self, sentences: &[String], shift: bool) -> Result<Vec<EncodedSentence>> {
        let rows = self.encoder.encode(sentences);

        let mut shifted: Vec<Option<(Vec<u32>, Vec<u32>)>> = vec![None; rows.len()];
        if shift {
            let (inputs, targets) = shift_for_language_model(&rows)?;
            for (slot, pair) in shifted.iter_mut().zip(inputs.into_iter().zip(targets)) {
                *slot = Some(pair);
            }
        }

        Ok(sentences
            .iter()
            .zip(rows)
            .zip(shifted)
            .map(|((sentence, ids), shifted)| EncodedSentence {
                sentence: sentence.clone(),
                ids,
                shifted,
            })
            .collect())
    }

    /// The token an ID stands for, `<oov>` past the vocabulary
    pub fn describe(&self, id: u32) -> &str {
        self.encoder.vocab().token(id).unwrap_or("<oov>")
    }
}
