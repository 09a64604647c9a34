// ============================================================
// Data Layer Errors
// ============================================================
// Every failure the data pipeline can report, as one enum.
// The application and CLI layers wrap these in anyhow with
// extra context; the data layer keeps them typed so tests
// can match on the exact variant.

use thiserror::Error;

use crate::domain::client_map::Split;

/// Errors raised while building vocabularies, partitions, and shards.
#[derive(Error, Debug)]
pub enum DataError {
    /// IO error while reading an archive or a ranked word list
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An archive file could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A ranked word list line is not `<word> <count>`
    #[error("Malformed word count source at line {line}: {reason}")]
    MalformedWordCount { line: usize, reason: String },

    /// The ranked word list contains one of `<pad>`, `<bos>`, `<eos>`
    #[error("Word list contains the reserved token '{word}'")]
    ReservedWord { word: String },

    /// The ranked word list ran out before `requested` words were read
    #[error("Vocabulary shortfall: requested {requested} words, source has {available}")]
    VocabularyShortfall { requested: usize, available: usize },

    /// Archive columns disagree with each other
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// Partitioning into zero clients
    #[error("Client count must be at least 1")]
    InvalidClientCount,

    /// Partitioning an empty set of example IDs
    #[error("Cannot partition an empty set of example IDs")]
    EmptyUniverse,

    /// A local shard was requested for a client that does not exist
    #[error("Client index {index} out of range for {client_num} clients")]
    ClientOutOfRange { index: usize, client_num: usize },

    /// A stored client map does not match the configured client count
    #[error("Client map has {found} clients, expected {expected}")]
    ClientCountMismatch { expected: usize, found: usize },

    /// A stored client map is not a disjoint cover of the archive's IDs
    #[error("Client map does not partition the {split} archive: {reason}")]
    ClientMapMismatch { split: Split, reason: String },

    /// Rows of a token batch have different or too-short lengths
    #[error("Ragged batch: {0}")]
    RaggedBatch(String),

    /// Encoder or loader parameters out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the data layer.
pub type DataResult<T> = std::result::Result<T, DataError>;
