// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that no single data loader owns:
//
//   memo.rs            — a lazily filled, shareable slot used
//                        for every cache (vocabularies, client
//                        maps)
//
//   archive_store.rs   — ArchiveSource implementations: JSON
//                        files on disk, or archives in memory
//
//   vocab_store.rs     — reads the word and tag count files
//                        once per loader and hands out the
//                        built vocabularies
//
//   partition_store.rs — client maps saved to and restored
//                        from JSON so runs can share them
//
//   shard_report.rs    — per-shard sample and batch counts
//                        written to a CSV file
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Lazily initialised shared value
pub mod memo;

/// Train/test archive sources
pub mod archive_store;

/// Memoized word and tag vocabularies
pub mod vocab_store;

/// Client map persistence
pub mod partition_store;

/// Shard size CSV logger
pub mod shard_report;
