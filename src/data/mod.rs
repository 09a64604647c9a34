// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Turns a split archive into batched, per-client shards.
//
//   ranked word / tag counts
//       │
//       ▼
//   Vocabulary, TagVocabulary  → token and tag indices
//       │
//       ▼
//   TextEncoder                → fixed-length token ID rows
//
//   archive client IDs
//       │
//       ▼
//   partition                  → client map (memoized per split)
//       │
//       ▼
//   Cifar100Loader / StackOverflow*Loader
//       │                        rows owned by one client
//       ▼
//   ShardDataset + *Batcher    → burn DataLoaders
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Ranked word list → token ↔ ID table
pub mod vocabulary;

/// Ranked tag list → multi-hot targets
pub mod tag_vocabulary;

/// Sentence → fixed-length ID row, plus the next-token shift
pub mod encoder;

/// Disjoint, balanced assignment of IDs to clients
pub mod partitioner;

/// In-memory items implementing Burn's Dataset trait
pub mod dataset;

/// Burn Batchers for images, tags, and token sequences
pub mod batcher;

/// Shared shard-loading plumbing and the FederatedDataset trait
pub mod loader;

/// Federated CIFAR-100
pub mod cifar100;

/// Federated StackOverflow, tag and next-word tasks
pub mod stackoverflow;
