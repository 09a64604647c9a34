// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain structs, enums, and traits that define what a
// federated dataset IS:
//
//   - archives: the columnar train/test data of one dataset
//   - client maps: which client owns which example IDs
//   - archive sources: where archives come from
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - NO randomness

/// Image and text archive layouts
pub mod archive;

/// Client index → example ID sets, splits, and client selection
pub mod client_map;

/// Abstractions the infra layer implements
pub mod traits;
