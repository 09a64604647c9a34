// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Coordinates the data and infra layers to accomplish one
// goal: building every shard, building one rank's shard, or
// encoding sentences for inspection.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 4)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Global + per-client shard orchestration over any dataset
pub mod federation;

// Configuration and the partition / rank workflows
pub mod partition_use_case;

// Sentence encoding workflow
pub mod encode_use_case;
