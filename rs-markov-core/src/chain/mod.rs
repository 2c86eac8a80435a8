//! Top-level module for the word-level Markov chain.
//!
//! This module provides:
//! - The sliding window used as a lookup key (`Window`)
//! - The guarded transition table with train/generate operations (`Chain`)
//! - Starting-window strategies for generation (`StartSeed`)
//! - Gzip/JSON snapshots of the table (`Snapshot`)
//! - A periodic checkpoint task (`CheckpointHandle`)

/// Fixed-length window over the most recent tokens.
///
/// Produces the canonical key used to index the transition table.
pub mod window;

/// The transition table and its guarded operations.
///
/// Handles message ingestion, random-walk generation and size queries.
pub mod markov_chain;

/// Starting-window strategies for generation.
pub mod start_seed;

/// Compressed snapshot codec (load / save).
pub mod snapshot;

/// Background task saving the chain on a fixed interval.
pub mod checkpoint;

/// Parallel bulk training from line-oriented corpora.
mod corpus;

/// Log target shared by every message of the chain.
pub const LOG_TARGET: &str = "markov";

pub use checkpoint::{CheckpointHandle, CheckpointStatus, FailurePolicy};
pub use markov_chain::{Chain, ChainStats};
pub use snapshot::{Snapshot, read_snapshot};
pub use start_seed::StartSeed;
pub use window::Window;
