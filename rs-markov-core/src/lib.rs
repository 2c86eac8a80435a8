//! Word-level Markov chain text generation library.
//!
//! This crate provides:
//! - A fixed-width window transition table, safe to share between threads
//! - Training from messages or line-oriented corpora
//! - Random-walk text generation
//! - Gzip-compressed JSON snapshots and a periodic checkpoint task
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rs_markov_core::chain::{Chain, FailurePolicy, StartSeed};
//!
//! # fn main() -> rs_markov_core::Result<()> {
//! let chain = Arc::new(Chain::new(2)?);
//! chain.load("markov-state.json.gz");
//! chain.train("the quick brown fox jumps over the lazy dog");
//! let checkpoints = chain.run_periodic_save(Duration::from_secs(60), "markov-state.json.gz", FailurePolicy::Continue)?;
//! let (text, elapsed) = chain.generate(50, &StartSeed::Empty);
//! println!("{text} ({elapsed:?})");
//! checkpoints.stop();
//! # Ok(())
//! # }
//! ```

/// Windows, transition table, persistence and checkpoints.
pub mod chain;

/// Crate error type.
pub mod error;

/// I/O utilities (corpus reading, snapshot staging paths).
///
/// Not exposed
pub(crate) mod io;

pub use error::{ChainError, Result};
