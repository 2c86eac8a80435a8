//! Error type shared by every fallible chain operation.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = ChainError> = std::result::Result<T, E>;

/// Failures raised while building, persisting or feeding a [`Chain`](crate::chain::Chain).
#[derive(Debug, Error)]
pub enum ChainError {
	/// The window length must hold at least one token.
	#[error("invalid prefix length {0}, must be >= 1")]
	InvalidPrefixLength(usize),
	/// A periodic task needs a non-zero period.
	#[error("checkpoint interval must be greater than zero")]
	InvalidInterval,
	/// Filesystem failure, with the path involved when known.
	#[error("io error while processing {path:?}: {source}")]
	Io {
		/// Underlying IO error returned by the standard library.
		source: std::io::Error,
		/// Path being read or written, if any.
		path: Option<PathBuf>,
	},
	/// Snapshot could not be encoded or decoded.
	#[error("serialization error: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for ChainError {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

impl ChainError {
	/// Wraps an IO error and attaches the path it happened on.
	pub fn io<P: Into<PathBuf>>(source: std::io::Error, path: P) -> Self {
		Self::Io { source, path: Some(path.into()) }
	}
}
