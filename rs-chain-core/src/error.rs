//! Error types for the chain store and walker.

use thiserror::Error;

use crate::model::types::Bigram;

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors that can occur while loading, querying or walking a chain.
#[derive(Debug, Error)]
pub enum ChainError {
	/// A bigram, topic or candidate list is malformed.
	#[error("invalid input: {reason}")]
	InvalidInput { reason: String },

	/// No entry is stored for the bigram. Ends a walk, not a failure.
	#[error("no entry for bigram {bigram}")]
	NotFound { bigram: Bigram },

	/// A walk was requested from a seed with no entry at all.
	#[error("empty chain: no continuation for seed {seed}")]
	EmptyChain { seed: Bigram },

	/// A snapshot file is truncated, foreign or from a newer version.
	#[error("snapshot error: {reason}")]
	Snapshot { reason: String },

	/// A record of a JSON-lines exchange file could not be parsed.
	#[error("record error at line {line}: {source}")]
	Record {
		line: usize,
		#[source]
		source: serde_json::Error,
	},

	/// An indexing worker of a bulk load stopped without reporting.
	#[error("bulk load worker failed on chunk {chunk}")]
	WorkerFailed { chunk: usize },

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("encoding error: {0}")]
	Encoding(#[from] postcard::Error),

	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),
}
