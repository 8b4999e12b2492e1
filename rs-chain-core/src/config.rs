//! Walker and store configuration.
//!
//! Configuration is plain `serde` data with defaults for every field, so a
//! partial JSON file is enough. Environment variables take precedence over
//! the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChainError, Result};
use crate::model::types::{Bigram, Unigram};

/// Environment variable overriding [`WalkConfig::max_length`].
pub const MAX_LENGTH_ENV: &str = "CHAIN_MAX_LENGTH";

/// Reserved candidate word marking the end of the source text.
pub const DEFAULT_END_MARKER: &str = "$";

/// How the stored topic of each entry influences a walk.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TopicMode {
	/// Topics are ignored.
	#[default]
	Any,
	/// Stop as soon as the walk reaches an entry tagged with another topic.
	/// The seed entry is exempt.
	Strict { topic: Bigram },
	/// Multiply by `boost` the weight of candidates leading to an entry
	/// tagged with `topic`.
	Prefer { topic: Bigram, boost: u64 },
}

/// Parameters of a walk.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct WalkConfig {
	/// Maximum number of words in a generated sequence, seed included.
	pub max_length: usize,
	/// Candidate word that terminates a walk without being emitted.
	pub end_marker: Unigram,
	pub topic_mode: TopicMode,
}

impl Default for WalkConfig {
	fn default() -> Self {
		Self {
			max_length: 32,
			end_marker: DEFAULT_END_MARKER.to_owned(),
			topic_mode: TopicMode::Any,
		}
	}
}

impl WalkConfig {
	/// Reads a configuration from a JSON file. Missing fields take their
	/// default value.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let contents = std::fs::read_to_string(path.as_ref())?;
		let config: Self = serde_json::from_str(&contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads the configuration: defaults, then the file if given, then the
	/// process environment.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let mut config = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		config.apply_env_overrides(|key| std::env::var(key).ok())?;
		Ok(config)
	}

	/// Applies overrides read through `lookup` (usually `std::env::var`).
	pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(value) = lookup(MAX_LENGTH_ENV) {
			self.max_length = value.trim().parse().map_err(|_| ChainError::InvalidInput {
				reason: format!("{MAX_LENGTH_ENV} must be an integer, got {value:?}"),
			})?;
			debug!(max_length = self.max_length, "max length overridden from environment");
		}
		Ok(())
	}

	pub fn validate(&self) -> Result<()> {
		if self.end_marker.is_empty() {
			return Err(ChainError::InvalidInput { reason: "end marker cannot be empty".to_owned() });
		}
		match &self.topic_mode {
			TopicMode::Any => Ok(()),
			TopicMode::Strict { topic } => topic.validate("topic"),
			TopicMode::Prefer { topic, boost } => {
				if *boost == 0 {
					return Err(ChainError::InvalidInput { reason: "topic boost must be >= 1".to_owned() });
				}
				topic.validate("topic")
			}
		}
	}
}

/// Tuning of bulk loads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
	/// Inputs with at least this many records are indexed on several threads.
	pub parallel_threshold: usize,
	/// Number of chunks per CPU when indexing in parallel.
	pub chunk_factor: usize,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self { parallel_threshold: 50_000, chunk_factor: 8 }
	}
}
