//! Topic-aware bigram Markov chain library.
//!
//! This crate provides:
//! - A transition store mapping each word bigram to its topic bigram and
//!   weighted successor words
//! - Rebuild-style bulk loading, binary snapshots and JSON-lines records
//! - Weighted random walks producing word sequences, optionally
//!   conditioned on a topic
//!
//! Tokenization and corpus ingestion happen upstream; this crate only
//! consumes the resulting records.

/// Walker and store configuration.
pub mod config;

/// Error type shared by every operation.
pub mod error;

/// Chain records, store and walker.
pub mod model;

/// JSON-lines record files and path helpers.
pub mod io;

/// Binary snapshot format.
///
/// Not exposed
pub(crate) mod snapshot;

pub use config::{StoreConfig, TopicMode, WalkConfig};
pub use error::{ChainError, Result};
pub use model::store::{ChainIndex, TransitionStore};
pub use model::types::{Bigram, ChainEntry, SeqUnigram, Unigram};
pub use model::walker::ChainWalker;
