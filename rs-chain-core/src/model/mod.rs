//! Chain data model, storage and generation.
//!
//! - Record types (`Bigram`, `SeqUnigram`, `ChainEntry`)
//! - The bigram-keyed transition store (`TransitionStore`)
//! - Random-walk generation over the store (`ChainWalker`)

/// Record types shared by the store, the snapshot format and the
/// JSON-lines exchange format.
pub mod types;

/// Weighted candidate sampling on a single entry.
mod sampling;

/// Bigram-keyed store with snapshot reads and rebuild-style bulk loads.
pub mod store;

/// Random walk over a store, with optional topic conditioning.
pub mod walker;
