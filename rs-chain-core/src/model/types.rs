use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// A single word token.
pub type Unigram = String;

/// Ordered pair of consecutive word tokens.
///
/// Used both as the lookup key of a chain entry and as the topic tag
/// attached to it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bigram {
	pub first: Unigram,
	pub second: Unigram,
}

impl Bigram {
	pub fn new(first: impl Into<Unigram>, second: impl Into<Unigram>) -> Self {
		Self { first: first.into(), second: second.into() }
	}

	/// Returns the bigram obtained by sliding the window one word forward.
	///
	/// `("the", "cat").advance("sat")` is `("cat", "sat")`.
	pub fn advance(&self, next: &str) -> Self {
		Self::new(self.second.clone(), next)
	}

	/// Checks that neither token is empty.
	///
	/// `what` names the field in the error message (ex. "bigram", "topic").
	pub fn validate(&self, what: &str) -> Result<()> {
		if self.first.is_empty() || self.second.is_empty() {
			return Err(ChainError::InvalidInput {
				reason: format!("{what} {self} contains an empty token"),
			});
		}
		Ok(())
	}
}

impl fmt::Display for Bigram {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({:?}, {:?})", self.first, self.second)
	}
}

/// One candidate continuation of a bigram.
///
/// `seq` is the 0-based position of the observation within a run of the
/// same topic; it restarts at 0 whenever the topic changes. It carries no
/// weight: a word observed several times appears as several items.
#[derive(Serialize, Deserialize, Clone, Debug, Hash, PartialEq, Eq)]
pub struct SeqUnigram {
	pub seq: u32,
	pub word: Unigram,
}

impl SeqUnigram {
	pub fn new(seq: u32, word: impl Into<Unigram>) -> Self {
		Self { seq, word: word.into() }
	}
}

/// Record mapping a bigram to its topic and successor candidates.
///
/// ## Invariants (checked by [`ChainEntry::validate`])
/// - `bigram` and `topic` contain no empty token
/// - `candidates` is non-empty
/// - every candidate has a non-empty word
///
/// Candidate order is insertion order and is kept as-is; it is the tie-break
/// order when sampling.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChainEntry {
	pub bigram: Bigram,
	pub topic: Bigram,
	pub candidates: Vec<SeqUnigram>,
}

impl ChainEntry {
	pub fn new(bigram: Bigram, topic: Bigram, candidates: Vec<SeqUnigram>) -> Self {
		Self { bigram, topic, candidates }
	}

	pub fn validate(&self) -> Result<()> {
		self.bigram.validate("bigram")?;
		self.topic.validate("topic")?;

		if self.candidates.is_empty() {
			return Err(ChainError::InvalidInput {
				reason: format!("entry {} has no candidates", self.bigram),
			});
		}

		for candidate in &self.candidates {
			if candidate.word.is_empty() {
				return Err(ChainError::InvalidInput {
					reason: format!("entry {} has a candidate with an empty word", self.bigram),
				});
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(candidates: Vec<SeqUnigram>) -> ChainEntry {
		ChainEntry::new(Bigram::new("the", "cat"), Bigram::new("cat", "food"), candidates)
	}

	#[test]
	fn advance_slides_the_window() {
		let next = Bigram::new("the", "cat").advance("sat");
		assert_eq!(next, Bigram::new("cat", "sat"));
	}

	#[test]
	fn empty_tokens_are_rejected() {
		assert!(Bigram::new("", "cat").validate("bigram").is_err());
		assert!(Bigram::new("the", "").validate("topic").is_err());
		assert!(Bigram::new("the", "cat").validate("bigram").is_ok());
	}

	#[test]
	fn entry_validation() {
		assert!(entry(vec![SeqUnigram::new(1, "sat")]).validate().is_ok());
		assert!(entry(vec![]).validate().is_err());
		assert!(entry(vec![SeqUnigram::new(0, "sat"), SeqUnigram::new(1, "ran")]).validate().is_ok());
		assert!(entry(vec![SeqUnigram::new(2, "")]).validate().is_err());

		let mut bad_topic = entry(vec![SeqUnigram::new(1, "sat")]);
		bad_topic.topic = Bigram::new("", "");
		let err = bad_topic.validate().unwrap_err();
		assert!(matches!(err, ChainError::InvalidInput { .. }));
		assert!(err.to_string().contains("topic"));
	}

	#[test]
	fn display_quotes_tokens() {
		assert_eq!(Bigram::new("a", "b c").to_string(), r#"("a", "b c")"#);
	}
}
