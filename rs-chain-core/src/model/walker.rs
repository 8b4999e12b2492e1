use rand::Rng;
use tracing::debug;

use super::store::{ChainIndex, TransitionStore};
use super::types::{Bigram, SeqUnigram, Unigram};
use crate::config::{TopicMode, WalkConfig};
use crate::error::{ChainError, Result};

/// Generates word sequences by random walk over a [`TransitionStore`].
///
/// Each step looks up the current bigram, samples one candidate item
/// uniformly (a word listed several times is proportionally more likely),
/// appends it, and slides the bigram window onto it.
///
/// A walk stops when:
/// - the output reached `max_length` words
/// - the current bigram has no entry (end of chain)
/// - the sampled word is the end marker (not emitted)
/// - in `Strict` topic mode, the current entry belongs to another topic
///
/// The walker holds no mutable state; one walk reads a single store
/// snapshot taken when it starts.
#[derive(Clone, Debug, Default)]
pub struct ChainWalker {
	config: WalkConfig,
}

impl ChainWalker {
	/// # Errors
	/// Returns `InvalidInput` if the configuration is invalid.
	pub fn new(config: WalkConfig) -> Result<Self> {
		config.validate()?;
		Ok(Self { config })
	}

	pub fn config(&self) -> &WalkConfig {
		&self.config
	}

	/// Generates a sequence starting with the two words of `seed`.
	///
	/// The result holds at least the seed and at most `max_length` words
	/// (the seed alone if `max_length < 2`).
	///
	/// # Errors
	/// `EmptyChain` if the store has no entry for `seed`.
	pub fn generate<R: Rng + ?Sized>(
		&self,
		store: &TransitionStore,
		seed: &Bigram,
		max_length: usize,
		rng: &mut R,
	) -> Result<Vec<Unigram>> {
		let index = store.snapshot();
		self.walk(&index, seed, max_length, rng)
	}

	/// Generates a sequence from a randomly chosen stored bigram.
	///
	/// # Errors
	/// `EmptyChain` if the store is empty.
	pub fn generate_random<R: Rng + ?Sized>(
		&self,
		store: &TransitionStore,
		max_length: usize,
		rng: &mut R,
	) -> Result<Vec<Unigram>> {
		let index = store.snapshot();
		let seed = match index.random_bigram(rng) {
			Some(seed) => seed.clone(),
			None => return Err(ChainError::EmptyChain { seed: Bigram::default() }),
		};
		self.walk(&index, &seed, max_length, rng)
	}

	fn walk<R: Rng + ?Sized>(
		&self,
		index: &ChainIndex,
		seed: &Bigram,
		max_length: usize,
		rng: &mut R,
	) -> Result<Vec<Unigram>> {
		if !index.contains(seed) {
			return Err(ChainError::EmptyChain { seed: seed.clone() });
		}

		let mut output = vec![seed.first.clone(), seed.second.clone()];
		let mut current = seed.clone();

		while output.len() < max_length {
			let Some(entry) = index.get(&current) else {
				debug!(bigram = %current, length = output.len(), "end of chain");
				break;
			};

			if let TopicMode::Strict { topic } = &self.config.topic_mode {
				let at_seed = output.len() == 2;
				if !at_seed && entry.topic != *topic {
					debug!(bigram = %current, topic = %entry.topic, "left the topic");
					break;
				}
			}

			let Some(picked) = entry.sample(rng, |candidate| self.weight(index, &current, candidate)) else {
				break;
			};

			if picked.word == self.config.end_marker {
				debug!(bigram = %current, length = output.len(), "end marker reached");
				break;
			}

			current = current.advance(&picked.word);
			output.push(picked.word.clone());
		}

		Ok(output)
	}

	/// Effective sampling weight of `candidate` as a continuation of
	/// `current`: 1, or `boost` when it leads into the preferred topic.
	fn weight(&self, index: &ChainIndex, current: &Bigram, candidate: &SeqUnigram) -> u64 {
		match &self.config.topic_mode {
			TopicMode::Prefer { topic, boost } => {
				let next = current.advance(&candidate.word);
				match index.get(&next) {
					Some(entry) if entry.topic == *topic => *boost,
					_ => 1,
				}
			}
			TopicMode::Any | TopicMode::Strict { .. } => 1,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::types::ChainEntry;
	use rand::rngs::StdRng;
	use rand::{RngCore, SeedableRng};

	/// Always lands in the first bucket of a weighted pick.
	struct FirstPick;

	impl RngCore for FirstPick {
		fn next_u32(&mut self) -> u32 {
			0
		}

		fn next_u64(&mut self) -> u64 {
			0
		}

		fn fill_bytes(&mut self, dst: &mut [u8]) {
			dst.fill(0);
		}
	}

	fn entry(bigram: (&str, &str), topic: (&str, &str), words: &[(u32, &str)]) -> ChainEntry {
		ChainEntry::new(
			Bigram::new(bigram.0, bigram.1),
			Bigram::new(topic.0, topic.1),
			words.iter().map(|(seq, word)| SeqUnigram::new(*seq, *word)).collect(),
		)
	}

	fn store(entries: Vec<ChainEntry>) -> TransitionStore {
		let store = TransitionStore::default();
		store.bulk_load(entries).unwrap();
		store
	}

	fn walker(topic_mode: TopicMode) -> ChainWalker {
		ChainWalker::new(WalkConfig { topic_mode, ..WalkConfig::default() }).unwrap()
	}

	#[test]
	fn first_pick_stops_at_end_of_chain() {
		let store = store(vec![entry(("the", "cat"), ("the", "cat"), &[(1, "sat"), (2, "ran")])]);
		let words = ChainWalker::default()
			.generate(&store, &Bigram::new("the", "cat"), 4, &mut FirstPick)
			.unwrap();
		assert_eq!(words, vec!["the", "cat", "sat"]);
	}

	#[test]
	fn first_pick_follows_the_chain() {
		let store = store(vec![
			entry(("the", "cat"), ("the", "cat"), &[(1, "sat"), (2, "ran")]),
			entry(("cat", "sat"), ("the", "cat"), &[(1, "down"), (4, "still")]),
		]);
		let words = ChainWalker::default()
			.generate(&store, &Bigram::new("the", "cat"), 4, &mut FirstPick)
			.unwrap();
		assert_eq!(words, vec!["the", "cat", "sat", "down"]);
	}

	#[test]
	fn zero_based_runs_walk_by_item_count() {
		// Ingestion emits positions from 0 and repeats a word once per sighting.
		let store = store(vec![entry(("the", "cat"), ("the", "cat"), &[(0, "sat"), (1, "ran"), (2, "sat")])]);
		let walker = ChainWalker::default();
		let seed = Bigram::new("the", "cat");
		let mut rng = StdRng::seed_from_u64(21);

		let mut sat = 0;
		for _ in 0..3000 {
			if walker.generate(&store, &seed, 3, &mut rng).unwrap()[2] == "sat" {
				sat += 1;
			}
		}
		let share = sat as f64 / 3000.0;
		assert!(share > 0.61 && share < 0.72, "share of sat = {share}");
	}

	#[test]
	fn unknown_seed_is_an_empty_chain() {
		let store = store(vec![entry(("the", "cat"), ("the", "cat"), &[(1, "sat")])]);
		let err = ChainWalker::default()
			.generate(&store, &Bigram::new("a", "dog"), 10, &mut FirstPick)
			.unwrap_err();
		assert!(matches!(err, ChainError::EmptyChain { seed } if seed == Bigram::new("a", "dog")));
	}

	#[test]
	fn length_stays_within_bounds() {
		// a b -> c, b c -> a, c a -> b: never ends on its own.
		let store = store(vec![
			entry(("a", "b"), ("a", "b"), &[(1, "c")]),
			entry(("b", "c"), ("a", "b"), &[(1, "a")]),
			entry(("c", "a"), ("a", "b"), &[(1, "b")]),
		]);
		let walker = ChainWalker::default();
		let seed = Bigram::new("a", "b");
		let mut rng = StdRng::seed_from_u64(42);

		for max_length in 0..12 {
			let words = walker.generate(&store, &seed, max_length, &mut rng).unwrap();
			assert!(words.len() >= 2);
			assert_eq!(words.len(), max_length.max(2));
		}
		assert_eq!(
			walker.generate(&store, &seed, 7, &mut rng).unwrap(),
			vec!["a", "b", "c", "a", "b", "c", "a"]
		);
	}

	#[test]
	fn fixed_seed_is_reproducible() {
		let store = store(vec![
			entry(("a", "b"), ("a", "b"), &[(1, "c"), (1, "d"), (3, "e")]),
			entry(("b", "c"), ("a", "b"), &[(2, "a"), (1, "d")]),
			entry(("b", "d"), ("a", "b"), &[(1, "a")]),
			entry(("b", "e"), ("a", "b"), &[(1, "a"), (1, "b")]),
			entry(("c", "a"), ("a", "b"), &[(1, "b")]),
			entry(("d", "a"), ("a", "b"), &[(1, "b")]),
			entry(("e", "a"), ("a", "b"), &[(1, "b")]),
			entry(("e", "b"), ("a", "b"), &[(1, "$")]),
		]);
		let walker = ChainWalker::default();
		let seed = Bigram::new("a", "b");

		let first = walker.generate(&store, &seed, 50, &mut StdRng::seed_from_u64(9)).unwrap();
		let second = walker.generate(&store, &seed, 50, &mut StdRng::seed_from_u64(9)).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn end_marker_terminates_without_being_emitted() {
		let store = store(vec![
			entry(("the", "cat"), ("the", "cat"), &[(1, "sat")]),
			entry(("cat", "sat"), ("the", "cat"), &[(1, "$")]),
			entry(("sat", "$"), ("the", "cat"), &[(1, "never")]),
		]);
		let words = ChainWalker::default()
			.generate(&store, &Bigram::new("the", "cat"), 10, &mut StdRng::seed_from_u64(0))
			.unwrap();
		assert_eq!(words, vec!["the", "cat", "sat"]);
	}

	#[test]
	fn strict_topic_stops_on_topic_change() {
		let entries = vec![
			entry(("the", "cat"), ("cat", "food"), &[(1, "sat")]),
			entry(("cat", "sat"), ("cat", "food"), &[(1, "down")]),
			entry(("sat", "down"), ("stock", "market"), &[(1, "sharply")]),
		];
		let store = store(entries);
		let seed = Bigram::new("the", "cat");

		let any = walker(TopicMode::Any).generate(&store, &seed, 10, &mut FirstPick).unwrap();
		assert_eq!(any, vec!["the", "cat", "sat", "down", "sharply"]);

		let strict = walker(TopicMode::Strict { topic: Bigram::new("cat", "food") })
			.generate(&store, &seed, 10, &mut FirstPick)
			.unwrap();
		assert_eq!(strict, vec!["the", "cat", "sat", "down"]);
	}

	#[test]
	fn strict_topic_does_not_apply_to_the_seed() {
		let store = store(vec![entry(("the", "cat"), ("stock", "market"), &[(1, "sat")])]);
		let words = walker(TopicMode::Strict { topic: Bigram::new("cat", "food") })
			.generate(&store, &Bigram::new("the", "cat"), 10, &mut FirstPick)
			.unwrap();
		assert_eq!(words, vec!["the", "cat", "sat"]);
	}

	#[test]
	fn preferred_topic_is_boosted() {
		let store = store(vec![
			entry(("a", "b"), ("a", "b"), &[(1, "x"), (1, "y")]),
			entry(("b", "x"), ("other", "topic"), &[(1, "$")]),
			entry(("b", "y"), ("cat", "food"), &[(1, "$")]),
		]);
		let walker = walker(TopicMode::Prefer { topic: Bigram::new("cat", "food"), boost: 1000 });
		let seed = Bigram::new("a", "b");
		let mut rng = StdRng::seed_from_u64(5);

		let mut preferred = 0;
		for _ in 0..200 {
			let words = walker.generate(&store, &seed, 3, &mut rng).unwrap();
			if words[2] == "y" {
				preferred += 1;
			}
		}
		assert!(preferred >= 190, "preferred = {preferred}");

		// Without boost the first pick goes to the earlier candidate.
		let plain = ChainWalker::default().generate(&store, &seed, 3, &mut FirstPick).unwrap();
		assert_eq!(plain, vec!["a", "b", "x"]);
	}

	#[test]
	fn random_seed_walk() {
		let empty = TransitionStore::default();
		let err = ChainWalker::default().generate_random(&empty, 5, &mut FirstPick).unwrap_err();
		assert!(matches!(err, ChainError::EmptyChain { .. }));

		let store = store(vec![entry(("the", "cat"), ("the", "cat"), &[(1, "sat")])]);
		let words = ChainWalker::default()
			.generate_random(&store, 5, &mut StdRng::seed_from_u64(1))
			.unwrap();
		assert_eq!(words, vec!["the", "cat", "sat"]);
	}

	#[test]
	fn invalid_config_is_rejected() {
		let config = WalkConfig { end_marker: String::new(), ..WalkConfig::default() };
		assert!(ChainWalker::new(config).is_err());
	}
}
