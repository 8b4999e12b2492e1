use rand::Rng;

use super::types::{ChainEntry, SeqUnigram};

impl ChainEntry {
	/// Picks a candidate using weighted random sampling.
	///
	/// `weight` maps each candidate item to its effective weight; the plain
	/// case is 1 for every item, so a word listed several times is picked
	/// proportionally to its number of items. `seq` is not a weight.
	///
	/// Candidates are scanned in insertion order with a cumulative
	/// subtraction, so with a fixed rng the pick is reproducible and equal
	/// weights resolve toward the earlier candidate. The total is summed in
	/// `u128` and cannot overflow.
	///
	/// Returns `None` if every effective weight is zero.
	pub fn sample<R, F>(&self, rng: &mut R, weight: F) -> Option<&SeqUnigram>
	where
		R: Rng + ?Sized,
		F: Fn(&SeqUnigram) -> u64,
	{
		let weights: Vec<u128> = self.candidates.iter().map(|candidate| u128::from(weight(candidate))).collect();
		let total: u128 = weights.iter().sum();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);
		for (candidate, w) in self.candidates.iter().zip(weights) {
			if r < w {
				return Some(candidate);
			}
			r -= w;
		}

		// r < total, so some bucket always matches.
		None
	}
}
