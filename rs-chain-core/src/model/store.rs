use std::collections::HashMap;
use std::path::Path;
use std::sync::{mpsc, Arc, PoisonError, RwLock};
use std::thread;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use super::types::{Bigram, ChainEntry, SeqUnigram};
use crate::config::StoreConfig;
use crate::error::{ChainError, Result};
use crate::io::{build_output_path, read_entries, write_atomic};
use crate::snapshot;

type EntryMap = HashMap<Bigram, Arc<ChainEntry>>;

/// Immutable view of the store contents at one point in time.
///
/// Entries are shared through `Arc`, so cloning an index or handing an
/// entry to a reader never copies candidate lists.
///
/// # Invariants
/// - Exactly one entry per bigram
/// - `keys` holds the same bigrams as `entries`, sorted
/// - Every entry passed [`ChainEntry::validate`]
#[derive(Clone, Debug, Default)]
pub struct ChainIndex {
	entries: EntryMap,
	keys: Vec<Bigram>,
}

impl ChainIndex {
	fn from_map(entries: EntryMap) -> Self {
		let mut keys: Vec<Bigram> = entries.keys().cloned().collect();
		keys.sort_unstable();
		Self { entries, keys }
	}

	fn insert(&mut self, entry: ChainEntry) {
		let bigram = entry.bigram.clone();
		if self.entries.insert(bigram.clone(), Arc::new(entry)).is_none() {
			if let Err(pos) = self.keys.binary_search(&bigram) {
				self.keys.insert(pos, bigram);
			}
		}
	}

	pub fn get(&self, bigram: &Bigram) -> Option<&Arc<ChainEntry>> {
		self.entries.get(bigram)
	}

	pub fn contains(&self, bigram: &Bigram) -> bool {
		self.entries.contains_key(bigram)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries ordered by bigram.
	pub fn iter(&self) -> impl Iterator<Item = &ChainEntry> {
		self.keys.iter().filter_map(|key| self.entries.get(key)).map(|entry| entry.as_ref())
	}

	/// Returns a uniformly chosen stored bigram, or `None` if the index is
	/// empty. Keys are drawn from the sorted key list, so a seeded rng gives
	/// the same bigram across runs.
	pub fn random_bigram<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Bigram> {
		self.keys.choose(rng)
	}
}

/// Mapping from bigram to its topic and weighted candidate continuations.
///
/// # Responsibilities
/// - Single-entry `put` and exact-key `get`
/// - Rebuilding the whole contents from a batch of records (`bulk_load`)
/// - Writing and reading binary snapshots
///
/// # Concurrency
/// The live contents are an `Arc<ChainIndex>` behind a `RwLock`. Locks are
/// held only to clone or swap the `Arc`: readers always see a complete
/// index, and a bulk load builds its shadow index without blocking them.
///
/// There is no durability beyond explicit snapshots; the contents are
/// expected to be rebuilt from the records produced by the ingestion tool.
#[derive(Debug, Default)]
pub struct TransitionStore {
	config: StoreConfig,
	index: RwLock<Arc<ChainIndex>>,
}

impl TransitionStore {
	pub fn new(config: StoreConfig) -> Self {
		Self { config, index: RwLock::new(Arc::new(ChainIndex::default())) }
	}

	/// Returns the current contents. Later writes do not affect the
	/// returned index.
	pub fn snapshot(&self) -> Arc<ChainIndex> {
		self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	fn swap(&self, index: ChainIndex) {
		*self.index.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(index);
	}

	pub fn len(&self) -> usize {
		self.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot().is_empty()
	}

	pub fn contains(&self, bigram: &Bigram) -> bool {
		self.snapshot().contains(bigram)
	}

	/// All entries, ordered by bigram.
	pub fn entries(&self) -> Vec<Arc<ChainEntry>> {
		let index = self.snapshot();
		index.keys.iter().filter_map(|key| index.entries.get(key).cloned()).collect()
	}

	/// Returns a uniformly chosen stored bigram, or `None` if the store is
	/// empty.
	pub fn random_bigram<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Bigram> {
		self.snapshot().random_bigram(rng).cloned()
	}

	/// Inserts or replaces the entry for `bigram`.
	///
	/// # Errors
	/// `InvalidInput` if `bigram` or `topic` contains an empty token, if
	/// `candidates` is empty, or if a candidate has an empty word. The store
	/// is left untouched on error.
	pub fn put(&self, bigram: Bigram, topic: Bigram, candidates: Vec<SeqUnigram>) -> Result<()> {
		let entry = ChainEntry::new(bigram, topic, candidates);
		entry.validate()?;

		let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
		// Copies the index only if a reader still holds the current one.
		Arc::make_mut(&mut *guard).insert(entry);
		Ok(())
	}

	/// Exact-key lookup.
	///
	/// # Errors
	/// `NotFound` if no entry is stored for `bigram`.
	pub fn get(&self, bigram: &Bigram) -> Result<Arc<ChainEntry>> {
		self.snapshot()
			.get(bigram)
			.cloned()
			.ok_or_else(|| ChainError::NotFound { bigram: bigram.clone() })
	}

	/// Replaces the whole store contents with `entries`.
	///
	/// The records are validated and indexed into a new index which is then
	/// swapped in at once. Loading zero records empties the store.
	///
	/// Records sharing a bigram (one per topic run, as ingestion emits them)
	/// are folded into a single entry: candidates are concatenated in input
	/// order, and the entry keeps the topic that contributed the most
	/// candidates, the earliest one on a tie.
	///
	/// Large inputs are split into chunks indexed on separate threads, then
	/// folded in input order.
	///
	/// # Errors
	/// `InvalidInput` for the first invalid record (in input order). The
	/// previous contents stay visible in that case.
	pub fn bulk_load<I>(&self, entries: I) -> Result<()>
	where
		I: IntoIterator<Item = ChainEntry>,
	{
		let entries: Vec<ChainEntry> = entries.into_iter().collect();
		let nb_records = entries.len();

		let folded = if nb_records >= self.config.parallel_threshold && nb_records > 1 {
			self.index_parallel(entries)?
		} else {
			index_chunk(entries)?
		};

		let map: EntryMap = folded
			.into_iter()
			.map(|(bigram, folded)| (bigram, Arc::new(folded.into_entry())))
			.collect();

		let nb_entries = map.len();
		self.swap(ChainIndex::from_map(map));

		info!(
			records = nb_records,
			entries = nb_entries,
			folded = nb_records - nb_entries,
			"bulk load complete"
		);
		Ok(())
	}

	/// Splits the records into chunks (based on CPU cores * factor), indexes
	/// each chunk on its own thread and folds the partial maps in chunk
	/// order.
	fn index_parallel(&self, entries: Vec<ChainEntry>) -> Result<FoldMap> {
		let nb_records = entries.len();
		let chunks = (num_cpus::get() * self.config.chunk_factor).max(1);
		let chunk_size = nb_records.div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		let mut remaining = entries.into_iter();
		let mut nb_chunks = 0;
		loop {
			let chunk: Vec<ChainEntry> = remaining.by_ref().take(chunk_size).collect();
			if chunk.is_empty() {
				break;
			}

			let tx = tx.clone();
			let chunk_id = nb_chunks;
			thread::spawn(move || {
				// The receiver outlives every worker.
				let _ = tx.send((chunk_id, index_chunk(chunk)));
			});
			nb_chunks += 1;
		}
		drop(tx);

		debug!(records = nb_records, chunks = nb_chunks, "indexing in parallel");

		let mut partials: Vec<Option<Result<FoldMap>>> = (0..nb_chunks).map(|_| None).collect();
		for (chunk_id, partial) in rx.iter() {
			partials[chunk_id] = Some(partial);
		}

		let mut map = FoldMap::with_capacity(nb_records);
		for (chunk, partial) in partials.into_iter().enumerate() {
			let partial = partial.ok_or(ChainError::WorkerFailed { chunk })??;
			for (bigram, folded) in partial {
				match map.get_mut(&bigram) {
					Some(existing) => existing.absorb(folded),
					None => {
						map.insert(bigram, folded);
					}
				}
			}
		}

		Ok(map)
	}

	/// Adds every entry of `other` to this store, replacing entries with
	/// the same bigram.
	pub fn merge(&self, other: &TransitionStore) {
		let theirs = other.snapshot();

		let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
		let index = Arc::make_mut(&mut *guard);
		for (bigram, entry) in &theirs.entries {
			if index.entries.insert(bigram.clone(), entry.clone()).is_none() {
				if let Err(pos) = index.keys.binary_search(bigram) {
					index.keys.insert(pos, bigram.clone());
				}
			}
		}
	}

	/// Writes the current contents to a snapshot file.
	///
	/// The file is replaced atomically; an interrupted save leaves the
	/// previous snapshot in place.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let index = self.snapshot();
		let bytes = snapshot::encode(index.iter())?;
		write_atomic(path.as_ref(), &bytes)?;

		info!(path = %path.as_ref().display(), entries = index.len(), bytes = bytes.len(), "snapshot saved");
		Ok(())
	}

	/// Reads a store back from a snapshot file written by [`save`](Self::save).
	pub fn load<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
		let bytes = std::fs::read(path.as_ref())?;
		let entries = snapshot::decode(&bytes)?;

		info!(path = %path.as_ref().display(), entries = entries.len(), "snapshot loaded");

		let store = Self::new(config);
		store.bulk_load(entries)?;
		Ok(store)
	}

	/// Opens the store built from a JSON-lines record file.
	///
	/// - If a snapshot with the same name and a `.bin` extension exists and
	///   is not older than the records, it is loaded instead of the records.
	/// - Otherwise the records are bulk loaded and the snapshot is written
	///   for the next run.
	pub fn open<P: AsRef<Path>>(records_path: P, config: StoreConfig) -> Result<Self> {
		let snapshot_path = build_output_path(&records_path, "bin")?;
		if snapshot_is_fresh(records_path.as_ref(), &snapshot_path)? {
			return Self::load(&snapshot_path, config);
		}

		let store = Self::new(config);
		store.bulk_load(read_entries(&records_path)?)?;
		store.save(&snapshot_path)?;
		Ok(store)
	}
}

/// A snapshot is fresh if it exists and the records were not modified after
/// it. Without a records file, any existing snapshot is used.
fn snapshot_is_fresh(records_path: &Path, snapshot_path: &Path) -> Result<bool> {
	let snapshot_modified = match std::fs::metadata(snapshot_path) {
		Ok(metadata) => metadata.modified()?,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
		Err(e) => return Err(e.into()),
	};
	let records_modified = match std::fs::metadata(records_path) {
		Ok(metadata) => metadata.modified()?,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
		Err(e) => return Err(e.into()),
	};

	if records_modified > snapshot_modified {
		debug!(path = %snapshot_path.display(), "snapshot older than records, rebuilding");
		return Ok(false);
	}
	Ok(true)
}

/// Records sharing a bigram, accumulated in input order.
#[derive(Debug)]
struct Folded {
	bigram: Bigram,
	/// Topics in first-seen order with their number of candidates.
	topics: Vec<(Bigram, usize)>,
	candidates: Vec<SeqUnigram>,
}

type FoldMap = HashMap<Bigram, Folded>;

impl Folded {
	fn new(entry: ChainEntry) -> Self {
		Self {
			bigram: entry.bigram,
			topics: vec![(entry.topic, entry.candidates.len())],
			candidates: entry.candidates,
		}
	}

	/// Appends `other`, which comes later in the input.
	fn absorb(&mut self, other: Folded) {
		for (topic, count) in other.topics {
			match self.topics.iter_mut().find(|(known, _)| *known == topic) {
				Some((_, total)) => *total += count,
				None => self.topics.push((topic, count)),
			}
		}
		self.candidates.extend(other.candidates);
	}

	fn into_entry(self) -> ChainEntry {
		if self.topics.len() > 1 {
			debug!(bigram = %self.bigram, topics = self.topics.len(), "records folded");
		}

		let mut topics = self.topics.into_iter();
		// Never empty: `new` always records one topic.
		let mut best = topics.next().unwrap_or_default();
		for (topic, count) in topics {
			if count > best.1 {
				best = (topic, count);
			}
		}

		ChainEntry::new(self.bigram, best.0, self.candidates)
	}
}

/// Validates and indexes one chunk of records, folding records that share
/// a bigram.
fn index_chunk(entries: Vec<ChainEntry>) -> Result<FoldMap> {
	let mut map = FoldMap::with_capacity(entries.len());
	for entry in entries {
		if let Err(e) = entry.validate() {
			warn!(bigram = %entry.bigram, error = %e, "rejected record");
			return Err(e);
		}
		let folded = Folded::new(entry);
		match map.get_mut(&folded.bigram) {
			Some(existing) => existing.absorb(folded),
			None => {
				map.insert(folded.bigram.clone(), folded);
			}
		}
	}
	Ok(map)
}
