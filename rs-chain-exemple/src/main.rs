use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rs_chain_core::io::write_entries;
use rs_chain_core::{Bigram, ChainEntry, ChainError, ChainWalker, SeqUnigram, StoreConfig, TopicMode, TransitionStore, WalkConfig};

/// Small hand-written chain used when no record file is present.
///
/// A word observed several times is listed several times; `seq` is its
/// position in the list.
fn sample_records() -> Vec<ChainEntry> {
    let food = Bigram::new("cat", "food");
    let weather = Bigram::new("rain", "cloud");
    let entry = |first: &str, second: &str, topic: &Bigram, words: &[&str]| {
        ChainEntry::new(
            Bigram::new(first, second),
            topic.clone(),
            words.iter().zip(0..).map(|(word, seq)| SeqUnigram::new(seq, *word)).collect(),
        )
    };

    vec![
        entry("the", "cat", &food, &["ate", "watched", "ate", "ate"]),
        entry("cat", "ate", &food, &["the", "quietly", "the"]),
        entry("ate", "the", &food, &["fish", "fish", "cloud", "fish", "fish"]),
        entry("the", "fish", &food, &["$"]),
        entry("cat", "watched", &weather, &["the"]),
        entry("watched", "the", &weather, &["rain", "fish", "rain"]),
        entry("the", "rain", &weather, &["fall", "$"]),
        entry("rain", "fall", &weather, &["$"]),
        entry("ate", "quietly", &food, &["$"]),
        entry("the", "cloud", &weather, &["passed"]),
    ]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // Usage: rs-chain-exemple [records.jsonl] [walk.json]
    let mut args = std::env::args().skip(1);
    let records_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./data/chain.jsonl"));
    let config_path = args.next().map(PathBuf::from);

    // Write the sample records on first run
    if !records_path.exists() {
        write_entries(&records_path, &sample_records())
            .with_context(|| format!("Failed to write sample records to {}", records_path.display()))?;
    }

    // Load the records, or the .bin snapshot next to them if existing
    let store = TransitionStore::open(&records_path, StoreConfig::default())
        .with_context(|| format!("Failed to open {}", records_path.display()))?;
    info!(entries = store.len(), path = %records_path.display(), "store opened");

    let config = WalkConfig::load(config_path.as_deref())?;
    let walker = ChainWalker::new(config.clone())?;

    // Exact lookup
    let seed = Bigram::new("the", "cat");
    match store.get(&seed) {
        Ok(entry) => println!("{} -> topic {}, {} candidates", seed, entry.topic, entry.candidates.len()),
        Err(ChainError::NotFound { .. }) => println!("{} is not in the chain", seed),
        Err(e) => return Err(e.into()),
    }

    // Same rng seed, same sentence
    let mut rng = StdRng::seed_from_u64(2024);
    let words = walker.generate(&store, &seed, config.max_length, &mut rng)?;
    println!("Seeded: {}", words.join(" "));

    // An unknown seed cannot start a walk
    match walker.generate(&store, &Bigram::new("a", "dog"), config.max_length, &mut rng) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    // Random seeds
    let mut rng = rand::rng();
    for i in 0..5 {
        let words = walker.generate_random(&store, config.max_length, &mut rng)?;
        println!("Generated sentence {}: {}", i + 1, words.join(" "));
    }

    // Stay within one topic
    let strict = ChainWalker::new(WalkConfig {
        topic_mode: TopicMode::Strict { topic: Bigram::new("cat", "food") },
        ..config
    })?;
    for i in 0..3 {
        let words = strict.generate(&store, &seed, 16, &mut rng)?;
        println!("On topic {}: {}", i + 1, words.join(" "));
    }

    Ok(())
}
