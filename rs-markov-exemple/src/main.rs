use std::sync::Arc;
use std::time::Duration;

use rs_markov_core::chain::{Chain, FailurePolicy, StartSeed};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Windows of 2 words: each word is chosen from the two words before it
    let chain = Arc::new(Chain::new(2)?);

    // Restore the previous run, if any (a missing file just leaves the chain empty)
    let state_file = "./data/markov-state.json.gz";
    if !chain.load(state_file) {
        println!("No previous state, starting from scratch");
    }

    // Learn a corpus: every line is a message of its own
    match chain.train_file("./data/corpus.txt") {
        Ok(bytes) => println!("Trained {} bytes from the corpus", bytes),
        Err(e) => println!("No corpus loaded: {}", e),
    }

    // Single messages can be learned at any time, from any thread
    chain.train("the quick brown fox jumps over the lazy dog");
    chain.train("the quick red fox runs away from the lazy cat");

    // Save the chain every 30 seconds in the background.
    // 'Continue' retries on the next tick after a failure, 'Stop' gives up
    let checkpoints = chain.run_periodic_save(Duration::from_secs(30), state_file, FailurePolicy::Continue)?;

    // Start seed can be set to
    // 'Empty' to start like a message starts
    // 'Custom' to continue from the last words of a text
    // 'Random' to start from any known window
    let seeds = [
        StartSeed::Empty,
        StartSeed::Custom("the lazy".to_owned()),
        StartSeed::Random,
    ];
    for seed in &seeds {
        for i in 0..3 {
            let (text, elapsed) = chain.generate(20, seed);
            println!("{:?} #{}: {} ({:?})", seed, i + 1, text, elapsed);
        }
    }

    let stats = chain.stats();
    println!("{} windows, {} suffixes", stats.prefixes, stats.suffixes);

    // Stop the background task and write a last snapshot
    checkpoints.stop();
    if let Err(e) = chain.save(state_file) {
        println!("Cannot save state: {}", e);
    }

    Ok(())
}
