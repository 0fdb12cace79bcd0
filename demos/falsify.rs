//! Falsifying a property and reporting the minimal failure.

use std::collections::HashMap;

use quarry::*;

/// Counts words, but forgets to lowercase them.
fn word_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}

fn main() -> Result<()> {
    println!("Quarry falsification example");
    println!();

    let words = text(Some("aA "), SizeBounds::new().max(12))?;
    let settings = Settings::default().with_examples(500).with_seed(42);

    let outcome = falsify(
        &words,
        |text| {
            let counts = word_counts(text);
            let lowered = word_counts(&text.to_lowercase());
            if counts.len() == lowered.len() {
                Ok(())
            } else {
                Err(format!("{} distinct words, {} ignoring case", counts.len(), lowered.len()))
            }
        },
        Some(settings),
    )?;

    match outcome {
        Outcome::Found(minimal) => {
            println!("Property failed for {:?}: {}", minimal.value, minimal.error);
            println!("  examples tried: {}", minimal.stats.examples);
            println!("  shrinks: {}", minimal.stats.shrinks);
            println!("  local minimum: {}", minimal.is_local_minimum());
        }
        Outcome::NotFound(stats) => println!("Property held for {} examples", stats.examples),
    }

    Ok(())
}
