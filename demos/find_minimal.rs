//! Searching for minimal examples with `find`.

use quarry::*;

fn main() -> Result<()> {
    println!("Quarry minimal example search");
    println!();

    // Example 1: the smallest integer above a threshold
    println!("Finding an integer greater than 10");
    match find(&integers(), |&x| x > 10, None)? {
        Outcome::Found(minimal) => println!("Found {} ({})", minimal.value, minimal.termination),
        Outcome::NotFound(stats) => println!("Nothing found in {} examples", stats.examples),
    }
    println!();

    // Example 2: a list whose sum is large
    println!("Finding a list of integers summing to more than 100");
    let numbers = lists(integers(), SizeBounds::new())?;
    let large_sum = |list: &Vec<i64>| list.iter().map(|&x| i128::from(x)).sum::<i128>() > 100;
    let outcome = find(&numbers, large_sum, None)?;
    if let Some(minimal) = outcome.found() {
        println!("Found {:?}", minimal.value);
        println!(
            "  {} shrinks accepted out of {} attempts, seed {}",
            minimal.stats.shrinks, minimal.stats.shrink_attempts, minimal.seed
        );
        println!("  template: {:?}", minimal.template);
        println!("  replayed: {:?}", replay(&numbers, &minimal.template)?);
    }
    println!();

    // Example 3: nothing to find within a bounded range
    println!("Looking for a digit above 9");
    let digits = integers_in(Some(0), Some(9))?;
    match find(&digits, |&x| x > 9, None)? {
        Outcome::Found(minimal) => println!("Unexpectedly found {}", minimal.value),
        Outcome::NotFound(stats) => {
            println!("Nothing found after {} distinct examples", stats.examples)
        }
    }

    Ok(())
}
