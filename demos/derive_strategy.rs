//! Deriving strategies for custom types.

use quarry::*;

#[derive(Arbitrary, Debug, Clone, PartialEq)]
enum Shape {
    Circle { radius: u8 },
    Rectangle(u8, u8),
}

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct Drawing {
    title: String,
    shapes: Vec<Shape>,
}

fn area(shape: &Shape) -> u32 {
    match shape {
        Shape::Circle { radius } => 3 * u32::from(*radius) * u32::from(*radius),
        Shape::Rectangle(w, h) => u32::from(*w) * u32::from(*h),
    }
}

fn main() -> Result<()> {
    println!("Derived strategy examples");
    println!();

    let mut random = Random::from_seed(Random::fresh_seed());
    for _ in 0..3 {
        println!("{:?}", any::<Drawing>().example(&mut random)?);
    }
    println!();

    println!("Finding a drawing covering more than 1000 units");
    let large = |d: &Drawing| d.shapes.iter().map(area).sum::<u32>() > 1000;
    let covering = find(&any::<Drawing>(), large, None)?;
    match covering.value() {
        Some(drawing) => println!("Found {drawing:?}"),
        None => println!("No drawing found"),
    }

    Ok(())
}
