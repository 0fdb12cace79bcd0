#![cfg(feature = "derive")]

use quarry::*;

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct User {
    name: String,
    age: u8,
    active: bool,
}

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct Point(i32, i32);

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct Unit;

#[derive(Arbitrary, Debug, Clone, PartialEq)]
enum Color {
    Red,
    Green,
    Custom(u8, u8, u8),
    Named { name: String },
}

#[derive(Arbitrary, Debug, Clone, PartialEq)]
struct Wrapper<T> {
    inner: Option<T>,
}

fn seeded(seed: u64) -> Option<Settings> {
    Some(Settings::default().with_seed(seed))
}

#[test]
fn test_derive_struct_with_fields() {
    let mut random = Random::from_seed(1);
    for _ in 0..50 {
        let user = any::<User>().example(&mut random).unwrap();
        let _ = (user.name.len(), user.age, user.active);
    }
}

#[test]
fn test_derived_struct_shrinks_fieldwise() {
    let minimal = find(&any::<Point>(), |p| p.0 > 10 && p.1 < -3, seeded(2))
        .unwrap()
        .value();
    assert_eq!(minimal, Some(Point(11, -4)));
}

#[test]
fn test_unit_struct() {
    let mut random = Random::from_seed(3);
    assert_eq!(any::<Unit>().example(&mut random).unwrap(), Unit);
    assert_eq!(any::<Unit>().template_upper_bound(), UpperBound::Finite(1));
}

#[test]
fn test_enum_shrinks_toward_first_variant() {
    let minimal = find(&any::<Color>(), |c| *c != Color::Red, seeded(4)).unwrap().value();
    assert_eq!(minimal, Some(Color::Green));

    let named = find(&any::<Color>(), |c| matches!(c, Color::Named { .. }), seeded(5))
        .unwrap()
        .value();
    assert_eq!(named, Some(Color::Named { name: String::new() }));
}

#[test]
fn test_generic_struct() {
    let minimal = find(&any::<Wrapper<bool>>(), |w| w.inner.is_some(), seeded(6))
        .unwrap()
        .value();
    assert_eq!(minimal, Some(Wrapper { inner: Some(false) }));
}
