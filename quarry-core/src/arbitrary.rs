//! Default strategies for common types.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use crate::collections::{any_lists, tuples};
use crate::combinators::{booleans, none};
use crate::numbers::{bounded_integers, floats, integers};
use crate::strategy::Strategy;
use crate::strings::characters;

/// Types with a canonical strategy.
///
/// Implement this, or derive it with the `derive` feature of `quarry`, to
/// let a type be used without spelling out a strategy.
pub trait Arbitrary: Sized + 'static {
    fn arbitrary() -> Strategy<Self>;
}

/// The canonical strategy for `T`.
pub fn any<T: Arbitrary>() -> Strategy<T> {
    T::arbitrary()
}

impl Arbitrary for () {
    fn arbitrary() -> Strategy<Self> {
        none()
    }
}

impl Arbitrary for bool {
    fn arbitrary() -> Strategy<Self> {
        booleans()
    }
}

impl Arbitrary for i64 {
    fn arbitrary() -> Strategy<Self> {
        integers()
    }
}

impl Arbitrary for i32 {
    fn arbitrary() -> Strategy<Self> {
        bounded_integers(i64::from(i32::MIN), i64::from(i32::MAX)).map(|n| n as i32)
    }
}

impl Arbitrary for u8 {
    fn arbitrary() -> Strategy<Self> {
        bounded_integers(0, i64::from(u8::MAX)).map(|n| n as u8)
    }
}

impl Arbitrary for f64 {
    fn arbitrary() -> Strategy<Self> {
        floats()
    }
}

impl Arbitrary for char {
    fn arbitrary() -> Strategy<Self> {
        characters()
    }
}

impl Arbitrary for String {
    fn arbitrary() -> Strategy<Self> {
        any_lists(characters()).map(|chars| chars.into_iter().collect())
    }
}

/// `None` first, so optional values shrink toward absence.
impl<T: Arbitrary> Arbitrary for Option<T> {
    fn arbitrary() -> Strategy<Self> {
        none().map(|()| None).or(T::arbitrary().map(Some))
    }
}

impl<T: Arbitrary> Arbitrary for Vec<T> {
    fn arbitrary() -> Strategy<Self> {
        any_lists(T::arbitrary())
    }
}

impl<T: Arbitrary + Eq + Hash> Arbitrary for HashSet<T> {
    fn arbitrary() -> Strategy<Self> {
        any_lists(T::arbitrary()).map(|items| items.into_iter().collect())
    }
}

impl<T: Arbitrary + Ord> Arbitrary for BTreeSet<T> {
    fn arbitrary() -> Strategy<Self> {
        any_lists(T::arbitrary()).map(|items| items.into_iter().collect())
    }
}

impl<K: Arbitrary + Eq + Hash, V: Arbitrary> Arbitrary for HashMap<K, V> {
    fn arbitrary() -> Strategy<Self> {
        any_lists(tuples((K::arbitrary(), V::arbitrary())))
            .map(|entries| entries.into_iter().collect())
    }
}

impl<K: Arbitrary + Ord, V: Arbitrary> Arbitrary for BTreeMap<K, V> {
    fn arbitrary() -> Strategy<Self> {
        any_lists(tuples((K::arbitrary(), V::arbitrary())))
            .map(|entries| entries.into_iter().collect())
    }
}

macro_rules! arbitrary_tuple {
    ($($name:ident),+) => {
        impl<$($name: Arbitrary),+> Arbitrary for ($($name,)+) {
            fn arbitrary() -> Strategy<Self> {
                tuples(($($name::arbitrary(),)+))
            }
        }
    };
}

arbitrary_tuple!(A);
arbitrary_tuple!(A, B);
arbitrary_tuple!(A, B, C);
arbitrary_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Random;
    use crate::strategy::{SearchStrategy, TemplateSpace};
    use crate::template::Template;

    fn draw<T: Arbitrary>(seed: u64, count: usize) -> Vec<T> {
        let strategy = any::<T>();
        let mut random = Random::from_seed(seed);
        (0..count)
            .filter_map(|_| strategy.example(&mut random).ok())
            .collect()
    }

    #[test]
    fn test_narrow_integers_fit() {
        assert_eq!(draw::<u8>(1, 100).len(), 100);
        assert_eq!(draw::<i32>(2, 100).len(), 100);
    }

    #[test]
    fn test_option_shrinks_toward_none() {
        let strategy = any::<Option<bool>>();
        let template = Template::branch(1, Template::Bool(true));
        let mut random = Random::from_seed(0);
        let first = strategy.simplify(&mut random, &template).next().unwrap();
        assert_eq!(strategy.reify(&first).unwrap(), None);
    }

    #[test]
    fn test_collections() {
        for set in draw::<BTreeSet<u8>>(3, 30) {
            assert!(set.iter().zip(set.iter().skip(1)).all(|(a, b)| a < b));
        }
        assert_eq!(draw::<HashMap<u8, bool>>(4, 30).len(), 30);
        assert_eq!(draw::<(bool, i64, char, String)>(5, 30).len(), 30);
    }
}
