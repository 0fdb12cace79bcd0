//! Strategies looked up from value-space descriptions.
//!
//! A `Specifier` names a space of values without committing to a Rust type;
//! the `Registry` turns it into a `Strategy<Value>`. Custom names resolve
//! through builder functions registered at runtime. Nothing else in the
//! crate depends on this module.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use num_rational::Rational64;
use rust_decimal::Decimal;

use crate::collections::{dictionaries_as, fixed_dictionaries, lists, tuples_of, SizeBounds};
use crate::combinators::{booleans, just, none, one_of, sampled_from};
use crate::error::{Error, Result};
use crate::numbers::{
    complex_numbers, decimals, floats, floats_in, fractions, integers, integers_in,
};
use crate::settings::Settings;
use crate::streams::{streaming, Stream};
use crate::strategy::Strategy;
use crate::strings::{binary, text};

/// A description of a space of values.
#[derive(Debug, Clone, PartialEq)]
pub enum Specifier {
    None,
    Bool,
    Integer,
    Float,
    Complex,
    Fraction,
    Decimal,
    Text,
    Binary,
    /// Integers in an inclusive range.
    IntegerRange(i64, i64),
    /// Integers no smaller than the given base.
    IntegersFrom(i64),
    /// Floats in an inclusive range.
    FloatRange(f64, f64),
    /// Fixed-length tuples, one position per specifier.
    Tuple(Vec<Specifier>),
    /// Lists whose elements come from any of the specifiers. No specifiers
    /// means only the empty list.
    List(Vec<Specifier>),
    /// Like `List`, without repeated elements.
    Set(Vec<Specifier>),
    Dictionary(Box<Specifier>, Box<Specifier>),
    /// Dictionaries with exactly these text keys, in this order.
    FixedDictionary(Vec<(String, Specifier)>),
    OneOf(Vec<Specifier>),
    SampledFrom(Vec<Value>),
    Just(Value),
    Streaming(Box<Specifier>),
    /// A name resolved through the registry's custom builders.
    Custom(String),
}

/// A dynamically typed value produced from a `Specifier`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Complex(Complex64),
    Fraction(Rational64),
    Decimal(Decimal),
    Text(String),
    Binary(Vec<u8>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    /// Distinct values in the order they were first drawn.
    Set(Vec<Value>),
    /// Key/value pairs with distinct keys, in insertion order.
    Dictionary(Vec<(Value, Value)>),
    Stream(Arc<Stream<Value>>),
}

type Builder = Arc<dyn Fn(&Registry) -> Result<Strategy<Value>> + Send + Sync>;

/// Resolves specifiers to strategies.
#[derive(Clone, Default)]
pub struct Registry {
    custom: HashMap<String, Builder>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("custom", &names).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a builder for `Specifier::Custom(name)`, replacing any
    /// earlier one. The builder receives the registry so it can resolve
    /// nested specifiers.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&Registry) -> Result<Strategy<Value>> + Send + Sync + 'static,
    {
        let name = name.into();
        log::debug!("Registered custom strategy {name:?}");
        self.custom.insert(name, Arc::new(builder));
        self
    }

    /// Whether a custom builder is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Build the strategy described by `specifier` under `settings`.
    pub fn strategy_with(
        &self,
        specifier: &Specifier,
        settings: &Settings,
    ) -> Result<Strategy<Value>> {
        settings.validate()?;
        let _active = settings.activate();
        self.strategy(specifier)
    }

    /// Build the strategy described by `specifier` under the current
    /// settings.
    pub fn strategy(&self, specifier: &Specifier) -> Result<Strategy<Value>> {
        let strategy = match specifier {
            Specifier::None => none().map(|()| Value::None),
            Specifier::Bool => booleans().map(Value::Bool),
            Specifier::Integer => integers().map(Value::Integer),
            Specifier::Float => floats().map(Value::Float),
            Specifier::Complex => complex_numbers().map(Value::Complex),
            Specifier::Fraction => fractions().map(Value::Fraction),
            Specifier::Decimal => decimals().map(Value::Decimal),
            Specifier::Text => text(None, SizeBounds::new())?.map(Value::Text),
            Specifier::Binary => binary(SizeBounds::new())?.map(Value::Binary),
            Specifier::IntegerRange(lo, hi) => {
                integers_in(Some(*lo), Some(*hi))?.map(Value::Integer)
            }
            Specifier::IntegersFrom(base) => integers_in(Some(*base), None)?.map(Value::Integer),
            Specifier::FloatRange(lo, hi) => floats_in(Some(*lo), Some(*hi))?.map(Value::Float),
            Specifier::Tuple(items) => tuples_of(self.all(items)?).map(Value::Tuple),
            Specifier::List(elements) if elements.is_empty() => just(Value::List(Vec::new())),
            Specifier::List(elements) => {
                lists(self.any_of(elements)?, SizeBounds::new())?.map(Value::List)
            }
            Specifier::Set(elements) if elements.is_empty() => just(Value::Set(Vec::new())),
            Specifier::Set(elements) => {
                lists(self.any_of(elements)?, SizeBounds::new())?.map(|drawn| {
                    let mut distinct: Vec<Value> = Vec::with_capacity(drawn.len());
                    for value in drawn {
                        if !distinct.contains(&value) {
                            distinct.push(value);
                        }
                    }
                    Value::Set(distinct)
                })
            }
            Specifier::Dictionary(keys, values) => {
                dictionaries_as::<Vec<(Value, Value)>, _, _>(
                    self.strategy(keys)?,
                    self.strategy(values)?,
                    SizeBounds::new(),
                )?
                .map(Value::Dictionary)
            }
            Specifier::FixedDictionary(entries) => {
                let mut resolved = Vec::with_capacity(entries.len());
                for (key, specifier) in entries {
                    resolved.push((Value::Text(key.clone()), self.strategy(specifier)?));
                }
                fixed_dictionaries::<Value, Value, Vec<(Value, Value)>>(resolved)
                    .map(Value::Dictionary)
            }
            Specifier::OneOf(branches) => one_of(self.all(branches)?)?,
            Specifier::SampledFrom(values) => sampled_from(values.clone())?,
            Specifier::Just(value) => just(value.clone()),
            Specifier::Streaming(elements) => {
                streaming(self.strategy(elements)?).map(|stream| Value::Stream(Arc::new(stream)))
            }
            Specifier::Custom(name) => {
                let builder = self.custom.get(name).ok_or_else(|| {
                    Error::invalid_argument(format!("No strategy registered for {name:?}"))
                })?;
                builder(self)?
            }
        };
        Ok(strategy)
    }

    fn all(&self, specifiers: &[Specifier]) -> Result<Vec<Strategy<Value>>> {
        specifiers.iter().map(|specifier| self.strategy(specifier)).collect()
    }

    fn any_of(&self, specifiers: &[Specifier]) -> Result<Strategy<Value>> {
        one_of(self.all(specifiers)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Random;

    fn draw(strategy: &Strategy<Value>, seed: u64, count: usize) -> Vec<Value> {
        let mut random = Random::from_seed(seed);
        (0..count)
            .filter_map(|_| strategy.example(&mut random).ok())
            .collect()
    }

    #[test]
    fn test_integer_range() {
        let strategy = Registry::new().strategy(&Specifier::IntegerRange(-3, 3)).unwrap();
        for value in draw(&strategy, 1, 200) {
            match value {
                Value::Integer(n) => assert!((-3..=3).contains(&n)),
                other => panic!("Expected an integer, got: {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_ranges_are_rejected() {
        let registry = Registry::new();
        assert!(registry.strategy(&Specifier::IntegerRange(5, 1)).is_err());
        assert!(registry.strategy(&Specifier::FloatRange(5.0, 1.0)).is_err());
        assert!(registry.strategy(&Specifier::OneOf(Vec::new())).is_err());
        assert!(registry.strategy(&Specifier::SampledFrom(Vec::new())).is_err());
    }

    #[test]
    fn test_unknown_custom_name() {
        let result = Registry::new().strategy(&Specifier::Custom("point".into()));
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_custom_builder_resolves_nested_specifiers() {
        let mut registry = Registry::new();
        registry.register("point", |registry| {
            registry.strategy(&Specifier::Tuple(vec![
                Specifier::IntegerRange(0, 9),
                Specifier::IntegerRange(0, 9),
            ]))
        });
        assert!(registry.contains("point"));
        let strategy = registry
            .strategy(&Specifier::List(vec![Specifier::Custom("point".into())]))
            .unwrap();
        for value in draw(&strategy, 2, 50) {
            let Value::List(points) = value else {
                panic!("Expected a list");
            };
            for point in points {
                assert!(matches!(point, Value::Tuple(ref items) if items.len() == 2));
            }
        }
    }

    #[test]
    fn test_sets_have_distinct_elements() {
        let strategy = Registry::new()
            .strategy(&Specifier::Set(vec![Specifier::IntegerRange(0, 3)]))
            .unwrap();
        for value in draw(&strategy, 3, 100) {
            let Value::Set(items) = value else {
                panic!("Expected a set");
            };
            assert!(items.len() <= 4);
            for (i, item) in items.iter().enumerate() {
                assert!(!items[i + 1..].contains(item));
            }
        }
    }

    #[test]
    fn test_empty_list_specifier() {
        let strategy = Registry::new().strategy(&Specifier::List(Vec::new())).unwrap();
        assert!(draw(&strategy, 4, 10).iter().all(|value| *value == Value::List(Vec::new())));
    }

    #[test]
    fn test_fixed_dictionary_keeps_key_order() {
        let strategy = Registry::new()
            .strategy(&Specifier::FixedDictionary(vec![
                ("b".into(), Specifier::Bool),
                ("a".into(), Specifier::None),
            ]))
            .unwrap();
        for value in draw(&strategy, 5, 20) {
            let Value::Dictionary(entries) = value else {
                panic!("Expected a dictionary");
            };
            let keys: Vec<&Value> = entries.iter().map(|(key, _)| key).collect();
            assert_eq!(keys, vec![&Value::Text("b".into()), &Value::Text("a".into())]);
            assert_eq!(entries[1].1, Value::None);
        }
    }

    #[test]
    fn test_strategy_with_rejects_invalid_settings() {
        let settings = Settings::default().with_average_list_length(-1.0);
        assert!(Registry::new().strategy_with(&Specifier::Bool, &settings).is_err());
    }
}
