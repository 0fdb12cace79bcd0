//! The strategy capability contract.

use std::fmt;
use std::sync::Arc;

use crate::combinators::{Bound, Filtered, Mapped, OneOf};
use crate::data::Random;
use crate::error::{BoxError, Error, Result};
use crate::template::{Parameter, Template, UpperBound};

/// A lazy sequence of candidate simplifications.
pub type Simplifications = Box<dyn Iterator<Item = Template>>;

/// The untyped half of a strategy: everything that works on templates
/// without materializing values.
pub trait TemplateSpace: Send + Sync {
    /// Draw a per-attempt parameter. Must not retain state across calls.
    fn draw_parameter(&self, random: &mut Random) -> Parameter;

    /// Draw one raw template, biased (but not bound) by `parameter`.
    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template;

    /// Candidate simplifications of `template`, most aggressive first.
    ///
    /// The sequence may reify templates for the strategy's own bookkeeping
    /// but never evaluates anything the caller is testing.
    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications;

    /// Upper bound on the number of distinct templates this strategy draws.
    fn template_upper_bound(&self) -> UpperBound {
        UpperBound::Infinite
    }
}

/// A strategy: a template space plus a deterministic way to turn its
/// templates into values.
pub trait SearchStrategy: TemplateSpace {
    type Value;

    /// Materialize a template. Reifying the same template twice yields
    /// equal values.
    fn reify(&self, template: &Template) -> Result<Self::Value>;
}

/// A composable, immutable description of a space of `T` values.
///
/// Strategies are cheap to clone and safe to share between threads; every
/// combinator returns a new strategy and leaves its inputs untouched.
pub struct Strategy<T> {
    inner: Arc<dyn SearchStrategy<Value = T>>,
    alternatives: Option<Arc<[Strategy<T>]>>,
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        Strategy {
            inner: Arc::clone(&self.inner),
            alternatives: self.alternatives.clone(),
        }
    }
}

impl<T> fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("value", &std::any::type_name::<T>())
            .field("upper_bound", &self.inner.template_upper_bound())
            .finish()
    }
}

impl<T: 'static> Strategy<T> {
    /// Wrap any implementation of the capability contract.
    pub fn new<S>(strategy: S) -> Self
    where
        S: SearchStrategy<Value = T> + 'static,
    {
        Strategy {
            inner: Arc::new(strategy),
            alternatives: None,
        }
    }

    pub(crate) fn union(branches: Vec<Strategy<T>>) -> Self {
        let alternatives: Arc<[Strategy<T>]> = branches.into();
        Strategy {
            inner: Arc::new(OneOf::new(alternatives.to_vec())),
            alternatives: Some(alternatives),
        }
    }

    /// The branches of a `one_of`, if this strategy is one.
    pub fn alternatives(&self) -> Option<&[Strategy<T>]> {
        self.alternatives.as_deref()
    }

    /// Type-erased view of this strategy's template space.
    pub fn space(&self) -> Arc<dyn TemplateSpace> {
        Arc::new(self.clone())
    }

    /// Draw a parameter and template, and reify it.
    pub fn example(&self, random: &mut Random) -> Result<T> {
        let parameter = self.draw_parameter(random);
        let template = self.draw_template(random, &parameter);
        self.reify(&template)
    }

    /// Map a function over reified values. Templates are unaffected.
    pub fn map<U, F>(self, f: F) -> Strategy<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: 'static,
    {
        Strategy::new(Mapped::new(self, move |value| Ok(f(value))))
    }

    /// Map a fallible constructor over reified values. A failure surfaces as
    /// `Error::Construction`.
    pub fn try_map<U, E, F>(self, f: F) -> Strategy<U>
    where
        F: Fn(T) -> std::result::Result<U, E> + Send + Sync + 'static,
        E: Into<BoxError>,
        U: 'static,
    {
        Strategy::new(Mapped::new(self, move |value| {
            f(value).map_err(Error::construction)
        }))
    }

    /// Keep only values satisfying `predicate`.
    pub fn filter<F>(self, predicate: F) -> Strategy<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter_map(move |value| if predicate(&value) { Some(value) } else { None })
    }

    /// Map values through `f`, rejecting those for which it returns `None`.
    pub fn filter_map<U, F>(self, f: F) -> Strategy<U>
    where
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
        U: 'static,
    {
        let attempts = crate::settings::Settings::current().max_filter_attempts;
        Strategy::new(Filtered::new(self, f, attempts))
    }

    /// Dependent generation: use a drawn value to choose the next strategy.
    pub fn flat_map<U, F>(self, f: F) -> Strategy<U>
    where
        F: Fn(T) -> Strategy<U> + Send + Sync + 'static,
        U: 'static,
    {
        Strategy::new(Bound::new(self, f))
    }

    /// Pair this strategy with another.
    pub fn zip<U: 'static>(self, other: Strategy<U>) -> Strategy<(T, U)> {
        crate::collections::tuples((self, other))
    }

    /// Either this strategy or `other`. Nested unions are flattened so the
    /// branch order reads left to right.
    pub fn or(self, other: Strategy<T>) -> Strategy<T> {
        let mut branches = Vec::new();
        for strategy in [self, other] {
            match strategy.alternatives() {
                Some(alternatives) => branches.extend(alternatives.iter().cloned()),
                None => branches.push(strategy),
            }
        }
        Strategy::union(branches)
    }
}

impl<T: 'static> TemplateSpace for Strategy<T> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        self.inner.draw_parameter(random)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        self.inner.draw_template(random, parameter)
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        self.inner.simplify(random, template)
    }

    fn template_upper_bound(&self) -> UpperBound {
        self.inner.template_upper_bound()
    }
}

impl<T: 'static> SearchStrategy for Strategy<T> {
    type Value = T;

    fn reify(&self, template: &Template) -> Result<T> {
        self.inner.reify(template)
    }
}

/// Collect a finite list of templates into a `Simplifications`.
pub fn simplifications(templates: Vec<Template>) -> Simplifications {
    Box::new(templates.into_iter())
}

/// No simplifications at all.
pub fn no_simplifications() -> Simplifications {
    Box::new(std::iter::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{booleans, just};
    use crate::numbers::integers_in;

    /// A user-defined strategy: even numbers below a limit.
    struct Evens {
        limit: i64,
    }

    impl TemplateSpace for Evens {
        fn draw_parameter(&self, _random: &mut Random) -> Parameter {
            Parameter::Unit
        }

        fn draw_template(&self, random: &mut Random, _parameter: &Parameter) -> Template {
            use rand::Rng;
            Template::Integer(random.gen_range(0..self.limit))
        }

        fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
            match template.as_integer() {
                Ok(n) if n > 0 => {
                    simplifications(vec![Template::Integer(0), Template::Integer(n - 1)])
                }
                _ => no_simplifications(),
            }
        }

        fn template_upper_bound(&self) -> UpperBound {
            UpperBound::Finite(self.limit as u64)
        }
    }

    impl SearchStrategy for Evens {
        type Value = i64;

        fn reify(&self, template: &Template) -> Result<i64> {
            Ok(template.as_integer()? * 2)
        }
    }

    #[test]
    fn test_custom_strategy() {
        let strategy = Strategy::new(Evens { limit: 10 });
        let mut random = Random::from_seed(3);
        for _ in 0..50 {
            let value = strategy.example(&mut random).unwrap();
            assert_eq!(value % 2, 0);
            assert!((0..20).contains(&value));
        }
        assert_eq!(strategy.template_upper_bound(), UpperBound::Finite(10));
    }

    #[test]
    fn test_map_keeps_template_space() {
        let strategy = Strategy::new(Evens { limit: 10 }).map(|n| n + 1);
        assert_eq!(strategy.reify(&Template::Integer(4)).unwrap(), 9);
        let mut random = Random::from_seed(0);
        let candidates: Vec<Template> =
            strategy.simplify(&mut random, &Template::Integer(4)).collect();
        assert_eq!(candidates, vec![Template::Integer(0), Template::Integer(3)]);
    }

    #[test]
    fn test_try_map_surfaces_construction_errors() {
        let strategy = integers_in(Some(0), Some(10))
            .unwrap()
            .try_map(|n| if n > 5 { Err("too big") } else { Ok(n) });
        assert_eq!(strategy.reify(&Template::Integer(3)).unwrap(), 3);
        match strategy.reify(&Template::Integer(7)) {
            Err(Error::Construction(source)) => assert_eq!(source.to_string(), "too big"),
            other => panic!("Expected a construction error, got: {other:?}"),
        }
    }

    #[test]
    fn test_or_flattens() {
        let union = just(1).or(just(2)).or(just(3));
        assert_eq!(union.alternatives().map(|a| a.len()), Some(3));
        assert_eq!(union.template_upper_bound(), UpperBound::Finite(3));
    }

    #[test]
    fn test_zip() {
        let strategy = booleans().zip(just("x"));
        let mut random = Random::from_seed(9);
        let (_, label) = strategy.example(&mut random).unwrap();
        assert_eq!(label, "x");
    }
}
