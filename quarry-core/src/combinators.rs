//! Leaf strategies and the combinators that compose strategies.

use std::sync::Arc;

use crate::data::Random;
use crate::error::{Error, Result};
use crate::strategy::{
    no_simplifications, simplifications, SearchStrategy, Simplifications, Strategy, TemplateSpace,
};
use crate::template::{Parameter, Template, UpperBound};

/// Pick an index with probability proportional to `weights`. Falls back to
/// a uniform choice over `count` when the weights are unusable.
pub(crate) fn choose_weighted(random: &mut Random, weights: &[f64], count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let total: f64 = weights.iter().take(count).filter(|w| w.is_finite() && **w > 0.0).sum();
    if weights.len() >= count && total > 0.0 {
        let mut target = random.unit() * total;
        for (index, weight) in weights.iter().take(count).enumerate() {
            if !(weight.is_finite() && *weight > 0.0) {
                continue;
            }
            if target < *weight {
                return index;
            }
            target -= weight;
        }
    }
    (random.unit() * count as f64) as usize % count
}

/// Draw weights over `count` alternatives, sometimes switching some off.
pub(crate) fn draw_weights(random: &mut Random, count: usize) -> Vec<f64> {
    let mut weights: Vec<f64> = (0..count).map(|_| random.unit()).collect();
    if count > 1 && random.unit() < 0.5 {
        for weight in weights.iter_mut() {
            if random.unit() < 0.3 {
                *weight = 0.0;
            }
        }
    }
    if weights.iter().all(|w| *w <= 0.0) && count > 0 {
        let keep = (random.unit() * count as f64) as usize % count;
        weights[keep] = 1.0;
    }
    weights
}

/// Always the same value.
pub struct Just<T> {
    value: T,
}

impl<T: Clone + Send + Sync> TemplateSpace for Just<T> {
    fn draw_parameter(&self, _random: &mut Random) -> Parameter {
        Parameter::Unit
    }

    fn draw_template(&self, _random: &mut Random, _parameter: &Parameter) -> Template {
        Template::Unit
    }

    fn simplify(&self, _random: &mut Random, _template: &Template) -> Simplifications {
        no_simplifications()
    }

    fn template_upper_bound(&self) -> UpperBound {
        UpperBound::Finite(1)
    }
}

impl<T: Clone + Send + Sync> SearchStrategy for Just<T> {
    type Value = T;

    fn reify(&self, _template: &Template) -> Result<T> {
        Ok(self.value.clone())
    }
}

/// A strategy that only ever produces `value`.
pub fn just<T>(value: T) -> Strategy<T>
where
    T: Clone + Send + Sync + 'static,
{
    Strategy::new(Just { value })
}

/// A strategy that only produces `()`.
pub fn none() -> Strategy<()> {
    just(())
}

struct Booleans;

impl TemplateSpace for Booleans {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(random.unit())
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let p = parameter.value_or(0.5);
        Template::Bool(random.unit() < p)
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        match template {
            Template::Bool(true) => simplifications(vec![Template::Bool(false)]),
            _ => no_simplifications(),
        }
    }

    fn template_upper_bound(&self) -> UpperBound {
        UpperBound::Finite(2)
    }
}

impl SearchStrategy for Booleans {
    type Value = bool;

    fn reify(&self, template: &Template) -> Result<bool> {
        template.as_bool()
    }
}

/// Booleans; `false` is simpler than `true`.
pub fn booleans() -> Strategy<bool> {
    Strategy::new(Booleans)
}

/// Uniformly-ish chosen elements of a fixed collection. Earlier elements
/// are simpler.
pub(crate) struct SampledFrom<T> {
    elements: Arc<[T]>,
}

impl<T> SampledFrom<T> {
    pub(crate) fn new(elements: Vec<T>) -> Self {
        SampledFrom {
            elements: elements.into(),
        }
    }
}

impl<T: Clone + Send + Sync> TemplateSpace for SampledFrom<T> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Weights(draw_weights(random, self.elements.len()))
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        Template::Index(choose_weighted(random, parameter.weights(), self.elements.len()))
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        match template.as_index() {
            Ok(index) => Box::new((0..index.min(self.elements.len())).map(Template::Index)),
            Err(_) => no_simplifications(),
        }
    }

    fn template_upper_bound(&self) -> UpperBound {
        UpperBound::Finite(self.elements.len() as u64)
    }
}

impl<T: Clone + Send + Sync> SearchStrategy for SampledFrom<T> {
    type Value = T;

    fn reify(&self, template: &Template) -> Result<T> {
        let index = template.as_index()?;
        self.elements
            .get(index)
            .cloned()
            .ok_or(Error::TemplateMismatch {
                expected: "index within the sampled elements",
                found: "index",
            })
    }
}

/// Any one of `elements`.
pub fn sampled_from<T, I>(elements: I) -> Result<Strategy<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    let mut elements: Vec<T> = elements.into_iter().collect();
    match elements.len() {
        0 => Err(Error::invalid_argument(
            "sampled_from requires at least one value",
        )),
        1 => Ok(just(elements.remove(0))),
        _ => Ok(Strategy::new(SampledFrom::new(elements))),
    }
}

/// A union of strategies; the template records which branch drew it.
pub(crate) struct OneOf<T> {
    branches: Arc<[Strategy<T>]>,
}

impl<T> OneOf<T> {
    pub(crate) fn new(branches: Vec<Strategy<T>>) -> Self {
        OneOf {
            branches: branches.into(),
        }
    }
}

impl<T: 'static> TemplateSpace for OneOf<T> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        let mut parts = vec![Parameter::Weights(draw_weights(random, self.branches.len()))];
        parts.extend(self.branches.iter().map(|branch| branch.draw_parameter(random)));
        Parameter::Composite(parts)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let index = choose_weighted(random, parameter.part(0).weights(), self.branches.len());
        let branch = &self.branches[index];
        let inner = match parameter.part(index + 1) {
            Parameter::Unit => {
                let fresh = branch.draw_parameter(random);
                branch.draw_template(random, &fresh)
            }
            own => branch.draw_template(random, own),
        };
        Template::branch(index, inner)
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let Ok((index, inner)) = template.as_branch() else {
            return no_simplifications();
        };
        let Some(current) = self.branches.get(index) else {
            return no_simplifications();
        };

        // Earlier branches first: a fresh draw from each, keyed on the template
        // so the candidates are the same every time this template is simplified.
        let earlier: Vec<Template> = self.branches[..index]
            .iter()
            .enumerate()
            .map(|(position, branch)| {
                let mut local = Random::for_key(&(position, template));
                let parameter = branch.draw_parameter(&mut local);
                Template::branch(position, branch.draw_template(&mut local, &parameter))
            })
            .collect();

        let within = current
            .simplify(random, inner)
            .map(move |candidate| Template::branch(index, candidate));
        Box::new(earlier.into_iter().chain(within))
    }

    fn template_upper_bound(&self) -> UpperBound {
        self.branches
            .iter()
            .map(|branch| branch.template_upper_bound())
            .sum()
    }
}

impl<T: 'static> SearchStrategy for OneOf<T> {
    type Value = T;

    fn reify(&self, template: &Template) -> Result<T> {
        let (index, inner) = template.as_branch()?;
        match self.branches.get(index) {
            Some(branch) => branch.reify(inner),
            None => Err(Error::TemplateMismatch {
                expected: "branch of this union",
                found: "branch",
            }),
        }
    }
}

/// Values from any of `branches`. Earlier branches are considered simpler.
pub fn one_of<T: 'static>(branches: Vec<Strategy<T>>) -> Result<Strategy<T>> {
    let mut flattened = Vec::with_capacity(branches.len());
    for branch in branches {
        match branch.alternatives() {
            Some(alternatives) => flattened.extend(alternatives.iter().cloned()),
            None => flattened.push(branch),
        }
    }
    match flattened.len() {
        0 => Err(Error::invalid_argument("one_of requires at least one strategy")),
        1 => Ok(flattened.remove(0)),
        _ => Ok(Strategy::union(flattened)),
    }
}

type MapFn<T, U> = Arc<dyn Fn(T) -> Result<U> + Send + Sync>;

/// Reify through a function; the template space is the source's.
pub(crate) struct Mapped<T, U> {
    source: Strategy<T>,
    f: MapFn<T, U>,
}

impl<T, U> Mapped<T, U> {
    pub(crate) fn new<F>(source: Strategy<T>, f: F) -> Self
    where
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        Mapped {
            source,
            f: Arc::new(f),
        }
    }
}

impl<T: 'static, U> TemplateSpace for Mapped<T, U> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        self.source.draw_parameter(random)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        self.source.draw_template(random, parameter)
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        self.source.simplify(random, template)
    }

    fn template_upper_bound(&self) -> UpperBound {
        self.source.template_upper_bound()
    }
}

impl<T: 'static, U> SearchStrategy for Mapped<T, U> {
    type Value = U;

    fn reify(&self, template: &Template) -> Result<U> {
        (self.f)(self.source.reify(template)?)
    }
}

type FilterFn<T, U> = Arc<dyn Fn(T) -> Option<U> + Send + Sync>;

/// Values of the source accepted by a filter function.
///
/// Drawing retries up to `attempts` times, charging each retry to the
/// shared effort budget. Reifying a template the filter rejects walks that
/// template's simplifications for an accepted one before giving up with
/// `UnsatisfiableFilter`.
pub(crate) struct Filtered<T, U> {
    source: Strategy<T>,
    f: FilterFn<T, U>,
    attempts: usize,
}

impl<T, U> Clone for Filtered<T, U> {
    fn clone(&self) -> Self {
        Filtered {
            source: self.source.clone(),
            f: Arc::clone(&self.f),
            attempts: self.attempts,
        }
    }
}

impl<T: 'static, U: 'static> Filtered<T, U> {
    pub(crate) fn new<F>(source: Strategy<T>, f: F, attempts: usize) -> Self
    where
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
    {
        Filtered {
            source,
            f: Arc::new(f),
            attempts: attempts.max(1),
        }
    }

    fn accept(&self, template: &Template) -> Option<U> {
        self.source.reify(template).ok().and_then(|value| (self.f)(value))
    }
}

impl<T: 'static, U: 'static> TemplateSpace for Filtered<T, U> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        self.source.draw_parameter(random)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let mut template = self.source.draw_template(random, parameter);
        for _ in 1..self.attempts {
            if self.accept(&template).is_some() {
                break;
            }
            random.spend(1);
            template = self.source.draw_template(random, parameter);
        }
        template
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let filter = self.clone();
        Box::new(
            self.source
                .simplify(random, template)
                .filter(move |candidate| filter.accept(candidate).is_some()),
        )
    }

    fn template_upper_bound(&self) -> UpperBound {
        self.source.template_upper_bound()
    }
}

impl<T: 'static, U: 'static> SearchStrategy for Filtered<T, U> {
    type Value = U;

    fn reify(&self, template: &Template) -> Result<U> {
        let value = self.source.reify(template)?;
        if let Some(accepted) = (self.f)(value) {
            return Ok(accepted);
        }
        let mut random = Random::for_key(template);
        self.source
            .simplify(&mut random, template)
            .take(self.attempts)
            .find_map(|candidate| self.accept(&candidate))
            .ok_or(Error::UnsatisfiableFilter {
                attempts: self.attempts,
            })
    }
}

type BindFn<T, U> = Arc<dyn Fn(T) -> Strategy<U> + Send + Sync>;

/// Dependent composition. The template is `Pair(outer, inner)`.
pub(crate) struct Bound<T, U> {
    source: Strategy<T>,
    f: BindFn<T, U>,
}

impl<T, U> Clone for Bound<T, U> {
    fn clone(&self) -> Self {
        Bound {
            source: self.source.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<T: 'static, U: 'static> Bound<T, U> {
    pub(crate) fn new<F>(source: Strategy<T>, f: F) -> Self
    where
        F: Fn(T) -> Strategy<U> + Send + Sync + 'static,
    {
        Bound {
            source,
            f: Arc::new(f),
        }
    }

    fn child(&self, outer: &Template) -> Result<Strategy<U>> {
        Ok((self.f)(self.source.reify(outer)?))
    }
}

impl<T: 'static, U: 'static> TemplateSpace for Bound<T, U> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        self.source.draw_parameter(random)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let outer = self.source.draw_template(random, parameter);
        let inner = match self.child(&outer) {
            Ok(child) => {
                let child_parameter = child.draw_parameter(random);
                child.draw_template(random, &child_parameter)
            }
            Err(_) => Template::Unit,
        };
        Template::pair(outer, inner)
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let Ok((outer, inner)) = template.as_pair() else {
            return no_simplifications();
        };
        let (outer, inner) = (outer.clone(), inner.clone());

        // Simplifying the outer template may change which child applies; keep
        // the old inner template if it still fits, otherwise draw a new one.
        let bound = self.clone();
        let kept_inner = inner.clone();
        let mut local = random.split();
        let outer_moves = self
            .source
            .simplify(random, &outer)
            .filter_map(move |candidate| {
                let child = bound.child(&candidate).ok()?;
                let inner = if child.reify(&kept_inner).is_ok() {
                    kept_inner.clone()
                } else {
                    let parameter = child.draw_parameter(&mut local);
                    child.draw_template(&mut local, &parameter)
                };
                Some(Template::pair(candidate, inner))
            });

        let bound = self.clone();
        let mut local = random.split();
        let inner_moves = std::iter::once(()).flat_map(move |_| {
            let outer = outer.clone();
            let moves: Simplifications = match bound.child(&outer) {
                Ok(child) => Box::new(
                    child
                        .simplify(&mut local, &inner)
                        .map(move |candidate| Template::pair(outer.clone(), candidate)),
                ),
                Err(_) => no_simplifications(),
            };
            moves
        });

        Box::new(outer_moves.chain(inner_moves))
    }
}

impl<T: 'static, U: 'static> SearchStrategy for Bound<T, U> {
    type Value = U;

    fn reify(&self, template: &Template) -> Result<U> {
        let (outer, inner) = template.as_pair()?;
        self.child(outer)?.reify(inner)
    }
}

/// Independent random sources, each seeded from a drawn integer so it
/// shrinks like one.
pub fn randoms() -> Strategy<Random> {
    crate::numbers::integers().map(|seed| Random::from_seed(seed as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbers::integers_in;

    #[test]
    fn test_randoms_are_reproducible() {
        let strategy = randoms();
        let template = Template::branch(0, Template::Integer(17));
        let mut first = strategy.reify(&template).unwrap();
        let mut second = strategy.reify(&template).unwrap();
        assert_eq!(first.origin(), 17);
        assert_eq!(first.unit(), second.unit());
    }

    #[test]
    fn test_just_and_none() {
        let mut random = Random::from_seed(1);
        assert_eq!(just(7).example(&mut random).unwrap(), 7);
        assert_eq!(none().example(&mut random).unwrap(), ());
        assert_eq!(just(7).template_upper_bound(), UpperBound::Finite(1));
    }

    #[test]
    fn test_booleans_produce_both_values() {
        let strategy = booleans();
        let mut random = Random::from_seed(11);
        let values: Vec<bool> = (0..200).map(|_| strategy.example(&mut random).unwrap()).collect();
        assert!(values.contains(&true));
        assert!(values.contains(&false));
    }

    #[test]
    fn test_booleans_simplify_to_false() {
        let mut random = Random::from_seed(0);
        let candidates: Vec<Template> =
            booleans().simplify(&mut random, &Template::Bool(true)).collect();
        assert_eq!(candidates, vec![Template::Bool(false)]);
        assert_eq!(booleans().simplify(&mut random, &Template::Bool(false)).count(), 0);
    }

    #[test]
    fn test_sampled_from() {
        assert!(sampled_from(Vec::<i32>::new()).is_err());

        let single = sampled_from(vec!["only"]).unwrap();
        assert_eq!(single.template_upper_bound(), UpperBound::Finite(1));

        let strategy = sampled_from(vec!['a', 'b', 'c']).unwrap();
        let mut random = Random::from_seed(5);
        for _ in 0..50 {
            assert!("abc".contains(strategy.example(&mut random).unwrap()));
        }
        let candidates: Vec<Template> =
            strategy.simplify(&mut random, &Template::Index(2)).collect();
        assert_eq!(candidates, vec![Template::Index(0), Template::Index(1)]);
    }

    #[test]
    fn test_one_of_requires_branches() {
        assert!(one_of(Vec::<Strategy<i32>>::new()).is_err());
        let single = one_of(vec![just(1)]).unwrap();
        assert!(single.alternatives().is_none());
    }

    #[test]
    fn test_one_of_tries_earlier_branches_first() {
        let strategy = one_of(vec![just(0), integers_in(Some(10), Some(20)).unwrap()]).unwrap();
        let template = Template::branch(1, Template::Integer(15));
        let mut random = Random::from_seed(2);
        let candidates: Vec<Template> = strategy.simplify(&mut random, &template).collect();
        assert_eq!(candidates[0], Template::branch(0, Template::Unit));
        assert!(candidates[1..].iter().all(|c| matches!(c, Template::Branch(1, _))));
    }

    #[test]
    fn test_filter_only_yields_accepted_values() {
        let strategy = integers_in(Some(0), Some(100)).unwrap().filter(|n| n % 2 == 0);
        let mut random = Random::from_seed(4);
        for _ in 0..100 {
            match strategy.example(&mut random) {
                Ok(value) => assert_eq!(value % 2, 0),
                Err(error) => assert!(error.is_rejection()),
            }
        }
        let candidates: Vec<Template> =
            strategy.simplify(&mut random, &Template::Integer(40)).collect();
        assert!(!candidates.is_empty());
        for candidate in candidates {
            assert_eq!(strategy.reify(&candidate).unwrap() % 2, 0);
        }
    }

    #[test]
    fn test_unsatisfiable_filter_is_a_rejection() {
        let strategy = booleans().filter(|_| false);
        match strategy.reify(&Template::Bool(true)) {
            Err(error @ Error::UnsatisfiableFilter { .. }) => assert!(error.is_rejection()),
            other => panic!("Expected an unsatisfiable filter, got: {other:?}"),
        }
    }

    #[test]
    fn test_filter_retries_charge_the_budget() {
        let strategy = booleans().filter(|_| false);
        let mut random = Random::from_seed(4);
        let parameter = strategy.draw_parameter(&mut random);
        let _ = strategy.draw_template(&mut random, &parameter);
        assert!(random.effort() > 0);
    }

    #[test]
    fn test_flat_map_dependent_generation() {
        let strategy = integers_in(Some(1), Some(5))
            .unwrap()
            .flat_map(|n| integers_in(Some(0), Some(n)).unwrap().map(move |k| (n, k)));
        let mut random = Random::from_seed(8);
        for _ in 0..100 {
            let (n, k) = strategy.example(&mut random).unwrap();
            assert!((1..=5).contains(&n));
            assert!(k <= n);
        }
    }

    #[test]
    fn test_flat_map_simplifies_outer_first() {
        let strategy = integers_in(Some(1), Some(5))
            .unwrap()
            .flat_map(|n| integers_in(Some(0), Some(n)).unwrap());
        let template = Template::pair(Template::Integer(4), Template::Integer(3));
        let mut random = Random::from_seed(1);
        let candidates: Vec<Template> = strategy.simplify(&mut random, &template).collect();
        assert_eq!(candidates[0].as_pair().unwrap().0, &Template::Integer(1));
        for candidate in &candidates {
            let (outer, inner) = candidate.as_pair().unwrap();
            assert!(inner.as_integer().unwrap() <= outer.as_integer().unwrap());
        }
        assert!(candidates
            .iter()
            .any(|c| c.as_pair().unwrap().0 == &Template::Integer(4)));
    }
}
