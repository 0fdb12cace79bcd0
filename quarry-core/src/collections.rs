//! Products and bounded collections: tuples, lists, sets and mappings.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::data::Random;
use crate::error::{BoxError, Error, Result};
use crate::settings::Settings;
use crate::strategy::{no_simplifications, SearchStrategy, Simplifications, Strategy, TemplateSpace};
use crate::template::{Parameter, Template, UpperBound};

/// Size constraints for a collection strategy.
///
/// `average_size` is only a hint for how long drawn collections tend to be.
/// When it is absent the midpoint of `min_size..=max_size` is used, or the
/// ambient `Settings::average_list_length` when there is no maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeBounds {
    pub min_size: Option<usize>,
    pub average_size: Option<f64>,
    pub max_size: Option<usize>,
}

impl SizeBounds {
    pub fn new() -> Self {
        SizeBounds::default()
    }

    /// Exactly `size` elements.
    pub fn exactly(size: usize) -> Self {
        SizeBounds::new().min(size).max(size)
    }

    pub fn min(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self
    }

    pub fn max(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn average(mut self, size: f64) -> Self {
        self.average_size = Some(size);
        self
    }

    /// Reject contradictory or meaningless bounds.
    pub fn validate(&self) -> Result<()> {
        if let Some(average) = self.average_size {
            if average.is_nan() || average < 0.0 || average.is_infinite() {
                return Err(Error::invalid_argument(format!(
                    "Invalid size average_size {average}"
                )));
            }
        }
        if let Some(max) = self.max_size {
            if let Some(min) = self.min_size {
                if max < min {
                    return Err(Error::invalid_argument(format!(
                        "Cannot have max_size={max} < min_size={min}"
                    )));
                }
            }
            if let Some(average) = self.average_size {
                if (max as f64) < average {
                    return Err(Error::invalid_argument(format!(
                        "Cannot have max_size={max} < average_size={average}"
                    )));
                }
            }
        }
        if let (Some(average), Some(min)) = (self.average_size, self.min_size) {
            if average < min as f64 {
                return Err(Error::invalid_argument(format!(
                    "Cannot have average_size={average} < min_size={min}"
                )));
            }
        }
        Ok(())
    }

    fn lower(&self) -> usize {
        self.min_size.unwrap_or(0)
    }

    fn resolved_average(&self) -> f64 {
        match (self.average_size, self.max_size) {
            (Some(average), _) => average,
            (None, Some(max)) => (self.lower() + max) as f64 * 0.5,
            (None, None) => Settings::current().average_list_length,
        }
    }
}

type BuildFn<T> = Arc<dyn Fn(&[Template]) -> Result<T> + Send + Sync>;

/// A fixed-arity product. The template is a sequence holding one child
/// template per position.
struct Tupled<T> {
    spaces: Arc<[Arc<dyn TemplateSpace>]>,
    build: BuildFn<T>,
}

impl<T> Tupled<T> {
    fn new<F>(spaces: Vec<Arc<dyn TemplateSpace>>, build: F) -> Self
    where
        F: Fn(&[Template]) -> Result<T> + Send + Sync + 'static,
    {
        Tupled {
            spaces: spaces.into(),
            build: Arc::new(build),
        }
    }
}

impl<T> TemplateSpace for Tupled<T> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Composite(self.spaces.iter().map(|space| space.draw_parameter(random)).collect())
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        Template::Sequence(
            self.spaces
                .iter()
                .enumerate()
                .map(|(index, space)| space.draw_template(random, parameter.part(index)))
                .collect(),
        )
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let items = match template.as_sequence() {
            Ok(items) if items.len() == self.spaces.len() => items.to_vec(),
            _ => return no_simplifications(),
        };
        let spaces = Arc::clone(&self.spaces);
        let mut local = random.split();
        Box::new((0..items.len()).flat_map(move |index| {
            let base = items.clone();
            let candidates = spaces[index].simplify(&mut local, &base[index]);
            candidates.map(move |candidate| {
                let mut next = base.clone();
                next[index] = candidate;
                Template::Sequence(next)
            })
        }))
    }

    fn template_upper_bound(&self) -> UpperBound {
        self.spaces.iter().map(|space| space.template_upper_bound()).product()
    }
}

impl<T> SearchStrategy for Tupled<T> {
    type Value = T;

    fn reify(&self, template: &Template) -> Result<T> {
        let items = template.as_sequence()?;
        if items.len() != self.spaces.len() {
            return Err(Error::TemplateMismatch {
                expected: "sequence of the tuple's arity",
                found: "sequence",
            });
        }
        (self.build)(items)
    }
}

/// A Rust tuple of strategies that can be combined into a strategy of tuples.
pub trait StrategyTuple {
    type Value;

    fn into_strategy(self) -> Strategy<Self::Value>;
}

macro_rules! strategy_tuple {
    ($($name:ident $index:tt),+) => {
        impl<$($name: 'static),+> StrategyTuple for ($(Strategy<$name>,)+) {
            type Value = ($($name,)+);

            fn into_strategy(self) -> Strategy<Self::Value> {
                let spaces: Vec<Arc<dyn TemplateSpace>> = vec![$(self.$index.space()),+];
                let strategies = self;
                Strategy::new(Tupled::new(spaces, move |items: &[Template]| {
                    Ok(($(strategies.$index.reify(&items[$index])?,)+))
                }))
            }
        }
    };
}

strategy_tuple!(A 0);
strategy_tuple!(A 0, B 1);
strategy_tuple!(A 0, B 1, C 2);
strategy_tuple!(A 0, B 1, C 2, D 3);
strategy_tuple!(A 0, B 1, C 2, D 3, E 4);
strategy_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
strategy_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
strategy_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

/// Tuples whose positions are drawn from the corresponding strategies.
pub fn tuples<S: StrategyTuple>(strategies: S) -> Strategy<S::Value> {
    strategies.into_strategy()
}

/// Fixed-length vectors whose positions are drawn from the corresponding
/// strategies.
pub fn tuples_of<T: 'static>(strategies: Vec<Strategy<T>>) -> Strategy<Vec<T>> {
    let spaces = strategies.iter().map(Strategy::space).collect();
    Strategy::new(Tupled::new(spaces, move |items: &[Template]| {
        strategies
            .iter()
            .zip(items)
            .map(|(strategy, item)| strategy.reify(item))
            .collect()
    }))
}

/// Bound on the number of sequences of length `min..=max` over an
/// alphabet of `element` templates.
fn sequences_bound(element: UpperBound, min: usize, max: Option<usize>) -> UpperBound {
    match (element, max) {
        (UpperBound::Finite(0), _) => UpperBound::Finite(u64::from(min == 0)),
        (_, None) => UpperBound::Infinite,
        (UpperBound::Finite(1), Some(max)) => UpperBound::Finite((max - min) as u64 + 1),
        (element, Some(max)) => {
            let mut total = UpperBound::Finite(0);
            for length in min..=max {
                total = total + element.pow(length as u64);
                if !total.is_finite() {
                    break;
                }
            }
            total
        }
    }
}

/// Bound on the number of subsets of at most `max` elements.
fn subsets_bound(element: UpperBound, max: Option<usize>) -> UpperBound {
    let UpperBound::Finite(count) = element else {
        return UpperBound::Infinite;
    };
    match max {
        Some(max) if (max as u64) < count => {
            let mut total: u128 = 1;
            let mut choose: u128 = 1;
            for k in 1..=max as u128 {
                choose = match choose.checked_mul(count as u128 - k + 1) {
                    Some(product) => product / k,
                    None => return UpperBound::Infinite,
                };
                total = total.saturating_add(choose);
                if total > u64::MAX as u128 {
                    return UpperBound::Infinite;
                }
            }
            UpperBound::Finite(total as u64)
        }
        _ => UpperBound::Finite(2).pow(count),
    }
}

/// Positions and widths of the chunks to try deleting, widest first.
fn chunk_deletions(len: usize, min: usize) -> Vec<(usize, usize)> {
    let mut chunks = Vec::new();
    if len <= min {
        return chunks;
    }
    let spare = len - min;
    let mut size = 1usize << (usize::BITS - 1 - spare.leading_zeros());
    while size >= 1 {
        let mut start = 0;
        while start + size <= len {
            // Deleting the tail down to the minimum is already the first move.
            if !(start + size == len && start == min) {
                chunks.push((start, size));
            }
            start += size;
        }
        size /= 2;
    }
    chunks
}

/// Shared length handling for lists and sets.
#[derive(Debug, Clone, Copy)]
struct Lengths {
    min: usize,
    max: Option<usize>,
    average: f64,
}

impl Lengths {
    fn new(sizes: &SizeBounds) -> Self {
        Lengths {
            min: sizes.lower(),
            max: sizes.max_size,
            average: sizes.resolved_average(),
        }
    }

    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        let extra = (self.average - self.min as f64).max(0.0);
        Parameter::Value(-(1.0 - random.unit()).ln() * extra)
    }

    fn draw(&self, random: &mut Random, parameter: &Parameter) -> usize {
        let extra = (self.average - self.min as f64).max(0.0);
        let extra = parameter.value_or(extra).max(0.0);
        let drawn = random.geometric(1.0 / (1.0 + extra));
        let length = self.min.saturating_add(usize::try_from(drawn).unwrap_or(usize::MAX));
        match self.max {
            Some(max) => length.min(max),
            None => length,
        }
    }

    fn admits(&self, length: usize) -> bool {
        length >= self.min && self.max.map_or(true, |max| length <= max)
    }
}

/// Variable-length lists of independently drawn elements.
struct ListStrategy<T> {
    element: Strategy<T>,
    lengths: Lengths,
}

impl<T: 'static> TemplateSpace for ListStrategy<T> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Composite(vec![
            self.lengths.draw_parameter(random),
            self.element.draw_parameter(random),
        ])
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let length = self.lengths.draw(random, parameter.part(0));
        let element = parameter.part(1);
        Template::Sequence(
            (0..length)
                .map(|_| self.element.draw_template(random, element))
                .collect(),
        )
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let Ok(items) = template.as_sequence() else {
            return no_simplifications();
        };
        let items = items.to_vec();
        let min = self.lengths.min;

        let cut = (items.len() > min).then(|| Template::Sequence(items[..min].to_vec()));

        let source = items.clone();
        let deletions = chunk_deletions(items.len(), min)
            .into_iter()
            .map(move |(start, size)| {
                let mut next = source.clone();
                next.drain(start..start + size);
                Template::Sequence(next)
            });

        let element = self.element.clone();
        let mut local = random.split();
        let elements = (0..items.len()).flat_map(move |index| {
            let base = items.clone();
            let candidates = element.simplify(&mut local, &base[index]);
            candidates.map(move |candidate| {
                let mut next = base.clone();
                next[index] = candidate;
                Template::Sequence(next)
            })
        });

        Box::new(cut.into_iter().chain(deletions).chain(elements))
    }

    fn template_upper_bound(&self) -> UpperBound {
        sequences_bound(self.element.template_upper_bound(), self.lengths.min, self.lengths.max)
    }
}

impl<T: 'static> SearchStrategy for ListStrategy<T> {
    type Value = Vec<T>;

    fn reify(&self, template: &Template) -> Result<Vec<T>> {
        let items = template.as_sequence()?;
        if !self.lengths.admits(items.len()) {
            return Err(Error::TemplateMismatch {
                expected: "sequence within the size bounds",
                found: "sequence",
            });
        }
        items.iter().map(|item| self.element.reify(item)).collect()
    }
}

/// Lists over a strategy with a single possible template: only the length
/// is drawn.
struct SingleElementList<T> {
    element: Strategy<T>,
    element_template: Template,
    length: Strategy<i64>,
}

impl<T: 'static> TemplateSpace for SingleElementList<T> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        self.length.draw_parameter(random)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        self.length.draw_template(random, parameter)
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        self.length.simplify(random, template)
    }

    fn template_upper_bound(&self) -> UpperBound {
        self.length.template_upper_bound()
    }
}

impl<T: 'static> SearchStrategy for SingleElementList<T> {
    type Value = Vec<T>;

    fn reify(&self, template: &Template) -> Result<Vec<T>> {
        let length = usize::try_from(self.length.reify(template)?).map_err(|_| {
            Error::TemplateMismatch {
                expected: "non-negative length",
                found: "integer",
            }
        })?;
        (0..length)
            .map(|_| self.element.reify(&self.element_template))
            .collect()
    }
}

fn single_element_list<T: 'static>(
    elements: Strategy<T>,
    length: Strategy<i64>,
) -> Strategy<Vec<T>> {
    let mut random = Random::from_seed(0);
    let parameter = elements.draw_parameter(&mut random);
    let element_template = elements.draw_template(&mut random, &parameter);
    Strategy::new(SingleElementList {
        element: elements,
        element_template,
        length,
    })
}

/// A length as a length-strategy bound, saturating at `i64::MAX`.
fn length_bound(length: usize) -> i64 {
    i64::try_from(length).unwrap_or(i64::MAX)
}

/// Build a list strategy from already validated bounds.
fn list_strategy<T: 'static>(
    elements: Strategy<T>,
    sizes: SizeBounds,
) -> Result<Strategy<Vec<T>>> {
    let lengths = Lengths::new(&sizes);
    match (elements.template_upper_bound(), lengths.max) {
        (UpperBound::Finite(0), _) if lengths.min > 0 => Err(Error::invalid_argument(
            "Cannot create non-empty lists without an element type",
        )),
        (UpperBound::Finite(1), Some(max)) => {
            let length = crate::numbers::integers_in(
                Some(length_bound(lengths.min)),
                Some(length_bound(max)),
            )?;
            Ok(single_element_list(elements, length))
        }
        _ => Ok(unbounded_above(elements, lengths)),
    }
}

/// Lists with no upper size bound beyond what `lengths` says. Construction
/// cannot fail here.
fn unbounded_above<T: 'static>(elements: Strategy<T>, lengths: Lengths) -> Strategy<Vec<T>> {
    match elements.template_upper_bound() {
        UpperBound::Finite(0) => Strategy::new(ListStrategy {
            element: elements,
            lengths: Lengths {
                max: Some(0),
                ..lengths
            },
        }),
        UpperBound::Finite(1) if lengths.max.is_none() => {
            let length = crate::numbers::integers_from(
                length_bound(lengths.min),
                lengths.average - lengths.min as f64,
            );
            single_element_list(elements, length)
        }
        _ => Strategy::new(ListStrategy {
            element: elements,
            lengths,
        }),
    }
}

/// Lists of any length, sized by the current settings.
pub(crate) fn any_lists<T: 'static>(elements: Strategy<T>) -> Strategy<Vec<T>> {
    unbounded_above(elements, Lengths::new(&SizeBounds::new()))
}

/// Lists of values drawn from `elements`, with lengths inside `sizes`.
pub fn lists<T: 'static>(elements: Strategy<T>, sizes: SizeBounds) -> Result<Strategy<Vec<T>>> {
    sizes.validate()?;
    list_strategy(elements, sizes)
}

/// Collections of distinct element templates. The template is kept sorted
/// and free of duplicates.
struct SetStrategy<T, C> {
    element: Strategy<T>,
    lengths: Lengths,
    _collection: PhantomData<fn() -> C>,
}

fn normalized(mut items: Vec<Template>) -> Vec<Template> {
    items.sort();
    items.dedup();
    items
}

impl<T: 'static, C> TemplateSpace for SetStrategy<T, C> {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Composite(vec![
            self.lengths.draw_parameter(random),
            self.element.draw_parameter(random),
        ])
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let length = self.lengths.draw(random, parameter.part(0));
        let element = parameter.part(1);
        let items: BTreeSet<Template> = (0..length)
            .map(|_| self.element.draw_template(random, element))
            .collect();
        Template::Sequence(items.into_iter().collect())
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let Ok(items) = template.as_sequence() else {
            return no_simplifications();
        };
        let items = items.to_vec();
        let min = self.lengths.min;

        let source = items.clone();
        let deletions = chunk_deletions(items.len(), min)
            .into_iter()
            .map(move |(start, size)| {
                let mut next = source.clone();
                next.drain(start..start + size);
                Template::Sequence(next)
            });
        let cut = (items.len() > min).then(|| Template::Sequence(items[..min].to_vec()));

        let element = self.element.clone();
        let mut local = random.split();
        let original = items.clone();
        let elements = (0..items.len()).flat_map(move |index| {
            let base = original.clone();
            let candidates = element.simplify(&mut local, &base[index]);
            candidates.filter_map(move |candidate| {
                let mut next = base.clone();
                next[index] = candidate;
                let next = normalized(next);
                (next.len() >= min && next != base).then_some(Template::Sequence(next))
            })
        });

        Box::new(cut.into_iter().chain(deletions).chain(elements))
    }

    fn template_upper_bound(&self) -> UpperBound {
        subsets_bound(self.element.template_upper_bound(), self.lengths.max)
    }
}

impl<T: 'static, C: FromIterator<T>> SearchStrategy for SetStrategy<T, C> {
    type Value = C;

    fn reify(&self, template: &Template) -> Result<C> {
        let items = template.as_sequence()?;
        if self.lengths.max.map_or(false, |max| items.len() > max) {
            return Err(Error::TemplateMismatch {
                expected: "sequence within the size bounds",
                found: "sequence",
            });
        }
        items.iter().map(|item| self.element.reify(item)).collect()
    }
}

fn set_strategy<T, C>(
    elements: Strategy<T>,
    sizes: SizeBounds,
    len: fn(&C) -> usize,
) -> Result<Strategy<C>>
where
    T: 'static,
    C: FromIterator<T> + 'static,
{
    sizes.validate()?;
    let min = sizes.lower();
    let bound = elements.template_upper_bound();
    if bound.less_than(min) {
        return Err(Error::invalid_argument(format!(
            "Cannot generate sets of size {min} from a strategy with no more than {bound} \
             distinct values"
        )));
    }
    let lengths = Lengths::new(&sizes);
    let strategy = Strategy::new(SetStrategy::<T, C> {
        element: elements,
        lengths,
        _collection: PhantomData,
    });
    if min == 0 {
        Ok(strategy)
    } else {
        Ok(strategy.filter(move |set| len(set) >= min))
    }
}

/// Hash sets of values drawn from `elements`.
///
/// A `min_size` larger than the number of distinct templates `elements`
/// can produce is rejected before anything is drawn.
pub fn sets<T>(elements: Strategy<T>, sizes: SizeBounds) -> Result<Strategy<HashSet<T>>>
where
    T: Eq + Hash + 'static,
{
    set_strategy(elements, sizes, HashSet::len)
}

/// Ordered sets of values drawn from `elements`. Unlike `HashSet`, the
/// result is itself hashable and can be an element of another set.
pub fn frozensets<T>(elements: Strategy<T>, sizes: SizeBounds) -> Result<Strategy<BTreeSet<T>>>
where
    T: Ord + 'static,
{
    set_strategy(elements, sizes, BTreeSet::len)
}

/// A mapping type that dictionaries can be folded into.
pub trait MapLike<K, V>: Sized {
    fn empty() -> Self;

    /// Insert or replace the entry for `key`.
    fn put(&mut self, key: K, value: V);

    fn entries(&self) -> usize;
}

impl<K: Eq + Hash, V> MapLike<K, V> for HashMap<K, V> {
    fn empty() -> Self {
        HashMap::new()
    }

    fn put(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn entries(&self) -> usize {
        self.len()
    }
}

impl<K: Ord, V> MapLike<K, V> for BTreeMap<K, V> {
    fn empty() -> Self {
        BTreeMap::new()
    }

    fn put(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn entries(&self) -> usize {
        self.len()
    }
}

/// Insertion-ordered association list.
impl<K: PartialEq, V> MapLike<K, V> for Vec<(K, V)> {
    fn empty() -> Self {
        Vec::new()
    }

    fn put(&mut self, key: K, value: V) {
        match self.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.push((key, value)),
        }
    }

    fn entries(&self) -> usize {
        self.len()
    }
}

/// Mappings of type `M` with keys from `keys` and values from `values`.
///
/// Drawn key/value pairs are folded into the mapping until `max_size`
/// distinct keys are present; draws ending up below `min_size` keys after
/// collapsing duplicates are rejected.
pub fn dictionaries_as<M, K, V>(
    keys: Strategy<K>,
    values: Strategy<V>,
    sizes: SizeBounds,
) -> Result<Strategy<M>>
where
    M: MapLike<K, V> + 'static,
    K: 'static,
    V: 'static,
{
    sizes.validate()?;
    let min = sizes.lower();
    let max = sizes.max_size;

    let mut pairs = SizeBounds {
        min_size: sizes.min_size,
        average_size: sizes.average_size,
        max_size: None,
    };
    if max == Some(0) {
        pairs = SizeBounds::exactly(0);
    } else if sizes.min_size.is_some() {
        pairs.average_size = Some(pairs.average_size.unwrap_or(0.0).max(2.0 * min as f64));
    }

    let entries = list_strategy(tuples((keys, values)), pairs)?;
    Ok(entries.filter_map(move |entries| {
        let mut mapping = M::empty();
        for (key, value) in entries {
            mapping.put(key, value);
            if max.map_or(false, |max| mapping.entries() >= max) {
                break;
            }
        }
        (mapping.entries() >= min).then_some(mapping)
    }))
}

/// Hash maps with keys from `keys` and values from `values`.
pub fn dictionaries<K, V>(
    keys: Strategy<K>,
    values: Strategy<V>,
    sizes: SizeBounds,
) -> Result<Strategy<HashMap<K, V>>>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    dictionaries_as(keys, values, sizes)
}

/// Mappings with exactly the given keys, each value drawn from its own
/// strategy. The mapping type decides iteration order: a `Vec` of pairs
/// keeps the order of `entries`.
pub fn fixed_dictionaries<K, V, M>(entries: Vec<(K, Strategy<V>)>) -> Strategy<M>
where
    K: Clone + Send + Sync + 'static,
    V: 'static,
    M: MapLike<K, V> + 'static,
{
    let (keys, values): (Vec<K>, Vec<Strategy<V>>) = entries.into_iter().unzip();
    tuples_of(values).map(move |values| {
        let mut mapping = M::empty();
        for (key, value) in keys.iter().cloned().zip(values) {
            mapping.put(key, value);
        }
        mapping
    })
}

/// Values built by calling `constructor` with drawn positional arguments
/// and a mapping of drawn keyword arguments. A constructor failure during
/// reification surfaces as `Error::Construction`.
pub fn builds<P, K, V, M, R, E, F>(
    positional: P,
    keyword: Vec<(K, Strategy<V>)>,
    constructor: F,
) -> Strategy<R>
where
    P: StrategyTuple,
    P::Value: 'static,
    K: Clone + Send + Sync + 'static,
    V: 'static,
    M: MapLike<K, V> + 'static,
    R: 'static,
    E: Into<BoxError>,
    F: Fn(P::Value, M) -> std::result::Result<R, E> + Send + Sync + 'static,
{
    let arguments = tuples((positional.into_strategy(), fixed_dictionaries::<K, V, M>(keyword)));
    arguments.try_map(move |(args, kwargs)| constructor(args, kwargs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{booleans, just};
    use crate::numbers::{integers, integers_in};

    fn draw<T: 'static>(strategy: &Strategy<T>, seed: u64, count: usize) -> Vec<T> {
        let mut random = Random::from_seed(seed);
        (0..count)
            .filter_map(|_| strategy.example(&mut random).ok())
            .collect()
    }

    #[test]
    fn test_size_bounds_validation() {
        assert!(SizeBounds::new().validate().is_ok());
        assert!(SizeBounds::new().min(3).max(2).validate().is_err());
        assert!(SizeBounds::new().max(2).average(3.0).validate().is_err());
        assert!(SizeBounds::new().min(3).average(1.0).validate().is_err());
        assert!(SizeBounds::new().average(f64::NAN).validate().is_err());
        assert!(SizeBounds::new().average(-1.0).validate().is_err());
        assert!(SizeBounds::exactly(4).validate().is_ok());
    }

    #[test]
    fn test_tuples_simplify_one_position_at_a_time() {
        let strategy = tuples((booleans(), booleans()));
        let template = Template::Sequence(vec![Template::Bool(true), Template::Bool(true)]);
        let mut random = Random::from_seed(0);
        let candidates: Vec<Template> = strategy.simplify(&mut random, &template).collect();
        assert_eq!(
            candidates,
            vec![
                Template::Sequence(vec![Template::Bool(false), Template::Bool(true)]),
                Template::Sequence(vec![Template::Bool(true), Template::Bool(false)]),
            ]
        );
        assert_eq!(strategy.template_upper_bound(), UpperBound::Finite(4));
        assert_eq!(strategy.reify(&template).unwrap(), (true, true));
    }

    #[test]
    fn test_tuples_of() {
        let strategy = tuples_of(vec![just(1), just(2), just(3)]);
        assert_eq!(draw(&strategy, 1, 1), vec![vec![1, 2, 3]]);
        assert_eq!(
            tuples_of(Vec::<Strategy<i64>>::new()).template_upper_bound(),
            UpperBound::Finite(1)
        );
    }

    #[test]
    fn test_list_lengths_respect_bounds() {
        let strategy = lists(integers(), SizeBounds::new().min(2).max(5)).unwrap();
        for list in draw(&strategy, 3, 200) {
            assert!((2..=5).contains(&list.len()), "length {}", list.len());
        }
    }

    #[test]
    fn test_list_of_single_valued_strategy() {
        let strategy = lists(just("x"), SizeBounds::new().min(1).max(3)).unwrap();
        assert_eq!(strategy.template_upper_bound(), UpperBound::Finite(3));
        for list in draw(&strategy, 5, 50) {
            assert!((1..=3).contains(&list.len()));
            assert!(list.iter().all(|x| *x == "x"));
        }
    }

    #[test]
    fn test_empty_lists_only() {
        let strategy = lists(integers(), SizeBounds::exactly(0)).unwrap();
        assert!(draw(&strategy, 1, 20).iter().all(Vec::is_empty));
        assert_eq!(strategy.template_upper_bound(), UpperBound::Finite(1));
    }

    #[test]
    fn test_list_simplify_order() {
        let digits = integers_in(Some(0), Some(9)).unwrap();
        let strategy = lists(digits, SizeBounds::new().min(1)).unwrap();
        let template = Template::Sequence((1..=4).map(Template::Integer).collect());
        let mut random = Random::from_seed(0);
        let candidates: Vec<Template> = strategy.simplify(&mut random, &template).collect();

        assert_eq!(candidates[0], Template::Sequence(vec![Template::Integer(1)]));
        let lengths: Vec<usize> = candidates
            .iter()
            .map(|c| c.as_sequence().unwrap().len())
            .collect();
        let first_full = lengths.iter().position(|&len| len == 4).unwrap();
        assert!(lengths[..first_full].windows(2).all(|w| w[0] <= w[1]));
        assert!(lengths[first_full..].iter().all(|&len| len == 4));
        assert!(candidates.iter().all(|c| !c.as_sequence().unwrap().is_empty()));
    }

    #[test]
    fn test_sets_reject_impossible_min_size() {
        match sets(booleans(), SizeBounds::new().min(3)) {
            Err(Error::InvalidArgument { .. }) => {}
            other => panic!("Expected invalid argument, got: {other:?}"),
        }
        assert!(sets(booleans(), SizeBounds::new().min(2)).is_ok());
    }

    #[test]
    fn test_sets_are_within_bounds() {
        let elements = integers_in(Some(0), Some(50)).unwrap();
        let strategy = sets(elements, SizeBounds::new().min(2).max(6)).unwrap();
        for set in draw(&strategy, 9, 100) {
            assert!((2..=6).contains(&set.len()));
        }
        let nested = frozensets(
            frozensets(booleans(), SizeBounds::new()).unwrap(),
            SizeBounds::new().max(3),
        )
        .unwrap();
        assert!(draw(&nested, 2, 20).iter().all(|set| set.len() <= 3));
    }

    #[test]
    fn test_set_bounds() {
        assert_eq!(subsets_bound(UpperBound::Finite(2), None), UpperBound::Finite(4));
        assert_eq!(subsets_bound(UpperBound::Finite(4), Some(1)), UpperBound::Finite(5));
        assert_eq!(subsets_bound(UpperBound::Infinite, Some(1)), UpperBound::Infinite);
    }

    #[test]
    fn test_dictionaries_respect_bounds() {
        let strategy = dictionaries(
            integers_in(Some(0), Some(20)).unwrap(),
            booleans(),
            SizeBounds::new().min(1).max(4),
        )
        .unwrap();
        for map in draw(&strategy, 4, 100) {
            assert!((1..=4).contains(&map.len()));
        }
        let empty = dictionaries(integers(), booleans(), SizeBounds::exactly(0)).unwrap();
        assert!(draw(&empty, 4, 10).iter().all(HashMap::is_empty));
    }

    #[test]
    fn test_fixed_dictionaries_keep_keys() {
        let strategy: Strategy<Vec<(&str, i64)>> =
            fixed_dictionaries(vec![("b", just(1)), ("a", integers_in(Some(0), Some(3)).unwrap())]);
        for map in draw(&strategy, 6, 20) {
            let keys: Vec<&str> = map.iter().map(|(k, _)| *k).collect();
            assert_eq!(keys, vec!["b", "a"]);
        }
    }

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i64,
        label: Option<bool>,
    }

    #[test]
    fn test_builds() {
        let strategy = builds(
            (integers_in(Some(0), Some(9)).unwrap(),),
            vec![("label", booleans())],
            |(x,), keywords: BTreeMap<&str, bool>| {
                if x == 7 {
                    Err("seven is not allowed")
                } else {
                    Ok(Point {
                        x,
                        label: keywords.get("label").copied(),
                    })
                }
            },
        );
        let mut random = Random::from_seed(12);
        for _ in 0..50 {
            match strategy.example(&mut random) {
                Ok(point) => {
                    assert!(point.x != 7);
                    assert!(point.label.is_some());
                }
                Err(Error::Construction(source)) => {
                    assert_eq!(source.to_string(), "seven is not allowed")
                }
                Err(other) => panic!("Unexpected error: {other:?}"),
            }
        }
    }
}
