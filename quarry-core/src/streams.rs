//! Endless, lazily extended streams of values.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::RngCore;

use crate::data::Random;
use crate::error::Result;
use crate::strategy::{no_simplifications, SearchStrategy, Simplifications, Strategy, TemplateSpace};
use crate::template::{Parameter, Template};

/// Number of positions a stream template records when it is first
/// simplified.
const MATERIALIZED_PREFIX: usize = 10;

/// Template of the element at `index` of the stream seeded with `seed`.
fn element_template<T: 'static>(
    element: &Strategy<T>,
    parameter: &Parameter,
    seed: u64,
    index: usize,
) -> Template {
    let mut random = Random::for_key(&(seed, index));
    element.draw_template(&mut random, parameter)
}

fn element_parameter<T: 'static>(element: &Strategy<T>, seed: u64) -> Parameter {
    element.draw_parameter(&mut Random::from_seed(seed))
}

/// An endless sequence of values.
///
/// Position `i` is determined by the stream's seed and `i`, or by the
/// recorded prefix of the template the stream was reified from. Reading
/// a position records its template; recorded templates never change, so
/// values already read stay the same however far the stream is extended.
pub struct Stream<T> {
    element: Strategy<T>,
    seed: u64,
    parameter: Parameter,
    recorded: Arc<[Template]>,
    read: Mutex<Vec<Template>>,
}

impl<T: 'static> Stream<T> {
    fn new(element: Strategy<T>, seed: u64, prefix: &[Template]) -> Self {
        let parameter = element_parameter(&element, seed);
        Stream {
            element,
            seed,
            parameter,
            recorded: prefix.into(),
            read: Mutex::new(prefix.to_vec()),
        }
    }

    fn templates(&self) -> MutexGuard<'_, Vec<Template>> {
        self.read.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn template_at(&self, index: usize) -> Template {
        let mut read = self.templates();
        while read.len() <= index {
            let next = element_template(&self.element, &self.parameter, self.seed, read.len());
            read.push(next);
        }
        read[index].clone()
    }

    /// The value at `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        let template = self.template_at(index);
        self.element.reify(&template)
    }

    /// Iterate over the stream from the start. The iterator never ends.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        (0..).map(move |index| self.get(index))
    }

    /// Number of positions read or recorded so far.
    pub fn len_read(&self) -> usize {
        self.templates().len()
    }

    /// The template of this stream, including every position read so far.
    pub fn template(&self) -> Template {
        Template::Stream {
            seed: self.seed,
            prefix: self.templates().clone(),
        }
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        let read = self
            .read
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        Stream {
            element: self.element.clone(),
            seed: self.seed,
            parameter: self.parameter.clone(),
            recorded: Arc::clone(&self.recorded),
            read: Mutex::new(read),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("seed", &self.seed)
            .field("recorded", &self.recorded.len())
            .finish_non_exhaustive()
    }
}

/// Streams are equal when they come from the same seed and recorded prefix.
impl<T> PartialEq for Stream<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed && self.recorded == other.recorded
    }
}

struct StreamStrategy<T> {
    element: Strategy<T>,
}

impl<T: 'static> TemplateSpace for StreamStrategy<T> {
    fn draw_parameter(&self, _random: &mut Random) -> Parameter {
        Parameter::Unit
    }

    fn draw_template(&self, random: &mut Random, _parameter: &Parameter) -> Template {
        Template::Stream {
            seed: random.next_u64(),
            prefix: Vec::new(),
        }
    }

    fn simplify(&self, random: &mut Random, template: &Template) -> Simplifications {
        let Ok((seed, prefix)) = template.as_stream() else {
            return no_simplifications();
        };

        // An unrecorded prefix is pinned first so its positions can be
        // simplified individually; the pinned stream reads the same values.
        if prefix.len() < MATERIALIZED_PREFIX {
            let parameter = element_parameter(&self.element, seed);
            let mut pinned = prefix.to_vec();
            while pinned.len() < MATERIALIZED_PREFIX {
                pinned.push(element_template(&self.element, &parameter, seed, pinned.len()));
            }
            return Box::new(std::iter::once(Template::Stream { seed, prefix: pinned }));
        }

        let prefix = prefix.to_vec();
        let element = self.element.clone();
        let mut local = random.split();
        Box::new((0..prefix.len()).flat_map(move |index| {
            let base = prefix.clone();
            let candidates = element.simplify(&mut local, &base[index]);
            candidates.map(move |candidate| {
                let mut next = base.clone();
                next[index] = candidate;
                Template::Stream { seed, prefix: next }
            })
        }))
    }
}

impl<T: 'static> SearchStrategy for StreamStrategy<T> {
    type Value = Stream<T>;

    fn reify(&self, template: &Template) -> Result<Stream<T>> {
        let (seed, prefix) = template.as_stream()?;
        Ok(Stream::new(self.element.clone(), seed, prefix))
    }
}

/// Endless streams of values drawn from `elements`.
pub fn streaming<T: 'static>(elements: Strategy<T>) -> Strategy<Stream<T>> {
    Strategy::new(StreamStrategy { element: elements })
}
