//! Search for failing examples and greedy minimization of what is found.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::data::Random;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::strategy::{SearchStrategy, Strategy, TemplateSpace};
use crate::template::Template;

/// Why shrinking stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A full simplification pass found nothing that still fails.
    Converged,
    /// `max_shrinks` simplifications were accepted.
    ShrinkLimit,
    /// `max_shrink_attempts` candidates were evaluated.
    AttemptLimit,
    /// The wall-clock budget ran out.
    Timeout,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged => write!(f, "converged"),
            Termination::ShrinkLimit => write!(f, "shrink limit reached"),
            Termination::AttemptLimit => write!(f, "shrink attempt limit reached"),
            Termination::Timeout => write!(f, "timed out"),
        }
    }
}

/// Why the search phase ended without finding a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStop {
    /// `max_examples` valid examples passed.
    ExampleBudget,
    /// Every distinct template the strategy can produce was tried.
    Exhausted,
    /// `max_iterations` draws were spent before the example budget.
    IterationBudget,
    /// The wall-clock budget ran out.
    Timeout,
}

impl fmt::Display for SearchStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStop::ExampleBudget => write!(f, "example budget completed"),
            SearchStop::Exhausted => write!(f, "template space exhausted"),
            SearchStop::IterationBudget => write!(f, "iteration budget exhausted"),
            SearchStop::Timeout => write!(f, "timed out"),
        }
    }
}

/// Counters gathered during one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Valid examples evaluated while searching.
    pub examples: usize,
    /// Draws rejected by a filter.
    pub rejected: usize,
    /// Draws skipped because their template had already been seen.
    pub duplicates: usize,
    /// Effort spent drawing, including filter retries.
    pub iterations: usize,
    /// Accepted simplifications.
    pub shrinks: usize,
    /// Simplification candidates evaluated.
    pub shrink_attempts: usize,
    pub elapsed: Duration,
    /// Set when the search phase ended without a failure.
    pub stopped: Option<SearchStop>,
}

impl SearchStats {
    /// Whether the search ran to completion: its example budget was used
    /// up or there was nothing left to try. Searches cut short by the
    /// iteration or time budget are not complete.
    pub fn is_complete(&self) -> bool {
        matches!(
            self.stopped,
            Some(SearchStop::ExampleBudget | SearchStop::Exhausted)
        )
    }
}

/// The most simplified failing example found, with everything needed to
/// reproduce it.
#[derive(Debug)]
pub struct Minimal<T, E> {
    pub value: T,
    /// The error the test produced for `value` on its final evaluation.
    pub error: E,
    pub template: Template,
    pub seed: u64,
    pub settings: Settings,
    pub stats: SearchStats,
    pub termination: Termination,
}

impl<T, E> Minimal<T, E> {
    /// Whether no single simplification of the result still fails. Results
    /// cut short by a budget may not be.
    pub fn is_local_minimum(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Result of a completed search.
#[derive(Debug)]
pub enum Outcome<T, E = ()> {
    Found(Minimal<T, E>),
    /// No failure was found. `SearchStats::stopped` tells a completed
    /// search apart from one cut short by a budget.
    NotFound(SearchStats),
}

impl<T, E> Outcome<T, E> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn found(self) -> Option<Minimal<T, E>> {
        match self {
            Outcome::Found(minimal) => Some(minimal),
            Outcome::NotFound(_) => None,
        }
    }

    pub fn value(self) -> Option<T> {
        self.found().map(|minimal| minimal.value)
    }

    pub fn stats(&self) -> &SearchStats {
        match self {
            Outcome::Found(minimal) => &minimal.stats,
            Outcome::NotFound(stats) => stats,
        }
    }
}

/// How one evaluation of the test ended.
enum Evaluation<E> {
    Passed,
    Failed(E),
    Panicked(Box<dyn Any + Send>),
}

impl<E> Evaluation<E> {
    fn fails(&self) -> bool {
        !matches!(self, Evaluation::Passed)
    }
}

/// Run `test` on `value`. A panic counts as a failure.
fn evaluate<T, E, F>(test: &F, value: &T) -> Evaluation<E>
where
    F: Fn(&T) -> std::result::Result<(), E>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| test(value))) {
        Ok(Ok(())) => Evaluation::Passed,
        Ok(Err(error)) => Evaluation::Failed(error),
        Err(payload) => Evaluation::Panicked(payload),
    }
}

struct Budget {
    deadline: Option<Instant>,
    started: Instant,
}

impl Budget {
    fn new(timeout: Option<Duration>) -> Self {
        let started = Instant::now();
        Budget {
            deadline: timeout.and_then(|timeout| started.checked_add(timeout)),
            started,
        }
    }

    fn expired(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Search for a value on which `test` fails, then simplify it.
///
/// Uses `settings`, or the current settings when `None`, which stay active
/// for the duration of the search. Errors returned by `test` are kept
/// as they are: `Found` carries the error produced by the minimized value.
///
/// A panic in `test` counts as a failure too. Once shrinking is done, the
/// minimized value is tested again and its panic is resumed with the
/// original payload.
pub fn falsify<T, E, F>(
    strategy: &Strategy<T>,
    test: F,
    settings: Option<Settings>,
) -> Result<Outcome<T, E>>
where
    T: 'static,
    F: Fn(&T) -> std::result::Result<(), E>,
{
    let settings = settings.unwrap_or_else(Settings::current);
    settings.validate()?;
    let _scope = settings.activate();

    let seed = settings.seed.unwrap_or_else(Random::fresh_seed);
    let mut random = Random::from_seed(seed);
    let budget = Budget::new(settings.timeout);
    let mut stats = SearchStats::default();
    log::debug!("Searching for a failing example with seed {seed}");

    let searched = search(strategy, &test, &settings, &mut random, &budget, &mut stats)?;
    let Some(template) = searched else {
        stats.elapsed = budget.started.elapsed();
        if stats.examples < settings.min_satisfying_examples && stats.rejected > 0 {
            log::warn!(
                "Only {} valid examples after {} rejections",
                stats.examples,
                stats.rejected
            );
            return Err(Error::Unsatisfiable {
                examples: stats.examples,
                rejected: stats.rejected,
            });
        }
        if stats.is_complete() {
            log::info!("No failing example in {} examples", stats.examples);
        } else {
            log::warn!(
                "Search cut short after {} examples: {}",
                stats.examples,
                stats.stopped.map_or_else(String::new, |stop| stop.to_string())
            );
        }
        return Ok(Outcome::NotFound(stats));
    };

    log::debug!("Found a failing example after {} examples, shrinking", stats.examples);
    let (template, termination) = shrink(strategy, &test, &settings, template, &budget, &mut stats);
    stats.elapsed = budget.started.elapsed();

    let value = strategy.reify(&template)?;
    match evaluate(&test, &value) {
        Evaluation::Failed(error) => {
            log::info!(
                "Minimal example after {} shrinks ({termination})",
                stats.shrinks
            );
            Ok(Outcome::Found(Minimal {
                value,
                error,
                template,
                seed,
                settings,
                stats,
                termination,
            }))
        }
        Evaluation::Panicked(payload) => {
            log::info!(
                "Minimal example after {} shrinks ({termination}) panicked",
                stats.shrinks
            );
            panic::resume_unwind(payload)
        }
        Evaluation::Passed => {
            log::warn!("Minimal example passed when evaluated again");
            Err(Error::Flaky {
                message: format!(
                    "the minimal example for seed {seed} passed when evaluated again"
                ),
            })
        }
    }
}

/// Search for a value satisfying `condition` and simplify it.
pub fn find<T, F>(
    strategy: &Strategy<T>,
    condition: F,
    settings: Option<Settings>,
) -> Result<Outcome<T>>
where
    T: 'static,
    F: Fn(&T) -> bool,
{
    falsify(
        strategy,
        |value| if condition(value) { Err(()) } else { Ok(()) },
        settings,
    )
}

/// Reify a recorded template again, e.g. one taken from `Minimal::template`.
pub fn replay<T: 'static>(strategy: &Strategy<T>, template: &Template) -> Result<T> {
    strategy.reify(template)
}

fn search<T, E, F>(
    strategy: &Strategy<T>,
    test: &F,
    settings: &Settings,
    random: &mut Random,
    budget: &Budget,
    stats: &mut SearchStats,
) -> Result<Option<Template>>
where
    T: 'static,
    F: Fn(&T) -> std::result::Result<(), E>,
{
    let bound = strategy.template_upper_bound();
    let mut seen = HashSet::new();

    let found = loop {
        let stop = if stats.examples >= settings.max_examples {
            Some(SearchStop::ExampleBudget)
        } else if random.effort() >= settings.max_iterations {
            log::warn!("Iteration budget of {} exhausted", settings.max_iterations);
            Some(SearchStop::IterationBudget)
        } else if budget.expired() {
            log::warn!("Timed out while searching");
            Some(SearchStop::Timeout)
        } else if bound.at_most(seen.len() as u64) {
            log::debug!("All {bound} templates have been tried");
            Some(SearchStop::Exhausted)
        } else {
            None
        };
        if stop.is_some() {
            stats.stopped = stop;
            break None;
        }

        random.spend(1);
        let parameter = strategy.draw_parameter(random);
        let template = strategy.draw_template(random, &parameter);
        if !seen.insert(template.clone()) {
            stats.duplicates += 1;
            continue;
        }
        let value = match strategy.reify(&template) {
            Ok(value) => value,
            Err(error) if error.is_rejection() => {
                stats.rejected += 1;
                continue;
            }
            Err(error) => return Err(error),
        };
        stats.examples += 1;
        if evaluate(test, &value).fails() {
            break Some(template);
        }
    };
    stats.iterations = random.effort();
    Ok(found)
}

fn shrink<T, E, F>(
    strategy: &Strategy<T>,
    test: &F,
    settings: &Settings,
    mut best: Template,
    budget: &Budget,
    stats: &mut SearchStats,
) -> (Template, Termination)
where
    T: 'static,
    F: Fn(&T) -> std::result::Result<(), E>,
{
    let mut tried = HashSet::new();
    tried.insert(best.clone());

    loop {
        if stats.shrinks >= settings.max_shrinks {
            log::warn!("Stopped shrinking after {} shrinks", stats.shrinks);
            return (best, Termination::ShrinkLimit);
        }

        // Keyed on the template so a pass over the same template always
        // proposes the same candidates.
        let mut random = Random::for_key(&best);
        let mut improved = false;
        for candidate in strategy.simplify(&mut random, &best) {
            if stats.shrink_attempts >= settings.max_shrink_attempts {
                log::warn!("Stopped shrinking after {} attempts", stats.shrink_attempts);
                return (best, Termination::AttemptLimit);
            }
            if budget.expired() {
                log::warn!("Timed out while shrinking");
                return (best, Termination::Timeout);
            }
            if !tried.insert(candidate.clone()) {
                continue;
            }
            stats.shrink_attempts += 1;
            let fails = match strategy.reify(&candidate) {
                Ok(value) => evaluate(test, &value).fails(),
                Err(_) => false,
            };
            if fails {
                log::debug!(
                    "Shrink {}: template of {} nodes, depth {}",
                    stats.shrinks + 1,
                    candidate.count_nodes(),
                    candidate.depth()
                );
                best = candidate;
                stats.shrinks += 1;
                improved = true;
                break;
            }
        }
        if !improved {
            return (best, Termination::Converged);
        }
    }
}
