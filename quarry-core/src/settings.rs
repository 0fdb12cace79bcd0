//! Ambient configuration for generation and search, with scoped overrides.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::time::Duration;

use crate::error::{Error, Result};

thread_local! {
    static ACTIVE: RefCell<Vec<Settings>> = const { RefCell::new(Vec::new()) };
}

/// Configuration consulted by combinators and by the search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Valid examples required before "not found" is trusted.
    pub min_satisfying_examples: usize,

    /// Maximum number of valid examples to test while searching.
    pub max_examples: usize,

    /// Maximum number of draws, including rejected and duplicate ones and
    /// filter retries.
    pub max_iterations: usize,

    /// Maximum number of accepted simplifications.
    pub max_shrinks: usize,

    /// Maximum number of simplification candidates to evaluate.
    pub max_shrink_attempts: usize,

    /// Wall-clock budget for one search, checked between evaluations.
    pub timeout: Option<Duration>,

    /// Size hint for collections with no explicit average size.
    pub average_list_length: f64,

    /// Retries a filter makes before giving up on a draw.
    pub max_filter_attempts: usize,

    /// Fixed seed for the search; `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_satisfying_examples: 5,
            max_examples: 200,
            max_iterations: 1000,
            max_shrinks: 500,
            max_shrink_attempts: 20_000,
            timeout: Some(Duration::from_secs(60)),
            average_list_length: 25.0,
            max_filter_attempts: 25,
            seed: None,
        }
    }
}

impl Settings {
    /// The settings in effect on this thread: the innermost active override,
    /// or the defaults.
    pub fn current() -> Settings {
        ACTIVE.with(|active| active.borrow().last().cloned().unwrap_or_default())
    }

    /// Make these settings current until the returned guard is dropped.
    ///
    /// Guards nest: dropping one restores whatever was current when it was
    /// created, including when unwinding out of an error path.
    pub fn activate(&self) -> SettingsGuard {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            active.push(self.clone());
            log::debug!("Activated settings override (depth {})", active.len());
            SettingsGuard {
                depth: active.len(),
                _not_send: PhantomData,
            }
        })
    }

    /// Run `f` with these settings current.
    pub fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.activate();
        f()
    }

    /// Check that the settings describe a runnable configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_examples == 0 {
            return Err(Error::invalid_argument("max_examples must be positive"));
        }
        if self.average_list_length.is_nan() || self.average_list_length < 0.0 {
            return Err(Error::invalid_argument(format!(
                "Invalid average_list_length {}",
                self.average_list_length
            )));
        }
        Ok(())
    }

    pub fn with_examples(mut self, examples: usize) -> Self {
        self.max_examples = examples;
        self
    }

    pub fn with_min_satisfying_examples(mut self, examples: usize) -> Self {
        self.min_satisfying_examples = examples;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_shrinks(mut self, shrinks: usize) -> Self {
        self.max_shrinks = shrinks;
        self
    }

    pub fn with_shrink_attempts(mut self, attempts: usize) -> Self {
        self.max_shrink_attempts = attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_average_list_length(mut self, length: f64) -> Self {
        self.average_list_length = length;
        self
    }

    pub fn with_filter_attempts(mut self, attempts: usize) -> Self {
        self.max_filter_attempts = attempts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Keeps a settings override active; dropping it restores the outer scope.
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct SettingsGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for SettingsGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            active.truncate(self.depth.saturating_sub(1));
            log::debug!("Reverted settings override (depth {})", active.len());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_nothing_active() {
        assert_eq!(Settings::current(), Settings::default());
    }

    #[test]
    fn test_nested_overrides_revert() {
        let outer = Settings::default().with_average_list_length(5.0);
        let inner = Settings::default().with_average_list_length(50.0);

        {
            let _outer = outer.activate();
            assert_eq!(Settings::current().average_list_length, 5.0);
            inner.scoped(|| {
                assert_eq!(Settings::current().average_list_length, 50.0);
            });
            assert_eq!(Settings::current().average_list_length, 5.0);
        }
        assert_eq!(Settings::current(), Settings::default());
    }

    #[test]
    fn test_override_reverted_on_error_path() {
        fn failing(settings: &Settings) -> Result<()> {
            let _guard = settings.activate();
            Err(Error::invalid_argument("early exit"))
        }

        let settings = Settings::default().with_examples(3);
        assert!(failing(&settings).is_err());
        assert_eq!(Settings::current().max_examples, 200);
    }

    #[test]
    fn test_overrides_are_per_thread() {
        let _guard = Settings::default().with_examples(7).activate();
        let seen = std::thread::spawn(|| Settings::current().max_examples)
            .join()
            .unwrap();
        assert_eq!(seen, 200);
        assert_eq!(Settings::current().max_examples, 7);
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate().is_ok());
        assert!(Settings::default().with_examples(0).validate().is_err());
        assert!(Settings::default()
            .with_average_list_length(f64::NAN)
            .validate()
            .is_err());
    }
}
