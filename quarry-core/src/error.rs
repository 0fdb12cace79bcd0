//! Error types for Quarry strategies and the search engine.

use thiserror::Error;

/// Boxed error raised by a user-supplied constructor during reification.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for strategy construction, generation and search.
///
/// Errors produced by the predicate under test are never wrapped in this
/// type; the engine hands them back to the caller unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// A strategy was configured with conflicting or malformed arguments.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A filter could not find a satisfying template within its retry budget.
    #[error("Unable to satisfy filter after {attempts} attempts")]
    UnsatisfiableFilter { attempts: usize },

    /// Too many draws were rejected to gather enough valid examples.
    #[error("Unable to satisfy assumptions: {examples} valid examples, {rejected} rejected")]
    Unsatisfiable { examples: usize, rejected: usize },

    /// A constructor passed to `builds` or `try_map` failed.
    #[error("Constructor failed: {0}")]
    Construction(#[source] BoxError),

    /// A template did not have the shape a strategy expected.
    #[error("Template mismatch: expected {expected}, found {found}")]
    TemplateMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The minimized example stopped failing when evaluated again.
    #[error("Flaky test: {message}")]
    Flaky { message: String },
}

/// Result type for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an `InvalidArgument` error from anything printable.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap a constructor failure.
    pub fn construction<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Construction(error.into())
    }

    /// Whether this error means "this draw was rejected" rather than
    /// "something is broken". Rejected draws are discarded by the engine.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::UnsatisfiableFilter { .. })
    }
}
