//! Templates, parameters and template-count bounds.

use std::fmt;
use std::ops::{Add, Mul};

use crate::error::{Error, Result};

/// The structural record of the random choices behind one generated value.
///
/// Templates are plain trees: comparing, hashing and ordering them never
/// depends on whether the value they reify to supports those operations.
/// Composite templates own their children, so simplifying one subtree can
/// never disturb a sibling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Template {
    Unit,
    Bool(bool),
    Integer(i64),
    /// A float stored as its bit pattern so NaN and `-0.0` compare structurally.
    Float(u64),
    Index(usize),
    /// A choice between alternatives: which branch, and its template.
    Branch(usize, Box<Template>),
    Sequence(Vec<Template>),
    Pair(Box<Template>, Box<Template>),
    /// An endless stream: the seed for unread positions and the recorded prefix.
    Stream { seed: u64, prefix: Vec<Template> },
}

impl Template {
    pub fn float(value: f64) -> Self {
        Template::Float(value.to_bits())
    }

    pub fn branch(index: usize, inner: Template) -> Self {
        Template::Branch(index, Box::new(inner))
    }

    pub fn pair(left: Template, right: Template) -> Self {
        Template::Pair(Box::new(left), Box::new(right))
    }

    /// Short name of this template's shape, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Template::Unit => "unit",
            Template::Bool(_) => "bool",
            Template::Integer(_) => "integer",
            Template::Float(_) => "float",
            Template::Index(_) => "index",
            Template::Branch(..) => "branch",
            Template::Sequence(_) => "sequence",
            Template::Pair(..) => "pair",
            Template::Stream { .. } => "stream",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TemplateMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Template::Bool(value) => Ok(*value),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_integer(&self) -> Result<i64> {
        match self {
            Template::Integer(value) => Ok(*value),
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Template::Float(bits) => Ok(f64::from_bits(*bits)),
            other => Err(other.mismatch("float")),
        }
    }

    pub fn as_index(&self) -> Result<usize> {
        match self {
            Template::Index(value) => Ok(*value),
            other => Err(other.mismatch("index")),
        }
    }

    pub fn as_branch(&self) -> Result<(usize, &Template)> {
        match self {
            Template::Branch(index, inner) => Ok((*index, inner)),
            other => Err(other.mismatch("branch")),
        }
    }

    pub fn as_sequence(&self) -> Result<&[Template]> {
        match self {
            Template::Sequence(items) => Ok(items),
            other => Err(other.mismatch("sequence")),
        }
    }

    pub fn as_pair(&self) -> Result<(&Template, &Template)> {
        match self {
            Template::Pair(left, right) => Ok((left, right)),
            other => Err(other.mismatch("pair")),
        }
    }

    pub fn as_stream(&self) -> Result<(u64, &[Template])> {
        match self {
            Template::Stream { seed, prefix } => Ok((*seed, prefix)),
            other => Err(other.mismatch("stream")),
        }
    }

    fn children(&self) -> Vec<&Template> {
        match self {
            Template::Branch(_, inner) => vec![inner],
            Template::Sequence(items) => items.iter().collect(),
            Template::Pair(left, right) => vec![left, right],
            Template::Stream { prefix, .. } => prefix.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Count the total number of nodes in the template.
    pub fn count_nodes(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Template::count_nodes)
            .sum::<usize>()
    }

    /// Get the depth of the template.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Template::depth)
            .max()
            .unwrap_or(0)
    }
}

/// A per-attempt summary of distributional shape.
///
/// Parameters only bias how templates are drawn. A strategy handed a
/// parameter it does not recognise falls back to a neutral reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Unit,
    Value(f64),
    Weights(Vec<f64>),
    Composite(Vec<Parameter>),
}

impl Parameter {
    /// Read a scalar parameter, falling back to `default`.
    pub fn value_or(&self, default: f64) -> f64 {
        match self {
            Parameter::Value(value) if value.is_finite() => *value,
            _ => default,
        }
    }

    /// Read weights, falling back to an empty slice.
    pub fn weights(&self) -> &[f64] {
        match self {
            Parameter::Weights(weights) => weights,
            _ => &[],
        }
    }

    /// Read the `index`-th part of a composite parameter.
    pub fn part(&self, index: usize) -> &Parameter {
        match self {
            Parameter::Composite(parts) => parts.get(index).unwrap_or(&NEUTRAL),
            _ => &NEUTRAL,
        }
    }
}

static NEUTRAL: Parameter = Parameter::Unit;

/// Upper bound on the number of structurally distinct templates a strategy
/// can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpperBound {
    Finite(u64),
    Infinite,
}

impl UpperBound {
    pub fn is_finite(&self) -> bool {
        matches!(self, UpperBound::Finite(_))
    }

    /// Whether at most `count` distinct templates exist.
    pub fn at_most(&self, count: u64) -> bool {
        matches!(self, UpperBound::Finite(n) if *n <= count)
    }

    /// Whether fewer than `count` distinct templates exist.
    pub fn less_than(&self, count: usize) -> bool {
        matches!(self, UpperBound::Finite(n) if (*n as u128) < count as u128)
    }

    pub fn pow(self, exponent: u64) -> UpperBound {
        match self {
            UpperBound::Infinite if exponent == 0 => UpperBound::Finite(1),
            UpperBound::Infinite => UpperBound::Infinite,
            UpperBound::Finite(base) => match u32::try_from(exponent)
                .ok()
                .and_then(|e| base.checked_pow(e))
            {
                Some(value) => UpperBound::Finite(value),
                None if base <= 1 => UpperBound::Finite(base),
                None => UpperBound::Infinite,
            },
        }
    }
}

impl Add for UpperBound {
    type Output = UpperBound;

    fn add(self, other: UpperBound) -> UpperBound {
        match (self, other) {
            (UpperBound::Finite(a), UpperBound::Finite(b)) => {
                a.checked_add(b).map_or(UpperBound::Infinite, UpperBound::Finite)
            }
            _ => UpperBound::Infinite,
        }
    }
}

impl Mul for UpperBound {
    type Output = UpperBound;

    fn mul(self, other: UpperBound) -> UpperBound {
        match (self, other) {
            (UpperBound::Finite(0), _) | (_, UpperBound::Finite(0)) => UpperBound::Finite(0),
            (UpperBound::Finite(a), UpperBound::Finite(b)) => {
                a.checked_mul(b).map_or(UpperBound::Infinite, UpperBound::Finite)
            }
            _ => UpperBound::Infinite,
        }
    }
}

impl std::iter::Sum for UpperBound {
    fn sum<I: Iterator<Item = UpperBound>>(iter: I) -> UpperBound {
        iter.fold(UpperBound::Finite(0), Add::add)
    }
}

impl std::iter::Product for UpperBound {
    fn product<I: Iterator<Item = UpperBound>>(iter: I) -> UpperBound {
        iter.fold(UpperBound::Finite(1), Mul::mul)
    }
}

impl fmt::Display for UpperBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpperBound::Finite(n) => write!(f, "{n}"),
            UpperBound::Infinite => write!(f, "infinitely many"),
        }
    }
}
