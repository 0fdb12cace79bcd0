//! Integer, float and derived numeric strategies.

use std::f64::consts::PI;

use num_complex::Complex64;
use num_rational::Rational64;
use num_traits::FromPrimitive;
use rand::{Rng, RngCore};
use rust_decimal::Decimal;

use crate::collections::tuples;
use crate::combinators::{choose_weighted, draw_weights, just};
use crate::data::Random;
use crate::error::{Error, Result};
use crate::strategy::{
    no_simplifications, simplifications, SearchStrategy, Simplifications, Strategy, TemplateSpace,
};
use crate::template::{Parameter, Template, UpperBound};

/// Default size hint for integers bounded on one side only.
const DEFAULT_AVERAGE_OFFSET: f64 = 100.0;

/// Candidate simplifications of an integer, moving toward `target`.
///
/// The target itself comes first. A negative value then tries its absolute
/// value, followed by halving steps toward the target that end with a
/// single unit step.
pub(crate) fn integer_shrinks(value: i64, target: i64) -> Vec<i64> {
    if value == target {
        return Vec::new();
    }
    let mut candidates = vec![target];
    if value < 0 {
        if let Some(absolute) = value.checked_neg() {
            candidates.push(absolute);
        }
    }
    let mut step = (value as i128 - target as i128) / 2;
    while step != 0 {
        candidates.push((value as i128 - step) as i64);
        step /= 2;
    }
    if (value as i128 - target as i128).abs() > 1 {
        let unit = if value > target { value - 1 } else { value + 1 };
        candidates.push(unit);
    }
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|candidate| *candidate != value && seen.insert(*candidate));
    candidates
}

fn integer_simplifications(value: i64, target: i64, range: (i64, i64)) -> Simplifications {
    let (lo, hi) = range;
    simplifications(
        integer_shrinks(value, target)
            .into_iter()
            .filter(|candidate| (lo..=hi).contains(candidate))
            .map(Template::Integer)
            .collect(),
    )
}

/// Small integers of either sign, geometrically distributed in magnitude.
struct GeometricIntegers;

impl TemplateSpace for GeometricIntegers {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(1.0 / (1.0 + random.unit() * DEFAULT_AVERAGE_OFFSET))
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let p = parameter.value_or(0.1).clamp(1e-6, 1.0);
        let magnitude = random.geometric(p).min(i64::MAX as u64) as i64;
        if random.gen_bool(0.5) {
            Template::Integer(-magnitude)
        } else {
            Template::Integer(magnitude)
        }
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        match template.as_integer() {
            Ok(value) => integer_simplifications(value, 0, (i64::MIN, i64::MAX)),
            Err(_) => no_simplifications(),
        }
    }
}

impl SearchStrategy for GeometricIntegers {
    type Value = i64;

    fn reify(&self, template: &Template) -> Result<i64> {
        template.as_integer()
    }
}

/// Integers across the whole machine range, with extra weight on the
/// extremes.
struct WideRangeIntegers;

const EXTREME_INTEGERS: [i64; 6] = [i64::MIN, i64::MIN + 1, i64::MAX - 1, i64::MAX, -1, 1];

impl TemplateSpace for WideRangeIntegers {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(random.unit() * 0.3)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let extremes = parameter.value_or(0.1).clamp(0.0, 1.0);
        if random.gen_bool(extremes) {
            let index = random.gen_range(0..EXTREME_INTEGERS.len());
            return Template::Integer(EXTREME_INTEGERS[index]);
        }
        let width = random.gen_range(0..64);
        let magnitude = (random.next_u64() >> width) as i64;
        Template::Integer(if random.gen_bool(0.5) { magnitude.wrapping_neg() } else { magnitude })
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        match template.as_integer() {
            Ok(value) => integer_simplifications(value, 0, (i64::MIN, i64::MAX)),
            Err(_) => no_simplifications(),
        }
    }
}

impl SearchStrategy for WideRangeIntegers {
    type Value = i64;

    fn reify(&self, template: &Template) -> Result<i64> {
        template.as_integer()
    }
}

/// Integers in `lo..=hi`, shrinking toward the value in range closest to zero.
struct BoundedIntegers {
    lo: i64,
    hi: i64,
}

impl BoundedIntegers {
    fn target(&self) -> i64 {
        0i64.clamp(self.lo, self.hi)
    }
}

impl TemplateSpace for BoundedIntegers {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(random.unit() * 0.2)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let endpoints = parameter.value_or(0.0).clamp(0.0, 1.0);
        if random.gen_bool(endpoints) {
            return Template::Integer(if random.gen_bool(0.5) { self.lo } else { self.hi });
        }
        Template::Integer(random.gen_range(self.lo..=self.hi))
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        match template.as_integer() {
            Ok(value) => integer_simplifications(value, self.target(), (self.lo, self.hi)),
            Err(_) => no_simplifications(),
        }
    }

    fn template_upper_bound(&self) -> UpperBound {
        let width = self.hi as i128 - self.lo as i128 + 1;
        u64::try_from(width).map_or(UpperBound::Infinite, UpperBound::Finite)
    }
}

impl SearchStrategy for BoundedIntegers {
    type Value = i64;

    fn reify(&self, template: &Template) -> Result<i64> {
        let value = template.as_integer()?;
        if (self.lo..=self.hi).contains(&value) {
            Ok(value)
        } else {
            Err(Error::TemplateMismatch {
                expected: "integer within the bounds",
                found: "integer",
            })
        }
    }
}

/// Integers on one side of `base`. The template is the non-negative
/// distance from `base`.
struct IntegersFrom {
    base: i64,
    downward: bool,
    average: f64,
}

impl TemplateSpace for IntegersFrom {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(-(1.0 - random.unit()).ln() * self.average.max(0.0))
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let average = parameter.value_or(self.average).max(0.0);
        let offset = random.geometric(1.0 / (1.0 + average)).min(self.room());
        Template::Integer(offset as i64)
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        match template.as_integer() {
            Ok(offset) => integer_simplifications(offset, 0, (0, self.room() as i64)),
            Err(_) => no_simplifications(),
        }
    }

    fn template_upper_bound(&self) -> UpperBound {
        UpperBound::Finite(self.room()) + UpperBound::Finite(1)
    }
}

impl IntegersFrom {
    /// Largest representable offset from the base.
    fn room(&self) -> u64 {
        let room = if self.downward {
            self.base as i128 - i64::MIN as i128
        } else {
            i64::MAX as i128 - self.base as i128
        };
        room.clamp(0, i64::MAX as i128) as u64
    }
}

impl SearchStrategy for IntegersFrom {
    type Value = i64;

    fn reify(&self, template: &Template) -> Result<i64> {
        let offset = template.as_integer()?;
        let value = if offset < 0 {
            None
        } else if self.downward {
            self.base.checked_sub(offset)
        } else {
            self.base.checked_add(offset)
        };
        value.ok_or(Error::TemplateMismatch {
            expected: "offset within range of the base",
            found: "integer",
        })
    }
}

/// Integers no smaller than `base`.
pub(crate) fn integers_from(base: i64, average: f64) -> Strategy<i64> {
    Strategy::new(IntegersFrom {
        base,
        downward: false,
        average: if average.is_finite() { average.max(0.0) } else { DEFAULT_AVERAGE_OFFSET },
    })
}

/// Any `i64`: a mix of small values and values near the extremes of the range.
pub fn integers() -> Strategy<i64> {
    Strategy::new(GeometricIntegers).or(Strategy::new(WideRangeIntegers))
}

/// Integers within optional inclusive bounds.
pub fn integers_in(min: Option<i64>, max: Option<i64>) -> Result<Strategy<i64>> {
    match (min, max) {
        (None, None) => Ok(integers()),
        (Some(min), None) => Ok(integers_from(min, DEFAULT_AVERAGE_OFFSET)),
        (None, Some(max)) => Ok(Strategy::new(IntegersFrom {
            base: max,
            downward: true,
            average: DEFAULT_AVERAGE_OFFSET,
        })),
        (Some(min), Some(max)) if min > max => Err(Error::invalid_argument(format!(
            "Cannot have max_value={max} < min_value={min}"
        ))),
        (Some(min), Some(max)) => Ok(bounded_integers(min, max)),
    }
}

/// Integers in `lo..=hi`, for bounds already known to be ordered.
pub(crate) fn bounded_integers(lo: i64, hi: i64) -> Strategy<i64> {
    if lo == hi {
        just(lo)
    } else {
        Strategy::new(BoundedIntegers { lo, hi })
    }
}

/// Candidate simplifications of a float.
///
/// NaN and the infinities try finite stand-ins; negative values try their
/// negation. After that come zero, truncation, a unit step toward zero for
/// integral values, and halving.
pub(crate) fn float_shrinks(value: f64) -> Vec<f64> {
    let mut candidates = Vec::new();
    if value.is_nan() {
        candidates.extend([0.0, f64::INFINITY]);
    } else if value == f64::INFINITY {
        candidates.extend([0.0, f64::MAX]);
    } else if value == f64::NEG_INFINITY {
        candidates.extend([0.0, f64::INFINITY, f64::MIN]);
    } else if value == 0.0 {
        if value.is_sign_negative() {
            candidates.push(0.0);
        }
    } else {
        if value < 0.0 {
            candidates.push(-value);
        }
        candidates.push(0.0);
        let truncated = value.trunc();
        candidates.push(truncated);
        if truncated == value && value.abs() >= 1.0 && value.abs() < 9.0e15 {
            candidates.push(value - value.signum());
        }
        candidates.push(value / 2.0);
    }
    let mut unique: Vec<f64> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let fresh = !unique.iter().any(|seen| seen.to_bits() == candidate.to_bits());
        if candidate.to_bits() != value.to_bits() && fresh {
            unique.push(candidate);
        }
    }
    unique
}

fn float_simplifications(template: &Template, keep: impl Fn(f64) -> bool) -> Simplifications {
    match template.as_float() {
        Ok(value) => simplifications(
            float_shrinks(value)
                .into_iter()
                .filter(|candidate| keep(*candidate))
                .map(Template::float)
                .collect(),
        ),
        Err(_) => no_simplifications(),
    }
}

fn gaussian(random: &mut Random) -> f64 {
    let u1 = 1.0 - random.unit();
    let u2 = random.unit();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn exponential(random: &mut Random) -> f64 {
    -(1.0 - random.unit()).ln()
}

const NASTY_FLOATS: [f64; 16] = [
    0.0,
    -0.0,
    0.5,
    1.0,
    -1.0,
    1.0 / 3.0,
    f64::EPSILON,
    f64::MIN_POSITIVE,
    -f64::MIN_POSITIVE,
    5e-324,
    1e308,
    f64::MAX,
    f64::MIN,
    f64::INFINITY,
    f64::NEG_INFINITY,
    f64::NAN,
];

/// The shapes making up the unbounded float strategy.
#[derive(Debug, Clone, Copy)]
enum FloatShape {
    Gaussian,
    Fraction,
    Exponential,
    Integral,
    Nasty,
    FullRange,
}

struct UnboundedFloats {
    shape: FloatShape,
}

impl TemplateSpace for UnboundedFloats {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        match self.shape {
            FloatShape::Gaussian => Parameter::Composite(vec![
                Parameter::Value(gaussian(random) * 10.0),
                Parameter::Value(exponential(random) * 10.0),
            ]),
            FloatShape::Exponential => Parameter::Value(exponential(random)),
            FloatShape::Integral => {
                Parameter::Value(1.0 / (1.0 + random.unit() * DEFAULT_AVERAGE_OFFSET))
            }
            FloatShape::Nasty => Parameter::Weights(draw_weights(random, NASTY_FLOATS.len())),
            FloatShape::Fraction | FloatShape::FullRange => Parameter::Unit,
        }
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let value = match self.shape {
            FloatShape::Gaussian => {
                let mean = parameter.part(0).value_or(0.0);
                let deviation = parameter.part(1).value_or(1.0);
                mean + deviation * gaussian(random)
            }
            FloatShape::Fraction => random.unit(),
            FloatShape::Exponential => {
                let scale = parameter.value_or(1.0).max(f64::MIN_POSITIVE);
                let magnitude = exponential(random) / scale;
                if random.gen_bool(0.5) {
                    -magnitude
                } else {
                    magnitude
                }
            }
            FloatShape::Integral => {
                let p = parameter.value_or(0.1).clamp(1e-6, 1.0);
                let magnitude = random.geometric(p) as f64;
                if random.gen_bool(0.5) {
                    -magnitude
                } else {
                    magnitude
                }
            }
            FloatShape::Nasty => {
                NASTY_FLOATS[choose_weighted(random, parameter.weights(), NASTY_FLOATS.len())]
            }
            FloatShape::FullRange => f64::from_bits(random.next_u64()),
        };
        Template::float(value)
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        float_simplifications(template, |_| true)
    }
}

impl SearchStrategy for UnboundedFloats {
    type Value = f64;

    fn reify(&self, template: &Template) -> Result<f64> {
        template.as_float()
    }
}

/// Bisection steps from `value` toward `target`: halfway first, then ever
/// closer to `value`.
fn float_bisections(value: f64, target: f64) -> Vec<f64> {
    let mut candidates = Vec::new();
    let mut step = (value - target) / 2.0;
    while step.is_finite() && step != 0.0 {
        let candidate = value - step;
        if candidate == value {
            break;
        }
        candidates.push(candidate);
        step /= 2.0;
    }
    candidates
}

/// Finite floats in `lo..=hi`.
struct FixedBoundedFloats {
    lo: f64,
    hi: f64,
}

impl FixedBoundedFloats {
    fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

impl TemplateSpace for FixedBoundedFloats {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(random.unit() * 0.2)
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let endpoints = parameter.value_or(0.0).clamp(0.0, 1.0);
        if random.gen_bool(endpoints) {
            return Template::float(if random.gen_bool(0.5) { self.lo } else { self.hi });
        }
        let value = self.lo + random.unit() * (self.hi - self.lo);
        Template::float(value.clamp(self.lo, self.hi))
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        let Ok(value) = template.as_float() else {
            return no_simplifications();
        };
        let target = 0.0f64.clamp(self.lo, self.hi);
        let mut candidates: Vec<f64> = Vec::new();
        if target.to_bits() != value.to_bits() {
            candidates.push(target);
            candidates.extend(float_bisections(value, target));
        }
        for candidate in float_shrinks(value) {
            let fresh = candidates.iter().all(|seen| seen.to_bits() != candidate.to_bits());
            if self.contains(candidate) && fresh && candidate.to_bits() != value.to_bits() {
                candidates.push(candidate);
            }
        }
        simplifications(candidates.into_iter().map(Template::float).collect())
    }
}

impl SearchStrategy for FixedBoundedFloats {
    type Value = f64;

    fn reify(&self, template: &Template) -> Result<f64> {
        let value = template.as_float()?;
        if self.contains(value) {
            Ok(value)
        } else {
            Err(Error::TemplateMismatch {
                expected: "float within the bounds",
                found: "float",
            })
        }
    }
}

/// Floats on one side of `base`. The template is the non-negative distance.
struct FloatsFromBase {
    base: f64,
    sign: f64,
}

impl TemplateSpace for FloatsFromBase {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Value(exponential(random))
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let scale = parameter.value_or(1.0).max(1e-3);
        Template::float(exponential(random) / scale * 10.0)
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        float_simplifications(template, |offset| offset >= 0.0 && offset.is_finite())
    }
}

impl SearchStrategy for FloatsFromBase {
    type Value = f64;

    fn reify(&self, template: &Template) -> Result<f64> {
        let offset = template.as_float()?;
        if !(offset >= 0.0) {
            return Err(Error::TemplateMismatch {
                expected: "non-negative offset",
                found: "float",
            });
        }
        Ok(self.base + self.sign * offset)
    }
}

/// Any `f64`, including NaN, the infinities and signed zero.
pub fn floats() -> Strategy<f64> {
    [
        FloatShape::Fraction,
        FloatShape::Exponential,
        FloatShape::Integral,
        FloatShape::Nasty,
        FloatShape::FullRange,
    ]
    .into_iter()
    .fold(
        Strategy::new(UnboundedFloats {
            shape: FloatShape::Gaussian,
        }),
        |union, shape| union.or(Strategy::new(UnboundedFloats { shape })),
    )
}

/// Floats within optional inclusive bounds. An infinite endpoint is the
/// same as no endpoint; NaN endpoints are rejected.
pub fn floats_in(min: Option<f64>, max: Option<f64>) -> Result<Strategy<f64>> {
    for endpoint in [min, max].into_iter().flatten() {
        if endpoint.is_nan() {
            return Err(Error::invalid_argument("nan is not a valid end point"));
        }
    }
    let min = min.filter(|value| *value != f64::NEG_INFINITY);
    let max = max.filter(|value| *value != f64::INFINITY);

    match (min, max) {
        (None, None) => Ok(floats()),
        (Some(min), Some(max)) if max < min => Err(Error::invalid_argument(format!(
            "Cannot have max_value={max} < min_value={min}"
        ))),
        (Some(min), Some(max)) if min == max => Ok(just(min)),
        (Some(min), Some(max)) if (max - min).is_infinite() => {
            Ok(floats_in(Some(0.0), Some(max))?.or(floats_in(Some(min), Some(0.0))?))
        }
        (Some(min), Some(max)) => Ok(Strategy::new(FixedBoundedFloats { lo: min, hi: max })),
        (Some(min), None) => {
            let above = Strategy::new(FloatsFromBase { base: min, sign: 1.0 });
            Ok(above.or(just(f64::INFINITY)))
        }
        (None, Some(max)) => {
            let below = Strategy::new(FloatsFromBase { base: max, sign: -1.0 });
            Ok(below.or(just(f64::NEG_INFINITY)))
        }
    }
}

/// Complex numbers with independently drawn float parts.
pub fn complex_numbers() -> Strategy<Complex64> {
    tuples((floats(), floats())).map(|(re, im)| Complex64::new(re, im))
}

/// Rationals with an integer numerator and a positive denominator.
pub fn fractions() -> Strategy<Rational64> {
    tuples((integers(), integers_from(1, DEFAULT_AVERAGE_OFFSET)))
        .map(|(numer, denom)| Rational64::new(numer, denom))
}

/// Fixed-point decimals, converted from finite floats or from fractions.
/// Values outside the range `Decimal` can represent are rejected.
pub fn decimals() -> Strategy<Decimal> {
    let from_floats = floats().filter_map(Decimal::from_f64);
    let from_fractions = fractions().filter_map(|ratio| {
        Decimal::from(*ratio.numer()).checked_div(Decimal::from(*ratio.denom()))
    });
    from_floats.or(from_fractions)
}
