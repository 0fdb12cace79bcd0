//! Characters, text and byte strings.

use rand::Rng;

use crate::collections::{lists, SizeBounds};
use crate::combinators::{choose_weighted, draw_weights, just, sampled_from};
use crate::data::Random;
use crate::error::{Error, Result};
use crate::numbers::{integer_shrinks, integers_in};
use crate::strategy::{
    no_simplifications, simplifications, SearchStrategy, Simplifications, Strategy, TemplateSpace,
};
use crate::template::{Parameter, Template, UpperBound};

/// The character every other character shrinks toward.
const SIMPLEST_CHAR: u32 = '0' as u32;

const SURROGATES: std::ops::RangeInclusive<u32> = 0xD800..=0xDFFF;

/// Code point ranges drawn from, in order of preference.
const CHAR_RANGES: [(u32, u32); 3] = [(0x20, 0x7E), (0x00, 0xFFFF), (0x00, 0x10FFFF)];

struct Characters;

impl TemplateSpace for Characters {
    fn draw_parameter(&self, random: &mut Random) -> Parameter {
        Parameter::Weights(draw_weights(random, CHAR_RANGES.len()))
    }

    fn draw_template(&self, random: &mut Random, parameter: &Parameter) -> Template {
        let (lo, hi) = CHAR_RANGES[choose_weighted(random, parameter.weights(), CHAR_RANGES.len())];
        let mut point = random.gen_range(lo..=hi);
        if SURROGATES.contains(&point) {
            point = SIMPLEST_CHAR;
        }
        Template::Integer(i64::from(point))
    }

    fn simplify(&self, _random: &mut Random, template: &Template) -> Simplifications {
        let Ok(point) = template.as_integer() else {
            return no_simplifications();
        };
        simplifications(
            integer_shrinks(point, i64::from(SIMPLEST_CHAR))
                .into_iter()
                .filter(|candidate| {
                    u32::try_from(*candidate).map_or(false, |c| char::from_u32(c).is_some())
                })
                .map(Template::Integer)
                .collect(),
        )
    }

    fn template_upper_bound(&self) -> UpperBound {
        UpperBound::Finite(0x110000 - 0x800)
    }
}

impl SearchStrategy for Characters {
    type Value = char;

    fn reify(&self, template: &Template) -> Result<char> {
        let point = template.as_integer()?;
        u32::try_from(point)
            .ok()
            .and_then(char::from_u32)
            .ok_or(Error::TemplateMismatch {
                expected: "unicode scalar value",
                found: "integer",
            })
    }
}

/// Any Unicode scalar value, shrinking toward `'0'`.
pub fn characters() -> Strategy<char> {
    Strategy::new(Characters)
}

/// Strings of characters from `alphabet`, or of any characters when no
/// alphabet is given.
///
/// An empty alphabet only produces the empty string, so it is rejected
/// when `sizes` requires at least one character.
pub fn text(alphabet: Option<&str>, sizes: SizeBounds) -> Result<Strategy<String>> {
    sizes.validate()?;
    let characters = match alphabet {
        None => characters(),
        Some(alphabet) => {
            let mut symbols: Vec<char> = Vec::new();
            for symbol in alphabet.chars() {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
            if symbols.is_empty() {
                if sizes.min_size.unwrap_or(0) > 0 {
                    return Err(Error::invalid_argument(
                        "Cannot create non-empty text from an empty alphabet",
                    ));
                }
                return Ok(just(String::new()));
            }
            sampled_from(symbols)?
        }
    };
    Ok(lists(characters, sizes)?.map(|symbols| symbols.into_iter().collect()))
}

/// Byte strings.
pub fn binary(sizes: SizeBounds) -> Result<Strategy<Vec<u8>>> {
    let bytes = integers_in(Some(0), Some(255))?.map(|byte| byte as u8);
    lists(bytes, sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw<T: 'static>(strategy: &Strategy<T>, seed: u64, count: usize) -> Vec<T> {
        let mut random = Random::from_seed(seed);
        (0..count)
            .filter_map(|_| strategy.example(&mut random).ok())
            .collect()
    }

    #[test]
    fn test_characters_shrink_toward_zero_digit() {
        let strategy = characters();
        let mut random = Random::from_seed(0);
        let template = Template::Integer('z' as i64);
        let candidates: Vec<Template> = strategy.simplify(&mut random, &template).collect();
        assert_eq!(candidates[0], Template::Integer('0' as i64));
        assert!(strategy.simplify(&mut random, &Template::Integer('0' as i64)).next().is_none());
    }

    #[test]
    fn test_characters_skip_surrogates() {
        let strategy = characters();
        let mut random = Random::from_seed(0);
        let above = Template::Integer(0xE005);
        for candidate in strategy.simplify(&mut random, &above) {
            assert!(strategy.reify(&candidate).is_ok());
        }
        assert!(strategy.reify(&Template::Integer(0xD801)).is_err());
    }

    #[test]
    fn test_text_from_alphabet() {
        let strategy = text(Some("ab"), SizeBounds::new().max(8)).unwrap();
        for value in draw(&strategy, 3, 100) {
            assert!(value.chars().count() <= 8);
            assert!(value.chars().all(|c| c == 'a' || c == 'b'));
        }
    }

    #[test]
    fn test_empty_alphabet() {
        let strategy = text(Some(""), SizeBounds::new()).unwrap();
        assert!(draw(&strategy, 1, 10).iter().all(String::is_empty));
        assert!(text(Some(""), SizeBounds::new().min(1)).is_err());
    }

    #[test]
    fn test_binary_lengths() {
        let strategy = binary(SizeBounds::new().min(2).max(4)).unwrap();
        for bytes in draw(&strategy, 5, 100) {
            assert!((2..=4).contains(&bytes.len()));
        }
    }
}
