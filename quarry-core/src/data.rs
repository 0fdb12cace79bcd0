//! Random sources for template generation.

use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rand::RngCore;

/// Splittable random seed for deterministic generation.
///
/// Seeds can be split to create independent random streams,
/// ensuring deterministic and reproducible runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed(pub u64, pub u64);

impl Seed {
    /// Create a new seed from a single value.
    pub fn from_u64(value: u64) -> Self {
        let state = splitmix64_mix(value);
        let gamma = mix_gamma(state);
        Seed(state, gamma)
    }

    /// Split a seed into two independent seeds.
    /// Uses SplitMix64 splitting strategy for independence.
    pub fn split(self) -> (Self, Self) {
        let Seed(state, gamma) = self;
        let new_state = state.wrapping_add(gamma);
        let output = splitmix64_mix(new_state);
        let new_gamma = mix_gamma(output);

        (Seed(new_state, gamma), Seed(output, new_gamma))
    }

    /// Generate the next random value and advance the seed.
    pub fn next_u64(self) -> (u64, Self) {
        let Seed(state, gamma) = self;
        let new_state = state.wrapping_add(gamma);
        let output = splitmix64_mix(new_state);
        (output, Seed(new_state, gamma))
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({}, {})", self.0, self.1)
    }
}

/// The random source threaded through every draw and simplification.
///
/// A `Random` remembers the value it was seeded with so a run can be
/// replayed, and carries an effort counter shared with every stream split
/// off from it. Filter retries and search iterations are charged against
/// that counter so one budget bounds the whole session.
///
/// Cloning a `Random` duplicates its stream: both copies produce the same
/// numbers from then on.
#[derive(Debug, Clone)]
pub struct Random {
    seed: Seed,
    origin: u64,
    effort: Rc<Cell<usize>>,
}

impl Random {
    /// Create a random source from a seed value.
    pub fn from_seed(value: u64) -> Self {
        Random {
            seed: Seed::from_u64(value),
            origin: value,
            effort: Rc::new(Cell::new(0)),
        }
    }

    /// Create a random source whose stream is determined by a hashable key.
    ///
    /// Used where a strategy needs randomness that must be a pure function of
    /// its input, such as a filter repairing a template during reify.
    pub fn for_key<K: Hash + ?Sized>(key: &K) -> Self {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Random::from_seed(hasher.finish())
    }

    /// Draw a fresh seed value from the thread-local entropy source.
    pub fn fresh_seed() -> u64 {
        rand::thread_rng().next_u64()
    }

    /// The value this source was created from.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Split off an independent stream. The child shares this source's
    /// effort counter.
    pub fn split(&mut self) -> Random {
        let (own, child) = self.seed.split();
        self.seed = own;
        let (origin, child) = child.next_u64();
        Random {
            seed: child,
            origin,
            effort: Rc::clone(&self.effort),
        }
    }

    /// Charge `amount` units of work against the shared budget.
    pub fn spend(&self, amount: usize) {
        self.effort.set(self.effort.get().saturating_add(amount));
    }

    /// Work charged so far by this source and everything split from it.
    pub fn effort(&self) -> usize {
        self.effort.get()
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Geometric draw: number of failures before the first success with
    /// success probability `p`.
    pub fn geometric(&mut self, p: f64) -> u64 {
        if !(p > 0.0) {
            return u64::MAX;
        }
        if p >= 1.0 {
            return 0;
        }
        let u = 1.0 - self.unit();
        let draw = (u.ln() / (1.0 - p).ln()).floor();
        if draw.is_finite() && draw < u64::MAX as f64 {
            draw as u64
        } else {
            u64::MAX
        }
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let (value, next) = self.seed.next_u64();
        self.seed = next;
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl fmt::Display for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Random({})", self.origin)
    }
}

/// SplitMix64 mixing function for high-quality output.
fn splitmix64_mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Generate a good gamma value for SplitMix64 splitting.
fn mix_gamma(mut z: u64) -> u64 {
    z = splitmix64_mix(z);
    // Ensure gamma is odd for maximal period
    (z | 1).wrapping_mul(0x9e3779b97f4a7c15)
}
