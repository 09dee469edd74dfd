// Deterministic, portable pseudo-random source for score compilation.
//
// Implements a 32-bit counter generator in the Mulberry32 family: the state
// is advanced by a fixed odd constant on every draw and the new state is
// mixed through two rounds of multiply/xor-shift. The 32-bit result is
// divided by 2^32 to land in [0, 1).
//
// This crate is the only source of randomness used by `keydrum`. The
// compiler draws from it for probability gates and humanize jitter, so
// the draw order there is part of the output contract: same seed and same
// score must give the same timeline on every platform.
//
// `RandomSource` is the seam the compiler is generic over. Tests plug in
// scripted sources; production code uses `DrumRng`, either seeded from the
// score header or from OS entropy when the score has no `SEED:` line.
//
// **Critical constraint: determinism.** `DrumRng::next_u32` uses wrapping
// integer arithmetic only. Do not introduce floating point into the state
// update.

use serde::{Deserialize, Serialize};

/// Additive constant applied to the state before each draw.
const STATE_INCREMENT: u32 = 0x6D2B_79F5;

/// 2^32 as a float, used to normalize a `u32` draw into [0, 1).
const TWO_POW_32: f64 = 4_294_967_296.0;

/// A stream of uniform values in [0, 1).
///
/// The compiler only ever needs unit-interval draws, so this is the whole
/// interface. Implementations must be deterministic for a given starting
/// state if compiles are expected to be reproducible.
pub trait RandomSource {
    /// Next value in [0, 1).
    fn next_unit(&mut self) -> f64;

    /// Uniform value in [-magnitude, +magnitude].
    ///
    /// Consumes exactly one draw.
    fn symmetric(&mut self, magnitude: f64) -> f64 {
        (self.next_unit() * 2.0 - 1.0) * magnitude
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Seeded 32-bit generator.
///
/// Two instances built from the same seed produce bit-identical streams.
/// Re-constructing from the seed restarts the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumRng {
    state: u32,
}

impl DrumRng {
    /// Create a generator from an integer seed.
    ///
    /// Only the low 32 bits of the seed are used, so `SEED: -1` and
    /// `SEED: 4294967295` select the same stream.
    pub fn new(seed: i64) -> Self {
        Self { state: seed as u32 }
    }

    /// Create a generator seeded from the operating system's entropy source.
    ///
    /// Falls back to the wall clock if the OS source is unavailable, logging
    /// a warning. The resulting stream is not reproducible either way.
    pub fn from_entropy() -> Self {
        let mut bytes = [0u8; 4];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => Self {
                state: u32::from_le_bytes(bytes),
            },
            Err(e) => {
                tracing::warn!("entropy source unavailable ({e}), seeding from clock");
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
                    .unwrap_or(STATE_INCREMENT);
                Self { state: nanos }
            }
        }
    }

    /// Generate the next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(STATE_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Generate a uniform `f64` in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

impl RandomSource for DrumRng {
    fn next_unit(&mut self) -> f64 {
        self.next_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = DrumRng::new(42);
        let mut b = DrumRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = DrumRng::new(42);
        let mut b = DrumRng::new(43);
        // Extremely unlikely to collide on the first value.
        assert_ne!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn reconstructing_restarts_the_stream() {
        let mut rng = DrumRng::new(7);
        let first: Vec<u32> = (0..16).map(|_| rng.next_u32()).collect();
        let mut again = DrumRng::new(7);
        let second: Vec<u32> = (0..16).map(|_| again.next_u32()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn known_values_from_seed_one() {
        // Reference outputs of the Mulberry32 mixing function for seed 1.
        let mut rng = DrumRng::new(1);
        assert_eq!(rng.next_u32(), 2_693_262_067);
        assert_eq!(rng.next_u32(), 11_749_833);
    }

    #[test]
    fn seed_uses_low_32_bits() {
        let mut a = DrumRng::new(-1);
        let mut b = DrumRng::new(u32::MAX as i64);
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = DrumRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn symmetric_within_bounds() {
        let mut rng = DrumRng::new(777);
        for _ in 0..10_000 {
            let v = rng.symmetric(8.0);
            assert!((-8.0..=8.0).contains(&v), "symmetric out of range: {v}");
        }
    }

    #[test]
    fn mean_is_roughly_centered() {
        let mut rng = DrumRng::new(42);
        let n = 10_000;
        let sum: f64 = (0..n).map(|_| rng.next_f64()).sum();
        let mean = sum / n as f64;
        assert!((0.45..0.55).contains(&mean), "mean drifted: {mean}");
    }

    #[test]
    fn borrowed_source_advances_the_owner() {
        fn draw<R: RandomSource>(mut source: R) -> f64 {
            source.next_unit()
        }
        let mut rng = DrumRng::new(5);
        draw(&mut rng);
        let mut fresh = DrumRng::new(5);
        fresh.next_f64();
        assert_eq!(rng, fresh);
    }

    #[test]
    fn entropy_generators_produce_unit_values() {
        let mut rng = DrumRng::from_entropy();
        let v = rng.next_f64();
        assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = DrumRng::new(42);
        for _ in 0..100 {
            rng.next_u32();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: DrumRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u32(), restored.next_u32());
        }
    }
}
