// Cell expansion: one hit cell into concrete hit tokens.
//
// The marker picks a base velocity (normal 96, accent 115, ghost 60, rolls
// use the normal baseline). Modifier suffixes then override velocity,
// probability, and micro-shift; when a suffix repeats, the last one wins.
// Velocity is clamped to 0–127 and probability to 0–100.
//
// A roll `rN` with N ≥ 2 becomes N tokens spread across one step: sub-hit i
// (0-based) is shifted by `round(i × 4 / N)` micro-steps on top of the
// cell's own shift. With N = 4 that is 0, 1, 2, 3. Every sub-hit shares the
// same velocity, probability, and instrument and is gated separately by the
// compiler.

use crate::grid::MICRO_STEPS_PER_STEP;
use crate::pattern::{Cell, HitKind, Modifier};
use crate::score::Instrument;
use smallvec::SmallVec;

pub const NORMAL_VELOCITY: u8 = 96;
pub const ACCENT_VELOCITY: u8 = 115;
pub const GHOST_VELOCITY: u8 = 60;
pub const MAX_VELOCITY: u8 = 127;
pub const MAX_PROBABILITY: u8 = 100;

/// A single schedulable hit before timing is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitToken {
    pub instrument: Instrument,
    pub velocity: u8,
    /// Trigger chance in percent.
    pub probability: u8,
    /// Offset from the step start in micro-steps. May be negative.
    pub micro_shift: i64,
}

/// Most cells produce one token; short rolls still fit inline.
pub type HitTokens = SmallVec<[HitToken; 4]>;

impl HitKind {
    pub fn base_velocity(self) -> u8 {
        match self {
            HitKind::Normal | HitKind::Roll(_) => NORMAL_VELOCITY,
            HitKind::Accent => ACCENT_VELOCITY,
            HitKind::Ghost => GHOST_VELOCITY,
        }
    }
}

/// Expand one cell for `instrument`. Empty cells yield nothing.
pub fn expand_cell(instrument: Instrument, cell: &Cell) -> HitTokens {
    let Cell::Hit { kind, mods } = cell else {
        return HitTokens::new();
    };

    let mut velocity = i64::from(kind.base_velocity());
    let mut probability = i64::from(MAX_PROBABILITY);
    let mut micro_shift = 0i64;
    for modifier in mods {
        match *modifier {
            Modifier::Shift(shift) => micro_shift = shift,
            Modifier::Attributes { velocity: Some(v) } => velocity = v,
            Modifier::Attributes { velocity: None } | Modifier::Continuation => {}
            Modifier::Probability(p) => probability = p,
        }
    }

    let base = HitToken {
        instrument,
        velocity: velocity.clamp(0, i64::from(MAX_VELOCITY)) as u8,
        probability: probability.clamp(0, i64::from(MAX_PROBABILITY)) as u8,
        micro_shift,
    };

    match *kind {
        HitKind::Roll(count) if count >= 2 => (0..count)
            .map(|i| HitToken {
                micro_shift: base.micro_shift.saturating_add(roll_offset(i, count)),
                ..base
            })
            .collect(),
        _ => smallvec::smallvec![base],
    }
}

/// Micro-step offset of sub-hit `index` within a roll of `count`.
fn roll_offset(index: u32, count: u32) -> i64 {
    (f64::from(index) * f64::from(MICRO_STEPS_PER_STEP) / f64::from(count)).round() as i64
}
