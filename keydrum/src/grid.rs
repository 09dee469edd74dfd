// Grid and tempo arithmetic.
//
// A grid is a rhythmic subdivision written as "1 over denominator" (1/8,
// 1/16, 1/32). Time is fixed at 4/4, so a bar is always four beats and the
// step count per bar follows from the denominator alone. Everything here is
// pure arithmetic on the tempo and the grid; nothing holds state.
//
// The compiler derives a `GridTiming` once per track (tracks may override
// the grid and the step count) and once per section from the header grid.
// The section-level timing is what lays sections end to end; see
// `compiler.rs`.

use serde::{Deserialize, Serialize};

/// Number of micro-steps in one step. Micro-shifts (`^n`) and roll spacing
/// are expressed in this unit.
pub const MICRO_STEPS_PER_STEP: u32 = 4;

/// Beats in a bar. Only 4/4 is supported.
pub const BEATS_PER_BAR: u32 = 4;

/// A supported rhythmic subdivision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Grid {
    /// 1/8: two steps per beat.
    Eighth,
    /// 1/16: four steps per beat.
    #[default]
    Sixteenth,
    /// 1/32: eight steps per beat.
    ThirtySecond,
}

impl Grid {
    pub const ALL: [Grid; 3] = [Grid::Eighth, Grid::Sixteenth, Grid::ThirtySecond];

    /// The denominator of the "1/n" notation.
    pub fn denominator(self) -> u32 {
        match self {
            Grid::Eighth => 8,
            Grid::Sixteenth => 16,
            Grid::ThirtySecond => 32,
        }
    }

    pub fn from_denominator(denominator: u32) -> Option<Grid> {
        Grid::ALL.into_iter().find(|g| g.denominator() == denominator)
    }

    /// Parse `1/8`, `1/16`, `1/32`, or the bare denominators `8`, `16`, `32`.
    pub fn parse(text: &str) -> Option<Grid> {
        let text = text.trim();
        let denominator = match text.split_once('/') {
            Some((one, den)) if one.trim() == "1" => den.trim(),
            Some(_) => return None,
            None => text,
        };
        denominator.parse().ok().and_then(Grid::from_denominator)
    }

    pub fn steps_per_beat(self) -> u32 {
        self.denominator() / BEATS_PER_BAR
    }

    pub fn steps_per_bar(self) -> u32 {
        self.steps_per_beat() * BEATS_PER_BAR
    }

    /// Derive step and bar durations for this grid at `tempo_bpm`.
    pub fn timing(self, tempo_bpm: f64) -> GridTiming {
        GridTiming::new(self, tempo_bpm, None)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1/{}", self.denominator())
    }
}

/// Durations derived from a grid and tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTiming {
    pub steps_per_beat: u32,
    /// Steps rendered per bar. Equal to the grid's natural count unless a
    /// track's `LEN=` override replaced it.
    pub steps_per_bar: u32,
    pub step_ms: f64,
    pub bar_ms: f64,
}

impl GridTiming {
    /// Compute timing for `grid` at `tempo_bpm`, optionally replacing the
    /// steps-per-bar count (polymeter). The step duration always comes from
    /// the grid; an override only changes how many steps make up a bar.
    pub fn new(grid: Grid, tempo_bpm: f64, steps_per_bar: Option<u32>) -> Self {
        let steps_per_beat = grid.steps_per_beat();
        let steps_per_bar = steps_per_bar.unwrap_or_else(|| grid.steps_per_bar());
        let step_ms = (60_000.0 / tempo_bpm) / f64::from(steps_per_beat);
        GridTiming {
            steps_per_beat,
            steps_per_bar,
            step_ms,
            bar_ms: step_ms * f64::from(steps_per_bar),
        }
    }

    /// Duration of one micro-step.
    pub fn micro_ms(&self) -> f64 {
        self.step_ms / f64::from(MICRO_STEPS_PER_STEP)
    }
}
