// Structured score: the parser's output and the compiler's input.
//
// A score is a global `Header`, a list of named `Section`s (each owning its
// `TrackLine`s in the order they were written), and an optional finite play
// order. The order is stored already expanded: `A x2, B x1` becomes
// `["A", "A", "B"]`. Names in the order that match no section are kept as
// written; the compiler skips them.
//
// `TimedEvent` is the compiler's output unit and lives here too since the
// MIDI writer and the CLI consume it without touching the compiler.
//
// Nothing in here is mutated after parsing. The compiler only reads.

use crate::grid::{Grid, GridTiming};
use serde::{Deserialize, Serialize};

/// Name of the section that collects track lines written before any
/// `[Section]` header. It always exists, even when empty.
pub const DEFAULT_SECTION: &str = "Default";

/// One of the six playable instruments. The letters are the keys the
/// external player presses; `KitConfig` maps them to sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    Q,
    W,
    E,
    R,
    T,
    Y,
}

impl Instrument {
    pub const ALL: [Instrument; 6] = [
        Instrument::Q,
        Instrument::W,
        Instrument::E,
        Instrument::R,
        Instrument::T,
        Instrument::Y,
    ];

    /// Case-insensitive lookup from a single-letter symbol.
    pub fn from_symbol(symbol: &str) -> Option<Instrument> {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "Q" => Some(Instrument::Q),
            "W" => Some(Instrument::W),
            "E" => Some(Instrument::E),
            "R" => Some(Instrument::R),
            "T" => Some(Instrument::T),
            "Y" => Some(Instrument::Y),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Instrument::Q => 'Q',
            Instrument::W => 'W',
            Instrument::E => 'E',
            Instrument::R => 'R',
            Instrument::T => 'T',
            Instrument::Y => 'Y',
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Global score settings. Absent keys keep these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Quarter notes per minute. Always positive.
    pub tempo_bpm: f64,
    /// Nominal bars per section. Always at least 1.
    pub bars: u32,
    pub grid: Grid,
    /// Swing amount. Values at or below 50 mean straight time.
    pub swing: f64,
    /// When present, compiles are reproducible.
    pub seed: Option<i64>,
    /// Symmetric humanize bound in milliseconds.
    pub humanize_ms: Option<f64>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            tempo_bpm: 120.0,
            bars: 1,
            grid: Grid::Sixteenth,
            swing: 0.0,
            seed: None,
            humanize_ms: None,
        }
    }
}

impl Header {
    /// Timing of the header grid; sets the section length.
    pub fn timing(&self) -> GridTiming {
        self.grid.timing(self.tempo_bpm)
    }

    /// Duration of one section occurrence: `bars × bar_ms` on the header
    /// grid, regardless of what the section's tracks override.
    pub fn section_ms(&self) -> f64 {
        f64::from(self.bars) * self.timing().bar_ms
    }
}

/// Per-track overrides written after `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackModifier {
    pub grid: Option<Grid>,
    /// Steps per bar, independent of the grid (polymeter).
    pub length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLine {
    pub instrument: Instrument,
    pub modifier: TrackModifier,
    /// Pattern text as written, including bar separators and whitespace.
    pub pattern: String,
}

impl TrackLine {
    /// Resolve this track's grid and step count against the header.
    pub fn timing(&self, header: &Header) -> GridTiming {
        let grid = self.modifier.grid.unwrap_or(header.grid);
        GridTiming::new(grid, header.tempo_bpm, self.modifier.length)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub tracks: Vec<TrackLine>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Section {
            name: name.into(),
            tracks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub header: Header,
    /// Sections in the order they were first referenced. Names are unique.
    pub sections: Vec<Section>,
    /// Expanded play order, if the score had an `ORDER:` line.
    pub order: Option<Vec<String>>,
}

impl Default for Score {
    fn default() -> Self {
        Score {
            header: Header::default(),
            sections: vec![Section::new(DEFAULT_SECTION)],
            order: None,
        }
    }
}

impl Score {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// The section names to play, in sequence: the explicit order when one
    /// was given, otherwise every section in encounter order.
    pub fn play_order(&self) -> Vec<&str> {
        match &self.order {
            Some(order) => order.iter().map(String::as_str).collect(),
            None => self.sections.iter().map(|s| s.name.as_str()).collect(),
        }
    }

    pub fn section_ms(&self) -> f64 {
        self.header.section_ms()
    }
}

/// A scheduled hit: the compiler's output unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Offset from the start of playback. May be fractional.
    pub time_ms: f64,
    pub instrument: Instrument,
    /// MIDI-style velocity, 0–127.
    pub velocity: u8,
}

impl TimedEvent {
    /// Offset rounded to whole milliseconds, for schedulers that work in
    /// integral time.
    pub fn rounded_ms(&self) -> u64 {
        self.time_ms.round().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_lookup_is_case_insensitive() {
        assert_eq!(Instrument::from_symbol("q"), Some(Instrument::Q));
        assert_eq!(Instrument::from_symbol("Y"), Some(Instrument::Y));
        assert_eq!(Instrument::from_symbol("Z"), None);
        assert_eq!(Instrument::from_symbol("QW"), None);
    }

    #[test]
    fn default_score_has_empty_default_section() {
        let score = Score::default();
        assert_eq!(score.sections.len(), 1);
        assert_eq!(score.sections[0].name, DEFAULT_SECTION);
        assert!(score.sections[0].tracks.is_empty());
        assert_eq!(score.play_order(), vec![DEFAULT_SECTION]);
    }

    #[test]
    fn section_length_uses_header_grid_and_bars() {
        let header = Header {
            bars: 2,
            ..Header::default()
        };
        assert_eq!(header.section_ms(), 4000.0);
        let eighth = Header {
            bars: 2,
            grid: Grid::Eighth,
            ..Header::default()
        };
        assert_eq!(eighth.section_ms(), 4000.0);
    }

    #[test]
    fn track_timing_prefers_overrides() {
        let header = Header::default();
        let track = TrackLine {
            instrument: Instrument::E,
            modifier: TrackModifier {
                grid: Some(Grid::Eighth),
                length: Some(6),
            },
            pattern: String::new(),
        };
        let t = track.timing(&header);
        assert_eq!(t.step_ms, 250.0);
        assert_eq!(t.steps_per_bar, 6);
    }

    #[test]
    fn explicit_order_replaces_encounter_order() {
        let mut score = Score::default();
        score.sections.push(Section::new("A"));
        score.order = Some(vec!["A".into(), "Missing".into(), "A".into()]);
        assert_eq!(score.play_order(), vec!["A", "Missing", "A"]);
    }

    #[test]
    fn rounded_ms_rounds_half_up() {
        let ev = TimedEvent {
            time_ms: 31.5,
            instrument: Instrument::Q,
            velocity: 96,
        };
        assert_eq!(ev.rounded_ms(), 32);
    }
}
