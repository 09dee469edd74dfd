// keydrum: drum notation compiler.
//
// Compiles line-oriented drum notation ("score text") into a deterministic,
// time-ordered list of note events, each an absolute millisecond offset, an
// instrument symbol, and a velocity. An external player turns those events
// into keystrokes; this crate never schedules anything itself.
//
// Architecture:
// - grid.rs: Grid/tempo arithmetic (step, micro-step, and bar durations)
// - score.rs: Structured score (header, sections, track lines, order) and
//   the `TimedEvent` output type
// - pattern.rs: Per-track pattern tokenizer (cells, hit markers, modifiers)
// - expand.rs: Cell expansion into hit tokens (velocity, probability,
//   micro-shift, rolls)
// - parser.rs: Lenient line-oriented parser, score text into `Score`
// - compiler.rs: Timeline assembly (sections, swing, humanize, gating,
//   zero-normalization)
// - kit.rs: Instrument-to-key/MIDI-note mapping loaded from JSON
// - midi.rs: Standard MIDI File export of a compiled timeline
// - error.rs: `ScoreError`
//
// Randomness comes from `keydrum_prng`. With a `SEED:` line the output is
// bit-identical across runs; without one the compiler seeds from entropy.

pub mod compiler;
pub mod error;
pub mod expand;
pub mod grid;
pub mod kit;
pub mod midi;
pub mod parser;
pub mod pattern;
pub mod score;

pub use compiler::{Compiler, compile_score};
pub use error::{Result, ScoreError};
pub use parser::{parse_score, parse_score_bytes, parse_score_with_report};
pub use score::{Instrument, Score, TimedEvent};
