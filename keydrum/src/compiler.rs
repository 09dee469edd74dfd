// Compiler: structured score into a time-ordered event list.
//
// Walks the play order (the explicit `ORDER:` sequence, or every section in
// encounter order) with a running cursor starting at 0 ms. Names that match
// no section are skipped and take no time. For each section, every track is
// rendered on its own grid:
//
//   bars rendered = max(ceil(cells / steps_per_bar), header bars)
//   time = cursor + bar·steps_per_bar·step_ms + step·step_ms
//          + swing + micro_shift·micro_ms + humanize
//
// so a long pattern is never truncated and a short one still spans the
// header's bar count, with steps past its last cell silent. Those silent
// steps are never visited: work follows the cell count, not the bar or
// `LEN=` count.
//
// Each hit token takes one generator draw for its probability gate (always,
// even at 100%); tokens that survive take one more draw for humanize jitter
// when the header sets a humanize bound. That draw order is fixed: it is
// what makes a seeded compile reproducible.
//
// Swing delays odd steps within the bar by `((swing-50)/50) · step_ms/2`
// once swing exceeds 50. Even steps never move.
//
// A section's events are sorted by time and appended to the output, then
// the cursor advances by exactly one section length: header bars × the bar
// length of the header grid. Track overrides and overrunning patterns do
// not change that; an overrunning track simply spills into the next
// section's window. Finally the whole list is shifted so the earliest event
// sits at 0 ms.
//
// Compiles are synchronous and perform no I/O. The only state carried from
// one compile to the next is the generator's position.

use crate::expand::expand_cell;
use crate::grid::GridTiming;
use crate::pattern::tokenize;
use crate::score::{Header, Score, Section, TimedEvent, TrackLine};
use keydrum_prng::{DrumRng, RandomSource};

/// Swing amounts at or below this are straight time.
pub const SWING_NEUTRAL: f64 = 50.0;

/// Compiles scores using an owned random source.
#[derive(Debug, Clone)]
pub struct Compiler<R = DrumRng> {
    rng: R,
}

impl Compiler<DrumRng> {
    pub fn with_seed(seed: i64) -> Self {
        Compiler::new(DrumRng::new(seed))
    }

    /// Seeded from the header's `SEED:` when present, from OS entropy
    /// otherwise.
    pub fn for_header(header: &Header) -> Self {
        match header.seed {
            Some(seed) => Compiler::with_seed(seed),
            None => Compiler::new(DrumRng::from_entropy()),
        }
    }
}

impl<R: RandomSource> Compiler<R> {
    pub fn new(rng: R) -> Self {
        Compiler { rng }
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn into_rng(self) -> R {
        self.rng
    }

    /// Compile the whole score. The result is sorted within each section and
    /// starts at 0 ms when non-empty.
    pub fn compile(&mut self, score: &Score) -> Vec<TimedEvent> {
        let header = &score.header;
        let section_ms = header.section_ms();
        let mut cursor = 0.0;
        let mut events = Vec::new();

        for name in score.play_order() {
            let Some(section) = score.section(name) else {
                tracing::debug!(section = name, "skipping unknown section in order");
                continue;
            };
            let mut section_events = self.compile_section(header, section, cursor);
            section_events.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
            tracing::trace!(
                section = name,
                cursor,
                events = section_events.len(),
                "compiled section"
            );
            events.append(&mut section_events);
            cursor += section_ms;
        }

        normalize_to_zero(&mut events);
        events
    }

    fn compile_section(&mut self, header: &Header, section: &Section, cursor: f64) -> Vec<TimedEvent> {
        let mut events = Vec::new();
        for track in &section.tracks {
            self.compile_track(header, track, cursor, &mut events);
        }
        events
    }

    fn compile_track(
        &mut self,
        header: &Header,
        track: &TrackLine,
        cursor: f64,
        out: &mut Vec<TimedEvent>,
    ) {
        let timing = track.timing(header);
        let cells = tokenize(&track.pattern);
        let steps_per_bar = timing.steps_per_bar as usize;

        for (index, cell) in cells.iter().enumerate() {
            let (bar, step) = (index / steps_per_bar, index % steps_per_bar);
            for token in expand_cell(track.instrument, cell) {
                let draw = self.rng.next_unit();
                if token.probability < 100 && draw * 100.0 > f64::from(token.probability) {
                    continue;
                }
                let jitter = match header.humanize_ms {
                    Some(magnitude) => self.rng.symmetric(magnitude),
                    None => 0.0,
                };
                let time_ms = cursor
                    + bar as f64 * timing.steps_per_bar as f64 * timing.step_ms
                    + step as f64 * timing.step_ms
                    + swing_offset(header.swing, step, &timing)
                    + token.micro_shift as f64 * timing.micro_ms()
                    + jitter;
                out.push(TimedEvent {
                    time_ms,
                    instrument: token.instrument,
                    velocity: token.velocity,
                });
            }
        }
    }
}

/// Delay applied to `step` (index within the bar) for a swing amount.
pub fn swing_offset(swing: f64, step: usize, timing: &GridTiming) -> f64 {
    if swing <= SWING_NEUTRAL || step % 2 == 0 {
        return 0.0;
    }
    ((swing - SWING_NEUTRAL) / SWING_NEUTRAL) * (timing.step_ms * 0.5)
}

/// Shift every event so the earliest one is at 0 ms.
fn normalize_to_zero(events: &mut [TimedEvent]) {
    let Some(min) = events.iter().map(|e| e.time_ms).reduce(f64::min) else {
        return;
    };
    for event in events {
        event.time_ms -= min;
    }
}

/// Compile with a generator chosen from the header.
pub fn compile_score(score: &Score) -> Vec<TimedEvent> {
    Compiler::for_header(&score.header).compile(score)
}

/// Where one section occurrence sits on the nominal timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpan {
    pub name: String,
    pub start_ms: f64,
    pub length_ms: f64,
}

/// The nominal section layout of a score, before normalization. Unknown
/// names in the order are left out, as they are when compiling.
pub fn section_spans(score: &Score) -> Vec<SectionSpan> {
    let length_ms = score.section_ms();
    score
        .play_order()
        .into_iter()
        .filter(|name| score.section(name).is_some())
        .enumerate()
        .map(|(i, name)| SectionSpan {
            name: name.to_string(),
            start_ms: i as f64 * length_ms,
            length_ms,
        })
        .collect()
}
