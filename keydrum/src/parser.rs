// Score text parser.
//
// Line-oriented. Each line is handed to `classify_line`, which recognizes,
// in priority order:
//
//   %humanize=±Nms                   humanize directive
//   ORDER: A x2, B x∞, C             play order (∞ plays once)
//   [Name]                           section header
//   BPM: / BARS: / GRID: / SWING: / SEED:   header fields
//   Q@1/8,LEN=12: x . x .            track line
//
// Keywords are case-insensitive. Blank lines and `#` comments are skipped.
//
// Leniency policy: a line that matches none of the forms above is dropped
// and parsing continues; a typo on one line never costs the rest of the
// score. Dropped lines are logged at debug level and collected in a
// `ParseReport` for callers that want to show them. The one exception is a
// recognized header key (or humanize directive) whose value is unusable:
// that is a hard `ScoreError::InvalidField` carrying the line number.
//
// Sections are created on first reference. Track lines before any section
// header land in the always-present "Default" section. Writing a section
// header a second time reopens it.

use crate::error::{Result, ScoreError};
use crate::grid::Grid;
use crate::score::{Instrument, Score, Section, TrackLine, TrackModifier};
use rustc_hash::FxHashMap;

/// Largest repeat count an `ORDER:` entry may carry. Entries above it are
/// dropped.
pub const MAX_REPEAT: u32 = 1024;

/// One classified line of score text.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Humanize(f64),
    Order(Vec<String>),
    Section(String),
    Header(HeaderField),
    Track(TrackLine),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderField {
    Tempo(f64),
    Bars(u32),
    Grid(Grid),
    Swing(f64),
    Seed(i64),
}

/// A line that was not understood and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLine {
    /// 1-based line number.
    pub line: usize,
    pub text: String,
}

/// Side information from a parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub dropped: Vec<DroppedLine>,
}

/// Parse score text into a `Score`.
pub fn parse_score(text: &str) -> Result<Score> {
    parse_score_with_report(text).map(|(score, _)| score)
}

/// Parse raw bytes, rejecting input that is not UTF-8.
pub fn parse_score_bytes(bytes: &[u8]) -> Result<Score> {
    parse_score(std::str::from_utf8(bytes)?)
}

/// Parse score text, also returning the lines that were dropped.
pub fn parse_score_with_report(text: &str) -> Result<(Score, ParseReport)> {
    let mut builder = ScoreBuilder::new();
    let mut report = ParseReport::default();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match classify_line(trimmed, line_no)? {
            Some(line) => builder.apply(line),
            None => {
                tracing::debug!(line = line_no, text = trimmed, "dropping unrecognized line");
                report.dropped.push(DroppedLine {
                    line: line_no,
                    text: trimmed.to_string(),
                });
            }
        }
    }

    Ok((builder.finish(), report))
}

/// Accumulates classified lines into a score.
struct ScoreBuilder {
    score: Score,
    index: FxHashMap<String, usize>,
    current: usize,
}

impl ScoreBuilder {
    fn new() -> Self {
        let score = Score::default();
        let index = score
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        ScoreBuilder {
            score,
            index,
            current: 0,
        }
    }

    fn apply(&mut self, line: Line) {
        match line {
            Line::Humanize(ms) => self.score.header.humanize_ms = Some(ms),
            Line::Header(field) => self.apply_header(field),
            Line::Order(order) => self.score.order = Some(order),
            Line::Section(name) => self.current = self.section_index(name),
            Line::Track(track) => self.score.sections[self.current].tracks.push(track),
        }
    }

    fn apply_header(&mut self, field: HeaderField) {
        let header = &mut self.score.header;
        match field {
            HeaderField::Tempo(bpm) => header.tempo_bpm = bpm,
            HeaderField::Bars(bars) => header.bars = bars,
            HeaderField::Grid(grid) => header.grid = grid,
            HeaderField::Swing(swing) => header.swing = swing,
            HeaderField::Seed(seed) => header.seed = Some(seed),
        }
    }

    fn section_index(&mut self, name: String) -> usize {
        if let Some(&i) = self.index.get(&name) {
            return i;
        }
        let i = self.score.sections.len();
        self.score.sections.push(Section::new(name.clone()));
        self.index.insert(name, i);
        i
    }

    fn finish(self) -> Score {
        self.score
    }
}

/// Classify one trimmed, non-comment line.
///
/// Returns `Ok(None)` for lines matching no form; the caller drops those.
pub fn classify_line(line: &str, line_no: usize) -> Result<Option<Line>> {
    if let Some(rest) = strip_prefix_ignore_case(line, "%humanize") {
        return match rest.trim_start().strip_prefix('=') {
            Some(value) => parse_humanize(value, line_no).map(Some),
            None => Ok(None),
        };
    }

    if let Some(entries) = strip_prefix_ignore_case(line, "order")
        .and_then(|rest| rest.trim_start().strip_prefix(':'))
    {
        return Ok(Some(Line::Order(parse_order(entries))));
    }

    if let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        let name = inner.trim();
        return Ok((!name.is_empty()).then(|| Line::Section(name.to_string())));
    }

    let Some((key, value)) = line.split_once(':') else {
        return Ok(None);
    };
    let key = key.trim();
    let value = value.trim();

    if let Some(field) = parse_header_field(key, value, line_no)? {
        return Ok(Some(Line::Header(field)));
    }

    Ok(parse_track(key, value).map(Line::Track))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// `±N`, `+N`, `-N`, or `N`, with an optional `ms` suffix. The sign is
/// irrelevant; jitter is symmetric.
fn parse_humanize(value: &str, line_no: usize) -> Result<Line> {
    let raw = value.trim();
    let mut number = raw.trim_start_matches(['±', '+', '-']).trim();
    if let Some(stripped) = strip_suffix_ignore_case(number, "ms") {
        number = stripped.trim_end();
    }
    number
        .parse::<u32>()
        .map(|ms| Line::Humanize(f64::from(ms)))
        .map_err(|_| ScoreError::invalid(line_no, "humanize", raw))
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    let tail = text.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..split])
}

/// Expand `A x2, B x∞, C` into `["A", "A", "B", "C"]`. An entry without
/// a repeat marker plays once.
fn parse_order(entries: &str) -> Vec<String> {
    let mut order = Vec::new();
    for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let split = entry
            .rsplit_once(char::is_whitespace)
            .and_then(|(name, marker)| Some((name.trim(), parse_repeat(marker)?)));
        let (name, count) = match split {
            Some((name, Some(count))) => (name, count),
            Some((_, None)) => {
                tracing::debug!(entry, "dropping order entry with oversized repeat count");
                continue;
            }
            None => (entry, 1),
        };
        order.extend((0..count).map(|_| name.to_string()));
    }
    order
}

/// Parse a repeat marker `xN` or `x∞`. `∞` plays once: looping is not
/// modeled. Returns `None` when `marker` is not a repeat marker at all and
/// `Some(None)` when the count exceeds `MAX_REPEAT`.
fn parse_repeat(marker: &str) -> Option<Option<u32>> {
    let count = marker.strip_prefix(['x', 'X'])?;
    if count == "∞" {
        return Some(Some(1));
    }
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(count.parse().ok().filter(|&n| n <= MAX_REPEAT))
}

fn parse_header_field(key: &str, value: &str, line_no: usize) -> Result<Option<HeaderField>> {
    let invalid = |field| ScoreError::invalid(line_no, field, value);
    let field = match key.to_ascii_uppercase().as_str() {
        "BPM" => match value.parse::<f64>() {
            Ok(bpm) if bpm.is_finite() && bpm > 0.0 => HeaderField::Tempo(bpm),
            _ => return Err(invalid("BPM")),
        },
        "BARS" => match value.parse::<u32>() {
            Ok(bars) if bars >= 1 => HeaderField::Bars(bars),
            _ => return Err(invalid("BARS")),
        },
        "GRID" => HeaderField::Grid(Grid::parse(value).ok_or_else(|| invalid("GRID"))?),
        "SWING" => match value.parse::<f64>() {
            Ok(swing) if swing.is_finite() => HeaderField::Swing(swing),
            _ => return Err(invalid("SWING")),
        },
        "SEED" => HeaderField::Seed(value.parse().map_err(|_| invalid("SEED"))?),
        _ => return Ok(None),
    };
    Ok(Some(field))
}

/// `<Instrument>[@mod,mod,...]` followed by the pattern.
fn parse_track(key: &str, pattern: &str) -> Option<TrackLine> {
    let (symbol, mods) = match key.split_once('@') {
        Some((symbol, mods)) => (symbol, Some(mods)),
        None => (key, None),
    };
    let instrument = Instrument::from_symbol(symbol)?;
    Some(TrackLine {
        instrument,
        modifier: mods.map(parse_track_modifier).unwrap_or_default(),
        pattern: pattern.to_string(),
    })
}

/// Comma-separated `1/8`, `GRID=1/32`, `LEN=12`. Unknown or invalid
/// entries are ignored.
fn parse_track_modifier(mods: &str) -> TrackModifier {
    let mut modifier = TrackModifier::default();
    for entry in mods.split(',').map(str::trim) {
        if let Some(grid) = strip_prefix_ignore_case(entry, "grid=") {
            if let Some(grid) = Grid::parse(grid) {
                modifier.grid = Some(grid);
            }
        } else if let Some(len) = strip_prefix_ignore_case(entry, "len=") {
            if let Some(len) = len.trim().parse::<u32>().ok().filter(|&n| n >= 1) {
                modifier.length = Some(len);
            }
        } else if let Some(grid) = Grid::parse(entry) {
            modifier.grid = Some(grid);
        }
    }
    modifier
}
