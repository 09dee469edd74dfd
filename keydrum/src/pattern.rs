// Pattern tokenizer: per-track pattern text into a sequence of cells.
//
// A pattern is read left to right after removing whitespace and bar
// separators (`|`). Each cell is either empty (`.` or `-`) or a hit marker
// followed by any number of modifier suffixes:
//
//   x        normal hit            ^n, ^-n, ^+n   micro-shift (quarter steps)
//   X        accent hit            {...vel=n...}  attribute block
//   g        ghost hit             [p=n]          trigger probability
//   rN       roll of N sub-hits    -              no-op continuation
//
// Suffixes are consumed greedily and in any order, so `x-` is one cell, not
// a hit followed by a rest. A suffix that does not complete (`^` with no
// digits, a `{` with no closing `}`) ends the suffix run and its characters
// are then scanned as ordinary input. Characters that start no cell are
// skipped. Tokenizing never fails.
//
// The scanner works over a `Vec<char>` with an explicit cursor; each grammar
// piece is its own small function returning the parsed value and the new
// cursor, which keeps the modifier grammar testable on its own.

/// Rolls longer than this are clamped. Sub-hits past four per step already
/// land on shared micro-steps.
pub const MAX_ROLL: u32 = 64;

/// The marker that starts a hit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Normal,
    Accent,
    Ghost,
    /// `rN`. A count below 2 plays as a single hit.
    Roll(u32),
}

/// A suffix attached to a hit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `^n`: shift by n micro-steps (4 per step).
    Shift(i64),
    /// `{...}`: only `vel=` is understood; anything else is ignored.
    Attributes { velocity: Option<i64> },
    /// `[p=n]`
    Probability(i64),
    /// A bare `-` directly after a hit.
    Continuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Hit { kind: HitKind, mods: Vec<Modifier> },
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Remove whitespace and bar separators.
pub fn strip_pattern(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '|')
        .collect()
}

/// Tokenize a pattern into cells. Accepts raw or already stripped text.
pub fn tokenize(pattern: &str) -> Vec<Cell> {
    let chars: Vec<char> = strip_pattern(pattern).chars().collect();
    let mut cells = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        match chars[pos] {
            '.' | '-' => {
                cells.push(Cell::Empty);
                pos += 1;
            }
            'x' | 'X' | 'g' | 'r' => {
                let (kind, after_marker) = scan_marker(&chars, pos);
                let (mods, after_mods) = scan_modifiers(&chars, after_marker);
                cells.push(Cell::Hit { kind, mods });
                pos = after_mods;
            }
            _ => pos += 1,
        }
    }

    cells
}

/// Scan a hit marker at `pos`, which must hold one of `x X g r`.
fn scan_marker(chars: &[char], pos: usize) -> (HitKind, usize) {
    match chars[pos] {
        'X' => (HitKind::Accent, pos + 1),
        'g' => (HitKind::Ghost, pos + 1),
        'r' => match scan_digits(chars, pos + 1) {
            Some((count, end)) => {
                let count = u32::try_from(count).unwrap_or(MAX_ROLL).min(MAX_ROLL);
                (HitKind::Roll(count), end)
            }
            // `r` with no count degrades to a plain hit.
            None => (HitKind::Normal, pos + 1),
        },
        _ => (HitKind::Normal, pos + 1),
    }
}

/// Greedily consume modifier suffixes starting at `pos`.
fn scan_modifiers(chars: &[char], mut pos: usize) -> (Vec<Modifier>, usize) {
    let mut mods = Vec::new();
    while let Some((modifier, end)) = scan_modifier(chars, pos) {
        mods.push(modifier);
        pos = end;
    }
    (mods, pos)
}

fn scan_modifier(chars: &[char], pos: usize) -> Option<(Modifier, usize)> {
    match chars.get(pos)? {
        '^' => {
            let (shift, end) = scan_signed(chars, pos + 1)?;
            Some((Modifier::Shift(shift), end))
        }
        '{' => {
            let close = chars[pos + 1..].iter().position(|&c| c == '}')? + pos + 1;
            let body: String = chars[pos + 1..close].iter().collect();
            Some((
                Modifier::Attributes {
                    velocity: attribute_velocity(&body),
                },
                close + 1,
            ))
        }
        '[' => {
            let key = chars.get(pos + 1)?;
            if !key.eq_ignore_ascii_case(&'p') || chars.get(pos + 2) != Some(&'=') {
                return None;
            }
            let (probability, end) = scan_signed(chars, pos + 3)?;
            if chars.get(end) != Some(&']') {
                return None;
            }
            Some((Modifier::Probability(probability), end + 1))
        }
        '-' => Some((Modifier::Continuation, pos + 1)),
        _ => None,
    }
}

/// Find `vel=<int>` among the comma- or semicolon-separated entries of an
/// attribute block. The last well-formed entry wins.
fn attribute_velocity(body: &str) -> Option<i64> {
    body.split([',', ';'])
        .rev()
        .find_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            if !key.eq_ignore_ascii_case("vel") {
                return None;
            }
            let chars: Vec<char> = value.chars().collect();
            match scan_signed(&chars, 0)? {
                (v, end) if end == chars.len() => Some(v),
                _ => None,
            }
        })
}

/// Scan an optionally signed decimal integer. Saturates instead of
/// overflowing.
fn scan_signed(chars: &[char], pos: usize) -> Option<(i64, usize)> {
    let (negative, start) = match chars.get(pos) {
        Some('-') => (true, pos + 1),
        Some('+') => (false, pos + 1),
        _ => (false, pos),
    };
    let (magnitude, end) = scan_digits(chars, start)?;
    Some((if negative { -magnitude } else { magnitude }, end))
}

/// Scan one or more ASCII digits. Saturates at `i64::MAX`.
fn scan_digits(chars: &[char], pos: usize) -> Option<(i64, usize)> {
    let mut value: i64 = 0;
    let mut end = pos;
    while let Some(digit) = chars.get(end).and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(i64::from(digit));
        end += 1;
    }
    (end > pos).then_some((value, end))
}
