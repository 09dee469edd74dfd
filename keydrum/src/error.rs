// Error type for score loading, parsing, and export.
//
// Parsing is deliberately lenient: unrecognized lines are dropped, unknown
// header keys are ignored, and unknown sections in an order are skipped.
// None of those reach this type. What does reach it is a line whose key the
// parser *did* recognize but whose value is unusable (a non-numeric BPM, a
// zero bar count, an unsupported grid). Those are rejected with the 1-based
// line number rather than letting an unusable number flow into timing math.
//
// Compilation itself has no failure path; see `compiler.rs`.

use thiserror::Error;

/// Result alias for keydrum operations.
pub type Result<T> = std::result::Result<T, ScoreError>;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// A recognized header key or directive carried an unusable value.
    #[error("line {line}: invalid {field} value {value:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("score is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed kit configuration: {0}")]
    Kit(#[from] serde_json::Error),

    #[error("failed to write MIDI file: {0}")]
    Midi(std::io::Error),
}

impl ScoreError {
    pub(crate) fn invalid(line: usize, field: &'static str, value: &str) -> Self {
        ScoreError::InvalidField {
            line,
            field,
            value: value.to_string(),
        }
    }
}
