//! Error type for dump-stream surgery.

use std::io;

/// Result type for surgery operations
pub type Result<T> = std::result::Result<T, SurgeryError>;

/// Errors that can occur while reading, transforming, or emitting a dump stream
#[derive(Debug, thiserror::Error)]
pub enum SurgeryError {
    /// Malformed input; `line` is the 1-based line number of the offending input.
    #[error("{msg} at line {line}")]
    Parse { line: u64, msg: String },

    /// A fatal condition detected by a command hook (author mismatch,
    /// unresolvable copy source, malformed argument).
    #[error("{0}")]
    Fatal(String),

    #[error("invalid selection range {spec:?}: {msg}")]
    Range { spec: String, msg: String },

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SurgeryError {
    /// Shorthand for a parse error at a known input line.
    pub fn parse(line: u64, msg: impl Into<String>) -> Self {
        SurgeryError::Parse {
            line,
            msg: msg.into(),
        }
    }

    /// Shorthand for a fatal hook error.
    pub fn fatal(msg: impl Into<String>) -> Self {
        SurgeryError::Fatal(msg.into())
    }
}
