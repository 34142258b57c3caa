//! Error types for the rewriting engine
//!
//! Only [`LiftError`] escapes [`crate::annotate_source`]. The other errors are
//! recovered from locally: the driver logs them and skips the call site.

use crate::parser::ast::SourceLocation;
use crate::parser::ParseError;
use thiserror::Error;

/// The end of a call expression could not be mapped to a buffer offset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationResolutionError {
    #[error("offset {offset} is past the end of the buffer (length {len})")]
    EndOfBuffer { offset: usize, len: usize },

    #[error("no token starts at line {}, column {}", location.line, location.column)]
    NotAtToken { location: SourceLocation },

    #[error("token at line {}, column {} cannot be lexed: {message}", location.line, location.column)]
    Unlexable {
        location: SourceLocation,
        message: String,
    },
}

/// An insertion that cannot be applied to the buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("insertion offset {offset} is outside the buffer (length {len})")]
    OutOfBounds { offset: usize, len: usize },

    #[error("insertion offset {offset} is inside a multi-byte character")]
    NotCharBoundary { offset: usize },
}

/// Failure of a whole annotation run; no output is produced
#[derive(Error, Debug, Clone)]
pub enum LiftError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type LiftResult<T> = Result<T, LiftError>;
