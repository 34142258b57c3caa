//! # Introduction
//!
//! fplift reads one C translation unit and marks every call made through a
//! function pointer by inserting ` /*FP*/` right after the call's closing
//! parenthesis. Everything else is reproduced byte for byte.
//!
//! ```text
//! int (*fp)(int, int);             int (*fp)(int, int);
//! int add(int, int);          →    int add(int, int);
//! int r = fp(1, 2) + add(3, 4);    int r = fp(1, 2) /*FP*/ + add(3, 4);
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Driver (sema + classifier) → Overlay → Output
//! ```
//!
//! 1. [`parser`]: tokenises the source (byte offsets included) and builds an
//!    AST, tracking typedef names per scope.
//! 2. [`sema`]: scoped symbol table and static type inference.
//! 3. [`rewrite`]: classifies each call's callee, finds the end of its
//!    closing token and records an insertion in an overlay over the
//!    untouched source, then materializes the result.
//! 4. [`config`]: the marker text and type names assumed from headers.
//!
//! Preprocessor lines are skipped and macros are not expanded, so calls
//! hidden behind macros are not seen. Conditional groups that are dead for
//! any C compiler (`#if 0`, `#ifdef __cplusplus`) are left out of the parse
//! and reproduced unchanged.

pub mod config;
pub mod parser;
pub mod rewrite;
pub mod sema;

pub use config::LiftConfig;
pub use rewrite::errors::{LiftError, LiftResult};
pub use rewrite::{annotate, Annotation};

/// Annotate `text` and return only the rewritten source.
pub fn annotate_source(text: &str, config: &LiftConfig) -> LiftResult<String> {
    annotate(text, config).map(|annotation| annotation.text)
}
