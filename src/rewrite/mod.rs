//! Source rewriting engine
//!
//! - [`source`]: the immutable original text
//! - [`classify`]: direct vs function-pointer callees
//! - [`resolver`]: offset just past a call's closing token
//! - [`overlay`]: recorded insertions and the final materialization
//! - [`driver`]: the single AST walk tying the pieces together
//! - [`errors`]: error types
//!
//! ```text
//! text → SourceBuffer → Parser → Program → Driver → EditOverlay → String
//! ```

pub mod classify;
pub mod driver;
pub mod errors;
pub mod overlay;
pub mod resolver;
pub mod source;

use crate::config::LiftConfig;
use crate::parser::Parser;
use driver::{Driver, LiftSummary};
use errors::LiftResult;
use overlay::EditOverlay;
use source::SourceBuffer;
use tracing::info;

/// Output of one annotation run
#[derive(Debug, Clone)]
pub struct Annotation {
    pub text: String,
    pub summary: LiftSummary,
}

/// Parse `text`, mark every call made through a function pointer and
/// return the rewritten text together with the run's counts.
pub fn annotate(text: &str, config: &LiftConfig) -> LiftResult<Annotation> {
    let buffer = SourceBuffer::new(text);
    let program = Parser::with_type_names(buffer.as_str(), config.type_names())?.parse_program()?;

    let mut overlay = EditOverlay::new(&buffer);
    let summary = Driver::new(&mut overlay, &config.marker).run(&program);
    info!(
        calls = summary.calls,
        annotated = summary.annotated,
        skipped = summary.skipped,
        "annotation finished"
    );

    Ok(Annotation {
        text: overlay.materialize(),
        summary,
    })
}
