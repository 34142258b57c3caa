//! Static type resolution for C expressions
//!
//! - [`scope`]: block-structured symbol table (ordinary identifiers and
//!   struct/union tags)
//! - [`type_system`]: typedef expansion and expression type inference
//!
//! The tables are filled by whoever walks the AST (the rewrite driver), one
//! declaration at a time, so every lookup sees exactly the declarations that
//! precede it in source order.

pub mod scope;
pub mod type_system;

pub use scope::{Aggregate, Scopes, Symbol};
