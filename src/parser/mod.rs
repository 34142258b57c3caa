//! C source code parser
//!
//! This module transforms C source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens with byte offsets)
//! - `conditional`: which `#if` groups the lexer drops
//! - [`parse`]: Parser struct, helpers and typedef-name scopes
//! - [`ast`]: AST node and type definitions
//!
//! The parser methods themselves live in `declarations`, `statements` and
//! `expressions`, each adding an `impl Parser` block.
//!
//! # Supported C
//!
//! The parser accepts C11 translation units as they appear before
//! preprocessing:
//! - Types: all arithmetic types, structs, unions, enums, typedefs,
//!   pointers, arrays and functions, with full declarator syntax
//!   (`int (*(*table[4])(void))(int)`)
//! - Statements: declarations, control flow, labels, `goto`, `switch`
//! - Expressions: every C operator, casts, compound literals, `sizeof`
//! - Preprocessor lines are skipped, macros are not expanded
//! - `#if 0` and `#ifdef __cplusplus` groups are dropped; other conditional
//!   groups are all kept
//! - Common GNU annotations (`__attribute__`, `__extension__`, `asm`) are skipped
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for the
//! binary operators. No external parser generator dependencies. Nesting is
//! capped at [`parse::MAX_NESTING_DEPTH`].

pub mod ast;
mod conditional;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};
