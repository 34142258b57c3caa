//! Scoped symbol table
//!
//! C keeps two name spaces that matter here: ordinary identifiers
//! (objects, functions, typedef names, enumeration constants) and
//! struct/union/enum tags. Both follow block scope, so each frame holds
//! one map of each and lookups walk from the innermost frame outwards.

use crate::parser::ast::{AggregateKind, AstNode, Field, Type};
use rustc_hash::FxHashMap;

/// What an ordinary identifier denotes
#[derive(Debug, Clone)]
pub enum Symbol {
    /// A function declared by prototype or definition
    Function(Type),
    /// A variable or parameter
    Object(Type),
    Typedef(Type),
    EnumConstant,
}

/// A struct or union body registered under its tag
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub fields: Vec<Field>,
}

#[derive(Debug, Default)]
struct Frame {
    symbols: FxHashMap<String, Symbol>,
    tags: FxHashMap<String, Aggregate>,
}

/// Stack of scopes; the file scope is always present
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<Frame>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Leave the innermost scope. The file scope is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn declare(&mut self, name: impl Into<String>, symbol: Symbol) {
        if let Some(frame) = self.frames.last_mut() {
            frame.symbols.insert(name.into(), symbol);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.symbols.get(name))
    }

    /// Register a struct or union body. A later definition of the same tag
    /// in the same scope replaces the earlier one.
    pub fn define_tag(&mut self, name: impl Into<String>, aggregate: Aggregate) {
        if let Some(frame) = self.frames.last_mut() {
            frame.tags.insert(name.into(), aggregate);
        }
    }

    pub fn lookup_tag(&self, name: &str) -> Option<&Aggregate> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.tags.get(name))
    }

    /// Enter the names introduced by a declaration node into the innermost
    /// scope. Nodes that declare nothing are ignored.
    pub fn declare_node(&mut self, node: &AstNode) {
        match node {
            AstNode::FunctionDef { name, func_type, .. }
            | AstNode::FunctionDecl { name, func_type, .. } => {
                self.declare(name.clone(), Symbol::Function(func_type.clone()));
            }
            AstNode::VarDecl { name, var_type, .. } => {
                // `fn_t handler;` with `typedef int fn_t(int);` declares a
                // function, not an object
                let symbol = if self.resolve(var_type).is_function() {
                    Symbol::Function(var_type.clone())
                } else {
                    Symbol::Object(var_type.clone())
                };
                self.declare(name.clone(), symbol);
            }
            AstNode::TypedefDecl { name, target, .. } => {
                self.declare(name.clone(), Symbol::Typedef(target.clone()));
            }
            AstNode::StructDef {
                kind, name, fields, ..
            } => {
                self.define_tag(
                    name.clone(),
                    Aggregate {
                        kind: *kind,
                        fields: fields.clone(),
                    },
                );
            }
            AstNode::EnumDef { enumerators, .. } => {
                for enumerator in enumerators {
                    self.declare(enumerator.name.clone(), Symbol::EnumConstant);
                }
            }
            _ => {}
        }
    }

    /// Declare the named parameters of a function type in the innermost
    /// scope
    pub fn declare_params(&mut self, func_type: &Type) {
        if let Type::Function { params, .. } = func_type {
            for param in params {
                if let Some(name) = &param.name {
                    self.declare(name.clone(), Symbol::Object(param.param_type.clone()));
                }
            }
        }
    }
}
