//! Callee classification
//!
//! Decides whether a call goes through a function pointer by looking at the
//! static type of its callee expression:
//!
//! ```text
//! add(1, 2)          DirectFunction   (`add` is a declared function)
//! fp(1, 2)           FunctionPointer  (`fp` has type `int (*)(int, int)`)
//! (*fp)(1, 2)        FunctionPointer
//! ops->open(path)    FunctionPointer  (member of pointer-to-function type)
//! mystery(1)         Other            (undeclared, type unknown)
//! ```

use crate::parser::ast::AstNode;
use crate::sema::{Scopes, Symbol};
use std::fmt;

/// Static category of a call's callee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeKind {
    DirectFunction,
    FunctionPointer,
    Other,
}

impl fmt::Display for CalleeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalleeKind::DirectFunction => write!(f, "direct"),
            CalleeKind::FunctionPointer => write!(f, "function pointer"),
            CalleeKind::Other => write!(f, "other"),
        }
    }
}

/// Classify `callee` against the declarations visible in `scopes`.
///
/// Only a callee whose type is (after decay) a pointer to a function is a
/// [`CalleeKind::FunctionPointer`]. A bare function designator is direct
/// even if its address is taken elsewhere; anything that cannot be typed is
/// [`CalleeKind::Other`].
pub fn classify_callee(callee: &AstNode, scopes: &Scopes) -> CalleeKind {
    if let AstNode::Variable(name, _) = callee {
        if let Some(Symbol::Function(_)) = scopes.lookup(name) {
            return CalleeKind::DirectFunction;
        }
    }

    match scopes.decayed_type(callee) {
        Some(ty) if scopes.is_function_pointer(&ty) => CalleeKind::FunctionPointer,
        _ => CalleeKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{BaseType, Param, SourceLocation, Type, UnOp};

    fn binop_type() -> Type {
        Type::Function {
            return_type: Box::new(Type::new(BaseType::Int)),
            params: vec![
                Param {
                    name: None,
                    param_type: Type::new(BaseType::Int),
                },
                Param {
                    name: None,
                    param_type: Type::new(BaseType::Int),
                },
            ],
            variadic: false,
        }
    }

    fn var(name: &str) -> AstNode {
        AstNode::Variable(name.to_string(), SourceLocation::default())
    }

    fn deref(node: AstNode) -> AstNode {
        AstNode::UnaryOp {
            op: UnOp::Deref,
            operand: Box::new(node),
            location: SourceLocation::default(),
        }
    }

    fn scopes() -> Scopes {
        let mut scopes = Scopes::new();
        scopes.declare("add", Symbol::Function(binop_type()));
        scopes.declare("fp", Symbol::Object(binop_type().with_pointer()));
        scopes.declare("n", Symbol::Object(Type::new(BaseType::Int)));
        scopes
    }

    #[test]
    fn test_direct_call() {
        assert_eq!(classify_callee(&var("add"), &scopes()), CalleeKind::DirectFunction);
    }

    #[test]
    fn test_pointer_call() {
        let scopes = scopes();
        assert_eq!(classify_callee(&var("fp"), &scopes), CalleeKind::FunctionPointer);
        assert_eq!(classify_callee(&deref(var("fp")), &scopes), CalleeKind::FunctionPointer);
    }

    #[test]
    fn test_dereferenced_function_designator() {
        // `(*add)(1, 2)` calls through the pointer `add` decays to
        assert_eq!(classify_callee(&deref(var("add")), &scopes()), CalleeKind::FunctionPointer);
    }

    #[test]
    fn test_unknown_and_non_function_callees() {
        let scopes = scopes();
        assert_eq!(classify_callee(&var("mystery"), &scopes), CalleeKind::Other);
        assert_eq!(classify_callee(&var("n"), &scopes), CalleeKind::Other);
    }

    #[test]
    fn test_local_pointer_shadows_function() {
        let mut scopes = scopes();
        scopes.push();
        scopes.declare("add", Symbol::Object(binop_type().with_pointer()));

        assert_eq!(classify_callee(&var("add"), &scopes), CalleeKind::FunctionPointer);
    }
}
