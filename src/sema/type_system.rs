//! Typedef expansion and expression type inference
//!
//! Inference answers one question for the rewriter: what is the static type
//! of a callee expression? It follows C's rules closely enough for that:
//!
//! - Literals have their natural type (`int`, `double`, `char *`)
//! - Identifiers are looked up in the current scope stack
//! - `*e` yields the pointee of `e` after decay, `&e` a pointer to `e`
//! - Member access looks the field up in the struct/union body, descending
//!   into anonymous members
//! - Calls yield the return type of the (decayed) callee
//! - Casts and compound literals yield their written type
//!
//! Whenever a type cannot be determined (undeclared names, incomplete
//! structs, types from unseen headers) the result is `None`.

use crate::parser::ast::*;
use crate::sema::scope::{Scopes, Symbol};

/// Upper bound on typedef-to-typedef hops, guarding against cycles
const MAX_TYPEDEF_DEPTH: usize = 64;

impl Scopes {
    /// Expand typedef names at the top level of `ty` until a non-typedef
    /// type is reached. Unknown names are returned unchanged.
    pub fn resolve(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        for _ in 0..MAX_TYPEDEF_DEPTH {
            let next = match &current {
                Type::Base(BaseType::Named(name)) => match self.lookup(name) {
                    Some(Symbol::Typedef(target)) => target.clone(),
                    _ => return current,
                },
                _ => return current,
            };
            current = next;
        }
        current
    }

    /// Whether `ty` is a pointer whose pointee resolves to a function type
    pub fn is_function_pointer(&self, ty: &Type) -> bool {
        match self.resolve(ty) {
            Type::Pointer(pointee) => self.resolve(&pointee).is_function(),
            _ => false,
        }
    }

    /// Infer the static type of an expression, with typedefs at the top
    /// level expanded. No decay is applied to the result.
    pub fn infer_expr_type(&self, expr: &AstNode) -> Option<Type> {
        let ty = match expr {
            AstNode::IntLiteral(_, _) | AstNode::CharLiteral(_, _) => Type::new(BaseType::Int),

            AstNode::FloatLiteral(_, _) => Type::new(BaseType::Double),

            AstNode::StringLiteral(_, _) => Type::new(BaseType::Char).with_pointer(),

            AstNode::Variable(name, _) => match self.lookup(name)? {
                Symbol::Function(ty) | Symbol::Object(ty) => ty.clone(),
                Symbol::EnumConstant => Type::new(BaseType::Int),
                Symbol::Typedef(_) => return None,
            },

            AstNode::UnaryOp { op, operand, .. } => match op {
                UnOp::Deref => match self.decayed_type(operand)? {
                    Type::Pointer(pointee) => *pointee,
                    _ => return None,
                },
                UnOp::AddrOf => self.infer_expr_type(operand)?.with_pointer(),
                UnOp::Not => Type::new(BaseType::Int),
                _ => self.infer_expr_type(operand)?,
            },

            AstNode::BinaryOp {
                op, left, right, ..
            } => match op {
                BinOp::Comma => self.infer_expr_type(right)?,
                BinOp::Add | BinOp::Sub => {
                    // Pointer arithmetic keeps the pointer type
                    let left_type = self.decayed_type(left);
                    let right_type = self.decayed_type(right);
                    match (left_type, right_type) {
                        (Some(Type::Pointer(_)), Some(Type::Pointer(_))) => {
                            Type::new(BaseType::Long)
                        }
                        (Some(ty @ Type::Pointer(_)), _) => ty,
                        (_, Some(ty @ Type::Pointer(_))) if *op == BinOp::Add => ty,
                        (Some(ty), _) => ty,
                        (None, _) => return None,
                    }
                }
                BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
                | BinOp::And
                | BinOp::Or => Type::new(BaseType::Int),
                _ => self.infer_expr_type(left)?,
            },

            AstNode::Assignment { lhs, .. } | AstNode::CompoundAssignment { lhs, .. } => {
                self.infer_expr_type(lhs)?
            }

            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => match self.decayed_type(true_expr.as_deref().unwrap_or(condition)) {
                // `cond ? fp : 0` still has the pointer's type
                Some(ty @ Type::Pointer(_)) => ty,
                Some(ty) => match self.decayed_type(false_expr) {
                    Some(other @ Type::Pointer(_)) => other,
                    _ => ty,
                },
                None => self.decayed_type(false_expr)?,
            },

            AstNode::FunctionCall { callee, .. } => match self.decayed_type(callee)? {
                Type::Pointer(pointee) => match self.resolve(&pointee) {
                    Type::Function { return_type, .. } => *return_type,
                    _ => return None,
                },
                _ => return None,
            },

            AstNode::ArrayAccess { array, index, .. } => {
                match (self.decayed_type(array), self.decayed_type(index)) {
                    (Some(Type::Pointer(element)), _) => *element,
                    // `2[table]`
                    (_, Some(Type::Pointer(element))) => *element,
                    _ => return None,
                }
            }

            AstNode::MemberAccess { object, member, .. } => {
                let object_type = self.infer_expr_type(object)?;
                self.member_type(&object_type, member)?
            }

            AstNode::PointerMemberAccess { object, member, .. } => {
                match self.decayed_type(object)? {
                    Type::Pointer(pointee) => self.member_type(&pointee, member)?,
                    _ => return None,
                }
            }

            AstNode::Cast { target_type, .. } | AstNode::CompoundLiteral { target_type, .. } => {
                target_type.clone()
            }

            AstNode::SizeofType { .. } | AstNode::SizeofExpr { .. } => {
                Type::new(BaseType::Named("size_t".to_string()))
            }

            _ => return None,
        };

        Some(self.resolve(&ty))
    }

    /// Inferred type after array-to-pointer and function-to-pointer decay
    pub fn decayed_type(&self, expr: &AstNode) -> Option<Type> {
        self.infer_expr_type(expr).map(Type::decay)
    }

    /// Type of `member` inside the struct or union `object_type`, searching
    /// anonymous members as C11 does
    fn member_type(&self, object_type: &Type, member: &str) -> Option<Type> {
        self.member_type_at_depth(object_type, member, 0)
    }

    fn member_type_at_depth(&self, object_type: &Type, member: &str, depth: usize) -> Option<Type> {
        if depth > MAX_TYPEDEF_DEPTH {
            return None;
        }

        let tag = match self.resolve(object_type) {
            Type::Base(BaseType::Struct(tag)) | Type::Base(BaseType::Union(tag)) => tag,
            _ => return None,
        };
        let aggregate = self.lookup_tag(&tag)?;

        for field in &aggregate.fields {
            match &field.name {
                Some(name) if name == member => return Some(field.field_type.clone()),
                Some(_) => {}
                None => {
                    if let Some(ty) = self.member_type_at_depth(&field.field_type, member, depth + 1)
                    {
                        return Some(ty);
                    }
                }
            }
        }

        None
    }
}
