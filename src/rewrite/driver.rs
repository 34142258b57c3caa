//! AST traversal driver
//!
//! Walks the translation unit once, in source order, keeping the symbol
//! table in step with the declarations it passes. Every call node is
//! classified before its callee and arguments are visited; calls through a
//! function pointer get the marker inserted right after their closing `)`.
//!
//! Scopes opened by the walk mirror C's block scopes: function bodies
//! (sharing a scope with the parameters), compound statements, `for`
//! headers, and the bodies of selection and iteration statements.

use crate::parser::ast::*;
use crate::rewrite::classify::{classify_callee, CalleeKind};
use crate::rewrite::overlay::EditOverlay;
use crate::rewrite::resolver::TokenEndResolver;
use crate::sema::Scopes;
use tracing::{debug, trace, warn};

/// Counts gathered during one traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiftSummary {
    /// Call expressions visited
    pub calls: usize,
    /// Calls that received the marker
    pub annotated: usize,
    /// Function-pointer calls whose end could not be resolved
    pub skipped: usize,
}

pub struct Driver<'a, 'src> {
    scopes: Scopes,
    resolver: TokenEndResolver<'src>,
    overlay: &'a mut EditOverlay<'src>,
    marker: &'a str,
    summary: LiftSummary,
}

impl<'a, 'src> Driver<'a, 'src> {
    pub fn new(overlay: &'a mut EditOverlay<'src>, marker: &'a str) -> Self {
        let resolver = TokenEndResolver::new(overlay.buffer());
        Self {
            scopes: Scopes::new(),
            resolver,
            overlay,
            marker,
            summary: LiftSummary::default(),
        }
    }

    /// Visit every external declaration of `program` and return the counts
    pub fn run(mut self, program: &Program) -> LiftSummary {
        self.visit_all(&program.nodes);
        self.summary
    }

    fn visit_all(&mut self, nodes: &[AstNode]) {
        for node in nodes {
            self.visit(node);
        }
    }

    /// Visit `nodes` inside a fresh scope
    fn visit_scoped(&mut self, nodes: &[AstNode]) {
        self.scopes.push();
        self.visit_all(nodes);
        self.scopes.pop();
    }

    fn visit_opt(&mut self, node: Option<&AstNode>) {
        if let Some(node) = node {
            self.visit(node);
        }
    }

    fn visit(&mut self, node: &AstNode) {
        match node {
            // Declarations
            AstNode::FunctionDef {
                name,
                func_type,
                body,
                ..
            } => {
                // The name is visible inside the body (recursion)
                self.scopes.declare_node(node);
                trace!(function = %name, "entering function body");
                self.scopes.push();
                self.visit_type(func_type);
                self.scopes.declare_params(func_type);
                self.visit_all(body);
                self.scopes.pop();
            }
            AstNode::FunctionDecl { func_type, .. } => {
                self.visit_type(func_type);
                self.scopes.declare_node(node);
            }
            AstNode::VarDecl { var_type, init, .. } => {
                self.visit_type(var_type);
                // In scope from the end of its declarator, so the
                // initializer already sees it
                self.scopes.declare_node(node);
                self.visit_opt(init.as_deref());
            }
            AstNode::TypedefDecl { target, .. } => {
                self.visit_type(target);
                self.scopes.declare_node(node);
            }
            AstNode::StructDef { fields, .. } => {
                for field in fields {
                    self.visit_type(&field.field_type);
                }
                self.scopes.declare_node(node);
            }
            AstNode::EnumDef { enumerators, .. } => {
                for enumerator in enumerators {
                    self.visit_opt(enumerator.value.as_ref());
                }
                self.scopes.declare_node(node);
            }

            // Statements
            AstNode::Block { statements, .. } => self.visit_scoped(statements),
            AstNode::Return { expr, .. } => self.visit_opt(expr.as_deref()),
            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.visit(condition);
                self.visit_scoped(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_scoped(else_branch);
                }
            }
            AstNode::While {
                condition, body, ..
            } => {
                self.visit(condition);
                self.visit_scoped(body);
            }
            AstNode::DoWhile {
                body, condition, ..
            } => {
                self.visit_scoped(body);
                self.visit(condition);
            }
            AstNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                self.scopes.push();
                self.visit_all(init);
                self.visit_opt(condition.as_deref());
                self.visit_opt(increment.as_deref());
                self.visit_scoped(body);
                self.scopes.pop();
            }
            AstNode::Switch { expr, body, .. } => {
                self.visit(expr);
                self.visit_scoped(body);
            }
            AstNode::Case { value, .. } => self.visit(value),
            AstNode::ExpressionStatement { expr, .. } => self.visit(expr),
            AstNode::Default { .. }
            | AstNode::Break { .. }
            | AstNode::Continue { .. }
            | AstNode::Goto { .. }
            | AstNode::Label { .. }
            | AstNode::Empty { .. } => {}

            // Expressions
            AstNode::FunctionCall {
                callee,
                args,
                location,
                end,
            } => {
                self.handle_call(callee, *location, *end);
                self.visit(callee);
                self.visit_all(args);
            }
            AstNode::IntLiteral(..)
            | AstNode::FloatLiteral(..)
            | AstNode::CharLiteral(..)
            | AstNode::StringLiteral(..)
            | AstNode::Variable(..) => {}
            AstNode::BinaryOp { left, right, .. } => {
                self.visit(left);
                self.visit(right);
            }
            AstNode::Assignment { lhs, rhs, .. } | AstNode::CompoundAssignment { lhs, rhs, .. } => {
                self.visit(lhs);
                self.visit(rhs);
            }
            AstNode::UnaryOp { operand, .. } => self.visit(operand),
            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                self.visit(condition);
                self.visit_opt(true_expr.as_deref());
                self.visit(false_expr);
            }
            AstNode::ArrayAccess { array, index, .. } => {
                self.visit(array);
                self.visit(index);
            }
            AstNode::MemberAccess { object, .. } | AstNode::PointerMemberAccess { object, .. } => {
                self.visit(object)
            }
            AstNode::Cast {
                target_type, expr, ..
            } => {
                self.visit_type(target_type);
                self.visit(expr);
            }
            AstNode::CompoundLiteral {
                target_type, init, ..
            } => {
                self.visit_type(target_type);
                self.visit(init);
            }
            AstNode::InitList { items, .. } => {
                for item in items {
                    for designator in &item.designators {
                        if let Designator::Index(index) = designator {
                            self.visit(index);
                        }
                    }
                    self.visit(&item.value);
                }
            }
            AstNode::SizeofType { target_type, .. } => self.visit_type(target_type),
            AstNode::SizeofExpr { expr, .. } => self.visit(expr),
        }
    }

    /// Visit the expressions embedded in a type (array sizes)
    fn visit_type(&mut self, ty: &Type) {
        match ty {
            Type::Base(_) => {}
            Type::Pointer(inner) => self.visit_type(inner),
            Type::Array { element, size } => {
                self.visit_type(element);
                self.visit_opt(size.as_deref());
            }
            Type::Function {
                return_type,
                params,
                ..
            } => {
                self.visit_type(return_type);
                for param in params {
                    self.visit_type(&param.param_type);
                }
            }
        }
    }

    fn handle_call(&mut self, callee: &AstNode, start: SourceLocation, end: SourceLocation) {
        self.summary.calls += 1;

        let kind = classify_callee(callee, &self.scopes);
        trace!(line = start.line, column = start.column, %kind, "classified call");
        if kind != CalleeKind::FunctionPointer {
            return;
        }

        let offset = match self.resolver.token_end(end) {
            Ok(offset) => offset,
            Err(err) => {
                warn!(line = start.line, column = start.column, "skipping call: {err}");
                self.summary.skipped += 1;
                return;
            }
        };

        // Where the marker lands, for the log
        let at = self.overlay.buffer().line_column(offset);
        match self.overlay.insert(offset, self.marker) {
            Ok(()) => {
                debug!(line = at.line, column = at.column, offset, "annotated call");
                self.summary.annotated += 1;
            }
            Err(err) => {
                warn!(line = at.line, column = at.column, "skipping call: {err}");
                self.summary.skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::rewrite::source::SourceBuffer;

    fn run(text: &str) -> (String, LiftSummary) {
        let program = Parser::new(text).unwrap().parse_program().unwrap();
        let buffer = SourceBuffer::new(text);
        let mut overlay = EditOverlay::new(&buffer);
        let summary = Driver::new(&mut overlay, " /*FP*/").run(&program);
        (overlay.materialize(), summary)
    }

    #[test]
    fn test_counts_calls() {
        let (output, summary) = run("int f(void); int (*g)(void);\nint main(void) { f(); g(); h(); return 0; }");

        assert_eq!(output, "int f(void); int (*g)(void);\nint main(void) { f(); g() /*FP*/; h(); return 0; }");
        assert_eq!(
            summary,
            LiftSummary {
                calls: 3,
                annotated: 1,
                skipped: 0,
            }
        );
    }

    #[test]
    fn test_parameters_are_scoped_to_their_function() {
        let text = "void a(void (*cb)(void)) { cb(); }\nvoid cb(void);\nvoid b(void) { cb(); }";
        let (output, _) = run(text);

        assert_eq!(
            output,
            "void a(void (*cb)(void)) { cb() /*FP*/; }\nvoid cb(void);\nvoid b(void) { cb(); }"
        );
    }

    #[test]
    fn test_block_scope_ends() {
        let text = "int f(int);\nvoid g(void) { { int (*f)(int) = 0; f(1); } f(2); }";
        let (output, _) = run(text);

        assert_eq!(
            output,
            "int f(int);\nvoid g(void) { { int (*f)(int) = 0; f(1) /*FP*/; } f(2); }"
        );
    }

    #[test]
    fn test_for_header_declaration() {
        let text = "void (*next(int))(void);\nvoid g(void) { for (void (*fp)(void) = next(0); fp; fp = next(1)) fp(); }";
        let (output, summary) = run(text);

        assert_eq!(
            output,
            "void (*next(int))(void);\nvoid g(void) { for (void (*fp)(void) = next(0); fp; fp = next(1)) fp() /*FP*/; }"
        );
        assert_eq!(summary.calls, 3);
    }

    #[test]
    fn test_calls_in_initializers_and_sizeof() {
        let text = "int (*fp)(void);\nstruct s { int a; } v = { .a = fp() };\nunsigned long n = sizeof(fp());";
        let (output, summary) = run(text);

        assert_eq!(
            output,
            "int (*fp)(void);\nstruct s { int a; } v = { .a = fp() /*FP*/ };\nunsigned long n = sizeof(fp() /*FP*/);"
        );
        assert_eq!(summary.annotated, 2);
    }
}
