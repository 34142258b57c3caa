//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using precedence climbing
//! for the binary operators and recursive descent for the unary and postfix
//! forms. Every bracketed sub-expression counts towards the parser's
//! nesting limit.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, (concatenated) strings
//! - Identifiers
//! - Binary operators: arithmetic, comparison, logical, bitwise, comma
//! - Assignment and all compound assignments
//! - Unary operators: `-`, `+`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Ternary: `? :` (and the GNU `?:` shorthand)
//! - Casts `(type)expr` and compound literals `(type){...}`
//! - `sizeof` and `_Alignof`
//!
//! # Calls
//!
//! Any postfix expression may be called, so the callee is kept as a full
//! expression: `fp(1)`, `(*fp)(1)`, `ops->open(p)`, `table[i](x)` and
//! `((handler)raw)(x)` all produce [`AstNode::FunctionCall`]. The call's
//! closing `)` location is recorded for the rewriter.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_assignment()?;

        while self.match_token(&TokenKind::Comma) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_assignment()?);
            left = AstNode::BinaryOp {
                op: BinOp::Comma,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse assignment (right-associative)
    ///
    /// `a = b += c` is read as a chain of operands and folded from the
    /// right, so long chains do not deepen the call stack.
    pub(crate) fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        let mut pending = Vec::new();

        let mut expr = loop {
            let operand = self.parse_conditional()?;
            let loc = self.current_location();

            let op = match self.peek().kind {
                TokenKind::Eq => None,
                TokenKind::PlusEq => Some(BinOp::AddAssign),
                TokenKind::MinusEq => Some(BinOp::SubAssign),
                TokenKind::StarEq => Some(BinOp::MulAssign),
                TokenKind::SlashEq => Some(BinOp::DivAssign),
                TokenKind::PercentEq => Some(BinOp::ModAssign),
                TokenKind::AmpEq => Some(BinOp::AndAssign),
                TokenKind::PipeEq => Some(BinOp::OrAssign),
                TokenKind::CaretEq => Some(BinOp::XorAssign),
                TokenKind::LtLtEq => Some(BinOp::ShlAssign),
                TokenKind::GtGtEq => Some(BinOp::ShrAssign),
                _ => break operand,
            };
            self.advance();
            pending.push((operand, op, loc));
        };

        while let Some((lhs, op, location)) = pending.pop() {
            let lhs = Box::new(lhs);
            let rhs = Box::new(expr);
            expr = match op {
                None => AstNode::Assignment { lhs, rhs, location },
                Some(op) => AstNode::CompoundAssignment {
                    lhs,
                    op,
                    rhs,
                    location,
                },
            };
        }

        Ok(expr)
    }

    /// Parse ternary: condition ? true_expr : false_expr
    ///
    /// The GNU `condition ?: false_expr` form leaves `true_expr` empty.
    /// Chained conditionals nest to the right.
    pub(crate) fn parse_conditional(&mut self) -> Result<AstNode, ParseError> {
        let mut pending = Vec::new();

        let mut expr = loop {
            let condition = self.parse_binary(0)?;
            if !self.match_token(&TokenKind::Question) {
                break condition;
            }

            let loc = self.previous_location();
            let true_expr = if self.check(&TokenKind::Colon) {
                None
            } else {
                Some(Box::new(self.nested(Self::parse_expression)?))
            };
            self.expect_token(&TokenKind::Colon, "Expected ':' in ternary expression")?;
            pending.push((condition, true_expr, loc));
        };

        while let Some((condition, true_expr, location)) = pending.pop() {
            expr = AstNode::TernaryOp {
                condition: Box::new(condition),
                true_expr,
                false_expr: Box::new(expr),
                location,
            };
        }

        Ok(expr)
    }

    /// Binary operator for `kind` with its precedence, loosest first:
    /// `||`, `&&`, `|`, `^`, `&`, equality, relational, shift, additive,
    /// multiplicative
    fn binary_operator(kind: &TokenKind) -> Option<(BinOp, u8)> {
        let entry = match kind {
            TokenKind::OrOr => (BinOp::Or, 1),
            TokenKind::AndAnd => (BinOp::And, 2),
            TokenKind::Pipe => (BinOp::BitOr, 3),
            TokenKind::Caret => (BinOp::BitXor, 4),
            TokenKind::Amp => (BinOp::BitAnd, 5),
            TokenKind::EqEq => (BinOp::Eq, 6),
            TokenKind::NotEq => (BinOp::Ne, 6),
            TokenKind::Lt => (BinOp::Lt, 7),
            TokenKind::Le => (BinOp::Le, 7),
            TokenKind::Gt => (BinOp::Gt, 7),
            TokenKind::Ge => (BinOp::Ge, 7),
            TokenKind::LtLt => (BinOp::BitShl, 8),
            TokenKind::GtGt => (BinOp::BitShr, 8),
            TokenKind::Plus => (BinOp::Add, 9),
            TokenKind::Minus => (BinOp::Sub, 9),
            TokenKind::Star => (BinOp::Mul, 10),
            TokenKind::Slash => (BinOp::Div, 10),
            TokenKind::Percent => (BinOp::Mod, 10),
            _ => return None,
        };
        Some(entry)
    }

    /// Parse left-associative binary operators binding at least as tightly
    /// as `min_precedence`
    fn parse_binary(&mut self, min_precedence: u8) -> Result<AstNode, ParseError> {
        let mut left = self.parse_cast()?;

        while let Some((op, precedence)) = Self::binary_operator(&self.peek().kind) {
            if precedence < min_precedence {
                break;
            }
            let loc = self.current_location();
            self.advance();
            let right = Box::new(self.parse_binary(precedence + 1)?);
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Whether the current '(' opens a type name (cast or compound literal)
    fn at_parenthesized_type(&self) -> bool {
        self.check(&TokenKind::LParen)
            && self
                .peek_kind_ahead(1)
                .is_some_and(|kind| self.starts_type_name(kind))
    }

    /// Parse cast: (type)expr, or a compound literal (type){...}
    fn parse_cast(&mut self) -> Result<AstNode, ParseError> {
        if !self.at_parenthesized_type() {
            return self.parse_unary();
        }

        let loc = self.current_location();
        self.advance(); // consume '('
        let target_type = self.parse_type_name()?;
        self.expect_rparen("after cast type")?;

        if self.check(&TokenKind::LBrace) {
            let init = Box::new(self.parse_init_list()?);
            let literal = AstNode::CompoundLiteral {
                target_type,
                init,
                location: loc,
            };
            return self.parse_postfix_suffixes(literal);
        }

        let expr = Box::new(self.nested(Self::parse_cast)?);
        Ok(AstNode::Cast {
            target_type,
            expr,
            location: loc,
        })
    }

    /// Parse unary (! ~ - + & * ++ -- sizeof _Alignof)
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        let prefix = match self.peek().kind {
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Tilde => Some(UnOp::BitNot),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Amp => Some(UnOp::AddrOf),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            _ => None,
        };

        if let Some(op) = prefix {
            self.advance();
            let operand = if matches!(op, UnOp::PreInc | UnOp::PreDec) {
                self.nested(Self::parse_unary)?
            } else {
                self.nested(Self::parse_cast)?
            };
            return Ok(AstNode::UnaryOp {
                op,
                operand: Box::new(operand),
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Sizeof) || self.match_token(&TokenKind::Alignof) {
            if self.at_parenthesized_type() {
                let saved_pos = self.position;
                self.advance(); // consume '('
                let target_type = self.parse_type_name()?;
                self.expect_rparen("after sizeof type")?;

                // `sizeof (type){...}` is the size of a compound literal
                if !self.check(&TokenKind::LBrace) {
                    return Ok(AstNode::SizeofType {
                        target_type,
                        location: loc,
                    });
                }
                self.position = saved_pos;
            }

            let expr = Box::new(self.nested(Self::parse_cast)?);
            return Ok(AstNode::SizeofExpr {
                expr,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Extension) {
            return self.nested(Self::parse_cast);
        }

        self.parse_postfix()
    }

    /// Parse postfix (++ -- [] . -> ())
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_primary()?;
        self.parse_postfix_suffixes(expr)
    }

    fn parse_postfix_suffixes(&mut self, mut expr: AstNode) -> Result<AstNode, ParseError> {
        loop {
            let loc = self.current_location();

            if self.match_token(&TokenKind::PlusPlus) {
                expr = AstNode::UnaryOp {
                    op: UnOp::PostInc,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&TokenKind::MinusMinus) {
                expr = AstNode::UnaryOp {
                    op: UnOp::PostDec,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = Box::new(self.nested(Self::parse_expression)?);
                self.expect_token(&TokenKind::RBracket, "Expected ']' after array index")?;
                expr = AstNode::ArrayAccess {
                    array: Box::new(expr),
                    index,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::Dot) {
                let member = self.expect_identifier()?;
                expr = AstNode::MemberAccess {
                    object: Box::new(expr),
                    member,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::Arrow) {
                let member = self.expect_identifier()?;
                expr = AstNode::PointerMemberAccess {
                    object: Box::new(expr),
                    member,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::LParen) {
                let args = self.nested(Self::parse_argument_list)?;
                let end = self.expect_rparen("after function arguments")?;
                let start = *expr.location();

                expr = AstNode::FunctionCall {
                    callee: Box::new(expr),
                    args,
                    location: start,
                    end,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse argument list up to (not including) the closing ')'
    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            if self.starts_type_name(&self.peek().kind) {
                // Macro-style type arguments such as `va_arg(ap, int)`; the
                // type carries no expression to visit
                self.parse_type_name()?;
            } else {
                args.push(self.parse_assignment()?);
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, identifiers, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        match self.peek().kind.clone() {
            TokenKind::IntLiteral(n) => {
                self.advance();
                Ok(AstNode::IntLiteral(n, loc))
            }
            TokenKind::FloatLiteral(n) => {
                self.advance();
                Ok(AstNode::FloatLiteral(n, loc))
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                Ok(AstNode::CharLiteral(c, loc))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                // Adjacent string literals are concatenated
                let mut value = s;
                while let TokenKind::StringLiteral(next) = &self.peek().kind {
                    value.push_str(next);
                    self.advance();
                }
                Ok(AstNode::StringLiteral(value, loc))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(AstNode::Variable(name, loc))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.nested(Self::parse_expression)?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            _ => self.error(format!("Unexpected token: {}", self.peek())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    /// Parse `source` as the body of a function and return its last
    /// expression statement.
    fn last_expr(decls: &str, body: &str) -> AstNode {
        let source = format!("{decls}\nvoid test_fn(void) {{ {body} }}");
        let program = Parser::new(&source).unwrap().parse_program().unwrap();
        let Some(AstNode::FunctionDef { body, .. }) = program.nodes.into_iter().last() else {
            panic!("Expected function definition");
        };
        match body.into_iter().last() {
            Some(AstNode::ExpressionStatement { expr, .. }) => *expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = last_expr("int a, b, c;", "a + b * c;");

        match expr {
            AstNode::BinaryOp { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, AstNode::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_call_through_dereference() {
        let expr = last_expr("int (*fp)(int);", "(*fp)(1);");

        match expr {
            AstNode::FunctionCall { callee, args, end, .. } => {
                assert!(matches!(*callee, AstNode::UnaryOp { op: UnOp::Deref, .. }));
                assert_eq!(args.len(), 1);
                // `(*fp)(1)` starts at column 22 of line 2
                assert_eq!(end.line, 2);
                assert_eq!(end.column, 29);
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_member_and_index_callees() {
        let expr = last_expr("", "ops->table[2](x, y);");

        match expr {
            AstNode::FunctionCall { callee, args, .. } => {
                assert_eq!(args.len(), 2);
                match *callee {
                    AstNode::ArrayAccess { array, .. } => {
                        assert!(matches!(*array, AstNode::PointerMemberAccess { ref member, .. } if member == "table"));
                    }
                    other => panic!("Expected array access, got {:?}", other),
                }
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_to_function_pointer() {
        let expr = last_expr("void *raw;", "((int (*)(int))raw)(7);");

        match expr {
            AstNode::FunctionCall { callee, .. } => match *callee {
                AstNode::Cast { target_type, .. } => assert!(target_type.is_pointer_to_function()),
                other => panic!("Expected cast, got {:?}", other),
            },
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_calls() {
        let expr = last_expr("", "f(g(1), h());");

        match expr {
            AstNode::FunctionCall { args, .. } => {
                assert!(matches!(args[0], AstNode::FunctionCall { .. }));
                assert!(matches!(args[1], AstNode::FunctionCall { .. }));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_sizeof_forms() {
        let expr = last_expr("int x;", "sizeof(int) + sizeof x + sizeof(x);");

        match expr {
            AstNode::BinaryOp { left, right, .. } => {
                assert!(matches!(*right, AstNode::SizeofExpr { .. }));
                match *left {
                    AstNode::BinaryOp { left, right, .. } => {
                        assert!(matches!(*left, AstNode::SizeofType { .. }));
                        assert!(matches!(*right, AstNode::SizeofExpr { .. }));
                    }
                    other => panic!("Expected addition, got {:?}", other),
                }
            }
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_literal_and_comma() {
        let expr = last_expr("struct p { int x; };", "a = 1, b = (struct p){ .x = 2 }.x;");

        match expr {
            AstNode::BinaryOp { op: BinOp::Comma, right, .. } => match *right {
                AstNode::Assignment { rhs, .. } => {
                    assert!(matches!(*rhs, AstNode::MemberAccess { .. }));
                }
                other => panic!("Expected assignment, got {:?}", other),
            },
            other => panic!("Expected comma expression, got {:?}", other),
        }
    }

    #[test]
    fn test_gnu_conditional_shorthand() {
        let expr = last_expr("int a, b;", "a ?: b;");

        match expr {
            AstNode::TernaryOp { condition, true_expr, false_expr, .. } => {
                assert!(matches!(*condition, AstNode::Variable(ref n, _) if n == "a"));
                assert!(true_expr.is_none());
                assert!(matches!(*false_expr, AstNode::Variable(ref n, _) if n == "b"));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_right_associative_chains() {
        let expr = last_expr("int a, b, c, d;", "a = b += c ? d : a ? b : c;");

        let AstNode::Assignment { rhs, .. } = expr else {
            panic!("Expected assignment, got {:?}", expr);
        };
        let AstNode::CompoundAssignment { op: BinOp::AddAssign, rhs, .. } = *rhs else {
            panic!("Expected compound assignment");
        };
        let AstNode::TernaryOp { false_expr, .. } = *rhs else {
            panic!("Expected conditional");
        };
        assert!(matches!(*false_expr, AstNode::TernaryOp { .. }));
    }

    #[test]
    fn test_left_associative_levels() {
        let expr = last_expr("int a, b, c;", "a - b - c == a << 1 | b;");

        let AstNode::BinaryOp { op: BinOp::BitOr, left, .. } = expr else {
            panic!("Expected bitwise or, got {:?}", expr);
        };
        let AstNode::BinaryOp { op: BinOp::Eq, left, right, .. } = *left else {
            panic!("Expected equality");
        };
        assert!(matches!(*right, AstNode::BinaryOp { op: BinOp::BitShl, .. }));
        match *left {
            AstNode::BinaryOp { op: BinOp::Sub, left, .. } => {
                assert!(matches!(*left, AstNode::BinaryOp { op: BinOp::Sub, .. }));
            }
            other => panic!("Expected subtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_sizeof_compound_literal() {
        let expr = last_expr("struct p { int x; };", "sizeof (struct p){ 1 };");

        match expr {
            AstNode::SizeofExpr { expr, .. } => {
                assert!(matches!(*expr, AstNode::CompoundLiteral { .. }));
            }
            other => panic!("Expected sizeof expression, got {:?}", other),
        }
    }

    #[test]
    fn test_string_concatenation() {
        let expr = last_expr("", "puts(\"ab\" \"cd\");");

        match expr {
            AstNode::FunctionCall { args, .. } => {
                assert!(matches!(&args[0], AstNode::StringLiteral(s, _) if s == "abcd"));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }
}
