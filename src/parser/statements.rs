//! Statement parsing implementation
//!
//! This module handles parsing of all C statement types:
//!
//! - Declarations at block scope: `int (*fp)(int) = pick();`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`
//! - Labels: `name:`, `case value:`, `default:`
//! - Jump statements: `return`, `break`, `continue`, `goto`
//! - Compound statements: `{ ... }`
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! block_item ::= declaration | statement
//! statement  ::= block | if_stmt | while_stmt | for_stmt | do_while_stmt
//!              | switch_stmt | case_label | default_label | label
//!              | return_stmt | break_stmt | continue_stmt | goto_stmt
//!              | expr_stmt | ";"
//! ```
//!
//! Case and default labels are parsed as standalone nodes inside the switch
//! body, so fall-through and labels nested in inner blocks need no special
//! handling.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse `{ block_items }` without opening a scope; callers decide
    /// which scope the items belong to
    pub(crate) fn parse_compound_body(&mut self, ctx: &str) -> Result<Vec<AstNode>, ParseError> {
        self.expect_token(&TokenKind::LBrace, &format!("Expected '{{' before {ctx}"))?;

        let statements = self.nested(|parser| {
            let mut statements = Vec::new();
            while !parser.check(&TokenKind::RBrace) && !parser.is_at_end() {
                statements.extend(parser.parse_block_item()?);
            }
            Ok(statements)
        })?;

        self.expect_rbrace(&format!("after {ctx}"))?;
        Ok(statements)
    }

    /// Parse one block item: a declaration (possibly declaring several
    /// names) or a statement
    fn parse_block_item(&mut self) -> Result<Vec<AstNode>, ParseError> {
        if self.is_declaration_start() {
            self.parse_declaration(false)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.check(&TokenKind::LBrace) {
            self.push_scope();
            let statements = self.parse_compound_body("block");
            self.pop_scope();
            return Ok(AstNode::Block {
                statements: statements?,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Return) {
            return self.parse_return_statement();
        }

        if self.match_token(&TokenKind::If) {
            return self.parse_if_statement();
        }

        if self.match_token(&TokenKind::While) {
            return self.parse_while_statement();
        }

        if self.match_token(&TokenKind::Do) {
            return self.parse_do_while_statement();
        }

        if self.match_token(&TokenKind::For) {
            return self.parse_for_statement();
        }

        if self.match_token(&TokenKind::Switch) {
            return self.parse_switch_statement();
        }

        if self.match_token(&TokenKind::Case) {
            let value = self.parse_conditional()?;
            // GNU case range `case 1 ... 5:`
            if self.match_token(&TokenKind::Ellipsis) {
                self.parse_conditional()?;
            }
            self.expect_token(&TokenKind::Colon, "Expected ':' after case value")?;
            return Ok(AstNode::Case {
                value: Box::new(value),
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Default) {
            self.expect_token(&TokenKind::Colon, "Expected ':' after 'default'")?;
            return Ok(AstNode::Default { location: loc });
        }

        if self.match_token(&TokenKind::Break) {
            self.expect_semicolon("after 'break'")?;
            return Ok(AstNode::Break { location: loc });
        }

        if self.match_token(&TokenKind::Continue) {
            self.expect_semicolon("after 'continue'")?;
            return Ok(AstNode::Continue { location: loc });
        }

        if self.match_token(&TokenKind::Goto) {
            let label = self.expect_identifier()?;
            self.expect_semicolon("after 'goto'")?;
            return Ok(AstNode::Goto {
                label,
                location: loc,
            });
        }

        // Inline assembly carries no calls the rewriter can see
        if self.check(&TokenKind::Asm) {
            self.skip_gnu_annotations()?;
            self.expect_semicolon("after asm statement")?;
            return Ok(AstNode::Empty { location: loc });
        }

        if self.match_token(&TokenKind::Semicolon) {
            return Ok(AstNode::Empty { location: loc });
        }

        // Check for label: identifier followed by colon
        if let TokenKind::Ident(_) = self.peek().kind {
            if self.peek_kind_ahead(1) == Some(&TokenKind::Colon) {
                let name = self.expect_identifier()?;
                self.expect_token(&TokenKind::Colon, "Expected ':' after label")?;
                return Ok(AstNode::Label {
                    name,
                    location: loc,
                });
            }
        }

        // Otherwise, it's an expression statement
        let expr = self.parse_expression()?;
        self.expect_semicolon("after expression")?;
        Ok(AstNode::ExpressionStatement {
            expr: Box::new(expr),
            location: loc,
        })
    }

    /// Parse return statement
    fn parse_return_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_semicolon("after return")?;

        Ok(AstNode::Return { expr, location: loc })
    }

    /// Parse if statement
    fn parse_if_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after if condition")?;

        let then_branch = self.parse_statement_or_block()?;

        let else_branch = if self.match_token(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                // `else if` chains do not count as nesting
                Some(vec![self.parse_statement()?])
            } else {
                Some(self.parse_statement_or_block()?)
            }
        } else {
            None
        };

        Ok(AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after while condition")?;

        let body = self.parse_statement_or_block()?;

        Ok(AstNode::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse do-while statement
    fn parse_do_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let body = self.parse_statement_or_block()?;

        self.expect_token(&TokenKind::While, "Expected 'while' after do body")?;
        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after do-while condition")?;
        self.expect_semicolon("after do-while")?;

        Ok(AstNode::DoWhile {
            body,
            condition,
            location: loc,
        })
    }

    /// Parse for statement; declarations in the header get their own scope
    fn parse_for_statement(&mut self) -> Result<AstNode, ParseError> {
        self.push_scope();
        let result = self.parse_for_clauses();
        self.pop_scope();
        result
    }

    fn parse_for_clauses(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'for'")?;

        // Init (optional)
        let init = if self.match_token(&TokenKind::Semicolon) {
            Vec::new()
        } else if self.is_declaration_start() {
            // Declaration includes semicolon, so don't expect another
            self.parse_declaration(false)?
        } else {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for init")?;
            vec![expr]
        };

        // Condition (optional)
        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after for condition")?;

        // Increment (optional)
        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_rparen("after for clauses")?;

        let body = self.parse_statement_or_block()?;

        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    /// Parse switch statement
    fn parse_switch_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'switch'")?;
        let expr = Box::new(self.parse_expression()?);
        self.expect_rparen("after switch expression")?;

        let body = self.parse_statement_or_block()?;

        Ok(AstNode::Switch {
            expr,
            body,
            location: loc,
        })
    }

    /// Parse statement or block (for if/while/for/switch bodies)
    fn parse_statement_or_block(&mut self) -> Result<Vec<AstNode>, ParseError> {
        if self.check(&TokenKind::LBrace) {
            self.push_scope();
            let statements = self.parse_compound_body("block");
            self.pop_scope();
            statements
        } else {
            // Single statement; `if (a) if (b) ...` nests without braces
            Ok(vec![self.nested(Self::parse_statement)?])
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn body_of(source: &str) -> Vec<AstNode> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match program.nodes.into_iter().last() {
            Some(AstNode::FunctionDef { body, .. }) => body,
            other => panic!("Expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_statement() {
        let body = body_of("int main() { int x = 1; if (x > 0) return 1; else return 0; }");

        assert_eq!(body.len(), 2);
        assert!(matches!(
            &body[1],
            AstNode::If { then_branch, else_branch: Some(else_branch), .. }
                if then_branch.len() == 1 && else_branch.len() == 1
        ));
    }

    #[test]
    fn test_parse_switch_with_fallthrough() {
        let body = body_of(
            "void f(int x) { switch (x) { case 1: case 2: x++; break; default: x = 0; } }",
        );

        match &body[0] {
            AstNode::Switch { body, .. } => {
                assert!(matches!(body[0], AstNode::Case { .. }));
                assert!(matches!(body[1], AstNode::Case { .. }));
                assert!(matches!(body[2], AstNode::ExpressionStatement { .. }));
                assert!(matches!(body[3], AstNode::Break { .. }));
                assert!(matches!(body[4], AstNode::Default { .. }));
            }
            other => panic!("Expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_with_declarations() {
        let body = body_of("void f(void) { for (int i = 0, j = 1; i < j; i++) { } }");

        match &body[0] {
            AstNode::For {
                init,
                condition,
                increment,
                ..
            } => {
                assert_eq!(init.len(), 2);
                assert!(condition.is_some());
                assert!(increment.is_some());
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_labels_and_goto() {
        let body = body_of("void f(void) { goto done; done: ; }");

        assert!(matches!(&body[0], AstNode::Goto { label, .. } if label == "done"));
        assert!(matches!(&body[1], AstNode::Label { name, .. } if name == "done"));
        assert!(matches!(&body[2], AstNode::Empty { .. }));
    }

    #[test]
    fn test_block_scoped_typedef() {
        let body = body_of(
            "void f(void) { { typedef int (*cb)(void); cb c; } int cb = 2; cb * 3; }",
        );

        // Outside the inner block `cb` is an ordinary variable again
        assert!(matches!(&body[0], AstNode::Block { statements, .. } if statements.len() == 2));
        assert!(matches!(&body[1], AstNode::VarDecl { name, .. } if name == "cb"));
        assert!(matches!(
            &body[2],
            AstNode::ExpressionStatement { expr, .. }
                if matches!(**expr, AstNode::BinaryOp { op: BinOp::Mul, .. })
        ));
    }
}
