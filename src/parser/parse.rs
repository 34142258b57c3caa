//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, typedef-name scopes
//! - `declarations`: declaration specifiers, declarators, struct/union/enum
//! - `statements`: Parsing statements (if, while, for, etc.)
//! - `expressions`: Parsing expressions with precedence climbing
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! C cannot be parsed without knowing which identifiers name types, so the
//! parser keeps a stack of scopes recording whether each declared identifier
//! is a typedef name or an ordinary identifier that shadows one.
//!
//! Brackets, blocks and nested declarators share one nesting counter. Input
//! nested deeper than [`MAX_NESTING_DEPTH`] is rejected with a [`ParseError`]
//! instead of exhausting the stack.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Deepest nesting of parentheses, brackets, braces and declarators accepted
/// (clang's default bracket depth)
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("Parse error at line {}, column {}: {message}", location.line, location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for C
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// name -> is_typedef, innermost scope last
    pub(crate) type_scopes: Vec<FxHashMap<String, bool>>,
    pub(crate) anonymous_tags: usize,
    /// Current nesting depth, see [`Parser::nested`]
    pub(crate) depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Self::with_type_names(source, std::iter::empty::<&str>())
    }

    /// Create a parser that treats `names` as typedef names declared before
    /// the first line of `source` (stand-ins for types from unseen headers).
    pub fn with_type_names<I, S>(source: &str, names: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        let file_scope = names.into_iter().map(|n| (n.into(), true)).collect();
        Ok(Self {
            tokens,
            position: 0,
            type_scopes: vec![file_scope],
            anonymous_tags: 0,
            depth: 0,
        })
    }

    /// Parse the entire translation unit
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            let decls = self.parse_external_declaration()?;
            program.nodes.extend(decls);
        }

        Ok(program)
    }

    // ===== Typedef-name scopes =====

    pub(crate) fn push_scope(&mut self) {
        self.type_scopes.push(FxHashMap::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        if self.type_scopes.len() > 1 {
            self.type_scopes.pop();
        }
    }

    pub(crate) fn declare_name(&mut self, name: &str, is_typedef: bool) {
        if let Some(scope) = self.type_scopes.last_mut() {
            scope.insert(name.to_string(), is_typedef);
        }
    }

    /// Innermost declaration of `name`: Some(true) for a typedef name,
    /// Some(false) for an ordinary identifier, None if undeclared.
    pub(crate) fn lookup_name(&self, name: &str) -> Option<bool> {
        self.type_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    pub(crate) fn is_typedef_name(&self, name: &str) -> bool {
        self.lookup_name(name) == Some(true)
    }

    pub(crate) fn next_anonymous_tag(&mut self, kind: &str) -> String {
        self.anonymous_tags += 1;
        format!("<anonymous {} #{}>", kind, self.anonymous_tags)
    }

    /// Run `parse` one nesting level deeper, failing once the input nests
    /// past [`MAX_NESTING_DEPTH`]
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return self.error(format!(
                "Nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ===== Token classification =====

    /// Whether `kind` can begin a type name (specifier or qualifier).
    pub(crate) fn starts_type_name(&self, kind: &TokenKind) -> bool {
        match kind {
            TokenKind::Void
            | TokenKind::Bool
            | TokenKind::Char
            | TokenKind::Short
            | TokenKind::Int
            | TokenKind::Long
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Signed
            | TokenKind::Unsigned
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Const
            | TokenKind::Volatile
            | TokenKind::Restrict
            | TokenKind::Attribute
            | TokenKind::Extension => true,
            TokenKind::Ident(name) => self.is_typedef_name(name),
            _ => false,
        }
    }

    /// Whether the current token begins a declaration.
    pub(crate) fn is_declaration_start(&self) -> bool {
        let kind = &self.peek().kind;
        match kind {
            TokenKind::Typedef
            | TokenKind::Extern
            | TokenKind::Static
            | TokenKind::Auto
            | TokenKind::Register
            | TokenKind::ThreadLocal
            | TokenKind::Inline
            | TokenKind::Noreturn
            | TokenKind::StaticAssert => true,
            // `name: ...` is a label even when `name` is a typedef
            TokenKind::Ident(_) if self.peek_kind_ahead(1) == Some(&TokenKind::Colon) => false,
            // Two identifiers in a row can only be `type_name declarator`;
            // this admits types from headers that were never seen.
            TokenKind::Ident(name) if self.lookup_name(name).is_none() => {
                matches!(self.peek_kind_ahead(1), Some(TokenKind::Ident(_)))
            }
            _ => self.starts_type_name(kind),
        }
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        // The token stream always ends with Eof and `advance` never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind_ahead(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + n).map(|t| &t.kind)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            location: self.current_location(),
        })
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        message: &str,
    ) -> Result<SourceLocation, ParseError> {
        if self.check(kind) {
            Ok(self.advance().location())
        } else {
            self.error(format!("{}, found {}", message, self.peek()))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<SourceLocation, ParseError> {
        self.expect_token(&TokenKind::LParen, &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<SourceLocation, ParseError> {
        self.expect_token(&TokenKind::RParen, &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<SourceLocation, ParseError> {
        self.expect_token(&TokenKind::RBrace, &format!("Expected '}}' {ctx}"))
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<SourceLocation, ParseError> {
        self.expect_token(&TokenKind::Semicolon, &format!("Expected ';' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            self.error(format!("Expected identifier, found {}", self.peek()))
        }
    }

    /// Skip a balanced `( ... )` group starting at the current `(`.
    pub(crate) fn skip_balanced_parens(&mut self) -> Result<(), ParseError> {
        self.expect_lparen("to open group")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.is_at_end() {
                return self.error("Unbalanced parentheses");
            }
            match self.advance().kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// Skip GNU `__attribute__((...))` and `asm("...")` annotations.
    pub(crate) fn skip_gnu_annotations(&mut self) -> Result<(), ParseError> {
        loop {
            if self.match_token(&TokenKind::Attribute) || self.match_token(&TokenKind::Asm) {
                while self.match_token(&TokenKind::Volatile) || self.match_token(&TokenKind::Inline) {}
                self.skip_balanced_parens()?;
            } else if !self.match_token(&TokenKind::Extension) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_function() {
        let source = "int main() { return 0; }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::FunctionDef {
                name,
                func_type,
                body,
                ..
            } => {
                assert_eq!(name, "main");
                match func_type {
                    Type::Function {
                        return_type,
                        params,
                        ..
                    } => {
                        assert!(params.is_empty());
                        assert!(matches!(**return_type, Type::Base(BaseType::Int)));
                    }
                    other => panic!("Expected function type, got {:?}", other),
                }
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_expression() {
        let source = "int main() { int x = 1 + 2 * 3; }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();

        assert_eq!(program.nodes.len(), 1);
    }

    #[test]
    fn test_parse_struct() {
        let source = "struct Point { int x; int y; };";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::StructDef { name, fields, .. } => {
                assert_eq!(name, "Point");
                assert_eq!(fields.len(), 2);
            }
            _ => panic!("Expected struct definition"),
        }
    }

    #[test]
    fn test_known_type_names() {
        let source = "size_t n = 3; my_handle_t h;";
        let mut parser = Parser::with_type_names(source, ["size_t"]).unwrap();
        let program = parser.parse_program().unwrap();

        assert_eq!(program.nodes.len(), 2);
        assert!(matches!(
            &program.nodes[0],
            AstNode::VarDecl { var_type: Type::Base(BaseType::Named(n)), .. } if n == "size_t"
        ));
        assert!(matches!(
            &program.nodes[1],
            AstNode::VarDecl { var_type: Type::Base(BaseType::Named(n)), .. } if n == "my_handle_t"
        ));
    }

    #[test]
    fn test_parse_error_location() {
        let mut parser = Parser::new("int main() { return 0 }").unwrap();
        let err = parser.parse_program().unwrap_err();

        assert!(err.message.starts_with("Expected ';' after return"));
        assert_eq!(err.location.line, 1);
        assert_eq!(err.location.column, 23);
    }

    #[test]
    fn test_nesting_limit() {
        let within = format!("int x = {}1{};", "(".repeat(MAX_NESTING_DEPTH), ")".repeat(MAX_NESTING_DEPTH));
        let beyond = format!("int x = {}1{};", "(".repeat(MAX_NESTING_DEPTH + 1), ")".repeat(MAX_NESTING_DEPTH + 1));

        // Debug builds need more than the default test thread stack
        let handle = std::thread::Builder::new()
            .stack_size(8 << 20)
            .spawn(move || {
                let ok = Parser::new(&within).unwrap().parse_program();
                let err = Parser::new(&beyond).unwrap().parse_program();
                (ok.is_ok(), err.err().map(|err| err.message))
            })
            .unwrap();
        let (ok, err) = handle.join().unwrap();

        assert!(ok);
        assert_eq!(
            err,
            Some(format!("Nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"))
        );
    }

    #[test]
    fn test_depth_is_restored_after_each_group() {
        let source = format!("int a = ((1)); {}", "int b = (2); ".repeat(MAX_NESTING_DEPTH + 1));
        let mut parser = Parser::new(&source).unwrap();
        parser.parse_program().unwrap();

        assert_eq!(parser.depth, 0);
    }
}
