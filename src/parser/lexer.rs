//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Preprocessor directives are skipped as whole lines (including `\`-continued
//! lines) rather than expanded: the rewriter works on the text as written.
//! Conditional groups that are known to be dead, such as `#if 0` or
//! `#ifdef __cplusplus`, are skipped along with their directives.
//!
//! Every token records the byte offset where it starts and where it ends, so
//! the rewriting layer can place insertions on exact token boundaries. The
//! same rules are exposed through [`Lexer::lex_token_at`], which re-lexes a
//! single token at an arbitrary offset of the original buffer.

use super::ast::SourceLocation;
use super::conditional::{ConditionalStack, Directive};
use std::fmt;
use thiserror::Error;

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(u64),
    FloatLiteral(f64),
    CharLiteral(i64),
    StringLiteral(String),

    // Identifiers
    Ident(String),

    // Type specifiers
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Signed,
    Unsigned,
    Struct,
    Union,
    Enum,

    // Storage classes and qualifiers
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    ThreadLocal,
    Const,
    Volatile,
    Restrict,
    Inline,
    Noreturn,

    // Statements
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,

    // Operators spelled as keywords
    Sizeof,
    Alignof,
    StaticAssert,

    // GNU extensions that are parsed and dropped
    Attribute,
    Extension,
    Asm,

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    LtLt,  // <<
    GtGt,  // >>

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=
    AmpEq,     // &=
    PipeEq,    // |=
    CaretEq,   // ^=
    LtLtEq,    // <<=
    GtGtEq,    // >>=

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    // Member access
    Dot,   // .
    Arrow, // ->

    // Ternary
    Question, // ?
    Colon,    // :

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,
    Ellipsis,  // ...

    // End of file
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLiteral(n) => write!(f, "int literal {}", n),
            TokenKind::FloatLiteral(n) => write!(f, "float literal {}", n),
            TokenKind::CharLiteral(c) => write!(f, "char literal {}", c),
            TokenKind::StringLiteral(s) => write!(f, "string literal \"{}\"", s.escape_default()),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Eof => write!(f, "end of file"),
            other => write!(f, "'{}'", other.spelling()),
        }
    }
}

impl TokenKind {
    /// Source spelling of keyword and punctuator tokens.
    pub fn spelling(&self) -> &'static str {
        match self {
            TokenKind::Void => "void",
            TokenKind::Bool => "_Bool",
            TokenKind::Char => "char",
            TokenKind::Short => "short",
            TokenKind::Int => "int",
            TokenKind::Long => "long",
            TokenKind::Float => "float",
            TokenKind::Double => "double",
            TokenKind::Signed => "signed",
            TokenKind::Unsigned => "unsigned",
            TokenKind::Struct => "struct",
            TokenKind::Union => "union",
            TokenKind::Enum => "enum",
            TokenKind::Typedef => "typedef",
            TokenKind::Extern => "extern",
            TokenKind::Static => "static",
            TokenKind::Auto => "auto",
            TokenKind::Register => "register",
            TokenKind::ThreadLocal => "_Thread_local",
            TokenKind::Const => "const",
            TokenKind::Volatile => "volatile",
            TokenKind::Restrict => "restrict",
            TokenKind::Inline => "inline",
            TokenKind::Noreturn => "_Noreturn",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::Goto => "goto",
            TokenKind::Sizeof => "sizeof",
            TokenKind::Alignof => "_Alignof",
            TokenKind::StaticAssert => "_Static_assert",
            TokenKind::Attribute => "__attribute__",
            TokenKind::Extension => "__extension__",
            TokenKind::Asm => "asm",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::LtLt => "<<",
            TokenKind::GtGt => ">>",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::CaretEq => "^=",
            TokenKind::LtLtEq => "<<=",
            TokenKind::GtGtEq => ">>=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Ellipsis => "...",
            TokenKind::IntLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::CharLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::Ident(_)
            | TokenKind::Eof => "",
        }
    }
}

/// A token together with the span of source text it was lexed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    /// Byte offset one past the last character of the token
    pub end: usize,
}

impl Token {
    /// Returns the source location where this token starts.
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn len(&self) -> usize {
        self.end - self.location.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("Lexer error at line {}, column {}: {message}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for C source code
pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            position: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    /// Lex exactly one token starting at `location` without skipping
    /// anything first. Used to measure the extent of a token the parser
    /// already saw.
    pub fn lex_token_at(input: &'a str, location: SourceLocation) -> Result<Token, LexError> {
        let mut lexer = Self {
            input: input.as_bytes(),
            position: location.offset,
            line: location.line,
            column: location.column,
            at_line_start: false,
        };
        lexer.next_token()
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut conditionals = ConditionalStack::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                let loc = self.current_location();
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    location: loc,
                    end: loc.offset,
                });
                break;
            }

            if self.at_line_start && self.peek() == Some(b'#') {
                self.preprocessor_line(&mut conditionals)?;
                if !conditionals.is_live() {
                    self.skip_inactive_group(&mut conditionals)?;
                }
                continue;
            }

            tokens.push(self.next_token()?);
            self.at_line_start = false;
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let kind = self.next_token_kind(loc)?;
        Ok(Token {
            kind,
            location: loc,
            end: self.position,
        })
    }

    fn next_token_kind(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            // String literals
            b'"' => self.string_literal(loc),

            // Character literals
            b'\'' => self.char_literal(loc),

            // Numeric literals
            b'0'..=b'9' => self.number_literal(loc),
            b'.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number_literal(loc),

            // Identifiers and keywords
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier_or_keyword(loc),

            // Operators and punctuation
            b'+' => Ok(if self.match_char(b'+') {
                TokenKind::PlusPlus
            } else if self.match_char(b'=') {
                TokenKind::PlusEq
            } else {
                TokenKind::Plus
            }),
            b'-' => Ok(if self.match_char(b'-') {
                TokenKind::MinusMinus
            } else if self.match_char(b'=') {
                TokenKind::MinusEq
            } else if self.match_char(b'>') {
                TokenKind::Arrow
            } else {
                TokenKind::Minus
            }),
            b'*' => Ok(if self.match_char(b'=') {
                TokenKind::StarEq
            } else {
                TokenKind::Star
            }),
            b'/' => Ok(if self.match_char(b'=') {
                TokenKind::SlashEq
            } else {
                TokenKind::Slash
            }),
            b'%' => Ok(if self.match_char(b'=') {
                TokenKind::PercentEq
            } else {
                TokenKind::Percent
            }),
            b'=' => Ok(if self.match_char(b'=') {
                TokenKind::EqEq
            } else {
                TokenKind::Eq
            }),
            b'!' => Ok(if self.match_char(b'=') {
                TokenKind::NotEq
            } else {
                TokenKind::Bang
            }),
            b'<' => Ok(if self.match_char(b'=') {
                TokenKind::Le
            } else if self.match_char(b'<') {
                if self.match_char(b'=') {
                    TokenKind::LtLtEq
                } else {
                    TokenKind::LtLt
                }
            } else {
                TokenKind::Lt
            }),
            b'>' => Ok(if self.match_char(b'=') {
                TokenKind::Ge
            } else if self.match_char(b'>') {
                if self.match_char(b'=') {
                    TokenKind::GtGtEq
                } else {
                    TokenKind::GtGt
                }
            } else {
                TokenKind::Gt
            }),
            b'&' => Ok(if self.match_char(b'&') {
                TokenKind::AndAnd
            } else if self.match_char(b'=') {
                TokenKind::AmpEq
            } else {
                TokenKind::Amp
            }),
            b'|' => Ok(if self.match_char(b'|') {
                TokenKind::OrOr
            } else if self.match_char(b'=') {
                TokenKind::PipeEq
            } else {
                TokenKind::Pipe
            }),
            b'^' => Ok(if self.match_char(b'=') {
                TokenKind::CaretEq
            } else {
                TokenKind::Caret
            }),
            b'.' => {
                if self.peek() == Some(b'.') && self.peek_ahead(1) == Some(b'.') {
                    self.advance();
                    self.advance();
                    Ok(TokenKind::Ellipsis)
                } else {
                    Ok(TokenKind::Dot)
                }
            }
            b'~' => Ok(TokenKind::Tilde),
            b'?' => Ok(TokenKind::Question),
            b':' => Ok(TokenKind::Colon),
            b'(' => Ok(TokenKind::LParen),
            b')' => Ok(TokenKind::RParen),
            b'{' => Ok(TokenKind::LBrace),
            b'}' => Ok(TokenKind::RBrace),
            b'[' => Ok(TokenKind::LBracket),
            b']' => Ok(TokenKind::RBracket),
            b';' => Ok(TokenKind::Semicolon),
            b',' => Ok(TokenKind::Comma),

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", self.describe_byte(ch)),
                location: loc,
            }),
        }
    }

    /// Parse string literal; the opening quote is already consumed
    fn string_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut bytes = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                b'"' => {
                    self.advance(); // consume closing quote
                    return Ok(TokenKind::StringLiteral(
                        String::from_utf8_lossy(&bytes).into_owned(),
                    ));
                }
                b'\n' => break,
                b'\\' => {
                    self.advance();
                    let value = self.escape_sequence()?;
                    match u8::try_from(value) {
                        Ok(byte) => bytes.push(byte),
                        Err(_) => bytes.extend_from_slice(
                            char::from_u32(value as u32)
                                .unwrap_or(char::REPLACEMENT_CHARACTER)
                                .to_string()
                                .as_bytes(),
                        ),
                    }
                }
                _ => {
                    bytes.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    /// Parse character literal; the opening quote is already consumed
    fn char_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut value: i64 = 0;
        let mut count = 0;

        loop {
            match self.peek() {
                Some(b'\'') => {
                    self.advance();
                    break;
                }
                None | Some(b'\n') => {
                    return Err(LexError {
                        message: "Unterminated character literal".to_string(),
                        location: loc,
                    });
                }
                Some(b'\\') => {
                    self.advance();
                    value = (value << 8) | (self.escape_sequence()? & 0xff);
                }
                Some(ch) => {
                    self.advance();
                    value = (value << 8) | i64::from(ch);
                }
            }
            count += 1;
        }

        if count == 0 {
            return Err(LexError {
                message: "Empty character literal".to_string(),
                location: loc,
            });
        }

        Ok(TokenKind::CharLiteral(value))
    }

    /// Decode the escape sequence after a backslash
    fn escape_sequence(&mut self) -> Result<i64, LexError> {
        let loc = self.current_location();
        let escaped = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in escape sequence".to_string(),
            location: loc,
        })?;

        let value = match escaped {
            b'n' => 0x0a,
            b't' => 0x09,
            b'r' => 0x0d,
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'0'..=b'7' => {
                let mut value = i64::from(escaped - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            self.advance();
                            value = value * 8 + i64::from(d - b'0');
                        }
                        _ => break,
                    }
                }
                value
            }
            b'x' | b'u' | b'U' => {
                let mut value: i64 = 0;
                let mut digits = 0;
                while let Some(d) = self.peek().and_then(|c| (c as char).to_digit(16)) {
                    self.advance();
                    value = value.wrapping_mul(16).wrapping_add(i64::from(d));
                    digits += 1;
                }
                if digits == 0 {
                    return Err(LexError {
                        message: format!("Invalid escape sequence: \\{}", escaped as char),
                        location: loc,
                    });
                }
                value
            }
            // \\ \' \" \? and unknown escapes stand for the character itself
            other => i64::from(other),
        };

        Ok(value)
    }

    /// Parse numeric literal; the first character is already consumed
    fn number_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        // pp-number: digits, letters, '_', '.', and signs after an exponent
        while let Some(ch) = self.peek() {
            let prev = self.input[self.position - 1];
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'.' {
                self.advance();
            } else if (ch == b'+' || ch == b'-') && matches!(prev, b'e' | b'E' | b'p' | b'P') {
                self.advance();
            } else {
                break;
            }
        }

        let text = String::from_utf8_lossy(&self.input[loc.offset..self.position]).into_owned();
        let lower = text.to_ascii_lowercase();
        let is_hex = lower.starts_with("0x");
        let is_float = lower.contains('.')
            || (is_hex && lower.contains('p'))
            || (!is_hex && lower.contains('e'));

        let invalid = || LexError {
            message: format!("Invalid numeric literal: {}", text),
            location: loc,
        };

        if is_float {
            let digits = lower.trim_end_matches(['f', 'l']);
            if is_hex {
                // Hex floats are rare enough that their value is not needed
                return Ok(TokenKind::FloatLiteral(0.0));
            }
            return digits
                .parse::<f64>()
                .map(TokenKind::FloatLiteral)
                .map_err(|_| invalid());
        }

        let digits = lower.trim_end_matches(['u', 'l']);
        let value = if is_hex {
            u64::from_str_radix(&digits[2..], 16)
        } else if let Some(bin) = digits.strip_prefix("0b") {
            u64::from_str_radix(bin, 2)
        } else if digits.len() > 1 && digits.starts_with('0') {
            u64::from_str_radix(&digits[1..], 8)
        } else {
            digits.parse::<u64>()
        };

        value.map(TokenKind::IntLiteral).map_err(|_| invalid())
    }

    /// Parse identifier or keyword; the first character is already consumed
    fn identifier_or_keyword(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = String::from_utf8_lossy(&self.input[loc.offset..self.position]).into_owned();

        // Encoding prefixes: L"..", u8"..", u'..' and friends
        if matches!(ident.as_str(), "L" | "u" | "U" | "u8") {
            if self.match_char(b'"') {
                return self.string_literal(loc);
            }
            if ident != "u8" && self.match_char(b'\'') {
                return self.char_literal(loc);
            }
        }

        // Check if it's a keyword
        let token = match ident.as_str() {
            "void" => TokenKind::Void,
            "_Bool" => TokenKind::Bool,
            "char" => TokenKind::Char,
            "short" => TokenKind::Short,
            "int" => TokenKind::Int,
            "long" => TokenKind::Long,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "signed" | "__signed" | "__signed__" => TokenKind::Signed,
            "unsigned" => TokenKind::Unsigned,
            "struct" => TokenKind::Struct,
            "union" => TokenKind::Union,
            "enum" => TokenKind::Enum,
            "typedef" => TokenKind::Typedef,
            "extern" => TokenKind::Extern,
            "static" => TokenKind::Static,
            "auto" => TokenKind::Auto,
            "register" => TokenKind::Register,
            "_Thread_local" | "__thread" => TokenKind::ThreadLocal,
            "const" | "__const" | "__const__" => TokenKind::Const,
            "volatile" | "__volatile" | "__volatile__" => TokenKind::Volatile,
            "restrict" | "__restrict" | "__restrict__" => TokenKind::Restrict,
            "inline" | "__inline" | "__inline__" => TokenKind::Inline,
            "_Noreturn" => TokenKind::Noreturn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "goto" => TokenKind::Goto,
            "sizeof" => TokenKind::Sizeof,
            "_Alignof" | "__alignof" | "__alignof__" => TokenKind::Alignof,
            "_Static_assert" => TokenKind::StaticAssert,
            "__attribute__" | "__attribute" => TokenKind::Attribute,
            "__extension__" => TokenKind::Extension,
            "asm" | "__asm" | "__asm__" => TokenKind::Asm,
            _ => TokenKind::Ident(ident),
        };

        Ok(token)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') | Some(0x0b) | Some(0x0c) => {
                    self.advance();
                }
                Some(b'\\') if self.at_line_continuation() => {
                    self.advance();
                    self.advance();
                }
                Some(b'/') => {
                    if self.peek_ahead(1) == Some(b'/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some(b'*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...), leaving the newline in place
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some(b'*') && self.peek_ahead(1) == Some(b'/') {
                self.advance(); // skip '*'
                self.advance(); // skip '/'
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Skip preprocessor directive (#include, #define, ...), honouring
    /// backslash line continuations and comments that span lines
    fn skip_preprocessor_directive(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                b'\n' => break,
                b'\\' if self.at_line_continuation() => {
                    self.advance();
                    self.advance();
                }
                b'/' if self.peek_ahead(1) == Some(b'*') => self.skip_block_comment()?,
                b'/' if self.peek_ahead(1) == Some(b'/') => self.skip_line_comment(),
                _ => {
                    self.advance();
                }
            }
        }
        Ok(())
    }

    /// Skip the directive at the current `#`, applying it to
    /// `conditionals` when it opens, switches or closes a group
    fn preprocessor_line(&mut self, conditionals: &mut ConditionalStack) -> Result<(), LexError> {
        let loc = self.current_location();
        self.advance(); // skip '#'
        let start = self.position;
        self.skip_preprocessor_directive()?;

        let text = directive_text(&self.input[start..self.position]);
        conditionals
            .apply(Directive::parse(&text))
            .map_err(|message| LexError {
                message: message.to_string(),
                location: loc,
            })
    }

    /// Skip lines up to the directive that makes the text live again, or to
    /// the end of input if the group is never closed. Skipped lines are not
    /// tokenized, so they need not be C.
    fn skip_inactive_group(&mut self, conditionals: &mut ConditionalStack) -> Result<(), LexError> {
        loop {
            // Rest of the current line
            self.skip_preprocessor_directive()?;
            if self.advance().is_none() {
                return Ok(());
            }

            while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
                self.advance();
            }
            if self.peek() == Some(b'#') {
                self.preprocessor_line(conditionals)?;
                if conditionals.is_live() {
                    return Ok(());
                }
            }
        }
    }

    fn at_line_continuation(&self) -> bool {
        match self.peek_ahead(1) {
            Some(b'\n') => true,
            Some(b'\r') => self.peek_ahead(2) == Some(b'\n'),
            _ => false,
        }
    }

    fn describe_byte(&self, ch: u8) -> String {
        if ch.is_ascii_graphic() {
            (ch as char).to_string()
        } else {
            format!("\\x{:02x}", ch)
        }
    }

    /// Peek at current byte without consuming
    fn peek(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n bytes
    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.input.get(self.position + n).copied()
    }

    fn match_char(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance to next byte
    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else if ch & 0xc0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.position, self.line, self.column)
    }
}

/// Directive text after `#` with line continuations joined and comments
/// replaced by a space
fn directive_text(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_ref();

    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("\\\n").or_else(|| rest.strip_prefix("\\\r\n")) {
            rest = after;
        } else if let Some(after) = rest.strip_prefix("/*") {
            out.push(' ');
            rest = after.find("*/").map_or("", |end| &after[end + 2..]);
        } else if rest.starts_with("//") {
            break;
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("int main() { return 0; }");

        assert_eq!(tokens[0], TokenKind::Int);
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "main"));
        assert_eq!(tokens[2], TokenKind::LParen);
        assert_eq!(tokens[3], TokenKind::RParen);
        assert_eq!(tokens[4], TokenKind::LBrace);
        assert_eq!(tokens[5], TokenKind::Return);
        assert_eq!(tokens[6], TokenKind::IntLiteral(0));
        assert_eq!(tokens[7], TokenKind::Semicolon);
        assert_eq!(tokens[8], TokenKind::RBrace);
        assert_eq!(tokens[9], TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("++ -- += -= == != && || <<= >>= ... ->");

        assert_eq!(
            tokens,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::LtLtEq,
                TokenKind::GtGtEq,
                TokenKind::Ellipsis,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = kinds("int x; // comment\nint y; /* block\ncomment */ int z;");

        assert_eq!(tokens[0], TokenKind::Int);
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));
        assert_eq!(tokens[2], TokenKind::Semicolon);
        assert_eq!(tokens[3], TokenKind::Int);
        assert!(matches!(tokens[4], TokenKind::Ident(ref s) if s == "y"));
        assert_eq!(tokens[5], TokenKind::Semicolon);
        assert_eq!(tokens[6], TokenKind::Int);
        assert!(matches!(tokens[7], TokenKind::Ident(ref s) if s == "z"));
    }

    #[test]
    fn test_string_literal() {
        let tokens = kinds(r#""hello\nworld""#);

        match &tokens[0] {
            TokenKind::StringLiteral(s) => assert_eq!(s, "hello\nworld"),
            other => panic!("Expected string literal, got {:?}", other),
        }
    }

    #[test]
    fn test_number_literals() {
        let tokens = kinds("0x1F 017 42u 10UL 1.5f 2e3 .5");

        assert_eq!(tokens[0], TokenKind::IntLiteral(31));
        assert_eq!(tokens[1], TokenKind::IntLiteral(15));
        assert_eq!(tokens[2], TokenKind::IntLiteral(42));
        assert_eq!(tokens[3], TokenKind::IntLiteral(10));
        assert_eq!(tokens[4], TokenKind::FloatLiteral(1.5));
        assert_eq!(tokens[5], TokenKind::FloatLiteral(2000.0));
        assert_eq!(tokens[6], TokenKind::FloatLiteral(0.5));
    }

    #[test]
    fn test_char_literals() {
        let tokens = kinds(r"'a' '\n' '\x41' '\0' L'b'");

        assert_eq!(tokens[0], TokenKind::CharLiteral(97));
        assert_eq!(tokens[1], TokenKind::CharLiteral(10));
        assert_eq!(tokens[2], TokenKind::CharLiteral(65));
        assert_eq!(tokens[3], TokenKind::CharLiteral(0));
        assert_eq!(tokens[4], TokenKind::CharLiteral(98));
    }

    #[test]
    fn test_preprocessor_skip() {
        let tokens = kinds("#include <stdio.h>\n#define TWICE(x) \\\n  ((x) * 2)\nint x;");

        assert_eq!(tokens[0], TokenKind::Int);
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));
        assert_eq!(tokens[2], TokenKind::Semicolon);
    }

    #[test]
    fn test_dead_groups_are_not_tokenized() {
        let tokens = kinds("#if 0\nint @ $ 'unclosed // not /* a comment\n#endif\nint x;");
        assert_eq!(tokens[0], TokenKind::Int);
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));

        let tokens = kinds("#ifdef __cplusplus\nextern \"C\" {\n#endif\nint y;\n#ifdef __cplusplus\n}\n#endif\n");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0], TokenKind::Int);
    }

    #[test]
    fn test_dead_group_branches() {
        let source = "#if 0\n  #if 1\n  a\n  #else\n  b\n  #endif\nc\n#elif 0\nd\n#else\ne\n#endif\nf";
        let names: Vec<String> = kinds(source)
            .into_iter()
            .filter_map(|kind| match kind {
                TokenKind::Ident(name) => Some(name),
                _ => None,
            })
            .collect();

        assert_eq!(names, vec!["e", "f"]);
    }

    #[test]
    fn test_unknown_conditions_stay_live() {
        let tokens = kinds("#ifdef DEBUG\nint a;\n#else\nint b;\n#endif\n");
        assert_eq!(tokens.len(), 7);
    }

    #[test]
    fn test_directive_comments_and_continuations() {
        let tokens = kinds("#if /* on */ 0 \\\n  || 0 // never\nint a;\n#endif\nint b;");
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "b"));

        let locations: Vec<SourceLocation> = Lexer::new("#if 0\nx\n#endif\ny")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.location)
            .collect();
        assert_eq!(locations[0], SourceLocation::new(15, 4, 1));
    }

    #[test]
    fn test_unterminated_group_runs_to_end() {
        let tokens = kinds("int a;\n#if 0\nint b;\n");
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_misplaced_directive_is_an_error() {
        let err = Lexer::new("int a;\n#endif\n").tokenize().unwrap_err();
        assert_eq!(err.message, "#endif without #if");
        assert_eq!(err.location, SourceLocation::new(7, 2, 1));
    }

    #[test]
    fn test_hash_mid_line_is_an_error() {
        let mut lexer = Lexer::new("int x = 1 # 2;");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn test_token_offsets() {
        let mut lexer = Lexer::new("f(a)\n  >>= g");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(tokens[3].kind, TokenKind::RParen);
        assert_eq!(tokens[3].location.offset, 3);
        assert_eq!(tokens[3].end, 4);

        assert_eq!(tokens[4].kind, TokenKind::GtGtEq);
        assert_eq!(tokens[4].location, SourceLocation::new(7, 2, 3));
        assert_eq!(tokens[4].len(), 3);
    }

    #[test]
    fn test_lex_token_at() {
        let source = "x = call(\"a)b\");";
        let token = Lexer::lex_token_at(source, SourceLocation::new(9, 1, 10)).unwrap();

        assert_eq!(token.kind, TokenKind::StringLiteral("a)b".to_string()));
        assert_eq!(token.end, 14);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("int x; /* never closed");
        let err = lexer.tokenize().unwrap_err();
        assert_eq!(err.message, "Unterminated block comment");
        assert_eq!(err.location.column, 8);
    }
}
