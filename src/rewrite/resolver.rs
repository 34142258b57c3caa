//! Token-end resolution
//!
//! The parser records where a call's closing `)` starts. The marker goes
//! right after that token, so the resolver re-lexes the original buffer at
//! that position and measures the token.

use crate::parser::ast::SourceLocation;
use crate::parser::lexer::Lexer;
use crate::rewrite::errors::LocationResolutionError;
use crate::rewrite::source::SourceBuffer;

pub struct TokenEndResolver<'src> {
    buffer: &'src SourceBuffer,
}

impl<'src> TokenEndResolver<'src> {
    pub fn new(buffer: &'src SourceBuffer) -> Self {
        Self { buffer }
    }

    /// Offset one past the last character of the token starting at
    /// `location`.
    pub fn token_end(&self, location: SourceLocation) -> Result<usize, LocationResolutionError> {
        let offset = location.offset;
        let len = self.buffer.len();
        if offset >= len {
            return Err(LocationResolutionError::EndOfBuffer { offset, len });
        }
        if !self.buffer.is_char_boundary(offset) {
            return Err(LocationResolutionError::NotAtToken { location });
        }

        let rest = &self.buffer.as_str().as_bytes()[offset..];
        let starts_comment = rest.starts_with(b"//") || rest.starts_with(b"/*");
        if rest[0].is_ascii_whitespace() || rest[0] == b'#' || starts_comment {
            return Err(LocationResolutionError::NotAtToken { location });
        }

        let token = Lexer::lex_token_at(self.buffer.as_str(), location).map_err(|err| {
            LocationResolutionError::Unlexable {
                location,
                message: err.message,
            }
        })?;

        Ok(offset + token.len())
    }
}
