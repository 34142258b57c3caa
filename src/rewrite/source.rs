//! Immutable source buffer

use crate::parser::ast::SourceLocation;

/// The original text of one translation unit. Never modified; edits live
/// in an [`EditOverlay`](crate::rewrite::overlay::EditOverlay).
#[derive(Debug)]
pub struct SourceBuffer {
    text: String,
    /// Byte offset of the first character of each line
    line_offsets: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_offsets = Self::compute_line_offsets(&text);
        Self { text, line_offsets }
    }

    fn compute_line_offsets(text: &str) -> Vec<usize> {
        let mut offsets = vec![0];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                offsets.push(i + 1);
            }
        }
        offsets
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_char_boundary(&self, offset: usize) -> bool {
        self.text.is_char_boundary(offset)
    }

    /// Map a byte offset to a 1-based line and column (columns count
    /// characters, as the lexer does). Offsets past the end clamp to the end.
    pub fn line_column(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.text.len());
        let line_index = match self.line_offsets.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_offsets[line_index];
        let column = self.text.as_bytes()[line_start..offset]
            .iter()
            .filter(|&&byte| byte & 0xc0 != 0x80)
            .count()
            + 1;
        SourceLocation::new(offset, line_index + 1, column)
    }
}
