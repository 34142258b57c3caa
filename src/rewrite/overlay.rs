//! Edit overlay and output serialization
//!
//! Edits are recorded as pure insertions against the untouched
//! [`SourceBuffer`] and applied in a single pass at the end. Insertions at
//! the same offset come out in the order they were recorded.

use crate::rewrite::errors::OverlayError;
use crate::rewrite::source::SourceBuffer;

/// Text to insert before the character at `offset` (or at the end when
/// `offset` equals the buffer length)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub offset: usize,
    pub text: String,
}

pub struct EditOverlay<'src> {
    buffer: &'src SourceBuffer,
    insertions: Vec<Insertion>,
}

impl<'src> EditOverlay<'src> {
    pub fn new(buffer: &'src SourceBuffer) -> Self {
        Self {
            buffer,
            insertions: Vec::new(),
        }
    }

    pub fn buffer(&self) -> &'src SourceBuffer {
        self.buffer
    }

    /// Record an insertion. Offsets must lie within `0..=len` and on a
    /// character boundary.
    pub fn insert(&mut self, offset: usize, text: impl Into<String>) -> Result<(), OverlayError> {
        let len = self.buffer.len();
        if offset > len {
            return Err(OverlayError::OutOfBounds { offset, len });
        }
        if !self.buffer.is_char_boundary(offset) {
            return Err(OverlayError::NotCharBoundary { offset });
        }

        self.insertions.push(Insertion {
            offset,
            text: text.into(),
        });
        Ok(())
    }

    pub fn insertions(&self) -> &[Insertion] {
        &self.insertions
    }

    pub fn len(&self) -> usize {
        self.insertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Produce the edited text. The buffer itself is left unchanged.
    pub fn materialize(&self) -> String {
        let source = self.buffer.as_str();
        let extra: usize = self.insertions.iter().map(|i| i.text.len()).sum();
        let mut output = String::with_capacity(source.len() + extra);

        let mut ordered: Vec<&Insertion> = self.insertions.iter().collect();
        // Stable: equal offsets keep recording order
        ordered.sort_by_key(|insertion| insertion.offset);

        let mut copied = 0;
        for insertion in ordered {
            output.push_str(&source[copied..insertion.offset]);
            output.push_str(&insertion.text);
            copied = insertion.offset;
        }
        output.push_str(&source[copied..]);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overlay_reproduces_source() {
        let buffer = SourceBuffer::new("int main(void) { return 0; }\n");
        let overlay = EditOverlay::new(&buffer);

        assert_eq!(overlay.materialize(), buffer.as_str());
    }

    #[test]
    fn test_out_of_order_insertions() {
        let buffer = SourceBuffer::new("abcdef");
        let mut overlay = EditOverlay::new(&buffer);
        overlay.insert(4, "<2>").unwrap();
        overlay.insert(1, "<1>").unwrap();
        overlay.insert(6, "<end>").unwrap();
        overlay.insert(0, "<start>").unwrap();

        assert_eq!(overlay.materialize(), "<start>a<1>bcd<2>ef<end>");
    }

    #[test]
    fn test_equal_offsets_keep_recording_order() {
        let buffer = SourceBuffer::new("f(g())");
        let mut overlay = EditOverlay::new(&buffer);
        overlay.insert(6, " /*outer*/").unwrap();
        overlay.insert(6, " /*second*/").unwrap();

        assert_eq!(overlay.materialize(), "f(g()) /*outer*/ /*second*/");
    }

    #[test]
    fn test_rejects_invalid_offsets() {
        let buffer = SourceBuffer::new("é;");
        let mut overlay = EditOverlay::new(&buffer);

        assert_eq!(
            overlay.insert(4, "x"),
            Err(OverlayError::OutOfBounds { offset: 4, len: 3 })
        );
        assert_eq!(
            overlay.insert(1, "x"),
            Err(OverlayError::NotCharBoundary { offset: 1 })
        );
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_length_grows_by_inserted_text() {
        let buffer = SourceBuffer::new("f(); g();");
        let mut overlay = EditOverlay::new(&buffer);
        overlay.insert(3, " /*FP*/").unwrap();
        overlay.insert(8, " /*FP*/").unwrap();

        let output = overlay.materialize();
        assert_eq!(output.len(), buffer.len() + 2 * " /*FP*/".len());
        assert_eq!(output, "f() /*FP*/; g() /*FP*/;");
    }
}
