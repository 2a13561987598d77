//! Source module identities and byte spans

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source module
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// Id for the module at position `id`
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position of the module in registration order
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A byte offset span in a source module
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// First byte
    pub start: u32,
    /// Byte past the end
    pub end: u32,
}

impl Span {
    /// Span from `start` to `end`
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Span covering a `usize` byte range, as produced by tree-sitter
    pub fn from_range(range: Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }

    /// Byte range for slicing
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Length in bytes
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text this span covers in `source`, or an empty string when out of bounds
    pub fn slice<'src>(&self, source: &'src str) -> &'src str {
        source.get(self.range()).unwrap_or_default()
    }
}

/// A span with associated module
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileSpan {
    /// Module the span is in
    pub file: FileId,
    /// Span within the module
    pub span: Span,
}

impl FileSpan {
    /// Span in `file`
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// Byte range for slicing
    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_in_bounds() {
        let span = Span::new(6, 11);
        assert_eq!(span.slice("<?php class"), "class");
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn test_slice_out_of_bounds_is_empty() {
        let span = Span::new(4, 40);
        assert_eq!(span.slice("<?php"), "");
        assert!(Span::from_range(3..3).is_empty());
    }
}
