//! Source file spans and locations

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    Default,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
)]
#[display("file#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A byte offset span in a source file
#[derive(Copy, Clone, Debug, Display, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[display("{start}..{end}")]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A span with associated file
#[derive(Copy, Clone, Debug, Display, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[display("{file}:{span}")]
pub struct FileSpan {
    pub file: FileId,
    pub span: Span,
}

impl FileSpan {
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }

    /// Covering span; the file of `self` wins if they differ
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        if self.file != other.file {
            return self;
        }
        Self {
            file: self.file,
            span: self.span.cover(other.span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_spans_same_file() {
        let file = FileId::new(0);
        let left = FileSpan::new(file, Span::new(4, 8));
        let right = FileSpan::new(file, Span::new(2, 6));
        assert_eq!(left.cover(right).span, Span::new(2, 8));
        assert_eq!(left.to_string(), "file#0:4..8");
    }

    #[test]
    fn cover_keeps_left_across_files() {
        let left = FileSpan::new(FileId::new(0), Span::new(4, 8));
        let right = FileSpan::new(FileId::new(1), Span::new(0, 20));
        assert_eq!(left.cover(right), left);
    }
}
