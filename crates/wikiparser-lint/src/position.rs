//! Byte offset to line/column translation, computed on demand.
//!
//! A lint run shares one [`Source`] between all of its diagnostics. The line
//! table is only built when the first diagnostic asks for a line or column,
//! and each diagnostic memoizes its own resolved span.

use std::sync::{Arc, OnceLock};

/// Zero-based line and column. Columns count Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The serialized document a lint run reports against.
#[derive(Debug)]
pub(crate) struct Source {
    text: String,
    line_starts: OnceLock<Vec<usize>>,
}

impl Source {
    pub(crate) fn new(text: String) -> Self {
        Self {
            text,
            line_starts: OnceLock::new(),
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    fn line_starts(&self) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0];
            starts.extend(self.text.match_indices('\n').map(|(i, _)| i + 1));
            starts
        })
    }

    /// Position of a byte offset, clamped to the end of the text.
    pub(crate) fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let starts = self.line_starts();
        let line = starts.binary_search(&offset).unwrap_or_else(|i| i - 1);
        let line_start = starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        Position::new(line, column)
    }
}

/// A byte range whose line/column form is resolved on first access.
#[derive(Debug, Clone)]
pub struct LazySpan {
    source: Arc<Source>,
    start: usize,
    end: usize,
    resolved: OnceLock<(Position, Position)>,
}

impl LazySpan {
    pub(crate) fn new(source: Arc<Source>, start: usize, end: usize) -> Self {
        Self {
            source,
            start,
            end,
            resolved: OnceLock::new(),
        }
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn end_index(&self) -> usize {
        self.end
    }

    fn resolved(&self) -> (Position, Position) {
        *self
            .resolved
            .get_or_init(|| (self.source.position(self.start), self.source.position(self.end)))
    }

    pub fn start(&self) -> Position {
        self.resolved().0
    }

    pub fn end(&self) -> Position {
        self.resolved().1
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl PartialEq for LazySpan {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.source.text() == other.source.text()
    }
}

impl Eq for LazySpan {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, Position::new(0, 0))]
    #[case(2, Position::new(0, 2))]
    #[case(3, Position::new(1, 0))]
    #[case(6, Position::new(1, 2))]
    #[case(8, Position::new(2, 0))]
    #[case(99, Position::new(2, 0))]
    fn positions(#[case] offset: usize, #[case] expected: Position) {
        let source = Source::new("ab\nçd\n".to_string());
        assert_eq!(source.position(offset), expected);
    }

    #[test]
    fn spans_resolve_once_on_demand() {
        let source = Arc::new(Source::new("a\nbc".to_string()));
        let span = LazySpan::new(Arc::clone(&source), 2, 4);
        assert!(!span.is_resolved());
        assert!(source.line_starts.get().is_none());
        assert_eq!(span.start(), Position::new(1, 0));
        assert!(span.is_resolved());
        assert_eq!(span.end(), Position::new(1, 2));
    }
}
