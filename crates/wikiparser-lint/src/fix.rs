//! Text edits attached to diagnostics.

use serde::Serialize;
use std::ops::Range;

/// Replace `range` of the source with `replacement`. Offsets are bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub description: String,
    pub range: Range<usize>,
    pub replacement: String,
}

impl Fix {
    pub fn new(description: impl Into<String>, range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(description: impl Into<String>, at: usize, text: impl Into<String>) -> Self {
        Self::new(description, at..at, text)
    }

    pub fn delete(description: impl Into<String>, range: Range<usize>) -> Self {
        Self::new(description, range, "")
    }
}

/// Applies `fixes` to `text`, returning the edited text and how many were used.
///
/// Fixes are taken in order of their start offset. One that overlaps an
/// already applied fix, or that falls outside `text` or off a character
/// boundary, is skipped; running the linter again will report it anew.
pub fn apply_fixes<'a>(text: &str, fixes: impl IntoIterator<Item = &'a Fix>) -> (String, usize) {
    let mut sorted: Vec<&Fix> = fixes.into_iter().collect();
    sorted.sort_by_key(|fix| (fix.range.start, fix.range.end));

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut applied = 0;
    for fix in sorted {
        let Range { start, end } = fix.range;
        let valid = start >= pos && start <= end && text.get(start..end).is_some();
        if !valid {
            continue;
        }
        out.push_str(&text[pos..start]);
        out.push_str(&fix.replacement);
        pos = end;
        applied += 1;
    }
    out.push_str(&text[pos..]);
    (out, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn applies_in_offset_order() {
        let fixes = [
            Fix::insert("close", 5, "-->"),
            Fix::new("escape", 0..1, "&lt;"),
        ];
        assert_eq!(apply_fixes("<a b c", &fixes), ("&lt;a b -->c".to_string(), 2));
    }

    #[test]
    fn skips_overlaps_and_bad_ranges() {
        let fixes = [
            Fix::new("first", 0..3, "x"),
            Fix::new("overlap", 2..4, "y"),
            Fix::new("outside", 10..12, "z"),
            Fix::delete("last", 4..5),
        ];
        assert_eq!(apply_fixes("abcdef", &fixes), ("xdf".to_string(), 2));
    }

    #[test]
    fn insertions_at_the_same_offset_both_apply() {
        let fixes = [Fix::insert("a", 1, "A"), Fix::insert("b", 1, "B")];
        assert_eq!(apply_fixes("xy", &fixes), ("xABy".to_string(), 2));
    }
}
