//! Placeholder sentinels.
//!
//! Once a stage extracts a span into the accumulator it leaves
//! `\0{index}{kind}\x7F` in the working text. Later stages scan around these
//! markers, which keeps already-parsed spans out of their reach.

pub(crate) const LOW: char = '\0';
pub(crate) const HIGH: char = '\x7F';

/// Kind characters, grouped by the stage that emits them.
pub(crate) mod kind {
    pub const ESCAPED: char = 's';
    pub const COMMENT: char = 'c';
    pub const EXT: char = 'e';
    pub const INCLUDE: char = 'n';
    pub const HEADING: char = 'h';
    pub const TEMPLATE: char = 't';
    pub const ARG: char = 'a';
    pub const PIPE: char = '!';
    pub const DOUBLE_PIPE: char = '+';
    pub const TABLE_OPEN: char = '{';
    pub const TABLE_CLOSE: char = '}';
    pub const ROW: char = '-';
    pub const EQUALS: char = '~';
    pub const HTML: char = 'x';
    pub const TABLE: char = 'b';
    pub const DD: char = 'd';
    pub const HR: char = 'r';
    pub const SWITCH: char = 'u';
    pub const LIST: char = 'l';
    pub const LINK: char = 'k';
    pub const EXT_LINK: char = 'w';
    pub const QUOTE: char = 'q';
    pub const CONVERTER: char = 'v';
}

pub(crate) fn sentinel(index: usize, kind: char) -> String {
    format!("{LOW}{index}{kind}{HIGH}")
}

/// Parses a sentinel at the start of `text`: `(index, kind, byte length)`.
pub(crate) fn parse_at(text: &str) -> Option<(usize, char, usize)> {
    let rest = text.strip_prefix(LOW)?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let index = rest[..digits].parse().ok()?;
    let mut tail = rest[digits..].chars();
    let kind = tail.next()?;
    if tail.next()? != HIGH {
        return None;
    }
    Some((index, kind, 1 + digits + kind.len_utf8() + 1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    Text(&'a str),
    Sentinel { index: usize, kind: char },
}

/// Splits working text into literal runs and sentinels.
pub(crate) fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(LOW) {
        let at = pos + offset;
        match parse_at(&text[at..]) {
            Some((index, kind, len)) => {
                if at > literal_start {
                    out.push(Piece::Text(&text[literal_start..at]));
                }
                out.push(Piece::Sentinel { index, kind });
                pos = at + len;
                literal_start = pos;
            }
            None => pos = at + 1,
        }
    }
    if literal_start < text.len() {
        out.push(Piece::Text(&text[literal_start..]));
    }
    out
}

/// Byte length of the sentinel starting at `text`, if one does.
pub(crate) fn len_at(text: &str) -> Option<usize> {
    parse_at(text).map(|(_, _, len)| len)
}

/// Removes sentinels of the given kinds.
pub(crate) fn strip(text: &str, kinds: &[char]) -> String {
    pieces(text)
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(t) => t.to_string(),
            Piece::Sentinel { kind, .. } if kinds.contains(&kind) => String::new(),
            Piece::Sentinel { index, kind } => sentinel(index, kind),
        })
        .collect()
}

pub(crate) fn contains_any(text: &str) -> bool {
    pieces(text)
        .iter()
        .any(|p| matches!(p, Piece::Sentinel { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sentinels_split_out_of_text() {
        let text = format!("a{}b{}", sentinel(3, 't'), sentinel(12, 'c'));
        assert_eq!(
            pieces(&text),
            vec![
                Piece::Text("a"),
                Piece::Sentinel { index: 3, kind: 't' },
                Piece::Text("b"),
                Piece::Sentinel { index: 12, kind: 'c' },
            ]
        );
    }

    #[test]
    fn malformed_markers_stay_literal() {
        assert_eq!(pieces("a\0b"), vec![Piece::Text("a\0b")]);
        assert_eq!(parse_at("\05t"), None);
    }

    #[test]
    fn lengths_and_strip() {
        let s = sentinel(1, '!');
        assert_eq!(len_at(&s), Some(s.len()));
        assert_eq!(len_at(&format!(" {s}")), None);
        let mixed = format!("x{}y{}", sentinel(0, 'c'), sentinel(2, 't'));
        assert_eq!(strip(&mixed, &['c']), format!("xy{}", sentinel(2, 't')));
        assert!(contains_any(&mixed));
        assert!(!contains_any("plain"));
    }
}
