//! Stage 4: list prefixes, definition colons, horizontal rules and behavior
//! switches.

use wikiparser_config::{ConfigError, MagicWords};

use crate::kind::NodeKind;
use crate::parser::sentinel::{self, kind};
use crate::parser::{ParseContext, SlotInfo};

const LIST_CHARS: [char; 4] = ['*', '#', ':', ';'];

/// The `:` ending a definition term, ignoring ones inside brackets and URLs.
fn definition_colon(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if let Some(len) = sentinel::len_at(rest) {
            i += len;
            continue;
        }
        match rest.as_bytes()[0] {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && !rest.starts_with("://") => return Some(i),
            _ => {}
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

struct Lines<'c> {
    ctx: &'c mut ParseContext,
    switches: Option<MagicWords>,
    out: String,
}

impl Lines<'_> {
    fn marker(&mut self, kind: NodeKind, text: &str, sentinel_kind: char) {
        let node = self.ctx.leaf(kind, text);
        let sentinel = self.ctx.push(node, sentinel_kind);
        self.out.push_str(&sentinel);
    }

    fn line(&mut self, line: &str, at_line_start: bool) -> Result<(), ConfigError> {
        if !at_line_start {
            return self.switches(line);
        }
        let dashes = line.len() - line.trim_start_matches('-').len();
        if dashes >= 4 {
            self.marker(NodeKind::Hr, &line[..dashes], kind::HR);
            return self.switches(&line[dashes..]);
        }
        let prefix_len = line.len() - line.trim_start_matches(LIST_CHARS).len();
        if prefix_len == 0 {
            return self.switches(line);
        }
        let prefix = &line[..prefix_len];
        self.marker(NodeKind::List, prefix, kind::LIST);
        let rest = &line[prefix_len..];
        match definition_colon(rest).filter(|_| prefix.contains(';')) {
            Some(colon) => {
                self.switches(&rest[..colon])?;
                self.marker(NodeKind::Dd, ":", kind::DD);
                self.switches(&rest[colon + 1..])
            }
            None => self.switches(rest),
        }
    }

    /// Copies `text`, replacing known `__SWITCH__` words with nodes.
    fn switches(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut pos = 0;
        let mut search = 0;
        while let Some(offset) = text[search..].find("__") {
            let at = search + offset;
            let name_start = at + 2;
            let name_len = text[name_start..]
                .find(|c: char| !c.is_alphanumeric())
                .unwrap_or(text.len() - name_start);
            let name_end = name_start + name_len;
            if name_len == 0 || !text[name_end..].starts_with("__") {
                search = at + 1;
                continue;
            }
            let name = &text[name_start..name_end];
            if self.switches.is_none() {
                self.switches = Some(self.ctx.config.double_underscore()?.clone());
            }
            let known = self
                .switches
                .as_ref()
                .is_some_and(|s| s.canonical(name).is_some());
            if !known {
                search = at + 1;
                continue;
            }
            self.out.push_str(&text[pos..at]);
            self.marker(NodeKind::DoubleUnderscore, name, kind::SWITCH);
            pos = name_end + 2;
            search = pos;
        }
        self.out.push_str(&text[pos..]);
        Ok(())
    }
}

pub(crate) fn parse(text: &str, slot: &SlotInfo, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    let mut lines = Lines {
        ctx,
        switches: None,
        out: String::with_capacity(text.len()),
    };
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            lines.out.push('\n');
        }
        lines.line(line, i > 0 || slot.line_start)?;
    }
    Ok(lines.out)
}

#[cfg(test)]
mod tests {
    use super::definition_colon;
    use crate::kind::NodeKind;
    use crate::parse;
    use crate::tree::Tree;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use wikiparser_config::Config;

    fn parse_lines(text: &str) -> Tree {
        let tree = parse(text, false, 5, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), text);
        tree
    }

    fn summary(tree: &Tree) -> Vec<(NodeKind, String)> {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|n| {
                matches!(
                    tree.kind(*n),
                    NodeKind::List | NodeKind::Dd | NodeKind::Hr | NodeKind::DoubleUnderscore
                )
            })
            .map(|n| (tree.kind(n), tree.to_string(n)))
            .collect()
    }

    #[rstest]
    #[case("* a\n*# b", vec![(NodeKind::List, "*"), (NodeKind::List, "*#")])]
    #[case("; term : def", vec![(NodeKind::List, ";"), (NodeKind::Dd, ":")])]
    #[case(": indent: no dd", vec![(NodeKind::List, ":")])]
    #[case("----\n---", vec![(NodeKind::Hr, "----")])]
    #[case("a * b", vec![])]
    #[case("__TOC__ x __notoc__ __UNKNOWN__", vec![(NodeKind::DoubleUnderscore, "__TOC__"), (NodeKind::DoubleUnderscore, "__notoc__")])]
    fn line_markers(#[case] text: &str, #[case] expected: Vec<(NodeKind, &str)>) {
        let tree = parse_lines(text);
        let expected: Vec<_> = expected.into_iter().map(|(k, s)| (k, s.to_string())).collect();
        assert_eq!(summary(&tree), expected);
    }

    #[test]
    fn switch_names_are_canonical() {
        let tree = parse_lines("__ToC__");
        let switch = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.get_attribute(switch, "name"), Some("toc".into()));
    }

    #[rstest]
    #[case(" a : b", Some(3))]
    #[case(" [http://x y] : b", Some(14))]
    #[case(" http://x", None)]
    fn finds_definition_colon(#[case] text: &str, #[case] expected: Option<usize>) {
        assert_eq!(definition_colon(text), expected);
    }
}
