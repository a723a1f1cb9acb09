//! Stage 6: bold and italic apostrophe runs.
//!
//! Works line by line. Runs of four apostrophes give one back to the text
//! before them, runs longer than five give back all but five. When both the
//! italic and the bold count of a line are odd, one bold run is demoted to
//! italic, preferring a run after a single-letter word, then one after a
//! longer word, then one after a space.

use crate::kind::NodeKind;
use crate::parser::ParseContext;
use crate::parser::sentinel::kind;
use crate::tree::NodeId;

/// A line split into text and apostrophe runs: `texts.len() == runs.len() + 1`.
#[derive(Debug, Default, PartialEq, Eq)]
struct Split {
    texts: Vec<String>,
    runs: Vec<usize>,
}

fn split_runs(line: &str) -> Split {
    let mut split = Split::default();
    let mut current = String::new();
    let mut rest = line;
    while let Some(at) = rest.find("''") {
        let len = rest[at..].len() - rest[at..].trim_start_matches('\'').len();
        current.push_str(&rest[..at]);
        split.texts.push(std::mem::take(&mut current));
        split.runs.push(len);
        rest = &rest[at + len..];
    }
    current.push_str(rest);
    split.texts.push(current);
    split
}

fn balance(split: &mut Split) {
    for (i, run) in split.runs.iter_mut().enumerate() {
        let keep = match *run {
            4 => 3,
            n if n > 5 => 5,
            n => n,
        };
        split.texts[i].push_str(&"'".repeat(*run - keep));
        *run = keep;
    }

    let italics = split.runs.iter().filter(|r| matches!(r, 2 | 5)).count();
    let bolds = split.runs.iter().filter(|r| matches!(r, 3 | 5)).count();
    if italics % 2 == 0 || bolds % 2 == 0 {
        return;
    }

    let mut single_letter = None;
    let mut multi_letter = None;
    let mut space = None;
    for (i, run) in split.runs.iter().enumerate() {
        if *run != 3 {
            continue;
        }
        let mut before = split.texts[i].chars().rev();
        let x1 = before.next();
        let x2 = before.next();
        match (x1, x2) {
            (Some(' '), _) => {
                space.get_or_insert(i);
            }
            (_, Some(' ')) => {
                single_letter = Some(i);
                break;
            }
            _ => {
                multi_letter.get_or_insert(i);
            }
        }
    }
    if let Some(i) = single_letter.or(multi_letter).or(space) {
        split.texts[i].push('\'');
        split.runs[i] = 2;
    }
}

fn quote_line(line: &str, ctx: &mut ParseContext, out: &mut String) {
    let mut split = split_runs(line);
    balance(&mut split);

    let mut italic: Option<NodeId> = None;
    let mut bold: Option<NodeId> = None;
    out.push_str(&split.texts[0]);
    for (run, text) in split.runs.iter().zip(&split.texts[1..]) {
        let node = ctx.leaf(NodeKind::Quote, &"'".repeat(*run));
        let is_italic = matches!(run, 2 | 5);
        let is_bold = matches!(run, 3 | 5);
        ctx.put(node, "italic", is_italic);
        ctx.put(node, "bold", is_bold);
        if is_italic {
            italic = match italic {
                Some(_) => None,
                None => Some(node),
            };
        }
        if is_bold {
            bold = match bold {
                Some(_) => None,
                None => Some(node),
            };
        }
        out.push_str(&ctx.push(node, kind::QUOTE));
        out.push_str(text);
    }
    for open in [italic, bold].into_iter().flatten() {
        ctx.put(open, "unclosed", true);
    }
}

pub(crate) fn parse(text: &str, ctx: &mut ParseContext) -> String {
    if !text.contains("''") {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.contains("''") {
            quote_line(line, ctx, &mut out);
        } else {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;
    use crate::{MAX_STAGE, parse as parse_tree};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use wikiparser_config::Config;

    fn balanced(line: &str) -> Split {
        let mut split = split_runs(line);
        balance(&mut split);
        split
    }

    #[rstest]
    #[case("''a''", vec!["", "a", ""], vec![2, 2])]
    #[case("''''a'''", vec!["'", "a", ""], vec![3, 3])]
    #[case("'''''''a'''''", vec!["''", "a", ""], vec![5, 5])]
    #[case("''bold'''", vec!["", "bold'", ""], vec![2, 2])]
    #[case("''a l'''x", vec!["", "a l'", "x"], vec![2, 2])]
    #[case("'''a ''b x'''y''", vec!["", "a ", "b x", "y", ""], vec![3, 2, 3, 2])]
    fn balances_runs(#[case] line: &str, #[case] texts: Vec<&str>, #[case] runs: Vec<usize>) {
        let split = balanced(line);
        assert_eq!(split.texts, texts);
        assert_eq!(split.runs, runs);
    }

    #[test]
    fn single_letter_beats_multi_letter_and_space() {
        let split = balanced("''x ab'''c a'''d e '''f");
        assert_eq!(split.runs, vec![2, 3, 2, 3]);
        assert_eq!(split.texts[2], "c a'");
    }

    fn quotes(text: &str) -> (Tree, Vec<NodeId>) {
        let tree = parse_tree(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), text);
        let found = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|n| tree.kind(*n) == NodeKind::Quote)
            .collect();
        (tree, found)
    }

    #[test]
    fn quote_nodes_and_visible_text() {
        let (tree, found) = quotes("''bold'''");
        assert_eq!(found.len(), 2);
        assert_eq!(tree.to_text(tree.root()), "bold'");
    }

    #[test]
    fn unclosed_runs_are_marked_per_line() {
        let (tree, found) = quotes("'''a\n''b''");
        assert_eq!(found.len(), 3);
        assert_eq!(tree.get_attribute(found[0], "unclosed"), Some(true.into()));
        assert_eq!(tree.get_attribute(found[0], "bold"), Some(true.into()));
        assert!(!tree.has_attribute(found[1], "unclosed"));
    }
}
