//! Stage 1: templates, parser functions, arguments and headings.
//!
//! A single left-to-right scan with an explicit stack of open frames. Text is
//! copied into an output buffer; when a closing run matches the innermost
//! open frame, that frame's span is cut from the buffer, turned into a node
//! and replaced by a sentinel. Constructs therefore resolve innermost-first
//! without backtracking.
//!
//! `[[` and `-{` open guard frames: they build nothing here, but keep their
//! `|` from splitting an enclosing template and block `}}` until they close.
//! Headings open at a line-start `=` and close at the end of the line.

use wikiparser_config::ConfigError;

use crate::kind::NodeKind;
use crate::parser::sentinel::{self, kind};
use crate::parser::{ParseContext, SlotInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Brace,
    Link,
    Converter,
    Heading,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// Offset in the output buffer where the opening run begins.
    start: usize,
    /// Unmatched `{` in the opening run.
    count: usize,
    /// Offsets of top-level `|` separators.
    seps: Vec<usize>,
    /// First `=` of each part, indexed like the parts.
    eqs: Vec<Option<usize>>,
}

impl Frame {
    fn new(kind: FrameKind, start: usize, count: usize) -> Self {
        Self {
            kind,
            start,
            count,
            seps: Vec::new(),
            eqs: vec![None],
        }
    }

    fn records_separators(&self) -> bool {
        matches!(self.kind, FrameKind::Brace | FrameKind::Heading)
    }

    fn reset_parts(&mut self) {
        self.seps.clear();
        self.eqs = vec![None];
    }

    fn note_equals(&mut self, at: usize) {
        let part = self.seps.len();
        if self.eqs[part].is_none() {
            self.eqs[part] = Some(at);
        }
    }

    /// Hands the separators of a dropped heading to the frame below it.
    fn absorb(&mut self, dropped: Frame) {
        if !self.records_separators() {
            return;
        }
        let part = self.seps.len();
        if self.eqs[part].is_none() {
            self.eqs[part] = dropped.eqs[0];
        }
        for (sep, eq) in dropped.seps.into_iter().zip(dropped.eqs.into_iter().skip(1)) {
            self.seps.push(sep);
            self.eqs.push(eq);
        }
    }
}

/// A part of a brace construct: its text and the offset of its first `=`.
struct Part<'a> {
    text: &'a str,
    eq: Option<usize>,
}

fn split_parts<'a>(buffer: &'a str, content_start: usize, frame: &Frame) -> Vec<Part<'a>> {
    let mut bounds = vec![content_start];
    bounds.extend(frame.seps.iter().map(|s| s + 1));
    let mut ends: Vec<usize> = frame.seps.clone();
    ends.push(buffer.len());
    bounds
        .iter()
        .zip(ends)
        .zip(&frame.eqs)
        .map(|((start, end), eq)| Part {
            text: &buffer[*start..end],
            eq: eq.filter(|e| *e >= *start && *e < end).map(|e| e - start),
        })
        .collect()
}

fn special_kind(name: &str) -> Option<char> {
    Some(match name {
        "!" => kind::PIPE,
        "!!" => kind::DOUBLE_PIPE,
        "(!" => kind::TABLE_OPEN,
        "!)" => kind::TABLE_CLOSE,
        "!-" => kind::ROW,
        "=" => kind::EQUALS,
        _ => return None,
    })
}

fn valid_template_name(name: &str) -> bool {
    let bare = sentinel::strip(name, &[kind::COMMENT]);
    let bare = bare.trim();
    !bare.is_empty() && !bare.contains(['<', '>', '[', ']', '{', '}', '\n'])
}

struct Scan<'c> {
    ctx: &'c mut ParseContext,
    out: String,
    stack: Vec<Frame>,
    later: usize,
}

impl Scan<'_> {
    fn parameter(&mut self, part: &Part<'_>, positional_only: bool) -> crate::tree::NodeId {
        let param = self.ctx.node(NodeKind::Parameter);
        let (key, value, anon) = match part.eq {
            Some(eq) if !positional_only => (&part.text[..eq], &part.text[eq + 1..], false),
            _ => ("", part.text, true),
        };
        self.ctx.put(param, "anon", anon);
        let key = self.ctx.slot(NodeKind::ParameterKey, key, self.later, false);
        let value = self.ctx.slot(NodeKind::ParameterValue, value, self.later, true);
        self.ctx.add(param, key);
        self.ctx.add(param, value);
        param
    }

    fn arg(&mut self, parts: &[Part<'_>]) -> String {
        let node = self.ctx.node(NodeKind::Arg);
        for (i, part) in parts.iter().enumerate() {
            let (kind, line_start) = match i {
                0 => (NodeKind::ArgName, false),
                1 => (NodeKind::ArgDefault, true),
                _ => (NodeKind::Hidden, false),
            };
            let child = self.ctx.slot(kind, part.text, self.later, line_start);
            self.ctx.add(node, child);
        }
        self.ctx.push(node, kind::ARG)
    }

    /// Builds a template or parser function, or `None` when the name is not one.
    fn transclusion(&mut self, parts: &[Part<'_>]) -> Result<Option<String>, ConfigError> {
        let name = parts[0].text;
        let trimmed = name.trim();
        let config = self.ctx.config.clone();
        let functions = config.parser_functions()?;

        if parts.len() == 1 {
            if let Some(kind) = special_kind(trimmed).filter(|_| functions.is_sensitive(trimmed)) {
                let node = self.magic_word(name, "", &[], None);
                return Ok(Some(self.ctx.push(node, kind)));
            }
        }
        if let Some((function, rest)) = name.split_once(':') {
            if functions.canonical(function.trim()).is_some() {
                let first = Part { text: rest, eq: None };
                let node = self.magic_word(function, ":", &parts[1..], Some(&first));
                return Ok(Some(self.ctx.push(node, kind::TEMPLATE)));
            }
        }
        if functions.is_sensitive(trimmed) {
            let node = self.magic_word(name, "|", &parts[1..], None);
            return Ok(Some(self.ctx.push(node, kind::TEMPLATE)));
        }
        if !valid_template_name(name) {
            return Ok(None);
        }

        let node = self.ctx.node(NodeKind::Template);
        let name_node = self.ctx.slot(NodeKind::TemplateName, name, self.later, false);
        self.ctx.add(node, name_node);
        for part in &parts[1..] {
            let param = self.parameter(part, false);
            self.ctx.add(node, param);
        }
        Ok(Some(self.ctx.push(node, kind::TEMPLATE)))
    }

    fn magic_word(
        &mut self,
        name: &str,
        sep: &str,
        parts: &[Part<'_>],
        first: Option<&Part<'_>>,
    ) -> crate::tree::NodeId {
        let node = self.ctx.node(NodeKind::MagicWord);
        let name_node = self.ctx.slot(NodeKind::MagicWordName, name, self.later, false);
        self.ctx.add(node, name_node);
        self.ctx.put(node, "sep", sep);
        if let Some(first) = first {
            let param = self.parameter(first, true);
            self.ctx.add(node, param);
        }
        for part in parts {
            let param = self.parameter(part, false);
            self.ctx.add(node, param);
        }
        node
    }

    /// Handles a run of `n` closing braces starting at `text[i]`; returns bytes consumed.
    fn close_braces(&mut self, text: &str, i: usize, n: usize) -> Result<usize, ConfigError> {
        let mut remaining = n;
        while remaining >= 2 {
            let Some(top) = self.stack.last() else { break };
            if top.kind != FrameKind::Brace {
                break;
            }
            let matched = top.count.min(remaining).min(3);
            let inner_start = top.start + top.count - matched;
            let content_start = inner_start + matched;
            let built = {
                let buffer = std::mem::take(&mut self.out);
                let frame = self.stack.last().map(|f| split_parts(&buffer, content_start, f));
                let parts = frame.unwrap_or_default();
                let built = if matched == 3 {
                    Some(self.arg(&parts))
                } else {
                    self.transclusion(&parts)?
                };
                drop(parts);
                self.out = buffer;
                built
            };
            match built {
                Some(sentinel) => {
                    self.out.truncate(inner_start);
                    self.out.push_str(&sentinel);
                }
                None => self.out.push_str(&"}".repeat(matched)),
            }
            remaining -= matched;
            if let Some(top) = self.stack.last_mut() {
                top.count -= matched;
                if top.count < 2 {
                    self.stack.pop();
                } else {
                    top.reset_parts();
                }
            }
        }

        let after = i + n;
        let closes_converter = remaining >= 1
            && text[after..].starts_with('-')
            && self.stack.last().is_some_and(|f| f.kind == FrameKind::Converter);
        if closes_converter {
            self.out.push_str(&"}".repeat(remaining));
            self.out.push('-');
            self.stack.pop();
            return Ok(n + 1);
        }
        self.out.push_str(&"}".repeat(remaining));
        Ok(n)
    }

    /// Tries to turn the heading frame on top of the stack into a heading.
    fn close_heading(&mut self) {
        let Some(frame) = self.stack.pop() else { return };
        let line = &self.out[frame.start..];
        let lead = line.len() - line.trim_start_matches('=').len();

        let mut body_end = line.len();
        loop {
            let trimmed = line[..body_end].trim_end_matches([' ', '\t', '\r']);
            body_end = trimmed.len();
            let Some(low) = trimmed.rfind(sentinel::LOW) else { break };
            match sentinel::parse_at(&trimmed[low..]) {
                Some((_, kind::COMMENT | kind::INCLUDE, len)) if low + len == body_end => {
                    body_end = low;
                }
                _ => break,
            }
        }
        let body = &line[..body_end];
        let trail = body.len() - body.trim_end_matches('=').len();
        let level = lead.min(trail).min(6).min(body.len().saturating_sub(1) / 2);
        if level == 0 {
            self.drop_frame(frame);
            return;
        }

        let title = body[level..body.len() - level].to_string();
        let trail_text = line[body_end..].to_string();
        let node = self.ctx.node(NodeKind::Heading);
        self.ctx.put(node, "level", level as i64);
        let title = self.ctx.slot(NodeKind::HeadingTitle, &title, self.later, false);
        let trail_node = self.ctx.slot(NodeKind::HeadingTrail, &trail_text, self.later, false);
        self.ctx.add(node, title);
        self.ctx.add(node, trail_node);
        let sentinel = self.ctx.push(node, kind::HEADING);
        self.out.truncate(frame.start);
        self.out.push_str(&sentinel);
    }

    fn drop_frame(&mut self, frame: Frame) {
        if let Some(below) = self.stack.last_mut() {
            below.absorb(frame);
        }
    }

    fn end_of_line(&mut self) {
        let Some(pos) = self
            .stack
            .iter()
            .rposition(|f| f.kind == FrameKind::Heading)
        else {
            return;
        };
        if pos + 1 == self.stack.len() {
            self.close_heading();
        } else {
            let frame = self.stack.remove(pos);
            if pos > 0 {
                self.stack[pos - 1].absorb(frame);
            }
        }
    }

    fn open_heading(&mut self) {
        let mut frame = Frame::new(FrameKind::Heading, self.out.len(), 0);
        frame.eqs[0] = Some(self.out.len());
        self.stack.push(frame);
    }
}

fn run_len(text: &str, i: usize, c: u8) -> usize {
    text.as_bytes()[i..].iter().take_while(|b| **b == c).count()
}

pub(crate) fn parse(text: &str, slot: &SlotInfo, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    if !text.contains(['{', '[', '=']) {
        return Ok(text.to_string());
    }
    let later = ctx.stage() + 1;
    let mut scan = Scan {
        ctx,
        out: String::with_capacity(text.len()),
        stack: Vec::new(),
        later,
    };
    let bytes = text.as_bytes();
    let mut i = 0;
    if slot.line_start && text.starts_with('=') {
        scan.open_heading();
    }

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let n = run_len(text, i, b'{');
                if n >= 2 {
                    let start = scan.out.len();
                    scan.stack.push(Frame::new(FrameKind::Brace, start, n));
                }
                scan.out.push_str(&text[i..i + n]);
                i += n;
            }
            b'}' => {
                let n = run_len(text, i, b'}');
                i += scan.close_braces(text, i, n)?;
            }
            b'[' if text[i..].starts_with("[[") => {
                let start = scan.out.len();
                scan.stack.push(Frame::new(FrameKind::Link, start, 0));
                scan.out.push_str("[[");
                i += 2;
            }
            b']' if text[i..].starts_with("]]") => {
                if scan.stack.last().is_some_and(|f| f.kind == FrameKind::Link) {
                    scan.stack.pop();
                }
                scan.out.push_str("]]");
                i += 2;
            }
            b'-' if text[i..].starts_with("-{") && !text[i..].starts_with("-{{") => {
                let start = scan.out.len();
                scan.stack.push(Frame::new(FrameKind::Converter, start, 0));
                scan.out.push_str("-{");
                i += 2;
            }
            b'|' => {
                let at = scan.out.len();
                if let Some(top) = scan.stack.last_mut().filter(|f| f.records_separators()) {
                    top.seps.push(at);
                    top.eqs.push(None);
                }
                scan.out.push('|');
                i += 1;
            }
            b'=' => {
                let at = scan.out.len();
                if let Some(top) = scan.stack.last_mut().filter(|f| f.records_separators()) {
                    top.note_equals(at);
                }
                scan.out.push('=');
                i += 1;
            }
            b'\n' => {
                scan.end_of_line();
                scan.out.push('\n');
                i += 1;
                if bytes.get(i) == Some(&b'=') {
                    scan.open_heading();
                }
            }
            b'\0' => {
                let len = sentinel::len_at(&text[i..]).unwrap_or(1);
                scan.out.push_str(&text[i..i + len]);
                i += len;
            }
            _ => {
                let next = text[i..]
                    .find(['{', '}', '[', ']', '-', '|', '=', '\n', '\0'])
                    .map_or(text.len(), |n| if n == 0 { i + 1 } else { i + n });
                scan.out.push_str(&text[i..next]);
                i = next;
            }
        }
    }
    if scan
        .stack
        .last()
        .is_some_and(|f| f.kind == FrameKind::Heading)
    {
        scan.close_heading();
    }
    Ok(scan.out)
}

#[cfg(test)]
mod tests {
    use crate::kind::NodeKind;
    use crate::tree::{NodeId, Tree};
    use crate::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use wikiparser_config::Config;

    fn parse_braces(text: &str) -> Tree {
        let tree = parse(text, false, 2, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), text);
        tree
    }

    fn of_kind(tree: &Tree, kind: NodeKind) -> Vec<NodeId> {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|n| tree.kind(*n) == kind)
            .collect()
    }

    #[test]
    fn nested_templates_resolve_innermost_first() {
        let tree = parse_braces("{{a|{{b|c}}|d=e}}");
        let templates = of_kind(&tree, NodeKind::Template);
        assert_eq!(templates.len(), 2);
        let outer = templates[0];
        assert_eq!(tree.get_attribute(outer, "name"), Some("Template:A".into()));
        assert_eq!(tree.children(outer).len(), 3);
        let named = tree.child(outer, 2).unwrap();
        assert_eq!(tree.get_attribute(named, "name"), Some("d".into()));
    }

    #[rstest]
    #[case("{{{a}}}", 1, 0)]
    #[case("{{{a|b}}}", 1, 0)]
    #[case("{{{{a}}}}", 1, 0)]
    #[case("{{{{{a}}}}}", 1, 1)]
    #[case("{{{{{a}}}|b}}", 1, 1)]
    fn brace_run_disambiguation(#[case] text: &str, #[case] args: usize, #[case] templates: usize) {
        let tree = parse_braces(text);
        assert_eq!(of_kind(&tree, NodeKind::Arg).len(), args, "args in {text}");
        assert_eq!(of_kind(&tree, NodeKind::Template).len(), templates, "templates in {text}");
    }

    #[rstest]
    #[case("{{a<b}}")]
    #[case("{{}}")]
    #[case("{{a|[[b}}")]
    #[case("{{a")]
    #[case("a}}")]
    fn malformed_braces_stay_text(#[case] text: &str) {
        let tree = parse_braces(text);
        assert_eq!(of_kind(&tree, NodeKind::Template).len(), 0);
    }

    #[test]
    fn link_pipes_do_not_split_parameters() {
        let tree = parse_braces("{{a|[[b|c]]|d}}");
        let template = of_kind(&tree, NodeKind::Template)[0];
        assert_eq!(tree.children(template).len(), 3);
    }

    #[test]
    fn parser_functions_split_on_colon() {
        let tree = parse_braces("{{#if: x | y | z }}");
        let magic = of_kind(&tree, NodeKind::MagicWord)[0];
        assert_eq!(tree.get_attribute(magic, "name"), Some("#if".into()));
        let params: Vec<_> = tree.children(magic)[1..]
            .iter()
            .map(|p| tree.to_string(*p))
            .collect();
        assert_eq!(params, vec![" x ", " y ", " z "]);
    }

    #[test]
    fn variables_and_pipe_magic_words() {
        let tree = parse_braces("{{PAGENAME}}{{!}}{{pagename}}");
        assert_eq!(of_kind(&tree, NodeKind::MagicWord).len(), 2);
        assert_eq!(of_kind(&tree, NodeKind::Template).len(), 1);
    }

    #[rstest]
    #[case("== a ==", Some(2))]
    #[case("=a=", Some(1))]
    #[case("=== a ==", Some(2))]
    #[case("======= a =======", Some(6))]
    #[case("== a == <!--c-->", Some(2))]
    #[case("== a", None)]
    #[case("==", None)]
    #[case("x == a ==", None)]
    fn headings(#[case] text: &str, #[case] level: Option<i64>) {
        let tree = parse(text, false, 2, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), text);
        let headings = of_kind(&tree, NodeKind::Heading);
        assert_eq!(
            headings.first().map(|h| tree.get_attribute(*h, "level").unwrap().as_int().unwrap()),
            level
        );
    }

    #[test]
    fn heading_title_and_trail() {
        let tree = parse_braces("a\n== {{b}} == \nc");
        let heading = of_kind(&tree, NodeKind::Heading)[0];
        assert_eq!(tree.to_string(tree.child(heading, 0).unwrap()), " {{b}} ");
        assert_eq!(tree.to_string(tree.child(heading, 1).unwrap()), " ");
    }

    #[test]
    fn heading_inside_parameter() {
        let tree = parse_braces("{{a|\n== b ==\n}}");
        assert_eq!(of_kind(&tree, NodeKind::Heading).len(), 1);
        let template = of_kind(&tree, NodeKind::Template)[0];
        let param = tree.child(template, 1).unwrap();
        assert_eq!(tree.get_attribute(param, "anon"), Some(true.into()));
    }

    #[test]
    fn failed_heading_hands_equals_back() {
        let tree = parse_braces("{{a|\n=b\n}}");
        let param = of_kind(&tree, NodeKind::Parameter)[0];
        assert_eq!(tree.get_attribute(param, "anon"), Some(false.into()));
    }

    #[test]
    fn converter_guards_pipes() {
        let tree = parse_braces("{{a|-{x|y}-}}");
        let template = of_kind(&tree, NodeKind::Template)[0];
        assert_eq!(tree.children(template).len(), 2);
    }

    #[test]
    fn multibyte_text_is_copied_whole() {
        let tree = parse_braces("ü{{ä|ö}}é");
        assert_eq!(of_kind(&tree, NodeKind::Template).len(), 1);
    }
}
