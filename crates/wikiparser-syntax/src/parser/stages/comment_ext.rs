//! Stage 0: comments, extension tags and inclusion markers.
//!
//! Runs first because these spans may hold unbalanced brackets that later
//! stages must never see. Closing tags are found by a case-insensitive scan
//! since the tag name has to match the opening one.

use log::trace;
use wikiparser_config::ConfigError;

use super::html::{TagHead, scan_tag};
use crate::kind::{NodeKind, PARSED_EXT};
use crate::parser::sentinel::kind;
use crate::parser::{ParseContext, SlotInfo};

const INCLUSION: &[&str] = &["includeonly", "noinclude", "onlyinclude"];

/// Finds `</name\s*>` at or after `from`. `lower` is `text` ASCII-lowercased.
fn find_closing(text: &str, lower: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let needle = format!("</{name}");
    let mut pos = from;
    while let Some(offset) = lower[pos..].find(&needle) {
        let start = pos + offset;
        let after = start + needle.len();
        let rest = &text[after..];
        let spaces = rest.len() - rest.trim_start().len();
        if rest[spaces..].starts_with('>') {
            return Some((start, after + spaces + 1));
        }
        pos = after;
    }
    None
}

fn marker(ctx: &mut ParseContext, text: &str) -> String {
    let node = ctx.leaf(NodeKind::Noinclude, text);
    ctx.push(node, kind::INCLUDE)
}

fn hidden(ctx: &mut ParseContext, open: &str, inner: &str, close: &str) -> String {
    let node = ctx.leaf(NodeKind::Include, inner);
    ctx.put(node, "open", open);
    ctx.put(node, "close", close);
    ctx.push(node, kind::INCLUDE)
}

struct Scanner<'a> {
    text: &'a str,
    lower: String,
    ext: Vec<String>,
}

impl Scanner<'_> {
    fn scan(&self, ctx: &mut ParseContext, from: usize, to: usize) -> String {
        let text = self.text;
        let mut out = String::with_capacity(to - from);
        let mut pos = from;
        while let Some(offset) = text[pos..to].find('<') {
            let at = pos + offset;
            out.push_str(&text[pos..at]);
            match self.construct(ctx, at, to) {
                Some((sentinel, end)) => {
                    out.push_str(&sentinel);
                    pos = end;
                }
                None => {
                    out.push('<');
                    pos = at + 1;
                }
            }
        }
        out.push_str(&text[pos..to]);
        out
    }

    /// Recognizes a construct starting at `at`; returns its sentinel and end.
    fn construct(&self, ctx: &mut ParseContext, at: usize, to: usize) -> Option<(String, usize)> {
        let rest = &self.text[at..to];
        if let Some(body) = rest.strip_prefix("<!--") {
            let (content, closed, len) = match body.find("-->") {
                Some(end) => (&body[..end], true, 4 + end + 3),
                None => (body, false, rest.len()),
            };
            let node = ctx.leaf(NodeKind::Comment, content);
            ctx.put(node, "closed", closed);
            return Some((ctx.push(node, kind::COMMENT), at + len));
        }

        let head = scan_tag(rest, true)?;
        let name = head.name.to_ascii_lowercase();
        let tag_end = at + head.len;
        if INCLUSION.contains(&name.as_str()) {
            return Some(self.inclusion(ctx, &head, &name, at, tag_end, to));
        }
        if head.closing || !self.ext.contains(&name) {
            return None;
        }
        if head.self_closing {
            return Some((self.ext_node(ctx, &head, &name, None), tag_end));
        }
        let (close_start, close_end) = find_closing(&self.text[..to], &self.lower[..to], &name, tag_end)?;
        let inner = &self.text[tag_end..close_start];
        let closing = &self.text[close_start..close_end];
        Some((self.ext_node(ctx, &head, &name, Some((inner, closing))), close_end))
    }

    fn inclusion(
        &self,
        ctx: &mut ParseContext,
        head: &TagHead,
        name: &str,
        at: usize,
        tag_end: usize,
        to: usize,
    ) -> (String, usize) {
        let hiding = if ctx.include { "noinclude" } else { "includeonly" };
        let open = &self.text[at..tag_end];
        if name != hiding || head.closing || head.self_closing {
            return (marker(ctx, open), tag_end);
        }
        match find_closing(&self.text[..to], &self.lower[..to], name, tag_end) {
            Some((close_start, close_end)) => {
                let inner = &self.text[tag_end..close_start];
                let close = &self.text[close_start..close_end];
                (hidden(ctx, open, inner, close), close_end)
            }
            None => (hidden(ctx, open, &self.text[tag_end..to], ""), to),
        }
    }

    fn ext_node(&self, ctx: &mut ParseContext, head: &TagHead, name: &str, body: Option<(&str, &str)>) -> String {
        let node = ctx.node(NodeKind::Ext);
        ctx.put(node, "name", name);
        ctx.put(node, "tag", head.name);
        ctx.put(node, "selfClosing", body.is_none());
        let attrs = super::attributes::build(ctx, NodeKind::ExtAttrs, head.attrs);
        ctx.add(node, attrs);
        if let Some((inner, closing)) = body {
            let inner_node = if PARSED_EXT.contains(&name) {
                let stage = ctx.stage();
                ctx.slot(NodeKind::ExtInner, inner, stage, true)
            } else {
                ctx.leaf(NodeKind::ExtInner, inner)
            };
            ctx.add(node, inner_node);
            ctx.put(node, "closing", closing);
        }
        trace!("extension tag <{name}>");
        ctx.push(node, kind::EXT)
    }
}

pub(crate) fn parse(text: &str, slot: &SlotInfo, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    if !text.contains('<') {
        return Ok(text.to_string());
    }
    let scanner = Scanner {
        text,
        lower: text.to_ascii_lowercase(),
        ext: ctx.config.ext()?.to_vec(),
    };

    const OPEN: &str = "<onlyinclude>";
    const CLOSE: &str = "</onlyinclude>";
    if !(ctx.include && slot.kind == NodeKind::Root && scanner.lower.contains(OPEN)) {
        return Ok(scanner.scan(ctx, 0, text.len()));
    }

    // In transclusion mode only the `<onlyinclude>` blocks survive.
    let mut out = String::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(offset) = scanner.lower[pos..].find(OPEN) else {
            out.push_str(&hidden(ctx, "", &text[pos..], ""));
            break;
        };
        let open = pos + offset;
        if open > pos {
            out.push_str(&hidden(ctx, "", &text[pos..open], ""));
        }
        let body = open + OPEN.len();
        out.push_str(&marker(ctx, &text[open..body]));
        match scanner.lower[body..].find(CLOSE) {
            Some(n) => {
                out.push_str(&scanner.scan(ctx, body, body + n));
                out.push_str(&marker(ctx, &text[body + n..body + n + CLOSE.len()]));
                pos = body + n + CLOSE.len();
            }
            None => {
                out.push_str(&scanner.scan(ctx, body, text.len()));
                pos = text.len();
            }
        }
    }
    Ok(out)
}
