//! Stage 5, first half: internal links, categories and files.
//!
//! A link's label cannot hold another `[[`, so `[[a|b [[c]] d]]` yields only
//! the inner link. File captions are the exception: their closing `]]` is
//! found by bracket depth and the caption is parsed again for nested links.

use wikiparser_config::ConfigError;

use crate::kind::NodeKind;
use crate::parser::ParseContext;
use crate::parser::sentinel::{self, kind};
use crate::title::normalize_title;

const FILE_NS: i32 = 6;
const CATEGORY_NS: i32 = 14;

/// Byte length of the link target at the start of `text`.
fn target_len(text: &str) -> usize {
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if let Some((_, found, len)) = sentinel::parse_at(rest) {
            if found == kind::PIPE {
                break;
            }
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else { break };
        if matches!(c, '\n' | '[' | ']' | '{' | '}' | '|') {
            break;
        }
        i += c.len_utf8();
    }
    i
}

/// End of a plain label: the first `]]`, provided no `[[` comes before it.
fn label_end(text: &str) -> Option<usize> {
    let close = text.find("]]")?;
    (!text[..close].contains("[[")).then_some(close)
}

/// End of a file caption, skipping balanced nested links.
fn caption_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while let Some(offset) = text[i..].find(['[', ']']) {
        let at = i + offset;
        if text[at..].starts_with("[[") {
            depth += 1;
            i = at + 2;
        } else if text[at..].starts_with("]]") {
            if depth == 0 {
                return Some(at);
            }
            depth -= 1;
            i = at + 2;
        } else {
            i = at + 1;
        }
    }
    None
}

/// Splits a caption on `|` outside nested links.
fn split_options(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    let bytes = text.as_bytes();
    while i < bytes.len() {
        if text[i..].starts_with("[[") {
            depth += 1;
            i += 2;
        } else if text[i..].starts_with("]]") {
            depth = depth.saturating_sub(1);
            i += 2;
        } else {
            if bytes[i] == b'|' && depth == 0 {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            i += 1;
        }
    }
    parts.push(&text[start..]);
    parts
}

fn link_kind(target: &str, ctx: &ParseContext) -> Result<Option<NodeKind>, ConfigError> {
    let bare = sentinel::strip(target, &[kind::COMMENT]);
    let generated = sentinel::contains_any(&bare);
    let plain: String = sentinel::strip(&bare, &[kind::TEMPLATE, kind::ARG, kind::ESCAPED]);
    if plain.trim().is_empty() && !generated {
        return Ok(None);
    }
    let title = normalize_title(&plain, 0, &ctx.config)?;
    if !generated && !title.valid {
        return Ok(None);
    }
    let forced = plain.trim_start().starts_with(':');
    Ok(Some(match title.ns {
        FILE_NS if !forced => NodeKind::File,
        CATEGORY_NS if !forced => NodeKind::Category,
        _ => NodeKind::Link,
    }))
}

/// Tries a link right after `[[`; returns its sentinel and the bytes consumed.
fn link_at(text: &str, ctx: &mut ParseContext) -> Result<Option<(String, usize)>, ConfigError> {
    let target_end = target_len(text);
    let target = &text[..target_end];
    let rest = &text[target_end..];
    let Some(link) = link_kind(target, ctx)? else {
        return Ok(None);
    };

    let (label, consumed) = if rest.starts_with("]]") {
        (None, target_end + 2)
    } else if let Some(after_pipe) = rest.strip_prefix('|') {
        let end = if link == NodeKind::File {
            caption_end(after_pipe)
        } else {
            label_end(after_pipe)
        };
        let Some(end) = end else { return Ok(None) };
        (Some(&after_pipe[..end]), target_end + 1 + end + 2)
    } else {
        return Ok(None);
    };

    let stage = ctx.stage();
    let node = ctx.node(link);
    let target_node = ctx.leaf(NodeKind::LinkTarget, target);
    ctx.add(node, target_node);
    match (link, label) {
        (NodeKind::File, Some(caption)) => {
            for option in split_options(caption) {
                let param = ctx.slot(NodeKind::ImageParameter, option, stage, false);
                ctx.add(node, param);
            }
        }
        (_, Some(label)) => {
            let text_node = ctx.slot(NodeKind::LinkText, label, stage + 1, false);
            ctx.add(node, text_node);
        }
        (_, None) => {}
    }
    Ok(Some((ctx.push(node, kind::LINK), consumed)))
}

pub(crate) fn parse(text: &str, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    if !text.contains("[[") {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut search = 0;
    while let Some(offset) = text[search..].find("[[") {
        let at = search + offset;
        match link_at(&text[at + 2..], ctx)? {
            Some((sentinel, consumed)) => {
                out.push_str(&text[pos..at]);
                out.push_str(&sentinel);
                pos = at + 2 + consumed;
                search = pos;
            }
            None => search = at + 1,
        }
    }
    out.push_str(&text[pos..]);
    Ok(out)
}
