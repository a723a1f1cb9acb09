//! Tag attribute scanner shared by extension tags, HTML tags and tables.
//!
//! Recognizes `key`, `key=value`, `key="value"` and `key='value'`, keeping
//! everything between attributes as text so the region round-trips.

use crate::kind::NodeKind;
use crate::parser::ParseContext;

fn is_space(c: char) -> bool {
    c.is_whitespace()
}

fn skip_spaces(text: &str, mut pos: usize) -> usize {
    while let Some(c) = text[pos..].chars().next() {
        if !is_space(c) {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

fn scan_while(text: &str, mut pos: usize, keep: impl Fn(char) -> bool) -> usize {
    while let Some(c) = text[pos..].chars().next() {
        if !keep(c) {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

struct Scanned<'a> {
    key: &'a str,
    equal: &'a str,
    quote: &'a str,
    value: &'a str,
    closed: bool,
    end: usize,
}

/// Scans one attribute whose key starts at `start`.
fn scan_attr(text: &str, start: usize) -> Option<Scanned<'_>> {
    let key_end = scan_while(text, start, |c| !is_space(c) && !matches!(c, '/' | '=' | '>'));
    if key_end == start {
        return None;
    }
    let key = &text[start..key_end];
    let after_key = skip_spaces(text, key_end);
    if !text[after_key..].starts_with('=') {
        return Some(Scanned {
            key,
            equal: "",
            quote: "",
            value: "",
            closed: true,
            end: key_end,
        });
    }
    let value_start = skip_spaces(text, after_key + 1);
    let equal = &text[key_end..value_start];
    let rest = &text[value_start..];
    if let Some(q) = rest.chars().next().filter(|c| matches!(c, '"' | '\'')) {
        let body = value_start + 1;
        let (value_end, closed, end) = match text[body..].find(q) {
            Some(n) => (body + n, true, body + n + 1),
            None => (text.len(), false, text.len()),
        };
        return Some(Scanned {
            key,
            equal,
            quote: &text[value_start..body],
            value: &text[body..value_end],
            closed,
            end,
        });
    }
    let value_end = scan_while(text, value_start, |c| !is_space(c) && c != '>');
    Some(Scanned {
        key,
        equal,
        quote: "",
        value: &text[value_start..value_end],
        closed: true,
        end: value_end,
    })
}

/// Builds an attribute container of `kind` for the raw region `text`.
pub(crate) fn build(ctx: &mut ParseContext, kind: NodeKind, text: &str) -> crate::tree::NodeId {
    let container = ctx.node(kind);
    let attr_kind = kind.attr_kind().unwrap_or(NodeKind::HtmlAttr);
    let mut junk_start = 0;
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        if is_space(c) || matches!(c, '/' | '=' | '>') {
            pos += c.len_utf8();
            continue;
        }
        let Some(scanned) = scan_attr(text, pos) else {
            pos += c.len_utf8();
            continue;
        };
        if pos > junk_start {
            ctx.expand_into(container, &text[junk_start..pos]);
        }
        let attr = ctx.node(attr_kind);
        ctx.put(attr, "equal", scanned.equal);
        ctx.put(attr, "quote", scanned.quote);
        ctx.put(attr, "closed", scanned.closed);
        let key = ctx.leaf(NodeKind::AttrKey, scanned.key);
        let value = ctx.leaf(NodeKind::AttrValue, scanned.value);
        ctx.add(attr, key);
        ctx.add(attr, value);
        ctx.add(container, attr);
        pos = scanned.end;
        junk_start = pos;
    }
    if junk_start < text.len() {
        ctx.expand_into(container, &text[junk_start..]);
    }
    container
}

#[cfg(test)]
mod tests {
    use crate::kind::NodeKind;
    use crate::{MAX_STAGE, parse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use wikiparser_config::Config;

    fn attrs_of(source: &str) -> Vec<(String, String, bool)> {
        let tree = parse(source, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), source);
        tree.descendants(tree.root())
            .into_iter()
            .filter(|n| tree.kind(*n).is_attr())
            .map(|n| {
                (
                    tree.get_attribute(n, "name").unwrap().to_string(),
                    tree.to_string(tree.child(n, 1).unwrap()),
                    tree.get_attribute(n, "closed").and_then(|v| v.as_bool()).unwrap(),
                )
            })
            .collect()
    }

    #[rstest]
    #[case(r#"<div class="a b">"#, vec![("class", "a b", true)])]
    #[case("<div id=x title='y'>", vec![("id", "x", true), ("title", "y", true)])]
    #[case("<div hidden id = z>", vec![("hidden", "", true), ("id", "z", true)])]
    #[case(r#"<div style="color:red>"#, vec![("style", "color:red", false)])]
    #[case(r#"<ref name="n" />"#, vec![("name", "n", true)])]
    fn scans_attributes(#[case] source: &str, #[case] expected: Vec<(&str, &str, bool)>) {
        let expected: Vec<_> = expected
            .into_iter()
            .map(|(k, v, c)| (k.to_string(), v.to_string(), c))
            .collect();
        assert_eq!(attrs_of(source), expected);
    }

    #[test]
    fn junk_is_kept_as_text() {
        let tree = parse("<span = / a=1>", false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        let html = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(html), NodeKind::Html);
        assert_eq!(tree.to_string(tree.root()), "<span = / a=1>");
        assert_eq!(tree.get_attr(html, "a").as_deref(), Some("1"));
    }
}
