//! Stage 2: HTML tags.
//!
//! Each opening, closing or self-closing tag becomes its own node; pairing
//! them up happens on the finished tree (see `Tree::matching_tag`), where it is
//! known which spans ended up as text.

use wikiparser_config::ConfigError;

use super::attributes;
use crate::kind::NodeKind;
use crate::parser::ParseContext;
use crate::parser::sentinel::kind;

/// The head of a tag: `<name attrs>`, `</name>` or `<name attrs/>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagHead<'a> {
    pub(crate) closing: bool,
    pub(crate) name: &'a str,
    pub(crate) attrs: &'a str,
    pub(crate) self_closing: bool,
    pub(crate) len: usize,
}

/// Scans a tag at the start of `text`. With `allow_lt`, the attribute region
/// may contain `<`.
pub(crate) fn scan_tag(text: &str, allow_lt: bool) -> Option<TagHead<'_>> {
    let body = text.strip_prefix('<')?;
    let (closing, body, prefix) = match body.strip_prefix('/') {
        Some(rest) => (true, rest, 2),
        None => (false, body, 1),
    };
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name_len = body
        .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '<' | '\0' | '\x7F'))
        .unwrap_or(body.len());
    let name = &body[..name_len];
    let gt = name_len + body[name_len..].find('>')?;
    let region = &body[name_len..gt];
    if !allow_lt && region.contains('<') {
        return None;
    }
    let (attrs, self_closing) = match region.strip_suffix('/') {
        Some(attrs) => (attrs, true),
        None => (region, false),
    };
    Some(TagHead {
        closing,
        name,
        attrs,
        self_closing,
        len: prefix + gt + 1,
    })
}

pub(crate) fn parse(text: &str, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    if !text.contains('<') {
        return Ok(text.to_string());
    }
    let config = ctx.config.clone();
    let html = config.html()?;
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(offset) = text[pos..].find('<') {
        let at = pos + offset;
        out.push_str(&text[pos..at]);
        let head = scan_tag(&text[at..], false)
            .filter(|head| html.contains(&head.name.to_ascii_lowercase()));
        let Some(head) = head else {
            out.push('<');
            pos = at + 1;
            continue;
        };
        let node = ctx.node(NodeKind::Html);
        ctx.put(node, "name", head.name.to_ascii_lowercase());
        ctx.put(node, "tag", head.name);
        ctx.put(node, "closing", head.closing);
        ctx.put(node, "selfClosing", head.self_closing);
        ctx.put(node, "close", if head.self_closing { "/>" } else { ">" });
        let attrs = attributes::build(ctx, NodeKind::HtmlAttrs, head.attrs);
        ctx.add(node, attrs);
        out.push_str(&ctx.push(node, kind::HTML));
        pos = at + head.len;
    }
    out.push_str(&text[pos..]);
    Ok(out)
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

    #[rstest]
    #[case("<b>", false, "b", "", false, 3)]
    #[case("</B >", true, "B", " ", false, 5)]
    #[case("<br/>", false, "br", "", true, 5)]
    #[case(r#"<div class="x" />"#, false, "div", r#" class="x" "#, true, 17)]
    fn scans_tag_heads(
        #[case] text: &str,
        #[case] closing: bool,
        #[case] name: &str,
        #[case] attrs: &str,
        #[case] self_closing: bool,
        #[case] len: usize,
    ) {
        assert_eq!(
            scan_tag(text, false),
            Some(TagHead {
                closing,
                name,
                attrs,
                self_closing,
                len
            })
        );
    }

    #[rstest]
    #[case("< b>")]
    #[case("<1>")]
    #[case("<b")]
    #[case("<b <i>")]
    fn rejects_non_tags(#[case] text: &str) {
        assert_eq!(scan_tag(text, false), None);
    }

    fn html_nodes(text: &str) -> (Tree, Vec<crate::tree::NodeId>) {
        let tree = parse_tree(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), text);
        let nodes = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|n| tree.kind(*n) == NodeKind::Html)
            .collect();
        (tree, nodes)
    }

    #[test]
    fn known_tags_become_nodes() {
        let (tree, nodes) = html_nodes("a <b>bold</b> <foo>x</foo> <br>");
        let names: Vec<_> = nodes
            .iter()
            .map(|n| tree.get_attribute(*n, "name").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["b", "b", "br"]);
        assert_eq!(tree.get_attribute(nodes[1], "closing"), Some(true.into()));
    }

    #[test]
    fn template_inside_attributes() {
        let (tree, nodes) = html_nodes(r#"<span style="{{c}}">"#);
        assert_eq!(nodes.len(), 1);
        let value = tree
            .descendants(nodes[0])
            .into_iter()
            .find(|n| tree.kind(*n) == NodeKind::AttrValue)
            .unwrap();
        assert_eq!(tree.kind(tree.first_child(value).unwrap()), NodeKind::Template);
    }
}
