//! Lossless serialization, visible text, byte ranges and JSON dumps.
//!
//! Each kind is written as `opening`, its children joined by `between`
//! separators, then `closing`. The punctuation lives here rather than in
//! extra leaves, so `to_string` of a freshly parsed tree reproduces the
//! input byte-for-byte.

use serde_json::{Map, Value, json};
use std::borrow::Cow;

use super::{NodeId, Tree};
use crate::kind::NodeKind;

fn repeat_eq(level: i64) -> Cow<'static, str> {
    Cow::Owned("=".repeat(level.max(0) as usize))
}

impl Tree {
    fn opening(&self, id: NodeId) -> Cow<'_, str> {
        match self.kind(id) {
            NodeKind::Comment => "<!--".into(),
            NodeKind::Include => self.str_attr(id, "open").into(),
            NodeKind::Ext => format!("<{}", self.str_attr(id, "tag")).into(),
            NodeKind::Heading => repeat_eq(self.level(id)),
            NodeKind::Template | NodeKind::MagicWord => "{{".into(),
            NodeKind::Arg => "{{{".into(),
            NodeKind::Html => {
                let slash = if self.bool_attr(id, "closing") { "/" } else { "" };
                format!("<{slash}{}", self.str_attr(id, "tag")).into()
            }
            NodeKind::Link | NodeKind::Category | NodeKind::File => "[[".into(),
            NodeKind::ExtLink => "[".into(),
            NodeKind::DoubleUnderscore => "__".into(),
            NodeKind::Converter => "-{".into(),
            _ => "".into(),
        }
    }

    /// Separator written before child `index` (never called for index 0).
    fn between(&self, id: NodeId, index: usize) -> Cow<'_, str> {
        match self.kind(id) {
            NodeKind::Ext => ">".into(),
            NodeKind::Heading => repeat_eq(self.level(id)),
            NodeKind::Template | NodeKind::Arg => "|".into(),
            NodeKind::MagicWord if index == 1 => self.str_attr(id, "sep").into(),
            NodeKind::MagicWord => "|".into(),
            NodeKind::Parameter if self.bool_attr(id, "anon") => "".into(),
            NodeKind::Parameter => "=".into(),
            NodeKind::ExtAttr | NodeKind::HtmlAttr | NodeKind::TableAttr => format!(
                "{}{}",
                self.str_attr(id, "equal"),
                self.str_attr(id, "quote")
            )
            .into(),
            NodeKind::Link | NodeKind::Category | NodeKind::File => "|".into(),
            NodeKind::ExtLink => self.str_attr(id, "space").into(),
            NodeKind::Converter => {
                let after_flags = index == 1
                    && self
                        .child(id, 0)
                        .is_some_and(|c| self.kind(c) == NodeKind::ConverterFlags);
                Cow::Borrowed(if after_flags { "|" } else { ";" })
            }
            NodeKind::ConverterFlags => ";".into(),
            NodeKind::ConverterRule => match self.child(id, index).map(|c| self.kind(c)) {
                Some(NodeKind::ConverterRuleVariant) => "=>".into(),
                _ => ":".into(),
            },
            _ => "".into(),
        }
    }

    fn closing(&self, id: NodeId) -> Cow<'_, str> {
        match self.kind(id) {
            NodeKind::Comment if self.bool_attr(id, "closed") => "-->".into(),
            NodeKind::Include => self.str_attr(id, "close").into(),
            NodeKind::Ext if self.bool_attr(id, "selfClosing") => "/>".into(),
            NodeKind::Ext => self.str_attr(id, "closing").into(),
            NodeKind::Template | NodeKind::MagicWord => "}}".into(),
            NodeKind::Arg => "}}}".into(),
            NodeKind::Html => self.str_attr(id, "close").into(),
            NodeKind::ExtAttr | NodeKind::HtmlAttr | NodeKind::TableAttr
                if self.bool_attr(id, "closed") =>
            {
                self.str_attr(id, "quote").into()
            }
            NodeKind::Link | NodeKind::Category | NodeKind::File => "]]".into(),
            NodeKind::ExtLink => "]".into(),
            NodeKind::DoubleUnderscore => "__".into(),
            NodeKind::Converter => "}-".into(),
            _ => "".into(),
        }
    }

    pub(crate) fn level(&self, id: NodeId) -> i64 {
        self.data(id)
            .attrs
            .get("level")
            .and_then(|v| v.as_int())
            .unwrap_or(1)
    }

    fn write(&self, id: NodeId, out: &mut String, mut ranges: Option<&mut Vec<Option<(usize, usize)>>>) {
        let start = out.len();
        let data = self.data(id);
        if data.kind == NodeKind::Text {
            out.push_str(&data.text);
        } else {
            out.push_str(&self.opening(id));
            for (i, child) in data.children.iter().enumerate() {
                if i > 0 {
                    out.push_str(&self.between(id, i));
                }
                self.write(*child, out, ranges.as_deref_mut());
            }
            out.push_str(&self.closing(id));
        }
        if let Some(ranges) = ranges {
            ranges[id.index()] = Some((start, out.len()));
        }
    }

    /// The exact source text of `id`.
    pub fn to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write(id, &mut out, None);
        out
    }

    /// Byte ranges of every node attached to the root, indexed by [`NodeId::index`].
    pub fn positions(&self) -> Vec<Option<(usize, usize)>> {
        let mut ranges = vec![None; self.nodes.len()];
        let mut out = String::new();
        self.write(self.root(), &mut out, Some(&mut ranges));
        ranges
    }

    /// Byte range of `id` within the document, `None` when detached.
    pub fn range(&self, id: NodeId) -> Option<(usize, usize)> {
        if !self.is_attached(id) {
            return None;
        }
        let mut start = 0;
        let mut node = id;
        while let Some(parent) = self.parent(node) {
            start += self.opening(parent).len();
            for (i, sibling) in self.children(parent).iter().enumerate() {
                if i > 0 {
                    start += self.between(parent, i).len();
                }
                if *sibling == node {
                    break;
                }
                start += self.to_string(*sibling).len();
            }
            node = parent;
        }
        Some((start, start + self.to_string(id).len()))
    }

    fn join_text(&self, id: NodeId, open: &str, sep: &str, close: &str) -> String {
        let parts: Vec<_> = self.children(id).iter().map(|c| self.to_text(*c)).collect();
        format!("{open}{}{close}", parts.join(sep))
    }

    /// Human-visible rendering: comments, hidden spans and markup markers are
    /// dropped, links show their label.
    pub fn to_text(&self, id: NodeId) -> String {
        let data = self.data(id);
        match data.kind {
            NodeKind::Text => data.text.clone(),
            NodeKind::Comment
            | NodeKind::Include
            | NodeKind::Noinclude
            | NodeKind::Hidden
            | NodeKind::Quote
            | NodeKind::List
            | NodeKind::Dd
            | NodeKind::Hr
            | NodeKind::DoubleUnderscore
            | NodeKind::Html
            | NodeKind::ExtAttrs
            | NodeKind::HtmlAttrs
            | NodeKind::TableAttrs
            | NodeKind::Category => String::new(),
            NodeKind::Ext => self
                .child(id, 1)
                .map(|inner| self.to_text(inner))
                .unwrap_or_default(),
            NodeKind::Heading => self
                .child(id, 0)
                .map(|title| self.to_text(title).trim().to_string())
                .unwrap_or_default(),
            NodeKind::Link | NodeKind::ExtLink => {
                let label = self.child(id, 1).or_else(|| self.child(id, 0));
                label.map(|c| self.to_text(c)).unwrap_or_default()
            }
            NodeKind::File => String::new(),
            NodeKind::Template | NodeKind::MagicWord => {
                let mut out = String::from("{{");
                for (i, child) in data.children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(&self.between(id, i));
                    }
                    out.push_str(&self.to_text(*child));
                }
                out.push_str("}}");
                out
            }
            NodeKind::Parameter => {
                let sep = if self.bool_attr(id, "anon") { "" } else { "=" };
                self.join_text(id, "", sep, "")
            }
            NodeKind::Arg => self.join_text(id, "{{{", "|", "}}}"),
            NodeKind::Converter => {
                let rules: Vec<_> = data
                    .children
                    .iter()
                    .filter(|c| self.kind(**c) == NodeKind::ConverterRule)
                    .map(|c| self.to_text(*c))
                    .collect();
                rules.join(";")
            }
            NodeKind::ConverterRule => self
                .last_child(id)
                .map(|to| self.to_text(to))
                .unwrap_or_default(),
            _ => self.join_text(id, "", "", ""),
        }
    }

    /// A JSON dump with `type`, `range` and `childNodes`, plus stored attributes.
    pub fn to_json(&self, id: NodeId) -> Value {
        let ranges = self.positions();
        self.json_node(id, &ranges)
    }

    fn json_node(&self, id: NodeId, ranges: &[Option<(usize, usize)>]) -> Value {
        let data = self.data(id);
        let mut obj = Map::new();
        obj.insert("type".into(), json!(data.kind.name()));
        if let Some((start, end)) = ranges[id.index()] {
            obj.insert("range".into(), json!([start, end]));
        }
        if data.kind == NodeKind::Text {
            obj.insert("data".into(), json!(data.text));
            return Value::Object(obj);
        }
        for (key, value) in &data.attrs {
            obj.insert(key.clone(), json!(value));
        }
        let children: Vec<_> = data
            .children
            .iter()
            .map(|c| self.json_node(*c, ranges))
            .collect();
        obj.insert("childNodes".into(), Value::Array(children));
        Value::Object(obj)
    }
}
