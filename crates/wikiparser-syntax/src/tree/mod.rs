//! Arena-backed wikitext tree.
//!
//! Every node of one document lives in a single `Vec` owned by [`Tree`];
//! parents and children refer to each other by [`NodeId`]. Removing a node
//! detaches it but keeps it in the arena, so it can be re-inserted and so
//! [`Tree::undo`] can restore it.
//!
//! ## Submodules
//!
//! - [`serialize`]: lossless `to_string`, visible `text`, byte ranges, JSON dumps
//! - [`mutation`]: checked structural edits with an undo log
//! - [`normalize`]: derived attributes (resolved titles, parameter names)

mod attr;
mod mutation;
mod normalize;
mod serialize;

pub use attr::AttrValue;
pub use mutation::Mutation;

use std::collections::BTreeMap;
use std::sync::Arc;
use wikiparser_config::Config;

use crate::kind::{NodeKind, PARSED_EXT};

/// Handle to a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Payload of text leaves; empty for every other kind.
    pub(crate) text: String,
    pub(crate) attrs: BTreeMap<String, AttrValue>,
}

/// A parsed document and every node ever created for it.
///
/// # Panics
///
/// Read accessors that take a [`NodeId`] (`kind`, `parent`, `children`,
/// `text_data`, `get_attribute` and the like) index the arena directly and
/// panic when the id is out of range for this tree. Check an id of unknown
/// origin with [`Tree::contains`] first. Mutations check their ids and
/// return [`TreeError::UnknownNode`](crate::TreeError::UnknownNode) instead.
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) nodes: Vec<NodeData>,
    root: NodeId,
    config: Arc<Config>,
    include: bool,
    pub(crate) history: Vec<Mutation>,
}

impl Tree {
    pub(crate) fn new(config: Arc<Config>, include: bool) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            config,
            include,
            history: Vec::new(),
        };
        tree.root = tree.alloc(NodeKind::Root);
        tree
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            text: String::new(),
            attrs: BTreeMap::new(),
        });
        id
    }

    pub(crate) fn alloc_text(&mut self, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text);
        self.nodes[id.index()].text = text.to_string();
        id
    }

    /// Appends without shape checks; the parser only builds valid shapes.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn put(&mut self, id: NodeId, key: &str, value: impl Into<AttrValue>) {
        self.nodes[id.index()]
            .attrs
            .insert(key.to_string(), value.into());
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the document was parsed in transclusion mode.
    pub fn include(&self) -> bool {
        self.include
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.child(parent, index + 1)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |n| self.parent(*n))
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Whether `id` is the root or hangs below it.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor_of(self.root, id)
    }

    /// `id` and all of its descendants in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Payload of a text leaf.
    pub fn text_data(&self, id: NodeId) -> Option<&str> {
        let data = self.data(id);
        (data.kind == NodeKind::Text).then_some(data.text.as_str())
    }

    /// Stored attributes, without computed ones.
    pub fn attributes(&self, id: NodeId) -> &BTreeMap<String, AttrValue> {
        &self.data(id).attrs
    }

    /// Reads an attribute, including computed ones such as a category's
    /// `sortkey` or a cell's `rowspan`.
    pub fn get_attribute(&self, id: NodeId, key: &str) -> Option<AttrValue> {
        match (self.kind(id), key) {
            (NodeKind::Category, "sortkey") => Some(AttrValue::Str(self.sortkey(id))),
            (NodeKind::Td, "rowspan" | "colspan") => Some(AttrValue::Int(self.span(id, key))),
            _ => self.data(id).attrs.get(key).cloned(),
        }
    }

    pub fn has_attribute(&self, id: NodeId, key: &str) -> bool {
        self.get_attribute(id, key).is_some()
    }

    pub(crate) fn str_attr(&self, id: NodeId, key: &str) -> &str {
        self.data(id)
            .attrs
            .get(key)
            .and_then(AttrValue::as_str)
            .unwrap_or("")
    }

    pub(crate) fn bool_attr(&self, id: NodeId, key: &str) -> bool {
        self.data(id)
            .attrs
            .get(key)
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    /// Sort key of a category link; empty when there is none.
    pub fn sortkey(&self, id: NodeId) -> String {
        self.child(id, 1)
            .map(|text| self.to_text(text))
            .unwrap_or_default()
    }

    /// Attribute node named `name` in a tag-like node's attribute container.
    pub fn attr_node(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let attrs = self.attrs_container(id)?;
        self.children(attrs)
            .iter()
            .rev()
            .copied()
            .find(|a| self.kind(*a).is_attr() && self.str_attr(*a, "name") == name)
    }

    /// Value of the HTML-style attribute `name` on an html, ext, table, tr or td node.
    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<String> {
        let attr = self.attr_node(id, &name.to_lowercase())?;
        Some(
            self.child(attr, 1)
                .map(|value| self.to_text(value))
                .unwrap_or_default(),
        )
    }

    pub(crate) fn attrs_container(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Html | NodeKind::Ext => self.child(id, 0),
            NodeKind::Table | NodeKind::Tr | NodeKind::Td => self.child(id, 1),
            k if k.is_attrs() => Some(id),
            _ => None,
        }
        .filter(|c| self.kind(*c).is_attrs())
    }

    /// Whether a text leaf is rendered wikitext, as opposed to the inside of
    /// a comment, a hidden span, a marker or an extension tag's raw body.
    pub fn is_prose(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if self.kind(id) != NodeKind::Text || !self.kind(parent).holds_wikitext() {
            return false;
        }
        self.ancestors(id).all(|a| match self.kind(a) {
            NodeKind::Hidden | NodeKind::Include => false,
            NodeKind::Ext => PARSED_EXT.contains(&self.str_attr(a, "name")),
            _ => true,
        })
    }

    /// The tag that pairs with an HTML tag among its siblings.
    ///
    /// Opening tags search forwards and closing tags backwards, skipping
    /// nested tags of the same name. Void and self-closing tags never pair.
    pub fn matching_tag(&self, id: NodeId) -> Option<NodeId> {
        if self.kind(id) != NodeKind::Html || self.bool_attr(id, "selfClosing") {
            return None;
        }
        let name = self.str_attr(id, "name");
        if self.config().html().is_ok_and(|html| html.is_void(name)) {
            return None;
        }
        let closing = self.bool_attr(id, "closing");
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        let siblings = self.children(parent);
        let candidates: Box<dyn Iterator<Item = &NodeId>> = if closing {
            Box::new(siblings[..index].iter().rev())
        } else {
            Box::new(siblings[index + 1..].iter())
        };
        let mut depth = 0usize;
        for sibling in candidates {
            let same = self.kind(*sibling) == NodeKind::Html
                && self.str_attr(*sibling, "name") == name
                && !self.bool_attr(*sibling, "selfClosing");
            if !same {
                continue;
            }
            if self.bool_attr(*sibling, "closing") == closing {
                depth += 1;
            } else if depth == 0 {
                return Some(*sibling);
            } else {
                depth -= 1;
            }
        }
        None
    }

    fn span(&self, id: NodeId, key: &str) -> i64 {
        self.get_attr(id, key)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }
}
