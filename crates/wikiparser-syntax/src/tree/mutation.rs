//! Checked structural edits.
//!
//! Every successful edit appends a [`Mutation`] to the tree's history and
//! refreshes the derived attributes of the edited node and its ancestors.
//! [`Tree::undo`] pops the last command and applies its inverse.

use super::{AttrValue, NodeId, Tree};
use crate::error::TreeError;
use crate::kind::NodeKind;

/// A logged edit, holding what is needed to invert it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    Remove {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    Replace {
        parent: NodeId,
        index: usize,
        old: NodeId,
        new: NodeId,
    },
    TextEdit {
        node: NodeId,
        old: String,
        new: String,
    },
    SetAttribute {
        node: NodeId,
        key: String,
        old: Option<AttrValue>,
        new: Option<AttrValue>,
    },
}

/// Attributes that encode syntax or are recomputed from children.
const PROTECTED: &[&str] = &[
    "tag",
    "name",
    "ns",
    "fragment",
    "interwiki",
    "closing",
    "close",
    "open",
    "closed",
    "selfClosing",
    "quote",
    "equal",
    "sep",
    "space",
    "anon",
    "bold",
    "italic",
    "subtype",
];

/// Quote for an attribute value: `current` when the value cannot break out
/// of it, otherwise `"`, or `'` for values holding a double quote.
fn attr_quote(current: &str, value: &str) -> &'static str {
    let bare_ok = !value.is_empty()
        && !value.starts_with(['"', '\''])
        && !value.contains(|c: char| c.is_whitespace() || c == '>');
    match current {
        "" if bare_ok => "",
        "'" if !value.contains('\'') => "'",
        _ if !value.contains('"') => "\"",
        _ if !value.contains('\'') => "'",
        _ => "\"",
    }
}

/// Attribute value text as written between `quote`s.
fn quoted_text(quote: &str, value: &str) -> String {
    if quote == "\"" {
        value.replace('"', "&quot;")
    } else {
        value.to_string()
    }
}

impl Tree {
    fn check_node(&self, id: NodeId) -> Result<(), TreeError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TreeError::UnknownNode(id))
        }
    }

    fn check_shape(&self, parent: NodeId, children: &[NodeId]) -> Result<(), TreeError> {
        let parent_kind = self.kind(parent);
        for (index, child) in children.iter().enumerate() {
            let child_kind = self.kind(*child);
            if !parent_kind.accepts(child_kind, index) {
                return Err(TreeError::UnacceptableChild {
                    parent: parent_kind,
                    child: child_kind,
                    index,
                });
            }
        }
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.check_node(parent)?;
        self.check_node(node)?;
        if self.is_ancestor_of(node, parent) {
            return Err(TreeError::Cycle {
                parent,
                child: node,
            });
        }
        if self.parent(node).is_some() || node == self.root() {
            return Err(TreeError::AlreadyAttached(node));
        }
        Ok(())
    }

    /// Creates a detached text leaf.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc_text(text)
    }

    /// Creates a detached, childless node of `kind`.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind)
    }

    /// Inserts the detached `node` as child `index` of `parent`.
    pub fn insert_at(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<(), TreeError> {
        self.check_insertable(parent, node)?;
        let len = self.children(parent).len();
        if index > len {
            return Err(TreeError::OutOfBounds { index, len });
        }
        let mut children = self.children(parent).to_vec();
        children.insert(index, node);
        self.check_shape(parent, &children)?;

        self.raw_insert(parent, index, node);
        self.history.push(Mutation::Insert {
            parent,
            index,
            node,
        });
        self.refresh(parent)?;
        Ok(())
    }

    pub fn append(&mut self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.check_node(parent)?;
        let index = self.children(parent).len();
        self.insert_at(parent, index, node)
    }

    /// Detaches child `index` of `parent` and returns it.
    pub fn remove_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        self.check_node(parent)?;
        let len = self.children(parent).len();
        if index >= len {
            return Err(TreeError::OutOfBounds { index, len });
        }
        let mut children = self.children(parent).to_vec();
        let node = children.remove(index);
        self.check_shape(parent, &children)?;

        self.raw_remove(parent, index);
        self.history.push(Mutation::Remove {
            parent,
            index,
            node,
        });
        self.refresh(parent)?;
        Ok(node)
    }

    /// Swaps child `index` of `parent` for the detached `node`, returning the old child.
    pub fn replace_child(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<NodeId, TreeError> {
        self.check_insertable(parent, node)?;
        let len = self.children(parent).len();
        if index >= len {
            return Err(TreeError::OutOfBounds { index, len });
        }
        let mut children = self.children(parent).to_vec();
        let old = std::mem::replace(&mut children[index], node);
        self.check_shape(parent, &children)?;

        self.raw_replace(parent, index, node);
        self.history.push(Mutation::Replace {
            parent,
            index,
            old,
            new: node,
        });
        self.refresh(parent)?;
        Ok(old)
    }

    /// Replaces the payload of a text leaf.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        self.check_node(node)?;
        if self.kind(node) != NodeKind::Text {
            return Err(TreeError::NotText(node));
        }
        let old = std::mem::replace(&mut self.data_mut(node).text, text.to_string());
        self.history.push(Mutation::TextEdit {
            node,
            old,
            new: text.to_string(),
        });
        if let Some(parent) = self.parent(node) {
            self.refresh(parent)?;
        }
        Ok(())
    }

    /// Sets a stored attribute. A category's `sortkey` rewrites its link text;
    /// syntax-bearing and derived attributes are read-only.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), TreeError> {
        self.check_node(node)?;
        let kind = self.kind(node);
        let value = value.into();
        if kind == NodeKind::Category && key == "sortkey" {
            return self.set_sortkey(node, &value.to_string());
        }
        let level_ok = kind == NodeKind::Heading
            && key == "level"
            && value.as_int().is_some_and(|n| (1..=6).contains(&n));
        if PROTECTED.contains(&key) || (key == "level" && !level_ok) {
            return Err(TreeError::ReadOnlyAttribute {
                kind,
                key: key.to_string(),
            });
        }
        self.set_logged(node, key, value);
        Ok(())
    }

    /// Stores an attribute and logs it, without the read-only check.
    fn set_logged(&mut self, node: NodeId, key: &str, value: AttrValue) {
        let old = self
            .data_mut(node)
            .attrs
            .insert(key.to_string(), value.clone());
        self.history.push(Mutation::SetAttribute {
            node,
            key: key.to_string(),
            old,
            new: Some(value),
        });
    }

    /// Rewrites a category's sort key, adding or emptying its link text.
    pub fn set_sortkey(&mut self, category: NodeId, sortkey: &str) -> Result<(), TreeError> {
        let text = self.create_text(sortkey);
        match self.child(category, 1) {
            Some(label) => {
                while !self.children(label).is_empty() {
                    self.remove_at(label, 0)?;
                }
                self.append(label, text)
            }
            None => {
                let label = self.create_node(NodeKind::LinkText);
                self.append(label, text)?;
                self.append(category, label)
            }
        }
    }

    /// Sets the HTML-style attribute `name` on an html, ext, table, tr or td node.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        self.check_node(node)?;
        let kind = self.kind(node);
        let container = self
            .attrs_container(node)
            .ok_or_else(|| TreeError::ReadOnlyAttribute {
                kind,
                key: name.to_string(),
            })?;
        let name = name.to_lowercase();

        if let Some(attr) = self.attr_node(node, &name) {
            if let Some(value_slot) = self.child(attr, 1) {
                let current = self.str_attr(attr, "quote").to_string();
                let valueless = self.str_attr(attr, "equal").is_empty();
                let quote = attr_quote(if valueless { "\"" } else { current.as_str() }, value);
                let text = self.create_text(&quoted_text(quote, value));
                while !self.children(value_slot).is_empty() {
                    self.remove_at(value_slot, 0)?;
                }
                self.append(value_slot, text)?;
                if valueless {
                    self.set_logged(attr, "equal", "=".into());
                }
                if current != quote {
                    self.set_logged(attr, "quote", quote.into());
                }
                if !self.bool_attr(attr, "closed") {
                    self.set_logged(attr, "closed", true.into());
                }
                return Ok(());
            }
        }

        let quote = attr_quote("\"", value);
        let text = self.create_text(&quoted_text(quote, value));

        let attr_kind = self.kind(container).attr_kind().unwrap_or(NodeKind::HtmlAttr);
        let attr = self.create_node(attr_kind);
        self.put(attr, "equal", "=");
        self.put(attr, "quote", quote);
        self.put(attr, "closed", true);
        let key = self.create_node(NodeKind::AttrKey);
        let key_text = self.create_text(&name);
        let value_slot = self.create_node(NodeKind::AttrValue);
        self.append(key, key_text)?;
        self.append(value_slot, text)?;
        self.append(attr, key)?;
        self.append(attr, value_slot)?;

        let space = self.create_text(" ");
        self.append(container, space)?;
        self.append(container, attr)
    }

    /// Reverts the most recent edit.
    pub fn undo(&mut self) -> Result<Mutation, TreeError> {
        let mutation = self.history.pop().ok_or(TreeError::NothingToUndo)?;
        let touched = match &mutation {
            Mutation::Insert { parent, index, .. } => {
                self.raw_remove(*parent, *index);
                Some(*parent)
            }
            Mutation::Remove {
                parent,
                index,
                node,
            } => {
                self.raw_insert(*parent, *index, *node);
                Some(*parent)
            }
            Mutation::Replace {
                parent, index, old, ..
            } => {
                self.raw_replace(*parent, *index, *old);
                Some(*parent)
            }
            Mutation::TextEdit { node, old, .. } => {
                self.data_mut(*node).text = old.clone();
                self.parent(*node)
            }
            Mutation::SetAttribute { node, key, old, .. } => {
                match old {
                    Some(value) => self.data_mut(*node).attrs.insert(key.clone(), value.clone()),
                    None => self.data_mut(*node).attrs.remove(key),
                };
                None
            }
        };
        if let Some(parent) = touched {
            self.refresh(parent)?;
        }
        Ok(mutation)
    }

    /// Logged edits, oldest first.
    pub fn history(&self) -> &[Mutation] {
        &self.history
    }

    fn raw_insert(&mut self, parent: NodeId, index: usize, node: NodeId) {
        self.data_mut(node).parent = Some(parent);
        self.data_mut(parent).children.insert(index, node);
    }

    fn raw_remove(&mut self, parent: NodeId, index: usize) -> NodeId {
        let node = self.data_mut(parent).children.remove(index);
        self.data_mut(node).parent = None;
        node
    }

    fn raw_replace(&mut self, parent: NodeId, index: usize, node: NodeId) {
        let old = std::mem::replace(&mut self.data_mut(parent).children[index], node);
        self.data_mut(old).parent = None;
        self.data_mut(node).parent = Some(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_STAGE, parse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use wikiparser_config::Config;

    fn parse_default(text: &str) -> Tree {
        parse(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap()
    }

    fn first_of(tree: &Tree, kind: NodeKind) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find(|n| tree.kind(*n) == kind)
            .unwrap()
    }

    #[test]
    fn category_sortkey_round_trip() {
        let mut tree = parse_default("before [[Category:Foo|bar]] after");
        let category = first_of(&tree, NodeKind::Category);
        assert_eq!(tree.get_attribute(category, "sortkey"), Some("bar".into()));

        tree.set_attribute(category, "sortkey", "baz").unwrap();
        assert_eq!(tree.to_string(tree.root()), "before [[Category:Foo|baz]] after");
        assert_eq!(tree.sortkey(category), "baz");
    }

    #[test]
    fn sortkey_is_added_when_missing() {
        let mut tree = parse_default("[[Category:Foo]]");
        let category = first_of(&tree, NodeKind::Category);
        assert_eq!(tree.sortkey(category), "");
        tree.set_sortkey(category, "Key").unwrap();
        assert_eq!(tree.to_string(tree.root()), "[[Category:Foo|Key]]");
    }

    #[test]
    fn insert_rejects_cycles() {
        let mut tree = parse_default("{{a|b}}");
        let template = first_of(&tree, NodeKind::Template);
        let value = first_of(&tree, NodeKind::ParameterValue);
        let root = tree.root();
        let removed = tree.remove_at(root, 0).unwrap();
        assert_eq!(removed, template);
        let err = tree.insert_at(value, 0, template).unwrap_err();
        assert!(matches!(err, TreeError::Cycle { .. }));
    }

    #[test]
    fn insert_rejects_unacceptable_kinds() {
        let mut tree = parse_default("{{a|b}}");
        let template = first_of(&tree, NodeKind::Template);
        let text = tree.create_text("x");
        let err = tree.append(template, text).unwrap_err();
        assert!(matches!(
            err,
            TreeError::UnacceptableChild {
                parent: NodeKind::Template,
                child: NodeKind::Text,
                index: 2
            }
        ));
    }

    #[test]
    fn insert_rejects_attached_nodes() {
        let mut tree = parse_default("a<!--b-->");
        let root = tree.root();
        let comment = first_of(&tree, NodeKind::Comment);
        let err = tree.append(root, comment).unwrap_err();
        assert!(matches!(err, TreeError::AlreadyAttached(_)));
    }

    #[test]
    fn removing_a_required_child_is_rejected() {
        let mut tree = parse_default("{{a|b}}");
        let template = first_of(&tree, NodeKind::Template);
        let err = tree.remove_at(template, 0).unwrap_err();
        assert!(matches!(err, TreeError::UnacceptableChild { .. }));
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut tree = parse_default("x");
        let root = tree.root();
        let text = tree.create_text("y");
        assert!(matches!(
            tree.insert_at(root, 5, text),
            Err(TreeError::OutOfBounds { index: 5, len: 1 })
        ));
    }

    #[test]
    fn edits_refresh_derived_names() {
        let mut tree = parse_default("[[foo]]");
        let link = first_of(&tree, NodeKind::Link);
        let target_text = tree.first_child(first_of(&tree, NodeKind::LinkTarget)).unwrap();
        assert_eq!(tree.get_attribute(link, "name"), Some("Foo".into()));

        tree.set_text(target_text, "help:bar").unwrap();
        assert_eq!(tree.get_attribute(link, "name"), Some("Help:Bar".into()));
        assert_eq!(tree.get_attribute(link, "ns"), Some(AttrValue::Int(12)));
    }

    #[test]
    fn undo_restores_every_edit() {
        let source = "x {{a|b}} [[Category:C|k]]";
        let mut tree = parse_default(source);
        let root = tree.root();
        let category = first_of(&tree, NodeKind::Category);
        let first = tree.first_child(root).unwrap();

        tree.set_text(first, "y ").unwrap();
        let extra = tree.create_text("!");
        tree.append(root, extra).unwrap();
        tree.set_sortkey(category, "other").unwrap();
        tree.set_attribute(root, "note", "custom").unwrap();
        assert_ne!(tree.to_string(root), source);

        while !tree.history().is_empty() {
            tree.undo().unwrap();
        }
        assert_eq!(tree.to_string(root), source);
        assert_eq!(tree.get_attribute(root, "note"), None);
        assert!(matches!(tree.undo(), Err(TreeError::NothingToUndo)));
    }

    #[test]
    fn replace_child_swaps_and_detaches() {
        let mut tree = parse_default("a<!--b-->c");
        let root = tree.root();
        let replacement = tree.create_text("B");
        let old = tree.replace_child(root, 1, replacement).unwrap();
        assert_eq!(tree.kind(old), NodeKind::Comment);
        assert_eq!(tree.parent(old), None);
        assert_eq!(tree.to_string(root), "aBc");
        assert_eq!(tree.range(old), None);
    }

    #[test]
    fn set_text_on_element_fails() {
        let mut tree = parse_default("<!--x-->");
        let comment = first_of(&tree, NodeKind::Comment);
        assert!(matches!(tree.set_text(comment, "y"), Err(TreeError::NotText(_))));
    }

    #[test]
    fn protected_attributes_are_read_only() {
        let mut tree = parse_default("[[a]]");
        let link = first_of(&tree, NodeKind::Link);
        assert!(matches!(
            tree.set_attribute(link, "name", "B"),
            Err(TreeError::ReadOnlyAttribute { .. })
        ));
    }

    #[test]
    fn heading_level_can_change() {
        let mut tree = parse_default("== a ==");
        let heading = first_of(&tree, NodeKind::Heading);
        tree.set_attribute(heading, "level", 3i64).unwrap();
        assert_eq!(tree.to_string(tree.root()), "=== a ===");
        assert!(tree.set_attribute(heading, "level", 9i64).is_err());
    }

    #[test]
    fn set_attr_updates_and_adds_tag_attributes() {
        let mut tree = parse_default(r#"<div class="a">"#);
        let div = first_of(&tree, NodeKind::Html);
        tree.set_attr(div, "class", "b").unwrap();
        tree.set_attr(div, "id", "main").unwrap();
        assert_eq!(tree.to_string(tree.root()), r#"<div class="b" id="main">"#);
        assert_eq!(tree.get_attr(div, "id").as_deref(), Some("main"));
    }

    #[test]
    fn set_attr_gives_a_valueless_attribute_a_value() {
        let mut tree = parse_default("<div hidden>");
        let div = first_of(&tree, NodeKind::Html);
        tree.set_attr(div, "hidden", "x").unwrap();
        assert_eq!(tree.to_string(tree.root()), r#"<div hidden="x">"#);
        assert_eq!(tree.get_attr(div, "hidden").as_deref(), Some("x"));

        while !tree.history().is_empty() {
            tree.undo().unwrap();
        }
        assert_eq!(tree.to_string(tree.root()), "<div hidden>");
    }

    #[rstest]
    #[case("<div id=a>", "id", "b", "<div id=b>")]
    #[case("<div id=a>", "id", "c d", r#"<div id="c d">"#)]
    #[case(r#"<div title="x">"#, "title", r#"a"b"#, r#"<div title='a"b'>"#)]
    #[case("<div title='x'>", "title", "it's", r#"<div title="it's">"#)]
    #[case("<div>", "title", r#"a"b'c"#, r#"<div title="a&quot;b'c">"#)]
    fn set_attr_values_survive_reparsing(
        #[case] source: &str,
        #[case] name: &str,
        #[case] value: &str,
        #[case] expected: &str,
    ) {
        let mut tree = parse_default(source);
        let div = first_of(&tree, NodeKind::Html);
        tree.set_attr(div, name, value).unwrap();
        let text = tree.to_string(tree.root());
        assert_eq!(text, expected);

        let reparsed = parse_default(&text);
        let reparsed_div = first_of(&reparsed, NodeKind::Html);
        assert_eq!(reparsed.get_attr(reparsed_div, name), tree.get_attr(div, name));
    }
}
