//! CSS-like selectors over node kinds and attributes.
//!
//! ```text
//! template[name="Template:Cite"]       type and attribute
//! table > tr:nth-child(odd)            child combinator, positional pseudo-class
//! heading ~ *:not(text, comment), hr   sibling combinator, negation, alternatives
//! ```
//!
//! Type names are the kebab-case [`NodeKind::name`]s. Positional
//! pseudo-classes take a [`Ranges`] expression over 0-based positions and
//! count only non-text siblings, so `:first-child` is the first sibling that
//! is not a text leaf.
//!
//! A malformed selector is a caller bug and fails with [`SelectorError`]
//! before any node is visited.

mod lexer;
mod matcher;
mod parse;

use std::str::FromStr;

use crate::error::SelectorError;
use crate::kind::NodeKind;
use crate::range::Ranges;
use crate::tree::{NodeId, Tree};

/// A parsed selector: alternatives separated by `,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub(crate) alternatives: Vec<Complex>,
}

/// Compounds joined by combinators; `combinators[i]` sits between
/// `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Complex {
    pub(crate) compounds: Vec<Compound>,
    pub(crate) combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

/// Conditions on a single node. `kind: None` is `*` or an omitted type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    pub(crate) kind: Option<NodeKind>,
    pub(crate) attrs: Vec<AttrPredicate>,
    pub(crate) pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttrOp {
    Equals,
    NotEquals,
    Prefix,
    Suffix,
    Contains,
}

/// `[key]` when `test` is `None`; otherwise operator, value and the ` i` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrPredicate {
    pub(crate) key: String,
    pub(crate) test: Option<(AttrOp, String, bool)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pseudo {
    NthChild(Ranges),
    NthLastChild(Ranges),
    NthOfType(Ranges),
    NthLastOfType(Ranges),
    FirstChild,
    LastChild,
    OnlyChild,
    Root,
    Empty,
    Not(Selector),
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        parse::parse_selector(input)
    }

    /// Whether `id` itself matches.
    pub fn matches(&self, tree: &Tree, id: NodeId) -> bool {
        matcher::matches(tree, id, self)
    }

    /// `id` or its nearest ancestor that matches.
    pub fn closest(&self, tree: &Tree, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(tree.ancestors(id))
            .find(|n| self.matches(tree, *n))
    }

    /// Every matching descendant of `scope`, in document order.
    pub fn query_all(&self, tree: &Tree, scope: NodeId) -> Vec<NodeId> {
        matcher::query_all(tree, scope, self)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Tree {
    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool, SelectorError> {
        Ok(Selector::parse(selector)?.matches(self, id))
    }

    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(Selector::parse(selector)?.closest(self, id))
    }

    pub fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        Ok(Selector::parse(selector)?.query_all(self, scope))
    }

    /// The first match of [`Tree::query_all`].
    pub fn query(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_all(scope, selector)?.into_iter().next())
    }
}
