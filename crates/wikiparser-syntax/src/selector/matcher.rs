//! Selector evaluation.
//!
//! Single-node checks walk the selector right to left from the candidate.
//! [`query_all`] instead runs left to right over the whole document, marking
//! the nodes that match each prefix of a complex selector in one linear pass
//! per combinator. Sibling positions for that pass are indexed once per
//! parent up front, so positional pseudo-classes and sibling combinators
//! cost a lookup per node.

use std::collections::HashMap;

use super::{AttrOp, AttrPredicate, Combinator, Complex, Compound, Pseudo, Selector};
use crate::kind::NodeKind;
use crate::tree::{NodeId, Tree};

fn is_element(tree: &Tree, id: NodeId) -> bool {
    tree.kind(id) != NodeKind::Text
}

/// Where an element sits among its non-text siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Place {
    index: usize,
    count: usize,
    type_index: usize,
    type_count: usize,
    prev: Option<NodeId>,
}

const LONE: Place = Place {
    index: 0,
    count: 1,
    type_index: 0,
    type_count: 1,
    prev: None,
};

/// Places of every element child of `parent`, in order.
fn child_places(tree: &Tree, parent: NodeId) -> Vec<(NodeId, Place)> {
    let elements: Vec<NodeId> = tree
        .children(parent)
        .iter()
        .copied()
        .filter(|n| is_element(tree, *n))
        .collect();
    let mut totals: HashMap<NodeKind, usize> = HashMap::new();
    for element in &elements {
        *totals.entry(tree.kind(*element)).or_default() += 1;
    }
    let mut seen: HashMap<NodeKind, usize> = HashMap::new();
    let mut prev = None;
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            let kind = tree.kind(*element);
            let type_index = seen.entry(kind).or_default();
            let place = Place {
                index,
                count: elements.len(),
                type_index: *type_index,
                type_count: totals.get(&kind).copied().unwrap_or(1),
                prev,
            };
            *type_index += 1;
            prev = Some(*element);
            (*element, place)
        })
        .collect()
}

/// Evaluation state: the tree plus, for whole-document queries, a sibling
/// index by arena slot.
struct Context<'t> {
    tree: &'t Tree,
    places: Option<Vec<Option<Place>>>,
}

impl<'t> Context<'t> {
    fn on_demand(tree: &'t Tree) -> Self {
        Self { tree, places: None }
    }

    /// Indexes the children of every node in `order`.
    fn indexed(tree: &'t Tree, order: &[NodeId]) -> Self {
        let mut places = vec![None; tree.nodes.len()];
        for node in order {
            if tree.parent(*node).is_none() && is_element(tree, *node) {
                places[node.index()] = Some(LONE);
            }
            for (child, place) in child_places(tree, *node) {
                places[child.index()] = Some(place);
            }
        }
        Self {
            tree,
            places: Some(places),
        }
    }

    fn place(&self, id: NodeId) -> Option<Place> {
        if let Some(places) = &self.places {
            return places.get(id.index()).copied().flatten();
        }
        if !is_element(self.tree, id) {
            return None;
        }
        match self.tree.parent(id) {
            None => Some(LONE),
            Some(parent) => child_places(self.tree, parent)
                .into_iter()
                .find(|(child, _)| *child == id)
                .map(|(_, place)| place),
        }
    }

    fn prev_element(&self, id: NodeId) -> Option<NodeId> {
        self.place(id).and_then(|p| p.prev)
    }
}

/// A `false` flag reads as a missing attribute.
fn attribute_value(tree: &Tree, id: NodeId, key: &str) -> Option<String> {
    tree.get_attribute(id, key)
        .filter(|value| value.as_bool() != Some(false))
        .map(|value| value.to_string())
        .or_else(|| tree.get_attr(id, key))
}

fn attr_matches(tree: &Tree, id: NodeId, predicate: &AttrPredicate) -> bool {
    let actual = attribute_value(tree, id, &predicate.key);
    let Some((op, expected, insensitive)) = &predicate.test else {
        return actual.is_some();
    };
    let Some(actual) = actual else {
        return *op == AttrOp::NotEquals;
    };
    let (actual, expected) = if *insensitive {
        (actual.to_lowercase(), expected.to_lowercase())
    } else {
        (actual, expected.clone())
    };
    match op {
        AttrOp::Equals => actual == expected,
        AttrOp::NotEquals => actual != expected,
        AttrOp::Prefix => actual.starts_with(&expected),
        AttrOp::Suffix => actual.ends_with(&expected),
        AttrOp::Contains => actual.contains(&expected),
    }
}

fn pseudo_matches(cx: &Context<'_>, id: NodeId, pseudo: &Pseudo) -> bool {
    let tree = cx.tree;
    let place = || cx.place(id);
    match pseudo {
        Pseudo::NthChild(ranges) => place().is_some_and(|p| ranges.contains(p.index, p.count)),
        Pseudo::NthLastChild(ranges) => {
            place().is_some_and(|p| ranges.contains(p.count - 1 - p.index, p.count))
        }
        Pseudo::NthOfType(ranges) => place().is_some_and(|p| ranges.contains(p.type_index, p.type_count)),
        Pseudo::NthLastOfType(ranges) => {
            place().is_some_and(|p| ranges.contains(p.type_count - 1 - p.type_index, p.type_count))
        }
        Pseudo::FirstChild => place().is_some_and(|p| p.index == 0),
        Pseudo::LastChild => place().is_some_and(|p| p.index + 1 == p.count),
        Pseudo::OnlyChild => place().is_some_and(|p| p.count == 1),
        Pseudo::Root => id == tree.root(),
        Pseudo::Empty => tree
            .children(id)
            .iter()
            .all(|c| tree.text_data(*c) == Some("")),
        Pseudo::Not(inner) => !selector_matches(cx, id, inner),
    }
}

fn compound_matches(cx: &Context<'_>, id: NodeId, compound: &Compound) -> bool {
    let tree = cx.tree;
    compound.kind.is_none_or(|kind| tree.kind(id) == kind)
        && compound.attrs.iter().all(|a| attr_matches(tree, id, a))
        && compound.pseudos.iter().all(|p| pseudo_matches(cx, id, p))
}

/// Whether `id` matches `complex` up to and including compound `step`.
fn matches_from(cx: &Context<'_>, id: NodeId, complex: &Complex, step: usize) -> bool {
    if !compound_matches(cx, id, &complex.compounds[step]) {
        return false;
    }
    if step == 0 {
        return true;
    }
    let tree = cx.tree;
    let previous = step - 1;
    match complex.combinators[previous] {
        Combinator::Child => tree
            .parent(id)
            .is_some_and(|p| matches_from(cx, p, complex, previous)),
        Combinator::Descendant => tree
            .ancestors(id)
            .any(|a| matches_from(cx, a, complex, previous)),
        Combinator::Adjacent => cx
            .prev_element(id)
            .is_some_and(|p| matches_from(cx, p, complex, previous)),
        Combinator::Sibling => std::iter::successors(cx.prev_element(id), |n| cx.prev_element(*n))
            .any(|s| matches_from(cx, s, complex, previous)),
    }
}

fn selector_matches(cx: &Context<'_>, id: NodeId, selector: &Selector) -> bool {
    selector
        .alternatives
        .iter()
        .any(|complex| matches_from(cx, id, complex, complex.compounds.len() - 1))
}

pub(crate) fn matches(tree: &Tree, id: NodeId, selector: &Selector) -> bool {
    selector_matches(&Context::on_demand(tree), id, selector)
}

/// Marks every node of `order` matching `complex`, indexed by arena slot.
fn mark(cx: &Context<'_>, order: &[NodeId], complex: &Complex) -> Vec<bool> {
    let tree = cx.tree;
    let arena_len = tree.nodes.len();
    let mut marked = vec![false; arena_len];
    for node in order {
        marked[node.index()] = compound_matches(cx, *node, &complex.compounds[0]);
    }
    for (step, combinator) in complex.combinators.iter().enumerate() {
        let compound = &complex.compounds[step + 1];
        let mut next = vec![false; arena_len];
        match combinator {
            Combinator::Child => {
                for node in order {
                    next[node.index()] = tree.parent(*node).is_some_and(|p| marked[p.index()])
                        && compound_matches(cx, *node, compound);
                }
            }
            Combinator::Descendant => {
                // Pre-order guarantees a parent is settled before its children.
                let mut below = vec![false; arena_len];
                for node in order {
                    below[node.index()] = tree
                        .parent(*node)
                        .is_some_and(|p| marked[p.index()] || below[p.index()]);
                    next[node.index()] = below[node.index()] && compound_matches(cx, *node, compound);
                }
            }
            Combinator::Adjacent => {
                for node in order {
                    next[node.index()] = cx.prev_element(*node).is_some_and(|p| marked[p.index()])
                        && compound_matches(cx, *node, compound);
                }
            }
            Combinator::Sibling => {
                for parent in order {
                    let mut seen = false;
                    for child in tree.children(*parent) {
                        if !is_element(tree, *child) {
                            continue;
                        }
                        next[child.index()] = seen && compound_matches(cx, *child, compound);
                        seen |= marked[child.index()];
                    }
                }
            }
        }
        marked = next;
    }
    marked
}

pub(crate) fn query_all(tree: &Tree, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    let top = tree.ancestors(scope).last().unwrap_or(scope);
    let order = tree.descendants(top);
    let cx = Context::indexed(tree, &order);
    let mut found = vec![false; tree.nodes.len()];
    for complex in &selector.alternatives {
        for (slot, hit) in mark(&cx, &order, complex).into_iter().enumerate() {
            found[slot] |= hit;
        }
    }
    tree.descendants(scope)
        .into_iter()
        .skip(1)
        .filter(|n| found[n.index()])
        .collect()
}
