//! Staged wikitext parser.
//!
//! The parser turns a whole document into a [`Tree`] in a fixed sequence of
//! stages, each responsible for one construct:
//!
//! ```text
//! 0 comments, extension tags, inclusion markers
//! 1 templates, parser functions, arguments, headings
//! 2 HTML tags
//! 3 tables
//! 4 lists, horizontal rules, behavior switches
//! 5 internal links, external links, magic links
//! 6 bold and italic quotes
//! 7 language conversion blocks
//! ```
//!
//! ## Slots and sentinels
//!
//! Working text lives in *slots*: containers (the root, a parameter value, a
//! link label, ...) whose content is still wikitext. A stage rewrites each
//! slot's text, creating nodes for what it recognizes, pushing them onto the
//! accumulator and leaving a sentinel in their place. Nodes created by a stage
//! may open new slots; those are visited by the same stage loop when their
//! content still needs it.
//!
//! After the last requested stage every slot's text is expanded: literal runs
//! become text leaves and sentinels are replaced by the accumulated nodes.
//! Derived attributes are then computed bottom-up.

mod sentinel;
mod stages;

use log::{debug, trace};
use std::sync::Arc;
use wikiparser_config::{Config, ConfigError};

use crate::error::ParseError;
use crate::kind::NodeKind;
use crate::tree::{AttrValue, NodeId, Tree};
use sentinel::Piece;
use stages::ext_links::UrlPatterns;

/// Number of stages; passing it to [`parse`] runs the full pipeline.
pub const MAX_STAGE: usize = 8;

pub(crate) struct Slot {
    node: NodeId,
    text: String,
    from_stage: usize,
    line_start: bool,
}

/// What a stage knows about the slot it is rewriting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotInfo {
    pub(crate) kind: NodeKind,
    /// Whether the first line of the slot starts a source line.
    pub(crate) line_start: bool,
}

pub(crate) struct ParseContext {
    pub(crate) tree: Tree,
    pub(crate) config: Arc<Config>,
    pub(crate) include: bool,
    accum: Vec<NodeId>,
    slots: Vec<Slot>,
    stage: usize,
    /// Built on the first slot that needs it, then shared by every later one.
    pub(crate) url_patterns: Option<Arc<UrlPatterns>>,
}

impl ParseContext {
    fn new(config: Arc<Config>, include: bool) -> Self {
        Self {
            tree: Tree::new(Arc::clone(&config), include),
            config,
            include,
            accum: Vec::new(),
            slots: Vec::new(),
            stage: 0,
            url_patterns: None,
        }
    }

    pub(crate) fn stage(&self) -> usize {
        self.stage
    }

    /// Pushes `node` onto the accumulator and returns its sentinel.
    pub(crate) fn push(&mut self, node: NodeId, kind: char) -> String {
        self.accum.push(node);
        sentinel::sentinel(self.accum.len() - 1, kind)
    }

    pub(crate) fn node(&mut self, kind: NodeKind) -> NodeId {
        self.tree.alloc(kind)
    }

    pub(crate) fn add(&mut self, parent: NodeId, child: NodeId) {
        self.tree.attach(parent, child);
    }

    pub(crate) fn put(&mut self, id: NodeId, key: &str, value: impl Into<AttrValue>) {
        self.tree.put(id, key, value);
    }

    /// Appends the content of `text` to `parent`, resolving sentinels now.
    pub(crate) fn expand_into(&mut self, parent: NodeId, text: &str) {
        for piece in sentinel::pieces(text) {
            match piece {
                Piece::Text(literal) => {
                    let leaf = self.tree.alloc_text(literal);
                    self.tree.attach(parent, leaf);
                }
                Piece::Sentinel { index, .. } => match self.accum.get(index) {
                    Some(node) => {
                        let node = *node;
                        self.tree.attach(parent, node);
                    }
                    None => debug!("dangling sentinel {index}"),
                },
            }
        }
    }

    /// A node of `kind` whose content needs no further parsing.
    pub(crate) fn leaf(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let node = self.node(kind);
        self.expand_into(node, text);
        node
    }

    /// A node of `kind` whose content is parsed by stages from `from_stage` on.
    pub(crate) fn slot(&mut self, kind: NodeKind, text: &str, from_stage: usize, line_start: bool) -> NodeId {
        if from_stage >= MAX_STAGE {
            return self.leaf(kind, text);
        }
        let node = self.node(kind);
        self.slots.push(Slot {
            node,
            text: text.to_string(),
            from_stage,
            line_start,
        });
        node
    }

    /// Replaces raw sentinel bytes in the input with escaped text nodes.
    fn escape(&mut self, text: &str) -> String {
        if !text.contains([sentinel::LOW, sentinel::HIGH]) {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c == sentinel::LOW || c == sentinel::HIGH {
                let leaf = self.tree.alloc_text(c.encode_utf8(&mut [0; 4]));
                out.push_str(&self.push(leaf, sentinel::kind::ESCAPED));
            } else {
                out.push(c);
            }
        }
        out
    }

    fn run_stage(&mut self, stage: usize) -> Result<(), ConfigError> {
        self.stage = stage;
        let mut i = 0;
        let mut visited = 0;
        while i < self.slots.len() {
            if self.slots[i].from_stage <= stage {
                let text = std::mem::take(&mut self.slots[i].text);
                let node = self.slots[i].node;
                let info = SlotInfo {
                    kind: self.tree.kind(node),
                    line_start: self.slots[i].line_start,
                };
                let rewritten = stages::run(stage, &text, &info, self)?;
                self.slots[i].text = rewritten;
                visited += 1;
            }
            i += 1;
        }
        trace!(
            "stage {stage}: {visited} slots, {} accumulated nodes",
            self.accum.len()
        );
        Ok(())
    }

    fn build(mut self) -> Tree {
        let slots = std::mem::take(&mut self.slots);
        for slot in slots {
            self.expand_into(slot.node, &slot.text);
        }
        self.tree
    }
}

/// Parses `text` into a tree.
///
/// `include` selects transclusion mode for `<includeonly>`, `<noinclude>` and
/// `<onlyinclude>`. `max_stage` stops the pipeline early; any value yields a
/// tree whose `to_string` is `text`. Malformed wikitext never fails; the only
/// error is a configuration table the document turns out to need.
pub fn parse(text: &str, include: bool, max_stage: usize, config: Arc<Config>) -> Result<Tree, ParseError> {
    let mut ctx = ParseContext::new(config, include);
    let escaped = ctx.escape(text);
    let root = ctx.tree.root();
    ctx.slots.push(Slot {
        node: root,
        text: escaped,
        from_stage: 0,
        line_start: true,
    });

    let stages = max_stage.min(MAX_STAGE);
    for stage in 0..stages {
        ctx.run_stage(stage)?;
    }
    let accumulated = ctx.accum.len();
    let mut tree = ctx.build();
    tree.after_build()?;
    debug!(
        "parsed {} bytes in {stages} stages, {accumulated} accumulated nodes",
        text.len()
    );
    Ok(tree)
}

#[cfg(test)]
mod tests;
