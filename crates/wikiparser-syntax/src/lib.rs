//! # wikiparser-syntax
//!
//! A lossless wikitext syntax tree with a staged parser, a mutation API and
//! CSS-like selector queries.
//!
//! ## What is Lossless?
//!
//! Every byte of the source ends up in exactly one place of the tree: either
//! in a text leaf or in the fixed punctuation a node kind serializes around
//! its children. [`Tree::to_string`] therefore gives back the input for any
//! document, however malformed. Unclosed templates, stray brackets and
//! half-written tables degrade to plain text instead of failing.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Stages 0..8 → Sentinel Text + Accumulator → Build → Tree
//!               (parser::stages)                            (after_build)
//! ```
//!
//! ### 1. Parser ([`parse`])
//!
//! Each stage rewrites slot text, turning recognized constructs into nodes
//! and leaving a placeholder sentinel in their place. Later stages see a
//! sentinel as an opaque token, which is how a template inside a link label
//! stays a template. See the `parser` module docs for the stage order.
//!
//! ### 2. Tree ([`tree`] module)
//!
//! An arena of nodes addressed by [`NodeId`]. Kind-specific behavior is a
//! match over [`NodeKind`]. Derived attributes such as a link's normalized
//! `name` are recomputed whenever a mutation touches the node.
//!
//! ### 3. Selectors ([`selector`] module)
//!
//! A small CSS dialect over node kinds and attributes:
//!
//! ```text
//! template[name="Template:Cite"], table > tr:nth-child(odd)
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! wikiparser-syntax/
//! ├── lib.rs        # This file - public API
//! ├── kind.rs       # NodeKind enum and child shapes
//! ├── error.rs      # Error types
//! ├── range.rs      # Range / Ranges index expressions
//! ├── title.rs      # Page title normalization
//! ├── parser/       # Staged parser, sentinels, one module per stage
//! ├── tree/         # Arena, serialization, mutation, derived attributes
//! └── selector/     # Lexer, parser and matcher for selectors
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use wikiparser_config::Config;
//! use wikiparser_syntax::{MAX_STAGE, NodeKind, parse};
//!
//! let tree = parse("{{a|b}} [[c]]", false, MAX_STAGE, Arc::new(Config::default())).unwrap();
//! assert_eq!(tree.to_string(tree.root()), "{{a|b}} [[c]]");
//!
//! let template = tree.query(tree.root(), "template").unwrap().unwrap();
//! assert_eq!(tree.kind(template), NodeKind::Template);
//! ```

pub mod error;
pub mod kind;
mod parser;
pub mod range;
pub mod selector;
pub mod title;
pub mod tree;

pub use error::{ParseError, RangeError, SelectorError, TreeError};
pub use kind::NodeKind;
pub use parser::{MAX_STAGE, parse};
pub use range::{Range, RangeItem, Ranges};
pub use selector::Selector;
pub use title::{Title, normalize_title};
pub use tree::{AttrValue, Mutation, NodeId, Tree};
