//! Error types for the syntax crate.
//!
//! Malformed wikitext never produces an error; it degrades to plain text.
//! These types cover caller mistakes and configuration gaps only.

use thiserror::Error;
use wikiparser_config::ConfigError;

use crate::kind::NodeKind;
use crate::tree::NodeId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid range expression `{0}`")]
    Syntax(String),
    #[error("coefficient of n must not be zero in `{0}`")]
    ZeroStep(String),
    #[error("constant term must not be negative when the coefficient of n is negative in `{0}`")]
    NegativeOffset(String),
    #[error("step must be at least 1 in `{0}`")]
    InvalidStep(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("unexpected {found} at byte {pos} in selector")]
    Unexpected { pos: usize, found: String },
    #[error("unknown node type `{0}`")]
    UnknownType(String),
    #[error("unknown pseudo-class `:{0}`")]
    UnknownPseudo(String),
    #[error("pseudo-class `:{0}` requires an argument")]
    MissingArgument(String),
    #[error(transparent)]
    Range(#[from] RangeError),
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("index {index} is out of bounds for a node with {len} children")]
    OutOfBounds { index: usize, len: usize },
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("{parent} does not accept a {child} child at position {index}")]
    UnacceptableChild {
        parent: NodeKind,
        child: NodeKind,
        index: usize,
    },
    #[error("node {0:?} already has a parent")]
    AlreadyAttached(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("attribute `{key}` cannot be set on a {kind}")]
    ReadOnlyAttribute { kind: NodeKind, key: String },
    #[error("nothing to undo")]
    NothingToUndo,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}
