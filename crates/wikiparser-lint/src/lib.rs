//! # wikiparser-lint
//!
//! Diagnostics for wikitext syntax trees.
//!
//! The [`Lint`] trait is implemented for [`wikiparser_syntax::Tree`]. A run
//! walks the tree once, asking each enabled rule about each node, and returns
//! [`LintError`]s ordered by byte offset. Rule severities come from a
//! [`wikiparser_config::LintConfig`]; a rule set to `off` is never run.
//!
//! Line and column numbers are only computed when a caller reads them, so an
//! editor that just wants byte ranges never pays for the translation.
//!
//! ```
//! use std::sync::Arc;
//! use wikiparser_config::{Config, LintConfig};
//! use wikiparser_lint::{Lint, apply_fixes};
//! use wikiparser_syntax::{MAX_STAGE, parse};
//!
//! let text = "a<!--b";
//! let tree = parse(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
//! let errors = tree.lint(&LintConfig::default());
//! assert_eq!(errors[0].rule, "unclosed-comment");
//!
//! let (fixed, applied) = apply_fixes(text, errors.iter().filter_map(|e| e.fix.as_ref()));
//! assert_eq!((fixed.as_str(), applied), ("a<!--b-->", 1));
//! ```

mod diagnostic;
mod fix;
mod linter;
mod position;
mod rules;

pub use diagnostic::{LintError, Severity};
pub use fix::{Fix, apply_fixes};
pub use linter::Lint;
pub use position::{LazySpan, Position};

/// Names of all built-in rules.
pub fn rule_names() -> impl Iterator<Item = &'static str> {
    rules::RULES.iter().map(|rule| rule.name)
}
