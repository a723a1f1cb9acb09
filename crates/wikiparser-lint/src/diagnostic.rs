use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use wikiparser_config::RuleSeverity;

use crate::fix::Fix;
use crate::position::LazySpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub(crate) fn from_rule(severity: RuleSeverity) -> Option<Self> {
        match severity {
            RuleSeverity::Off => None,
            RuleSeverity::Warning => Some(Severity::Warning),
            RuleSeverity::Error => Some(Severity::Error),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One finding of a lint run.
///
/// Byte offsets are known up front; lines and columns are resolved from the
/// shared source the first time one of them is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintError {
    pub rule: &'static str,
    pub message: String,
    pub severity: Severity,
    pub span: LazySpan,
    pub fix: Option<Fix>,
    pub suggestions: Vec<Fix>,
}

impl LintError {
    pub fn start_index(&self) -> usize {
        self.span.start_index()
    }

    pub fn end_index(&self) -> usize {
        self.span.end_index()
    }

    pub fn start_line(&self) -> usize {
        self.span.start().line
    }

    pub fn start_col(&self) -> usize {
        self.span.start().column
    }

    pub fn end_line(&self) -> usize {
        self.span.end().line
    }

    pub fn end_col(&self) -> usize {
        self.span.end().column
    }
}

impl fmt::Display for LintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.start_line() + 1,
            self.start_col() + 1,
            self.severity,
            self.rule,
            self.message
        )
    }
}

// Serializing resolves the span, so it is written by hand.
impl Serialize for LintError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LintError", 11)?;
        state.serialize_field("rule", self.rule)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("severity", &self.severity)?;
        state.serialize_field("startIndex", &self.start_index())?;
        state.serialize_field("endIndex", &self.end_index())?;
        state.serialize_field("startLine", &self.start_line())?;
        state.serialize_field("startCol", &self.start_col())?;
        state.serialize_field("endLine", &self.end_line())?;
        state.serialize_field("endCol", &self.end_col())?;
        state.serialize_field("fix", &self.fix)?;
        state.serialize_field("suggestions", &self.suggestions)?;
        state.end()
    }
}
