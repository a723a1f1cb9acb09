//! The built-in rules.
//!
//! Each rule looks at a single node and never walks its subtree; the driver
//! in [`crate::linter`] visits every node exactly once.

use std::collections::HashMap;
use std::sync::Arc;
use wikiparser_config::RuleSeverity;
use wikiparser_syntax::{NodeId, NodeKind, Tree};

use crate::diagnostic::{LintError, Severity};
use crate::fix::Fix;
use crate::position::{LazySpan, Source};

pub(crate) struct Rule {
    pub name: &'static str,
    pub default: RuleSeverity,
    pub check: fn(&mut Checker<'_>, NodeId),
}

pub(crate) const RULES: &[Rule] = &[
    Rule { name: "unclosed-comment", default: RuleSeverity::Warning, check: unclosed_comment },
    Rule { name: "tag-like", default: RuleSeverity::Warning, check: tag_like },
    Rule { name: "unmatched-tag", default: RuleSeverity::Error, check: unmatched_tag },
    Rule { name: "self-closing", default: RuleSeverity::Error, check: self_closing },
    Rule { name: "obsolete-tag", default: RuleSeverity::Warning, check: obsolete_tag },
    Rule { name: "unclosed-quote", default: RuleSeverity::Warning, check: unclosed_quote },
    Rule { name: "lonely-bracket", default: RuleSeverity::Warning, check: lonely_bracket },
    Rule { name: "no-duplicate", default: RuleSeverity::Error, check: no_duplicate },
    Rule { name: "h1", default: RuleSeverity::Error, check: h1 },
    Rule { name: "unbalanced-header", default: RuleSeverity::Error, check: unbalanced_header },
    Rule { name: "no-arg", default: RuleSeverity::Warning, check: no_arg },
    Rule { name: "no-ignored", default: RuleSeverity::Warning, check: no_ignored },
    Rule { name: "unclosed-table", default: RuleSeverity::Error, check: unclosed_table },
];

const OBSOLETE: &[&str] = &["big", "center", "font", "strike", "tt"];
const INCLUSION: &[&str] = &["includeonly", "noinclude", "onlyinclude"];

/// State shared by the rules of one lint run.
pub(crate) struct Checker<'a> {
    pub tree: &'a Tree,
    positions: &'a [Option<(usize, usize)>],
    source: Arc<Source>,
    rule: &'static str,
    severity: Severity,
    pub out: Vec<LintError>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(tree: &'a Tree, positions: &'a [Option<(usize, usize)>], source: Arc<Source>) -> Self {
        Self {
            tree,
            positions,
            source,
            rule: "",
            severity: Severity::Warning,
            out: Vec::new(),
        }
    }

    pub(crate) fn select(&mut self, rule: &'static str, severity: Severity) {
        self.rule = rule;
        self.severity = severity;
    }

    fn range(&self, id: NodeId) -> Option<(usize, usize)> {
        self.positions.get(id.index()).copied().flatten()
    }

    fn text(&self, start: usize, end: usize) -> &str {
        self.source.text().get(start..end).unwrap_or("")
    }

    fn report(&mut self, range: (usize, usize), message: impl Into<String>, fix: Option<Fix>) {
        self.report_with(range, message, fix, Vec::new());
    }

    /// Reports with alternative edits the caller may pick from.
    fn report_with(
        &mut self,
        (start, end): (usize, usize),
        message: impl Into<String>,
        fix: Option<Fix>,
        suggestions: Vec<Fix>,
    ) {
        self.out.push(LintError {
            rule: self.rule,
            message: message.into(),
            severity: self.severity,
            span: LazySpan::new(Arc::clone(&self.source), start, end),
            fix,
            suggestions,
        });
    }

    /// Source of a parameter's value, trimmed.
    fn value_text(&self, param: NodeId) -> &str {
        self.tree
            .child(param, 1)
            .and_then(|v| self.range(v))
            .map_or("", |(start, end)| self.text(start, end).trim())
    }

    /// A heading without its trailing whitespace and comments.
    fn heading_range(&self, heading: NodeId) -> Option<(usize, usize)> {
        let (start, end) = self.range(heading)?;
        let body_end = self.tree.child(heading, 1).and_then(|t| self.range(t)).map_or(end, |(s, _)| s);
        Some((start, body_end))
    }

    fn leaf_text(&self, id: Option<NodeId>) -> &'a str {
        id.and_then(|n| self.tree.text_data(n)).unwrap_or("")
    }

    fn report_node(&mut self, id: NodeId, message: impl Into<String>, fix: Option<Fix>) {
        if let Some(range) = self.range(id) {
            self.report(range, message, fix);
        }
    }

    fn str_attr(&self, id: NodeId, key: &str) -> String {
        self.tree
            .get_attribute(id, key)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    fn bool_attr(&self, id: NodeId, key: &str) -> bool {
        self.tree
            .get_attribute(id, key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn is_void(&self, name: &str) -> bool {
        self.tree.config().html().is_ok_and(|html| html.is_void(name))
    }

    fn is_known_tag(&self, name: &str) -> bool {
        let config = self.tree.config();
        INCLUSION.contains(&name)
            || config.html().is_ok_and(|html| html.contains(name))
            || config.ext().is_ok_and(|ext| ext.iter().any(|e| e == name))
    }
}

fn unclosed_comment(checker: &mut Checker<'_>, id: NodeId) {
    if checker.tree.kind(id) != NodeKind::Comment || checker.bool_attr(id, "closed") {
        return;
    }
    let Some((start, end)) = checker.range(id) else { return };
    let fix = Fix::insert("close the comment", end, "-->");
    checker.report((start, end), "unclosed HTML comment", Some(fix));
}

/// Text that looks like a tag but was left as plain text, typically because
/// its closing tag is missing.
fn tag_like(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    let (Some(text), Some((base, _))) = (tree.text_data(id), checker.range(id)) else {
        return;
    };
    if !text.contains('<') || !tree.is_prose(id) {
        return;
    }
    for (at, _) in text.match_indices('<') {
        let rest = &text[at + 1..];
        let name_start = usize::from(rest.starts_with('/'));
        let name_len = rest[name_start..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len() - name_start);
        if name_len == 0 {
            continue;
        }
        let name = rest[name_start..name_start + name_len].to_ascii_lowercase();
        if !checker.is_known_tag(&name) {
            continue;
        }
        let after = name_start + name_len;
        let tail = &rest[after..];
        let stop = tail.find(['<', '\n']).unwrap_or(tail.len());
        let len = match tail[..stop].find('>') {
            Some(gt) => 1 + after + gt + 1,
            None => 1 + after,
        };
        let start = base + at;
        let fix = Fix::new("escape the bracket", start..start + 1, "&lt;");
        checker.report((start, start + len), format!("lonely `<{name}>` is left as plain text"), Some(fix));
    }
}

fn unmatched_tag(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    if tree.kind(id) != NodeKind::Html || checker.bool_attr(id, "selfClosing") {
        return;
    }
    let name = checker.str_attr(id, "name");
    if checker.is_void(&name) || tree.matching_tag(id).is_some() {
        return;
    }
    let Some((start, end)) = checker.range(id) else { return };
    let mut suggestions = vec![Fix::delete("remove the tag", start..end)];
    let message = if checker.bool_attr(id, "closing") {
        format!("unmatched closing tag `</{name}>`")
    } else {
        let block_end = tree
            .parent(id)
            .and_then(|p| tree.last_child(p))
            .and_then(|last| checker.range(last))
            .map_or(end, |(_, e)| e);
        let tag = checker.str_attr(id, "tag");
        suggestions.push(Fix::insert("close the tag", block_end, format!("</{tag}>")));
        format!("unclosed tag `<{name}>`")
    };
    checker.report_with((start, end), message, None, suggestions);
}

/// `<span/>` is an opening tag to MediaWiki unless the tag is void.
fn self_closing(checker: &mut Checker<'_>, id: NodeId) {
    if checker.tree.kind(id) != NodeKind::Html || !checker.bool_attr(id, "selfClosing") {
        return;
    }
    let name = checker.str_attr(id, "name");
    if checker.is_void(&name) {
        return;
    }
    let Some((start, end)) = checker.range(id) else { return };
    let source = checker.text(start, end);
    let mut suggestions = Vec::new();
    let fix = source.rfind('/').map(|slash| {
        let open = source[..slash].trim_end();
        suggestions.push(Fix::new("make it an opening tag", start..end, format!("{open}>")));
        let tag = checker.str_attr(id, "tag");
        Fix::new("close the tag explicitly", start..end, format!("{open}></{tag}>"))
    });
    suggestions.push(Fix::delete("remove the tag", start..end));
    checker.report_with((start, end), format!("invalid self-closing tag `<{name}/>`"), fix, suggestions);
}

fn obsolete_tag(checker: &mut Checker<'_>, id: NodeId) {
    if checker.tree.kind(id) != NodeKind::Html || checker.bool_attr(id, "closing") {
        return;
    }
    let name = checker.str_attr(id, "name");
    if OBSOLETE.contains(&name.as_str()) {
        checker.report_node(id, format!("obsolete HTML tag `<{name}>`"), None);
    }
}

fn unclosed_quote(checker: &mut Checker<'_>, id: NodeId) {
    if checker.tree.kind(id) != NodeKind::Quote || !checker.bool_attr(id, "unclosed") {
        return;
    }
    let Some((start, end)) = checker.range(id) else { return };
    let style = if checker.bool_attr(id, "bold") { "bold" } else { "italic" };
    let remove = Fix::delete("remove the apostrophes", start..end);
    checker.report_with((start, end), format!("unclosed {style} apostrophes"), None, vec![remove]);
}

fn lonely_bracket(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    let (Some(text), Some((base, _))) = (tree.text_data(id), checker.range(id)) else {
        return;
    };
    if !text.contains(['[', ']', '{', '}']) || !tree.is_prose(id) {
        return;
    }
    let mut found: Vec<(usize, &str)> = ["[[", "]]", "{{", "}}"]
        .iter()
        .flat_map(|pair| text.match_indices(pair))
        .collect();
    found.sort_unstable();
    let mut last_end = 0;
    for (at, pair) in found {
        if at < last_end {
            continue;
        }
        last_end = at + 2;
        checker.report((base + at, base + at + 2), format!("lonely `{pair}`"), None);
    }
}

fn no_duplicate(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    match tree.kind(id) {
        NodeKind::Template | NodeKind::MagicWord => duplicate_parameters(checker, id),
        kind if kind.is_attrs() => {
            let attrs: Vec<_> = tree
                .children(id)
                .iter()
                .copied()
                .filter(|c| tree.kind(*c).is_attr())
                .collect();
            let names: Vec<_> = attrs.iter().map(|a| checker.str_attr(*a, "name")).collect();
            for (i, attr) in attrs.iter().enumerate() {
                if !names[i].is_empty() && names[i + 1..].contains(&names[i]) {
                    checker.report_node(*attr, format!("duplicated attribute `{}`", names[i]), None);
                }
            }
        }
        _ => {}
    }
}

fn duplicate_parameters(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    let params: Vec<_> = tree
        .children(id)
        .iter()
        .copied()
        .filter(|c| tree.kind(*c) == NodeKind::Parameter)
        .collect();
    let mut last: HashMap<String, NodeId> = HashMap::new();
    for param in &params {
        last.insert(checker.str_attr(*param, "name"), *param);
    }
    for param in params {
        let name = checker.str_attr(param, "name");
        let Some(kept) = last.get(&name).copied() else { continue };
        if kept == param {
            continue;
        }
        let Some((start, end)) = checker.range(param) else { continue };
        let same = checker.value_text(param) == checker.value_text(kept);
        let fix = (same && checker.text(start.saturating_sub(1), start) == "|")
            .then(|| Fix::delete("remove the earlier duplicate", start - 1..end));
        checker.report((start, end), format!("duplicated parameter `{name}`"), fix);
    }
}

fn h1(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    if tree.kind(id) != NodeKind::Heading || tree.get_attribute(id, "level").and_then(|l| l.as_int()) != Some(1) {
        return;
    }
    let Some((start, end)) = checker.heading_range(id) else { return };
    let demote = Fix::new("change to level 2", start..end, format!("={}=", checker.text(start, end)));
    let whole = checker.range(id).unwrap_or((start, end));
    checker.report_with(whole, "level 1 section heading", None, vec![demote]);
}

fn unbalanced_header(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    if tree.kind(id) != NodeKind::Heading {
        return;
    }
    let Some(title) = tree.child(id, 0) else { return };
    let first = checker.leaf_text(tree.first_child(title)).trim_start();
    let last = checker.leaf_text(tree.last_child(title)).trim_end();
    if !first.starts_with('=') && !last.ends_with('=') {
        return;
    }
    let Some((start, end)) = checker.heading_range(id) else { return };
    let source = checker.text(start, end);
    let lead = source.len() - source.trim_start_matches('=').len();
    let trail = source.len() - source.trim_end_matches('=').len();
    let mut suggestions = Vec::new();
    if lead != trail && lead < source.len() {
        let marks = "=".repeat(lead.max(trail));
        let inner = source.trim_matches('=');
        suggestions.push(Fix::new("balance the `=` marks", start..end, format!("{marks}{inner}{marks}")));
    }
    let whole = checker.range(id).unwrap_or((start, end));
    checker.report_with(whole, "unbalanced `=` in section heading", None, suggestions);
}

fn no_arg(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    if tree.kind(id) == NodeKind::Arg && !tree.include() {
        let name = checker.str_attr(id, "name");
        checker.report_node(id, format!("template argument `{{{{{{{name}}}}}}}` outside a transcluded page"), None);
    }
}

fn no_ignored(checker: &mut Checker<'_>, id: NodeId) {
    let tree = checker.tree;
    match tree.kind(id) {
        NodeKind::TableInter if !tree.to_text(id).trim().is_empty() => {
            checker.report_node(id, "content between table rows is moved out of the table", None);
        }
        NodeKind::Hidden if tree.parent(id).is_some_and(|p| tree.kind(p) == NodeKind::Arg) => {
            checker.report_node(id, "ignored text after the argument default", None);
        }
        _ => {}
    }
}

fn unclosed_table(checker: &mut Checker<'_>, id: NodeId) {
    if checker.tree.kind(id) != NodeKind::Table || checker.bool_attr(id, "closed") {
        return;
    }
    let Some((start, end)) = checker.range(id) else { return };
    let fix = Fix::insert("close the table", end, "\n|}");
    checker.report((start, end), "unclosed table", Some(fix));
}
