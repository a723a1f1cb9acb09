use pretty_assertions::assert_eq;
use std::sync::Arc;
use wikiparser_config::{Config, LintConfig, RuleSeverity};
use wikiparser_lint::{Lint, LintError, Severity, apply_fixes, rule_names};
use wikiparser_syntax::{MAX_STAGE, Tree, parse};

fn parse_doc(text: &str) -> Tree {
    let _ = env_logger::builder().is_test(true).try_init();
    parse(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap()
}

fn summary(errors: &[LintError]) -> String {
    errors
        .iter()
        .map(|e| {
            format!(
                "{}:{}-{}:{} {} {} {:?}\n",
                e.start_line(),
                e.start_col(),
                e.end_line(),
                e.end_col(),
                e.severity,
                e.rule,
                e.message
            )
        })
        .collect()
}

#[test]
fn unclosed_custom_tag_is_one_warning() {
    let tree = parse_doc("a<ref>b");
    assert_eq!(tree.to_string(tree.root()), "a<ref>b");
    let errors = tree.lint(&LintConfig::default());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, Severity::Warning);
    assert_eq!((errors[0].start_index(), errors[0].end_index()), (1, 6));
}

#[test]
fn lint_is_idempotent() {
    let tree = parse_doc("= x =\n{{t|a=1|a=1}}\n<span>''b\n{|\n|c");
    let config = LintConfig::default();
    let first = tree.lint(&config);
    let second = tree.lint(&config);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn document_snapshot() {
    let tree = parse_doc("== ok ==\n<font>x</font> ]]\n<!--open");
    insta::assert_snapshot!(summary(&tree.lint(&LintConfig::default())), @r#"
    1:0-1:6 warning obsolete-tag "obsolete HTML tag `<font>`"
    1:15-1:17 warning lonely-bracket "lonely `]]`"
    2:0-2:8 warning unclosed-comment "unclosed HTML comment"
    "#);
}

#[test]
fn fixes_converge() {
    let text = "''x'' <ref>y\n{|\n|z";
    let tree = parse_doc(text);
    let errors = tree.lint(&LintConfig::default());
    let (fixed, applied) = apply_fixes(text, errors.iter().filter_map(|e| e.fix.as_ref()));
    assert_eq!(applied, 2);
    assert_eq!(fixed, "''x'' &lt;ref>y\n{|\n|z\n|}");

    let again = parse_doc(&fixed).lint(&LintConfig::default());
    assert!(again.is_empty(), "{again:?}");
}

#[test]
fn lint_node_only_sees_the_subtree() {
    let tree = parse_doc("<center>a</center>\n{{t|b=[[c]] ]]|b=d}}");
    let template = tree.query(tree.root(), "template").unwrap().unwrap();
    let rules: Vec<_> = tree
        .lint_node(template, &LintConfig::default())
        .iter()
        .map(|e| (e.rule, e.start_index()))
        .collect();
    assert_eq!(rules, vec![("no-duplicate", 23), ("lonely-bracket", 31)]);
}

#[test]
fn disabled_rules_report_nothing() {
    let tree = parse_doc("a<ref>b = c =");
    let config = rule_names().fold(LintConfig::default(), |c, rule| c.with_rule(rule, RuleSeverity::Off));
    assert!(tree.lint(&config).is_empty());
}

#[test]
fn diagnostics_serialize_with_resolved_positions() {
    let tree = parse_doc("x\n''y");
    let errors = tree.lint(&LintConfig::default());
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json[0]["rule"], "unclosed-quote");
    assert_eq!(json[0]["severity"], "warning");
    assert_eq!(json[0]["startLine"], 1);
    assert_eq!(json[0]["endCol"], 2);
    assert_eq!(json[0]["fix"], serde_json::Value::Null);
}
