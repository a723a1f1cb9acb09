use log::debug;
use std::sync::Arc;
use wikiparser_config::LintConfig;
use wikiparser_syntax::{NodeId, Tree};

use crate::diagnostic::{LintError, Severity};
use crate::position::Source;
use crate::rules::{Checker, RULES, Rule};

/// Static analysis over a parsed tree.
pub trait Lint {
    /// Diagnostics for the whole document, ordered by position.
    fn lint(&self, config: &LintConfig) -> Vec<LintError>;

    /// Diagnostics for `id` and its subtree only. Offsets stay relative to
    /// the whole document.
    fn lint_node(&self, id: NodeId, config: &LintConfig) -> Vec<LintError>;
}

impl Lint for Tree {
    fn lint(&self, config: &LintConfig) -> Vec<LintError> {
        self.lint_node(self.root(), config)
    }

    fn lint_node(&self, id: NodeId, config: &LintConfig) -> Vec<LintError> {
        let enabled: Vec<(&Rule, Severity)> = RULES
            .iter()
            .filter_map(|rule| {
                Severity::from_rule(config.severity(rule.name, rule.default)).map(|severity| (rule, severity))
            })
            .collect();
        if enabled.is_empty() || !self.is_attached(id) {
            return Vec::new();
        }

        let positions = self.positions();
        let source = Arc::new(Source::new(self.to_string(self.root())));
        let mut checker = Checker::new(self, &positions, source);
        for node in self.descendants(id) {
            for (rule, severity) in &enabled {
                checker.select(rule.name, *severity);
                (rule.check)(&mut checker, node);
            }
        }

        let mut diagnostics = checker.out;
        diagnostics.sort_by_key(|d| (d.start_index(), d.end_index(), d.rule));
        debug!("lint found {} diagnostics under node {}", diagnostics.len(), id.index());
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use wikiparser_config::{Config, RuleSeverity};
    use wikiparser_syntax::{MAX_STAGE, parse};

    fn lint(text: &str) -> Vec<LintError> {
        let _ = env_logger::builder().is_test(true).try_init();
        let tree = parse(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        tree.lint(&LintConfig::default())
    }

    fn rules(text: &str) -> Vec<(&'static str, usize, usize)> {
        lint(text)
            .iter()
            .map(|d| (d.rule, d.start_index(), d.end_index()))
            .collect()
    }

    #[rstest]
    #[case("a<!--b", vec![("unclosed-comment", 1, 6)])]
    #[case("a<ref>b", vec![("tag-like", 1, 6)])]
    #[case("x</span>", vec![("unmatched-tag", 1, 8)])]
    #[case("<span>x", vec![("unmatched-tag", 0, 6)])]
    #[case("<span/>", vec![("self-closing", 0, 7)])]
    #[case("<br/><br>", vec![])]
    #[case("<center>x</center>", vec![("obsolete-tag", 0, 8)])]
    #[case("''a", vec![("unclosed-quote", 0, 2)])]
    #[case("a ]] b", vec![("lonely-bracket", 2, 4)])]
    #[case("{{t|a=1|a=2}}", vec![("no-duplicate", 4, 7)])]
    #[case("= a =", vec![("h1", 0, 5)])]
    #[case("=== a ==", vec![("unbalanced-header", 0, 8)])]
    #[case("{{{1}}}", vec![("no-arg", 0, 7)])]
    #[case("{|\n|a", vec![("unclosed-table", 0, 5)])]
    #[case("{{t|a}} [[b]] ''c''", vec![])]
    fn single_rule(#[case] text: &str, #[case] expected: Vec<(&'static str, usize, usize)>) {
        assert_eq!(rules(text), expected);
    }

    #[rstest]
    #[case("x</span>", vec![(1..8, "")])]
    #[case("<span>x", vec![(0..6, ""), (7..7, "</span>")])]
    #[case("<SPAN>x", vec![(0..6, ""), (7..7, "</SPAN>")])]
    #[case("= a =", vec![(0..5, "== a ==")])]
    #[case("= a = <!--c-->", vec![(0..5, "== a ==")])]
    #[case("=== a ==", vec![(0..8, "=== a ===")])]
    #[case("== a ===", vec![(0..8, "=== a ===")])]
    #[case("=== {{t}} ==", vec![(0..12, "=== {{t}} ===")])]
    #[case("<span/>", vec![(0..7, "<span>"), (0..7, "")])]
    #[case("<span id=x />", vec![(0..13, "<span id=x>"), (0..13, "")])]
    #[case("''a", vec![(0..2, "")])]
    fn rules_offer_suggestions(#[case] text: &str, #[case] expected: Vec<(std::ops::Range<usize>, &str)>) {
        let found = lint(text);
        assert_eq!(found.len(), 1);
        let offered: Vec<_> = found[0]
            .suggestions
            .iter()
            .map(|s| (s.range.clone(), s.replacement.as_str()))
            .collect();
        assert_eq!(offered, expected);
    }

    #[test]
    fn self_closing_fix_and_suggestions_differ() {
        let found = lint("<span/>");
        assert_eq!(found[0].fix.as_ref().unwrap().replacement, "<span></span>");
        assert!(found[0].suggestions.iter().all(|s| s.replacement != "<span></span>"));
    }

    #[test]
    fn tag_like_ignores_raw_extension_bodies() {
        assert_eq!(rules("<nowiki>a<span</nowiki><!--<b>-->"), vec![]);
    }

    #[test]
    fn tag_like_without_closing_bracket_covers_the_name() {
        assert_eq!(rules("a <ref name=x\nb"), vec![("tag-like", 2, 6)]);
    }

    #[test]
    fn identical_duplicates_get_a_fix() {
        let found = lint("{{t|a=1|b|a= 1}}");
        assert_eq!(found.len(), 1);
        let fix = found[0].fix.as_ref().unwrap();
        assert_eq!(fix.range, 3..7);
        assert_eq!(fix.replacement, "");
    }

    #[test]
    fn duplicates_compare_the_source_of_nested_values() {
        let found = lint("{{t|a= {{x}} |a={{x}}}}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fix.as_ref().unwrap().range, 3..13);
        let found = lint("{{t|a={{x}}|a={{y}}}}");
        assert_eq!(found.len(), 1);
        assert!(found[0].fix.is_none());
    }

    #[test]
    fn ignored_table_content_and_argument_tail() {
        let text = "{|\nstray\n|-\n|a\n|}";
        assert_eq!(
            rules(text).into_iter().map(|(rule, ..)| rule).collect::<Vec<_>>(),
            vec!["no-ignored"]
        );
        let tree = parse("{{{a|b|c}}}", true, MAX_STAGE, Arc::new(Config::default())).unwrap();
        let found = tree.lint(&LintConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].rule, found[0].start_index(), found[0].end_index()), ("no-ignored", 7, 8));
    }

    #[test]
    fn configuration_changes_severity_and_disables() {
        let tree = parse("= a =\n<span>", false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        let config = LintConfig::default()
            .with_rule("h1", RuleSeverity::Off)
            .with_rule("unmatched-tag", RuleSeverity::Warning);
        let found = tree.lint(&config);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "unmatched-tag");
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn everything_off_returns_nothing() {
        let tree = parse("= a =", false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        let config = RULES
            .iter()
            .fold(LintConfig::default(), |c, rule| c.with_rule(rule.name, RuleSeverity::Off));
        assert!(tree.lint(&config).is_empty());
    }

    #[test]
    fn positions_are_lazy() {
        let found = lint("a\n<!--b");
        assert!(!found[0].span.is_resolved());
        assert_eq!((found[0].start_line(), found[0].start_col()), (1, 0));
        assert_eq!((found[0].end_line(), found[0].end_col()), (1, 5));
    }
}
