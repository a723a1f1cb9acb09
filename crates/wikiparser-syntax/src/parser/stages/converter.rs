//! Stage 7: language conversion blocks, `-{flags|rules}-`.
//!
//! Blocks nest; the innermost closes first. The text before the first `|`
//! holds `;`-separated flags. Rules are split on `;`, and a piece that does
//! not start with `variant:` (or `from=>variant:`) continues the rule before
//! it.

use wikiparser_config::ConfigError;

use crate::kind::NodeKind;
use crate::parser::ParseContext;
use crate::parser::sentinel::kind;

/// A rule split into its optional `from`, optional variant and target text.
#[derive(Debug, PartialEq, Eq)]
struct Rule<'a> {
    from: Option<&'a str>,
    variant: Option<&'a str>,
    to: &'a str,
}

fn split_rule<'a>(text: &'a str, variants: &[String]) -> Rule<'a> {
    let known = |v: &str| variants.iter().any(|known| known == v.trim());
    let variant_rule = |text: &'a str| -> Option<(&'a str, &'a str)> {
        let (variant, to) = text.split_once(':')?;
        known(variant).then_some((variant, to))
    };
    if let Some((from, rest)) = text.split_once("=>") {
        if let Some((variant, to)) = variant_rule(rest) {
            return Rule {
                from: Some(from),
                variant: Some(variant),
                to,
            };
        }
    }
    match variant_rule(text) {
        Some((variant, to)) => Rule {
            from: None,
            variant: Some(variant),
            to,
        },
        None => Rule {
            from: None,
            variant: None,
            to: text,
        },
    }
}

/// Groups `;`-separated pieces into rules.
fn group_rules<'a>(raw: &'a str, variants: &[String]) -> Vec<&'a str> {
    let mut rules: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for piece in raw.split(';') {
        let end = start + piece.len();
        let starts_rule = split_rule(piece, variants).variant.is_some();
        match rules.last_mut() {
            Some(last) if !starts_rule => last.1 = end,
            _ => rules.push((start, end)),
        }
        start = end + 1;
    }
    rules.into_iter().map(|(s, e)| &raw[s..e]).collect()
}

fn build(content: &str, variants: &[String], ctx: &mut ParseContext) -> String {
    let node = ctx.node(NodeKind::Converter);
    let rules_text = match content.split_once('|') {
        Some((flags, rules)) => {
            let flags_node = ctx.node(NodeKind::ConverterFlags);
            for flag in flags.split(';') {
                let flag = ctx.leaf(NodeKind::ConverterFlag, flag);
                ctx.add(flags_node, flag);
            }
            ctx.add(node, flags_node);
            rules
        }
        None => content,
    };
    for rule_text in group_rules(rules_text, variants) {
        let rule = split_rule(rule_text, variants);
        let rule_node = ctx.node(NodeKind::ConverterRule);
        let parts = [
            (NodeKind::ConverterRuleFrom, rule.from),
            (NodeKind::ConverterRuleVariant, rule.variant),
            (NodeKind::ConverterRuleTo, Some(rule.to)),
        ];
        for (child_kind, text) in parts {
            if let Some(text) = text {
                let child = ctx.leaf(child_kind, text);
                ctx.add(rule_node, child);
            }
        }
        ctx.add(node, rule_node);
    }
    ctx.push(node, kind::CONVERTER)
}

pub(crate) fn parse(text: &str, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    if !text.contains("-{") {
        return Ok(text.to_string());
    }
    let config = ctx.config.clone();
    let variants = config.variants()?;
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<usize> = Vec::new();
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(['-', '}']) {
        let at = pos + offset;
        out.push_str(&text[pos..at]);
        let rest = &text[at..];
        if rest.starts_with("-{") {
            open.push(out.len());
            out.push_str("-{");
            pos = at + 2;
        } else if rest.starts_with("}-") && !open.is_empty() {
            let start = open.pop().unwrap_or_default();
            let content = out[start + 2..].to_string();
            out.truncate(start);
            out.push_str(&build(&content, variants, ctx));
            pos = at + 2;
        } else {
            out.push_str(&rest[..1]);
            pos = at + 1;
        }
    }
    out.push_str(&text[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeId, Tree};
    use crate::{MAX_STAGE, parse as parse_tree};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use wikiparser_config::Config;

    fn variants() -> Vec<String> {
        ["zh", "zh-hans", "zh-hant"].iter().map(|v| v.to_string()).collect()
    }

    #[rstest]
    #[case("a", Rule { from: None, variant: None, to: "a" })]
    #[case(" zh-hans : x", Rule { from: None, variant: Some(" zh-hans "), to: " x" })]
    #[case("f=>zh:t", Rule { from: Some("f"), variant: Some("zh"), to: "t" })]
    #[case("en:x", Rule { from: None, variant: None, to: "en:x" })]
    fn splits_rules(#[case] text: &str, #[case] expected: Rule<'_>) {
        assert_eq!(split_rule(text, &variants()), expected);
    }

    #[test]
    fn groups_continuations() {
        assert_eq!(
            group_rules("zh-hans:a;b;zh-hant:c", &variants()),
            vec!["zh-hans:a;b", "zh-hant:c"]
        );
        assert_eq!(group_rules("a;b", &variants()), vec!["a;b"]);
    }

    fn converters(text: &str) -> (Tree, Vec<NodeId>) {
        let tree = parse_tree(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        assert_eq!(tree.to_string(tree.root()), text);
        let found = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|n| tree.kind(*n) == NodeKind::Converter)
            .collect();
        (tree, found)
    }

    #[test]
    fn flags_and_rules() {
        let (tree, found) = converters("-{H;A|zh-hans:x;zh-hant:y}-");
        let conv = found[0];
        let kinds: Vec<_> = tree.children(conv).iter().map(|c| tree.kind(*c)).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::ConverterFlags, NodeKind::ConverterRule, NodeKind::ConverterRule]
        );
        let flags = tree.first_child(conv).unwrap();
        assert_eq!(tree.children(flags).len(), 2);
        assert_eq!(tree.to_text(conv), "x;y");
    }

    #[rstest]
    #[case("-{a-{b}-c}-", 2)]
    #[case("-{a", 0)]
    #[case("a}-", 0)]
    #[case("-{}-", 1)]
    fn nesting_and_malformed(#[case] text: &str, #[case] count: usize) {
        assert_eq!(converters(text).1.len(), count);
    }
}
