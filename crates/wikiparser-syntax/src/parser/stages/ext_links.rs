//! Stage 5, second half: bracketed external links, bare URLs and magic links.

use log::warn;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use wikiparser_config::ConfigError;

use crate::kind::NodeKind;
use crate::parser::ParseContext;
use crate::parser::sentinel::{self, kind};

/// Sentinel kinds allowed inside a bracketed URL.
const URL_SENTINELS: &[char] = &[
    kind::COMMENT,
    kind::INCLUDE,
    kind::PIPE,
    kind::EQUALS,
    kind::ESCAPED,
    kind::TEMPLATE,
    kind::ARG,
];

fn is_url_char(c: char) -> bool {
    !matches!(c, '[' | ']' | '<' | '>' | '"' | '\u{FFFD}' | '\x7F')
        && c > ' '
        && !(c.is_whitespace() || c == '\u{A0}')
}

fn magic_link_regex() -> &'static Regex {
    static MAGIC_LINK_REGEX: OnceLock<Regex> = OnceLock::new();
    MAGIC_LINK_REGEX.get_or_init(|| {
        Regex::new(
            r"\b(?:(?:RFC|PMID)[ \t\u{A0}]+[0-9]+\b|ISBN[ \t\u{A0}]+(?:97[89][ -]?)?(?:[0-9][ -]?){9}[0-9Xx]\b)",
        )
        .expect("Invalid magic link regex")
    })
}

/// The configured URL protocols and the bare-URL regex derived from them.
#[derive(Debug)]
pub(crate) struct UrlPatterns {
    protocols: Vec<String>,
    free_url: Option<Regex>,
}

impl UrlPatterns {
    fn new(protocols: &[String]) -> Self {
        let protocols: Vec<String> = protocols.iter().map(|p| p.to_ascii_lowercase()).collect();
        let free_url = free_url_regex(&protocols);
        Self { protocols, free_url }
    }
}

/// The patterns for this parse, compiled on first use.
fn url_patterns(ctx: &mut ParseContext) -> Result<Arc<UrlPatterns>, ConfigError> {
    if let Some(patterns) = &ctx.url_patterns {
        return Ok(Arc::clone(patterns));
    }
    let patterns = Arc::new(UrlPatterns::new(ctx.config.protocol()?));
    ctx.url_patterns = Some(Arc::clone(&patterns));
    Ok(patterns)
}

/// Matches bare URLs for every protocol except protocol-relative `//`.
fn free_url_regex(protocols: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = protocols
        .iter()
        .filter(|p| p.as_str() != "//")
        .map(|p| regex::escape(p))
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    let pattern = format!(
        r#"(?i)\b(?:{})[^\[\]<>"\x00-\x20\x7F\p{{Zs}}\x{{FFFD}}]+"#,
        alternatives.join("|")
    );
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!("skipping free links: {err}");
            None
        }
    }
}

/// Length of the URL at the start of `text`, protocol included.
fn url_len(text: &str, protocols: &[String]) -> Option<usize> {
    let protocol = protocols
        .iter()
        .find(|p| text.get(..p.len()).is_some_and(|head| head.eq_ignore_ascii_case(p)))?;
    let mut i = protocol.len();
    while i < text.len() {
        let rest = &text[i..];
        if let Some((_, found, len)) = sentinel::parse_at(rest) {
            if !URL_SENTINELS.contains(&found) {
                break;
            }
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else { break };
        if !is_url_char(c) {
            break;
        }
        i += c.len_utf8();
    }
    (i > protocol.len()).then_some(i)
}

/// Strips punctuation that usually ends a sentence rather than a URL.
fn trim_url(url: &str) -> &str {
    let mut end = url.len();
    while let Some(last) = url[..end].chars().last() {
        let strip = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '\'' => true,
            ')' => !url[..end].contains('('),
            _ => false,
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    &url[..end]
}

fn bracketed(text: &str, protocols: &[String], ctx: &mut ParseContext) -> Option<(String, usize)> {
    let body = text.strip_prefix('[')?;
    let url_end = url_len(body, protocols)?;
    let after_url = &body[url_end..];
    let space_len = after_url.len() - after_url.trim_start_matches([' ', '\t', '\u{A0}']).len();
    let label = &after_url[space_len..];
    let close = label.find([']', '\n'])?;
    if !label[close..].starts_with(']') {
        return None;
    }

    let node = ctx.node(NodeKind::ExtLink);
    ctx.put(node, "space", &after_url[..space_len]);
    let url = ctx.leaf(NodeKind::ExtLinkUrl, &body[..url_end]);
    ctx.add(node, url);
    if space_len > 0 || close > 0 {
        let stage = ctx.stage();
        let label = ctx.slot(NodeKind::ExtLinkText, &label[..close], stage + 1, false);
        ctx.add(node, label);
    }
    let consumed = 1 + url_end + space_len + close + 1;
    Some((ctx.push(node, kind::EXT_LINK), consumed))
}

fn replace_matches(
    text: &str,
    regex: &Regex,
    node_kind: NodeKind,
    trim: bool,
    ctx: &mut ParseContext,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for found in regex.find_iter(text) {
        let matched = if trim { trim_url(found.as_str()) } else { found.as_str() };
        if matched.is_empty() {
            continue;
        }
        out.push_str(&text[pos..found.start()]);
        let node = ctx.leaf(node_kind, matched);
        out.push_str(&ctx.push(node, kind::EXT_LINK));
        pos = found.start() + matched.len();
    }
    out.push_str(&text[pos..]);
    out
}

pub(crate) fn parse(text: &str, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    let has_protocol_hint = text.contains(':');
    let mut linked = text.to_string();

    if has_protocol_hint || text.contains("//") {
        let patterns = url_patterns(ctx)?;
        let protocols = &patterns.protocols;
        if text.contains('[') {
            let mut out = String::with_capacity(text.len());
            let mut pos = 0;
            let mut search = 0;
            while let Some(offset) = text[search..].find('[') {
                let at = search + offset;
                match bracketed(&text[at..], protocols, ctx) {
                    Some((sentinel, consumed)) => {
                        out.push_str(&text[pos..at]);
                        out.push_str(&sentinel);
                        pos = at + consumed;
                        search = pos;
                    }
                    None => search = at + 1,
                }
            }
            out.push_str(&text[pos..]);
            linked = out;
        }
        if has_protocol_hint {
            if let Some(regex) = &patterns.free_url {
                linked = replace_matches(&linked, regex, NodeKind::FreeExtLink, true, ctx);
            }
        }
    }

    if linked.contains("ISBN") || linked.contains("RFC") || linked.contains("PMID") {
        linked = replace_matches(&linked, magic_link_regex(), NodeKind::MagicLink, false, ctx);
    }
    Ok(linked)
}
