//! Page title normalization against the namespace tables of a [`Config`].

use wikiparser_config::{Config, ConfigError};

const INVALID_CHARS: &[char] = &['<', '>', '[', ']', '{', '}', '|', '\0', '\x7F', '\n'];

/// A page title resolved against a configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub ns: i32,
    /// Title without namespace prefix, first letter uppercased.
    pub main: String,
    pub fragment: Option<String>,
    pub interwiki: Option<String>,
    pub valid: bool,
    prefix: String,
}

impl Title {
    /// Full title with namespace prefix, e.g. `Category:Foo`.
    pub fn title(&self) -> String {
        format!("{}{}", self.prefix, self.main)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn collapse_spaces(s: &str) -> String {
    let replaced = s.replace('_', " ");
    let mut out = String::with_capacity(replaced.len());
    let mut last_space = false;
    for c in replaced.chars() {
        if c == ' ' {
            if !last_space {
                out.push(c);
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out.trim().to_string()
}

/// Normalizes `raw` the way a wiki resolves link and template targets.
///
/// A leading `:` forces the main namespace; otherwise a recognized prefix
/// selects the namespace, falling back to `default_ns`.
pub fn normalize_title(raw: &str, default_ns: i32, config: &Config) -> Result<Title, ConfigError> {
    let decoded = html_escape::decode_html_entities(raw);
    let mut rest = collapse_spaces(&decoded);
    let mut ns = default_ns;
    let mut interwiki = None;

    if let Some(stripped) = rest.strip_prefix(':') {
        rest = stripped.trim_start().to_string();
        ns = 0;
    }

    let fragment = rest.find('#').map(|pos| {
        let fragment = rest[pos + 1..].trim().to_string();
        rest.truncate(pos);
        fragment
    });
    rest = rest.trim().to_string();

    let ns_ids = config.ns_ids()?;
    if let Some(colon) = rest.find(':') {
        let prefix = rest[..colon].trim().to_lowercase();
        if let Some(id) = ns_ids.get(&prefix) {
            ns = *id;
            rest = rest[colon + 1..].trim().to_string();
        } else if config.interwiki()?.iter().any(|iw| *iw == prefix) {
            interwiki = Some(prefix);
            rest = rest[colon + 1..].trim().to_string();
        }
    }

    let main = if interwiki.is_some() { rest } else { ucfirst(&rest) };
    let valid = !main.contains(INVALID_CHARS)
        && (!main.is_empty() || fragment.is_some() || interwiki.is_some());
    let prefix = match (&interwiki, ns) {
        (Some(iw), _) => format!("{iw}:"),
        (None, 0) => String::new(),
        (None, id) => format!("{}:", config.namespace_name(id)?),
    };

    Ok(Title {
        ns,
        main,
        fragment,
        interwiki,
        valid,
        prefix,
    })
}
