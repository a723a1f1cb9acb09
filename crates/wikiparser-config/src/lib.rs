//! # wikiparser-config
//!
//! The static site snapshot every parse reads from, plus lint rule settings.
//!
//! A [`Config`] describes what a MediaWiki installation recognizes: extension
//! tags, allowed HTML tags, namespaces, parser functions, behavior switches,
//! URL protocols, image parameter keywords and language variants. The parser
//! never talks to a live wiki; callers hand it one of these snapshots.
//!
//! Every table is optional in the serialized form. A missing table is only an
//! error once a parse actually needs it, which keeps documents that never touch
//! (say) language conversion working against a trimmed-down snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod defaults;
mod lint;

pub use lint::{LintConfig, RuleSeverity};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse JSON config file at {config_path}: {source}")]
    JsonParseError {
        config_path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse TOML config file at {config_path}: {source}")]
    TomlParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unsupported config file extension at {config_path}")]
    UnsupportedFormat { config_path: PathBuf },

    #[error("Config is missing the `{0}` table")]
    MissingTable(&'static str),
}

/// HTML tags the parser turns into tag nodes, split into three tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlTags {
    /// Paired inline tags such as `b` or `span`.
    #[serde(default)]
    pub normal: Vec<String>,
    /// Tags that never take a closing tag (`br`, `hr`, `img`, ...).
    #[serde(default)]
    pub void: Vec<String>,
    /// Paired tags that change block layout (`div`, `p`, `table`, ...).
    #[serde(default)]
    pub display: Vec<String>,
}

impl HtmlTags {
    pub fn contains(&self, name: &str) -> bool {
        self.is_void(name) || self.normal.iter().chain(&self.display).any(|t| t == name)
    }

    pub fn is_void(&self, name: &str) -> bool {
        self.void.iter().any(|t| t == name)
    }

    pub fn is_display(&self, name: &str) -> bool {
        self.display.iter().any(|t| t == name)
    }
}

/// A name table split by case sensitivity, with alias resolution.
///
/// Used for both parser functions (`{{#if:}}`, `{{PAGENAME}}`) and
/// double-underscore behavior switches (`__TOC__`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicWords {
    /// Lowercase names matched case-insensitively.
    #[serde(default)]
    pub insensitive: Vec<String>,
    /// Names matched exactly.
    #[serde(default)]
    pub sensitive: Vec<String>,
    /// Alias → canonical name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl MagicWords {
    /// Resolves `name` to its canonical form, or `None` when unknown.
    pub fn canonical(&self, name: &str) -> Option<String> {
        if self.sensitive.iter().any(|s| s == name) {
            return Some(self.aliases.get(name).cloned().unwrap_or_else(|| name.to_string()));
        }
        let lower = name.to_lowercase();
        if self.insensitive.iter().any(|s| *s == lower) {
            return Some(self.aliases.get(&lower).cloned().unwrap_or(lower));
        }
        None
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive.iter().any(|s| s == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<HtmlTags>,
    /// Namespace id → canonical name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<BTreeMap<i32, String>>,
    /// Lowercase namespace name or alias → namespace id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns_ids: Option<BTreeMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser_functions: Option<MagicWords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_underscore: Option<MagicWords>,
    /// URL protocols, e.g. `https://` or `mailto:`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Vec<String>>,
    /// Image parameter syntax (`$1px`, `thumb`) → parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interwiki: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        defaults::english()
    }
}

impl Config {
    /// A config with every table absent.
    pub fn empty() -> Self {
        Self {
            ext: None,
            html: None,
            namespaces: None,
            ns_ids: None,
            parser_functions: None,
            double_underscore: None,
            protocol: None,
            img: None,
            variants: None,
            interwiki: None,
        }
    }

    pub fn ext(&self) -> Result<&[String], ConfigError> {
        self.ext.as_deref().ok_or(ConfigError::MissingTable("ext"))
    }

    pub fn html(&self) -> Result<&HtmlTags, ConfigError> {
        self.html.as_ref().ok_or(ConfigError::MissingTable("html"))
    }

    pub fn namespaces(&self) -> Result<&BTreeMap<i32, String>, ConfigError> {
        self.namespaces
            .as_ref()
            .ok_or(ConfigError::MissingTable("namespaces"))
    }

    pub fn ns_ids(&self) -> Result<&BTreeMap<String, i32>, ConfigError> {
        self.ns_ids.as_ref().ok_or(ConfigError::MissingTable("nsIds"))
    }

    pub fn parser_functions(&self) -> Result<&MagicWords, ConfigError> {
        self.parser_functions
            .as_ref()
            .ok_or(ConfigError::MissingTable("parserFunctions"))
    }

    pub fn double_underscore(&self) -> Result<&MagicWords, ConfigError> {
        self.double_underscore
            .as_ref()
            .ok_or(ConfigError::MissingTable("doubleUnderscore"))
    }

    pub fn protocol(&self) -> Result<&[String], ConfigError> {
        self.protocol
            .as_deref()
            .ok_or(ConfigError::MissingTable("protocol"))
    }

    pub fn img(&self) -> Result<&BTreeMap<String, String>, ConfigError> {
        self.img.as_ref().ok_or(ConfigError::MissingTable("img"))
    }

    pub fn variants(&self) -> Result<&[String], ConfigError> {
        self.variants
            .as_deref()
            .ok_or(ConfigError::MissingTable("variants"))
    }

    pub fn interwiki(&self) -> Result<&[String], ConfigError> {
        self.interwiki
            .as_deref()
            .ok_or(ConfigError::MissingTable("interwiki"))
    }

    /// Canonical name of namespace `id`, empty for the main namespace.
    pub fn namespace_name(&self, id: i32) -> Result<&str, ConfigError> {
        Ok(self.namespaces()?.get(&id).map(String::as_str).unwrap_or(""))
    }

    /// Loads a snapshot from a `.json` or `.toml` file.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        match config_path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|source| ConfigError::JsonParseError {
                    config_path: config_path.to_path_buf(),
                    source,
                })
            }
            Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::TomlParseError {
                config_path: config_path.to_path_buf(),
                source,
            }),
            _ => Err(ConfigError::UnsupportedFormat {
                config_path: config_path.to_path_buf(),
            }),
        }
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = match config_path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::to_string_pretty(self)?,
            _ => serde_json::to_string_pretty(self)?,
        };
        std::fs::write(config_path, content)?;
        Ok(())
    }
}
