use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Off,
    Warning,
    Error,
}

/// Per-rule severity overrides. Rules absent from the map use their default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSeverity>,
}

impl LintConfig {
    pub fn with_rule(mut self, rule: &str, severity: RuleSeverity) -> Self {
        self.rules.insert(rule.to_string(), severity);
        self
    }

    /// Effective severity for `rule`, falling back to `default`.
    pub fn severity(&self, rule: &str, default: RuleSeverity) -> RuleSeverity {
        self.rules.get(rule).copied().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let config = LintConfig::default().with_rule("h1", RuleSeverity::Off);
        assert_eq!(config.severity("h1", RuleSeverity::Error), RuleSeverity::Off);
        assert_eq!(
            config.severity("no-arg", RuleSeverity::Warning),
            RuleSeverity::Warning
        );
    }

    #[test]
    fn severity_deserializes_lowercase() {
        let config: LintConfig =
            serde_json::from_str(r#"{"rules": {"tag-like": "error", "h1": "off"}}"#).unwrap();
        assert_eq!(config.rules["tag-like"], RuleSeverity::Error);
        assert_eq!(config.rules["h1"], RuleSeverity::Off);
    }
}
