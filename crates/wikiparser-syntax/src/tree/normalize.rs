//! Derived attributes.
//!
//! Names that depend on child content (a template's resolved title, a
//! parameter's positional number, an attribute's lowercase key) are stored as
//! plain attributes and recomputed here: once bottom-up after the parser
//! builds the tree, and again along the ancestor chain after every edit.

use wikiparser_config::{Config, ConfigError};

use super::{NodeId, Tree};
use crate::kind::NodeKind;
use crate::title::normalize_title;

/// Parameter name for an image option such as `200px` or `thumb`.
pub(crate) fn image_parameter_name(option: &str, config: &Config) -> Result<String, ConfigError> {
    let option = option.trim();
    for (syntax, name) in config.img()? {
        match syntax.split_once("$1") {
            Some((prefix, suffix)) => {
                let Some(value) = option
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix))
                else {
                    continue;
                };
                let value_ok = if name == "width" {
                    is_image_width(value)
                } else {
                    !value.is_empty() || prefix.ends_with('=')
                };
                if value_ok {
                    return Ok(name.clone());
                }
            }
            None if syntax == option => return Ok(name.clone()),
            None => {}
        }
    }
    Ok("caption".to_string())
}

/// `200`, `x100` or `200x100`.
fn is_image_width(value: &str) -> bool {
    let (w, h) = match value.split_once('x') {
        Some((w, h)) => (w, Some(h)),
        None => (value, None),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match h {
        Some(h) => digits(w) && !h.is_empty() && digits(h),
        None => !w.is_empty() && digits(w),
    }
}

impl Tree {
    fn trimmed_text(&self, id: Option<NodeId>) -> String {
        id.map(|n| self.to_text(n).trim().to_string())
            .unwrap_or_default()
    }

    /// Recomputes the derived attributes of a single node.
    pub(crate) fn derive(&mut self, id: NodeId) -> Result<(), ConfigError> {
        match self.kind(id) {
            NodeKind::Template => {
                let raw = self.trimmed_text(self.child(id, 0));
                let title = normalize_title(&raw, 10, self.config())?;
                let name = if title.valid { title.title() } else { raw };
                self.put(id, "name", name);
                self.number_parameters(id);
            }
            NodeKind::MagicWord => {
                let raw = self.trimmed_text(self.child(id, 0));
                let name = self
                    .config()
                    .parser_functions()?
                    .canonical(&raw)
                    .unwrap_or_else(|| raw.to_lowercase());
                self.put(id, "name", name);
                self.number_parameters(id);
            }
            NodeKind::Arg => {
                let name = self.trimmed_text(self.child(id, 0));
                self.put(id, "name", name);
            }
            NodeKind::Link | NodeKind::Category | NodeKind::File => {
                let raw = self.trimmed_text(self.child(id, 0));
                let title = normalize_title(&raw, 0, self.config())?;
                self.put(id, "name", title.title());
                self.put(id, "ns", title.ns);
                self.put(id, "fragment", title.fragment.unwrap_or_default());
                self.put(id, "interwiki", title.interwiki.unwrap_or_default());
            }
            NodeKind::ExtAttr | NodeKind::HtmlAttr | NodeKind::TableAttr => {
                let name = self.trimmed_text(self.child(id, 0)).to_lowercase();
                self.put(id, "name", name);
            }
            NodeKind::ImageParameter => {
                let option = self.to_string(id);
                let name = image_parameter_name(&option, self.config())?;
                self.put(id, "name", name);
            }
            NodeKind::DoubleUnderscore => {
                let raw = self.trimmed_text(self.first_child(id));
                let name = self
                    .config()
                    .double_underscore()?
                    .canonical(&raw)
                    .unwrap_or_else(|| raw.to_lowercase());
                self.put(id, "name", name);
            }
            _ => {}
        }
        Ok(())
    }

    /// Named parameters take their trimmed key; anonymous ones count from 1.
    fn number_parameters(&mut self, id: NodeId) {
        let params: Vec<_> = self
            .children(id)
            .iter()
            .copied()
            .filter(|c| self.kind(*c) == NodeKind::Parameter)
            .collect();
        let mut position = 0;
        for param in params {
            if self.bool_attr(param, "anon") {
                position += 1;
                self.put(param, "name", position.to_string());
            } else {
                let key = self.trimmed_text(self.child(param, 0));
                self.put(param, "name", key);
            }
        }
    }

    /// Derives every node, children before parents.
    pub(crate) fn after_build(&mut self) -> Result<(), ConfigError> {
        for id in self.descendants(self.root()).into_iter().rev() {
            self.derive(id)?;
        }
        Ok(())
    }

    /// Re-derives `id` and each of its ancestors.
    pub(crate) fn refresh(&mut self, id: NodeId) -> Result<(), ConfigError> {
        let chain: Vec<_> = std::iter::once(id).chain(self.ancestors(id)).collect();
        for node in chain {
            self.derive(node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_STAGE, parse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;

    #[rstest]
    #[case("200px", "width")]
    #[case("x50px", "width")]
    #[case("20x50px", "width")]
    #[case("thumb", "thumbnail")]
    #[case(" left ", "left")]
    #[case("alt=A cat", "alt")]
    #[case("upright=1.2", "upright")]
    #[case("link=", "link")]
    #[case("A caption", "caption")]
    #[case("px", "caption")]
    fn image_options(#[case] option: &str, #[case] expected: &str) {
        assert_eq!(
            image_parameter_name(option, &Config::default()).unwrap(),
            expected
        );
    }

    fn names(text: &str, kind: NodeKind) -> Vec<String> {
        let tree = parse(text, false, MAX_STAGE, Arc::new(Config::default())).unwrap();
        tree.descendants(tree.root())
            .into_iter()
            .filter(|n| tree.kind(*n) == kind)
            .map(|n| tree.get_attribute(n, "name").unwrap().to_string())
            .collect()
    }

    #[test]
    fn parameters_are_numbered() {
        assert_eq!(
            names("{{t|a|k=v| b |2=c}}", NodeKind::Parameter),
            vec!["1", "k", "2", "2"]
        );
    }

    #[test]
    fn template_names_resolve_to_template_namespace() {
        assert_eq!(
            names("{{infobox_person}}{{:Main Page}}{{Help:X}}", NodeKind::Template),
            vec!["Template:Infobox person", "Main Page", "Help:X"]
        );
    }

    #[test]
    fn magic_words_use_canonical_names() {
        assert_eq!(
            names("{{#IF:x|y}}{{PAGENAME}}{{DEFAULTSORT:k}}", NodeKind::MagicWord),
            vec!["#if", "PAGENAME", "defaultsort"]
        );
    }

    #[test]
    fn attribute_names_are_lowercase() {
        assert_eq!(
            names(r#"<span STYLE="x" Id=y>"#, NodeKind::HtmlAttr),
            vec!["style", "id"]
        );
    }
}
