//! One module per pipeline stage, plus the shared tag attribute scanner.

pub(crate) mod attributes;
mod braces;
mod comment_ext;
mod converter;
pub(crate) mod ext_links;
mod html;
mod line;
mod links;
mod quotes;
mod table;

use wikiparser_config::ConfigError;

use super::{ParseContext, SlotInfo};

pub(crate) fn run(stage: usize, text: &str, slot: &SlotInfo, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    match stage {
        0 => comment_ext::parse(text, slot, ctx),
        1 => braces::parse(text, slot, ctx),
        2 => html::parse(text, ctx),
        3 => table::parse(text, slot, ctx),
        4 => line::parse(text, slot, ctx),
        5 => {
            let linked = links::parse(text, ctx)?;
            ext_links::parse(&linked, ctx)
        }
        6 => Ok(quotes::parse(text, ctx)),
        7 => converter::parse(text, ctx),
        _ => Ok(text.to_string()),
    }
}
