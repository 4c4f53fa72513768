use crate::config::types::{FieldEntry, ItemEntry, ParserEntry};
use crate::crawler::{Parser, UrlRule};
use crate::item::{ItemSpec, SaveStep, Selector};
use crate::ConfigError;

/// Builds parsers from declarative entries
///
/// Every declared item shares the given save step. With no entries a single
/// pass-through parser is returned, so the crawl still follows links.
///
/// # Arguments
///
/// * `entries` - The `[[parser]]` entries of a configuration
/// * `save` - The save step attached to every declared item
///
/// # Returns
///
/// * `Ok(Vec<Parser>)` - The compiled parsers, in declaration order
/// * `Err(ConfigError)` - A selector or pattern failed to compile
pub fn build_parsers(entries: &[ParserEntry], save: &SaveStep) -> Result<Vec<Parser>, ConfigError> {
    if entries.is_empty() {
        return Ok(vec![Parser::new()]);
    }

    entries
        .iter()
        .map(|entry| build_parser(entry, save))
        .collect()
}

fn build_parser(entry: &ParserEntry, save: &SaveStep) -> Result<Parser, ConfigError> {
    let mut parser = Parser::new();

    if let Some(needle) = &entry.contains {
        parser = parser.contains(needle.clone());
    }

    if let Some(pattern) = &entry.pattern {
        parser = parser.matches(pattern)?;
    }

    if let Some(pattern) = &entry.url_pattern {
        parser = parser.url_rule(UrlRule::pattern(pattern)?);
    }

    if entry.json {
        parser = parser.json();
    }

    if let Some(item) = &entry.item {
        parser = parser.item(build_item(item, save)?);
    }

    Ok(parser)
}

fn build_item(entry: &ItemEntry, save: &SaveStep) -> Result<ItemSpec, ConfigError> {
    let mut spec = if entry.binary {
        ItemSpec::binary(entry.name.clone(), save.clone())
    } else {
        ItemSpec::new(entry.name.clone(), save.clone())
    };

    for (name, field) in &entry.fields {
        spec = spec.field(name.clone(), build_selector(name, field)?);
    }

    Ok(spec)
}

fn build_selector(name: &str, field: &FieldEntry) -> Result<Selector, ConfigError> {
    let selector = match (&field.css, &field.attr, &field.regex) {
        (Some(query), Some(attr), None) => Selector::css_attr(query, attr)?,
        (Some(query), None, None) => Selector::css(query)?,
        (None, None, Some(pattern)) => Selector::regex(pattern)?,
        _ => {
            return Err(ConfigError::Validation(format!(
                "field '{}' must set exactly one of css or regex",
                name
            )))
        }
    };
    Ok(selector)
}
