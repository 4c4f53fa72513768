//! Item declarations and extraction
//!
//! An [`ItemSpec`] is an explicit table of `(field name, Selector)` pairs plus a
//! save step. Building it against a fetched [`Response`] produces an [`Item`]:
//! - markup items map each field to the value its selector found, omitting
//!   fields whose selector found nothing
//! - JSON items hold the decoded body under the single field `json`
//! - binary items skip selectors entirely and carry the raw bytes

mod save;
mod selector;

pub use save::{SaveFuture, SaveStep};
pub use selector::Selector;

use crate::crawler::Response;
use crate::ItemError;
use scraper::Html;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text of a structural match
    Text(String),

    /// Attribute values or pattern matches
    List(Vec<String>),

    /// A decoded JSON document
    Json(serde_json::Value),
}

impl FieldValue {
    /// Returns the text if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the list if this is a list value
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the JSON document if this is a JSON value
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// The shape of records an item spec produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemKind {
    /// Fields are extracted from markup with selectors
    #[default]
    Markup,

    /// The raw body is kept as bytes; no selectors, no URL discovery
    Binary,
}

/// One extracted record
#[derive(Debug, Clone)]
pub struct Item {
    /// Name of the spec that produced this item
    pub name: String,

    /// Extracted fields
    pub result: BTreeMap<String, FieldValue>,

    /// Raw body bytes, present for binary items only
    pub content: Option<Vec<u8>>,

    /// The response this item was built from
    pub response: Arc<Response>,
}

impl Item {
    /// Returns a field's value
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.result.get(field)
    }

    /// URL of the page the item came from
    pub fn url(&self) -> &str {
        &self.response.url
    }
}

/// Declarative description of a record shape
///
/// # Example
///
/// ```
/// use seen::item::{ItemSpec, SaveStep, Selector};
///
/// let post = ItemSpec::new("post", SaveStep::blocking(|item, _session| {
///     println!("{:?}", item.result);
///     Ok(())
/// }))
/// .field("title", Selector::css("title").unwrap())
/// .field("img", Selector::css_attr("img", "src").unwrap());
///
/// assert_eq!(post.fields().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ItemSpec {
    name: String,
    kind: ItemKind,
    fields: Vec<(String, Selector)>,
    save: SaveStep,
}

impl ItemSpec {
    /// Creates a markup item spec with no fields
    pub fn new(name: impl Into<String>, save: SaveStep) -> Self {
        Self {
            name: name.into(),
            kind: ItemKind::Markup,
            fields: Vec::new(),
            save,
        }
    }

    /// Creates a binary item spec
    pub fn binary(name: impl Into<String>, save: SaveStep) -> Self {
        Self {
            kind: ItemKind::Binary,
            ..Self::new(name, save)
        }
    }

    /// Adds a field; a later field with the same name replaces the earlier one
    pub fn field(mut self, name: impl Into<String>, selector: Selector) -> Self {
        let name = name.into();
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, selector));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn fields(&self) -> &[(String, Selector)] {
        &self.fields
    }

    pub fn save_step(&self) -> &SaveStep {
        &self.save
    }

    /// Builds an item from a response
    ///
    /// # Arguments
    ///
    /// * `response` - The fetched response
    /// * `is_json` - Decode the body as JSON instead of running selectors
    ///
    /// # Returns
    ///
    /// * `Ok(Item)` - The extracted item
    /// * `Err(ItemError::MalformedJson)` - JSON mode and the body does not decode
    pub fn build(&self, response: &Arc<Response>, is_json: bool) -> Result<Item, ItemError> {
        let mut item = Item {
            name: self.name.clone(),
            result: BTreeMap::new(),
            content: None,
            response: Arc::clone(response),
        };

        if self.kind == ItemKind::Binary {
            item.content = Some(response.content().to_vec());
            return Ok(item);
        }

        if is_json {
            let value = serde_json::from_slice(response.content()).map_err(|source| {
                ItemError::MalformedJson {
                    url: response.url.clone(),
                    source,
                }
            })?;
            item.result.insert("json".to_string(), FieldValue::Json(value));
            return Ok(item);
        }

        let html = response.text();
        let document = if self.fields.iter().any(|(_, s)| s.is_structural()) {
            Html::parse_document(html)
        } else {
            Html::new_document()
        };

        for (name, selector) in &self.fields {
            match selector.extract_from(&document, html) {
                Some(value) => {
                    item.result.insert(name.clone(), value);
                }
                None => {
                    tracing::error!(
                        "selector \"{}: {}\" found nothing on {}, please check again",
                        name,
                        selector,
                        response.url
                    );
                }
            }
        }

        Ok(item)
    }
}
