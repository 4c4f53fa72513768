//! Selectors pull a single field's value out of raw markup
//!
//! Two kinds are supported:
//! - **Css**: a structural query evaluated with `scraper`. Without an attribute
//!   name it yields the whitespace-collapsed text of every match; with one it
//!   yields the attribute values across all matches.
//! - **Regex**: every match of a pattern (the first capture group when the
//!   pattern has one).
//!
//! A selector that finds nothing structurally present returns `None`, which is
//! distinct from an empty string or an empty list.

use super::FieldValue;
use crate::ItemError;
use regex::Regex;
use scraper::Html;
use std::fmt;

/// A compiled field extractor
#[derive(Clone)]
pub enum Selector {
    /// Structural query over parsed markup
    Css {
        query: String,
        attr: Option<String>,
        compiled: scraper::Selector,
    },

    /// Pattern query over the raw text
    Regex(Regex),
}

impl Selector {
    /// Creates a CSS selector yielding the text of all matched elements
    ///
    /// # Example
    ///
    /// ```
    /// use seen::item::{FieldValue, Selector};
    ///
    /// let title = Selector::css("title").unwrap();
    /// let value = title.extract("<title> Test </title>");
    /// assert_eq!(value, Some(FieldValue::Text("Test".to_string())));
    /// ```
    pub fn css(query: &str) -> Result<Self, ItemError> {
        Ok(Self::Css {
            query: query.to_string(),
            attr: None,
            compiled: compile_css(query)?,
        })
    }

    /// Creates a CSS selector yielding an attribute of every matched element
    pub fn css_attr(query: &str, attr: &str) -> Result<Self, ItemError> {
        Ok(Self::Css {
            query: query.to_string(),
            attr: Some(attr.to_string()),
            compiled: compile_css(query)?,
        })
    }

    /// Creates a pattern selector yielding every match
    pub fn regex(pattern: &str) -> Result<Self, ItemError> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    /// Returns true when this selector needs parsed markup
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Css { .. })
    }

    /// Extracts a value from raw markup
    pub fn extract(&self, html: &str) -> Option<FieldValue> {
        match self {
            Self::Css { .. } => self.extract_from(&Html::parse_document(html), html),
            Self::Regex(_) => self.extract_from(&Html::new_document(), html),
        }
    }

    /// Extracts a value using an already parsed document
    ///
    /// `raw` must be the markup `document` was parsed from; pattern selectors
    /// run against it directly.
    pub fn extract_from(&self, document: &Html, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Css {
                attr: None,
                compiled,
                ..
            } => {
                let mut matched = false;
                let mut words = Vec::new();
                for element in document.select(compiled) {
                    matched = true;
                    for chunk in element.text() {
                        words.extend(chunk.split_whitespace());
                    }
                }
                matched.then(|| FieldValue::Text(words.join(" ")))
            }

            Self::Css {
                attr: Some(attr),
                compiled,
                ..
            } => {
                let mut matched = false;
                let mut values = Vec::new();
                for element in document.select(compiled) {
                    matched = true;
                    if let Some(value) = element.value().attr(attr) {
                        values.push(value.to_string());
                    }
                }
                matched.then_some(FieldValue::List(values))
            }

            Self::Regex(pattern) => {
                let group = usize::from(pattern.captures_len() > 1);
                let values = pattern
                    .captures_iter(raw)
                    .filter_map(|caps| caps.get(group))
                    .map(|m| m.as_str().to_string())
                    .collect();
                Some(FieldValue::List(values))
            }
        }
    }
}

fn compile_css(query: &str) -> Result<scraper::Selector, ItemError> {
    scraper::Selector::parse(query).map_err(|e| ItemError::InvalidSelector {
        query: query.to_string(),
        message: format!("{:?}", e),
    })
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css {
                query,
                attr: Some(attr),
                ..
            } => write!(f, "<selector: Css rule: {} attr: {}>", query, attr),
            Self::Css { query, .. } => write!(f, "<selector: Css rule: {}>", query),
            Self::Regex(pattern) => write!(f, "<selector: Regex rule: {}>", pattern.as_str()),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
