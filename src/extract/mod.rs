//! Schema-driven field extraction
//!
//! A [`SchemaRecipe`] names the fields to pull out of a page, the selector for
//! each, and the type to coerce the matched content to. [`SchemaExtractor`]
//! evaluates a recipe against a document and reports, per item and per field,
//! whether the value was found, missing or malformed. Missing and malformed
//! fields are data-quality signals for the scorer; only a document that
//! cannot be read at all is an error.

mod coerce;
mod extractor;
mod schema;

pub use coerce::{parse_date, parse_number, post_process};
pub use extractor::{decode_body, parse_document, ItemScope, SchemaExtractor};
pub use schema::{FieldSpec, FieldType, PostProcess, SchemaRecipe, RESERVED_FIELD_NAMES};

pub(crate) use schema::parse_selector;

use chrono::NaiveDate;
use serde::Serialize;

/// A coerced field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Absolute URL
    Url(String),
    Date(NaiveDate),
    Html(String),
    /// Processed text that could not be coerced to the field's type
    Raw(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Url(s) | Self::Html(s) | Self::Raw(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// How a field's extraction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldState {
    Found,
    Missing,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    /// Coerced value, the raw text when malformed, or the default when missing
    pub value: Option<FieldValue>,
    pub state: FieldState,
}

/// Field outcomes for one extracted item, in recipe order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    fields: Vec<(String, FieldOutcome)>,
}

impl ExtractionOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, outcome: FieldOutcome) {
        self.fields.push((name.to_string(), outcome));
    }

    pub fn get(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn state(&self, name: &str) -> Option<FieldState> {
        self.get(name).map(|o| o.state)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).and_then(|o| o.value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOutcome)> {
        self.fields.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when no field produced anything, not even a default
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, o)| o.value.is_none())
    }
}
