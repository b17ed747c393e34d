use crate::quality::StateScores;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declarative description of the records to extract
///
/// Fields are evaluated, reported and serialized in declaration order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaRecipe {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Per-state field scores used by the quality scorer
    #[serde(default)]
    pub scoring: StateScores,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Target type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Url,
    Date,
    Html,
}

/// String transformation applied to matched content before coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostProcess {
    /// Strip leading and trailing whitespace
    Trim,
    /// Collapse runs of whitespace into one space
    Clean,
    /// Drop control characters, then collapse whitespace
    Normalize,
    Lowercase,
    Uppercase,
}

/// How to extract and type one field
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldSpec {
    pub name: String,

    /// CSS selector evaluated within the item (or the whole page)
    pub selector: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// A missing required field rejects the item regardless of its score
    #[serde(default)]
    pub required: bool,

    /// Contribution to the item score, in [0, 1]
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Value used when nothing matches
    #[serde(default)]
    pub default: Option<String>,

    /// Read this attribute instead of the element's text
    #[serde(default)]
    pub attribute: Option<String>,

    /// Tried in order when `selector` matches nothing
    #[serde(default)]
    pub fallback_selectors: Vec<String>,

    #[serde(default)]
    pub post_processing: Vec<PostProcess>,

    /// Regex the processed text must match for the value to count as found
    #[serde(default)]
    pub validation_pattern: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

impl FieldSpec {
    pub fn new(name: &str, selector: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            field_type,
            required: false,
            weight: default_weight(),
            default: None,
            attribute: None,
            fallback_selectors: Vec::new(),
            post_processing: Vec::new(),
            validation_pattern: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn with_fallback(mut self, selector: &str) -> Self {
        self.fallback_selectors.push(selector.to_string());
        self
    }

    pub fn with_post_processing(mut self, step: PostProcess) -> Self {
        self.post_processing.push(step);
        self
    }

    pub fn with_validation_pattern(mut self, pattern: &str) -> Self {
        self.validation_pattern = Some(pattern.to_string());
        self
    }

    /// Primary selector followed by fallbacks
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.selector.as_str()).chain(self.fallback_selectors.iter().map(String::as_str))
    }
}

/// Metadata keys serialized alongside field values on every scraped item
pub const RESERVED_FIELD_NAMES: &[&str] =
    &["quality_score", "accepted", "source_url", "scraped_at", "issues"];

impl SchemaRecipe {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            version: default_version(),
            fields,
            scoring: StateScores::default(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Checks the recipe before any network activity
    ///
    /// Rejects an empty field list, duplicate, blank or reserved names, weights outside
    /// [0, 1], selectors that do not parse, and validation patterns that do
    /// not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::Validation(format!(
                "schema recipe '{}' has no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "field name cannot be empty".to_string(),
                ));
            }

            if RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "field name '{}' is reserved for item metadata",
                    field.name
                )));
            }

            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }

            if !field.weight.is_finite() || !(0.0..=1.0).contains(&field.weight) {
                return Err(ConfigError::Validation(format!(
                    "weight for '{}' must be between 0.0 and 1.0, got {}",
                    field.name, field.weight
                )));
            }

            for selector in field.selectors() {
                parse_selector(&field.name, selector)?;
            }

            if let Some(pattern) = &field.validation_pattern {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::InvalidPattern(format!("{} ({}): {}", field.name, pattern, e))
                })?;
            }
        }

        self.scoring.validate()?;

        Ok(())
    }
}

/// Parses a CSS selector, naming the owning field on failure
pub(crate) fn parse_selector(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}
