use crate::extract::coerce::{coerce, post_process};
use crate::extract::schema::{parse_selector, FieldSpec, FieldType, SchemaRecipe};
use crate::extract::{ExtractionOutcome, FieldOutcome, FieldState, FieldValue};
use crate::{ConfigError, ExtractionError};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Conventional item containers tried, in order, when a list page has no
/// explicit item selector
const ITEM_CANDIDATES: &[&str] = &[
    "article",
    "li.item",
    ".item",
    ".product",
    ".card",
    ".result",
    ".listing",
    "tr",
];

/// Which parts of a document are items
#[derive(Debug, Clone)]
pub enum ItemScope {
    /// The whole document is one item (detail pages)
    Document,
    /// Every element matching the selector is an item; `None` auto-detects
    Items(Option<Selector>),
}

impl ItemScope {
    /// Scope for list-style pages, with an optional explicit item selector
    pub fn list(item_selector: Option<&str>) -> Result<Self, ConfigError> {
        item_selector
            .map(|s| parse_selector("item", s))
            .transpose()
            .map(Self::Items)
    }
}

/// `charset=` in a Content-Type value or a `<meta>` tag
static CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).expect("Invalid regex")
});

/// How far into the body a `<meta charset>` declaration is looked for
const META_SNIFF_BYTES: usize = 1024;

fn declared_charset(text: &str) -> Option<&'static Encoding> {
    let label = CHARSET_RE.captures(text)?.get(1)?;
    Encoding::for_label(label.as_str().as_bytes())
}

fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    let start = head.to_ascii_lowercase().find("<meta")?;
    declared_charset(&head[start..])
}

/// Decodes a response body to text
///
/// The encoding comes from a byte order mark, then the Content-Type charset,
/// then a `<meta>` declaration. Undeclared bodies are UTF-8 when they are
/// valid UTF-8 and windows-1252 otherwise. Undecodable bytes become U+FFFD.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(body)
        .map(|(encoding, _)| encoding)
        .or_else(|| content_type.and_then(declared_charset))
        .or_else(|| meta_charset(body))
        .unwrap_or_else(|| match std::str::from_utf8(body) {
            Ok(_) => UTF_8,
            Err(_) => WINDOWS_1252,
        });
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// Parses a response body as HTML
///
/// Fails only when the body is empty; any structure that parses as HTML is
/// accepted.
pub fn parse_document(body: &[u8], content_type: Option<&str>) -> Result<Html, ExtractionError> {
    let text = decode_body(body, content_type);
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyBody);
    }
    Ok(Html::parse_document(&text))
}

struct CompiledField {
    spec: FieldSpec,
    selectors: Vec<Selector>,
    pattern: Option<Regex>,
}

/// A recipe with its selectors and patterns compiled once per run
pub struct SchemaExtractor {
    fields: Vec<CompiledField>,
}

impl SchemaExtractor {
    pub fn new(recipe: &SchemaRecipe) -> Result<Self, ConfigError> {
        let fields = recipe
            .fields
            .iter()
            .map(|spec| {
                let selectors = spec
                    .selectors()
                    .map(|s| parse_selector(&spec.name, s))
                    .collect::<Result<Vec<_>, _>>()?;
                let pattern = spec
                    .validation_pattern
                    .as_deref()
                    .map(|p| {
                        Regex::new(p).map_err(|e| ConfigError::InvalidPattern(e.to_string()))
                    })
                    .transpose()?;
                Ok(CompiledField {
                    spec: spec.clone(),
                    selectors,
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { fields })
    }

    /// Parses `body` and extracts one outcome set per item
    pub fn extract(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        base_url: &Url,
        scope: &ItemScope,
    ) -> Result<Vec<ExtractionOutcome>, ExtractionError> {
        let document = parse_document(body, content_type)?;
        Ok(self.extract_document(&document, base_url, scope))
    }

    /// Extracts from an already parsed document
    pub fn extract_document(
        &self,
        document: &Html,
        base_url: &Url,
        scope: &ItemScope,
    ) -> Vec<ExtractionOutcome> {
        let root = document.root_element();

        match scope {
            ItemScope::Document => vec![self.extract_item(root, base_url)],
            ItemScope::Items(Some(selector)) => document
                .select(selector)
                .map(|item| self.extract_item(item, base_url))
                .collect(),
            ItemScope::Items(None) => match self.detect_items(document) {
                Some(items) => items
                    .into_iter()
                    .map(|item| self.extract_item(item, base_url))
                    .collect(),
                None => vec![self.extract_item(root, base_url)],
            },
        }
    }

    /// Picks the first conventional container with at least two matches in
    /// which some field selector matches
    fn detect_items<'a>(&self, document: &'a Html) -> Option<Vec<ElementRef<'a>>> {
        for candidate in ITEM_CANDIDATES {
            let Ok(selector) = Selector::parse(candidate) else {
                continue;
            };

            let items: Vec<ElementRef<'a>> = document.select(&selector).collect();
            if items.len() < 2 {
                continue;
            }

            let has_fields = items.iter().any(|item| {
                self.fields
                    .iter()
                    .any(|f| f.selectors.iter().any(|s| item.select(s).next().is_some()))
            });

            if has_fields {
                tracing::debug!("Detected {} items with '{}'", items.len(), candidate);
                return Some(items);
            }
        }
        None
    }

    fn extract_item(&self, root: ElementRef<'_>, base_url: &Url) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::new();
        for field in &self.fields {
            outcome.push(&field.spec.name, extract_field(field, root, base_url));
        }
        outcome
    }
}

fn extract_field(field: &CompiledField, root: ElementRef<'_>, base_url: &Url) -> FieldOutcome {
    let raw = field
        .selectors
        .iter()
        .find_map(|selector| root.select(selector).find_map(|el| read_element(el, &field.spec)));

    let processed = raw
        .map(|r| post_process(&r, &field.spec.post_processing))
        .filter(|p| !p.trim().is_empty());

    let Some(text) = processed else {
        return missing(&field.spec, base_url);
    };

    if let Some(pattern) = &field.pattern {
        if !pattern.is_match(&text) {
            return FieldOutcome {
                value: Some(FieldValue::Raw(text)),
                state: FieldState::Malformed,
            };
        }
    }

    match coerce(&text, field.spec.field_type, base_url) {
        Some(value) => FieldOutcome {
            value: Some(value),
            state: FieldState::Found,
        },
        None => FieldOutcome {
            value: Some(FieldValue::Raw(text)),
            state: FieldState::Malformed,
        },
    }
}

fn missing(spec: &FieldSpec, base_url: &Url) -> FieldOutcome {
    let value = spec.default.as_deref().map(|default| {
        coerce(default, spec.field_type, base_url)
            .unwrap_or_else(|| FieldValue::Raw(default.to_string()))
    });

    FieldOutcome {
        value,
        state: FieldState::Missing,
    }
}

/// Reads the content of a matched element, or `None` when the element does
/// not carry what the field needs
fn read_element(element: ElementRef<'_>, spec: &FieldSpec) -> Option<String> {
    if let Some(attribute) = &spec.attribute {
        return element.value().attr(attribute).map(str::to_string);
    }

    match spec.field_type {
        FieldType::Html => Some(element.inner_html()),
        FieldType::Url => element
            .value()
            .attr("href")
            .or_else(|| element.value().attr("src"))
            .map(str::to_string)
            .or_else(|| Some(element_text(element))),
        _ => Some(element_text(element)),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
