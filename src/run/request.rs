use crate::extract::{parse_selector, ItemScope, SchemaRecipe};
use crate::url::parse_http_url;
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Kind of page the target URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeType {
    /// A listing with many items per page
    List,
    /// A single record per page
    Detail,
    /// Search results, extracted like a listing
    Search,
    /// An XML sitemap whose entries are detail pages
    Sitemap,
}

/// Explicit selectors that override auto-detection
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StrategySelectors {
    /// One element per item on list and search pages
    #[serde(default)]
    pub item: Option<String>,

    /// Link to the following page
    #[serde(default)]
    pub next_page: Option<String>,
}

/// How to walk the target
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScrapingStrategy {
    pub scrape_type: ScrapeType,

    #[serde(default)]
    pub pagination_enabled: bool,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default)]
    pub selectors: StrategySelectors,
}

fn default_max_pages() -> u32 {
    1
}

fn default_max_results() -> usize {
    100
}

impl ScrapingStrategy {
    pub fn new(scrape_type: ScrapeType) -> Self {
        Self {
            scrape_type,
            pagination_enabled: false,
            max_pages: default_max_pages(),
            max_results: default_max_results(),
            selectors: StrategySelectors::default(),
        }
    }

    /// Follows pagination for at most `max_pages` pages
    pub fn with_pagination(mut self, max_pages: u32) -> Self {
        self.pagination_enabled = true;
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_item_selector(mut self, selector: &str) -> Self {
        self.selectors.item = Some(selector.to_string());
        self
    }

    pub fn with_next_page_selector(mut self, selector: &str) -> Self {
        self.selectors.next_page = Some(selector.to_string());
        self
    }

    /// Which parts of a fetched page are items
    pub fn item_scope(&self) -> Result<ItemScope, ConfigError> {
        match self.scrape_type {
            ScrapeType::List | ScrapeType::Search => ItemScope::list(self.selectors.item.as_deref()),
            ScrapeType::Detail | ScrapeType::Sitemap => Ok(ItemScope::Document),
        }
    }
}

/// Everything one run needs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScrapeRequest {
    pub target_url: String,

    pub strategy: ScrapingStrategy,

    pub recipe: SchemaRecipe,

    /// Caller's cap on results, applied on top of the strategy's
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl ScrapeRequest {
    pub fn new(target_url: &str, strategy: ScrapingStrategy, recipe: SchemaRecipe) -> Self {
        Self {
            target_url: target_url.to_string(),
            strategy,
            recipe,
            max_results: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// The tighter of the request's and the strategy's result limits
    pub fn effective_max_results(&self) -> usize {
        self.max_results
            .map_or(self.strategy.max_results, |m| m.min(self.strategy.max_results))
    }

    /// Rejects a request that cannot run, before any network activity
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url(&self.target_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("target_url '{}': {}", self.target_url, e))
        })?;

        if self.strategy.max_pages < 1 {
            return Err(ConfigError::Validation(
                "max_pages must be >= 1".to_string(),
            ));
        }

        if self.effective_max_results() < 1 {
            return Err(ConfigError::Validation(
                "max_results must be >= 1".to_string(),
            ));
        }

        self.recipe.validate()?;
        self.strategy.item_scope()?;
        if let Some(next) = &self.strategy.selectors.next_page {
            parse_selector("next-page", next)?;
        }

        Ok(())
    }
}
