//! Sumi-Sift: a polite, schema-driven web extractor
//!
//! This crate fetches pages while respecting robots.txt and adaptive per-origin
//! pacing, extracts typed fields according to a declarative schema recipe,
//! scores every extracted item for quality, and follows pagination until a
//! limit is reached.

pub mod config;
pub mod extract;
pub mod fetcher;
pub mod limiter;
pub mod pagination;
pub mod quality;
pub mod robots;
pub mod run;
pub mod url;

#[cfg(test)]
mod testutil;

use thiserror::Error;

/// Main error type for Sumi-Sift operations
///
/// Only configuration problems and a robots.txt denial of the seed URL abort a
/// run. Everything else degrades into `ScrapingResult::errors`.
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for '{field}': {selector}")]
    InvalidSelector { field: String, selector: String },

    #[error("Invalid validation pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// robots.txt could not be retrieved
///
/// Never aborts a run: the guard logs it and falls back to allowing the origin
/// with the default crawl delay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComplianceError {
    #[error("robots.txt for {origin} unreachable: {message}")]
    Unreachable { origin: String, message: String },

    #[error("robots.txt for {origin} returned HTTP {status}")]
    ServerError { origin: String, status: u16 },
}

/// Page-local document failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("Document body is empty")]
    EmptyBody,
}

/// Result type alias for Sumi-Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::EngineConfig;
pub use extract::{ExtractionOutcome, FieldSpec, FieldState, FieldType, FieldValue, SchemaRecipe};
pub use fetcher::{FetchError, FetchResult, Fetcher, HttpFetcher};
pub use quality::{QualityReport, QualityScorer, StateScores};
pub use robots::{ComplianceDecision, ComplianceGuard};
pub use run::{
    RunError, RunErrorKind, RunOptions, RunOrchestrator, ScrapeRequest, ScrapeType, ScrapingResult,
    ScrapingStrategy,
};
