//! Configuration module for Sumi-Sift
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files: the engine configuration (user agent, politeness, retry and quality
//! policy) and scrape job files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sift.toml")).unwrap();
//! println!("Backoff factor: {}", config.rate_limit.backoff_factor);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ComplianceConfig, EngineConfig, QualityConfig, RateLimitConfig, RunConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_request};
