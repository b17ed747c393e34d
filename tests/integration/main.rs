//! Integration tests for the extraction engine
//!
//! These tests use wiremock to create mock HTTP servers and drive full runs
//! through the reqwest fetcher, end to end.

mod common;
mod compliance_tests;
mod config_tests;
mod pagination_tests;
mod quality_tests;
mod retry_tests;
