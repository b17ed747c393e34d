//! URL handling module for Sumi-Sift
//!
//! This module provides origin extraction (the scope for robots.txt and rate
//! limiting), link resolution, and the normalization used to recognise pages
//! that were already visited.

mod normalize;
mod origin;

pub use normalize::{normalize_url, resolve_link};
pub use origin::{origin_of, parse_http_url, robots_url};
