//! Minimal XML sitemap reading: `<loc>` entries only

use crate::url::{normalize_url, parse_http_url};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Page URLs listed in a sitemap, deduplicated, in document order
///
/// Entries that are not absolute HTTP(S) URLs are skipped.
pub fn parse_sitemap(xml: &str) -> Vec<Url> {
    let Ok(loc) = Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    loc.captures_iter(xml)
        .filter_map(|captures| captures.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .filter_map(|raw| parse_http_url(&raw).ok())
        .filter(|url| {
            let key = normalize_url(url.as_str())
                .map(|u| u.to_string())
                .unwrap_or_else(|_| url.to_string());
            seen.insert(key)
        })
        .collect()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
