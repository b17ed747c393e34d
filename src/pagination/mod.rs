//! Pagination controller
//!
//! Decides, page by page, whether a run continues and where. Limits are
//! checked before any next-page detection, so `max_pages` and `max_results`
//! always win over a link that says there is more.
//!
//! Next-page sources, in order:
//!
//! 1. the strategy's explicit next-page selector
//! 2. `rel="next"` on an `<a>` or `<link>`
//! 3. a numeric increment of `page=N` or `/page/N`, accepted only when the
//!    page links to the incremented URL

use crate::extract::parse_selector;
use crate::url::{normalize_url, resolve_link};
use crate::ConfigError;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationState {
    /// Pagination disabled; terminal from the start
    NoPagination,
    /// Another page is known
    HasNext,
    /// No further page could be found
    Exhausted,
    /// `max_pages` or `max_results` reached
    LimitReached,
}

impl PaginationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::HasNext)
    }
}

pub struct PaginationController {
    enabled: bool,
    max_pages: u32,
    max_results: usize,
    next_selector: Option<Selector>,
    visited: HashSet<String>,
    pages_visited: u32,
    state: PaginationState,
}

impl PaginationController {
    pub fn new(
        enabled: bool,
        max_pages: u32,
        max_results: usize,
        next_selector: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let next_selector = next_selector
            .map(|s| parse_selector("next-page", s))
            .transpose()?;

        Ok(Self {
            enabled,
            max_pages,
            max_results,
            next_selector,
            visited: HashSet::new(),
            pages_visited: 0,
            state: if enabled {
                PaginationState::HasNext
            } else {
                PaginationState::NoPagination
            },
        })
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    /// Records that a fetch was attempted for `url`
    pub fn record_visit(&mut self, url: &Url) {
        self.pages_visited += 1;
        self.visited.insert(visit_key(url));
    }

    /// Chooses the next page after `current` was processed
    ///
    /// `results` is the number of items collected so far.
    pub fn advance(&mut self, document: &Html, current: &Url, results: usize) -> Option<Url> {
        if !self.may_continue(results) {
            return None;
        }

        let next = self
            .explicit_next(document, current)
            .or_else(|| rel_next(document, current))
            .or_else(|| confirmed_increment(document, current));

        self.accept(next)
    }

    /// Chooses the next page after `current` could not be processed
    ///
    /// There is no document to read links from, so only an unconfirmed numeric
    /// increment is tried.
    pub fn advance_after_failure(&mut self, current: &Url, results: usize) -> Option<Url> {
        if !self.may_continue(results) {
            return None;
        }
        self.accept(increment_page(current))
    }

    /// Ends pagination early, e.g. when the next page is disallowed
    pub fn truncate(&mut self) {
        if self.state == PaginationState::HasNext {
            self.state = PaginationState::Exhausted;
        }
    }

    /// Moves to `LimitReached` when a limit is met
    ///
    /// `results` is the number of items emitted so far (`items.len()`), which
    /// includes rejected items kept when filtering is off. It is not
    /// `total_scraped`.
    pub fn check_limits(&mut self, results: usize) -> PaginationState {
        if self.state == PaginationState::HasNext
            && (self.pages_visited >= self.max_pages || results >= self.max_results)
        {
            tracing::debug!(
                "Pagination limit reached after {} pages and {} results",
                self.pages_visited,
                results
            );
            self.state = PaginationState::LimitReached;
        }
        self.state
    }

    fn may_continue(&mut self, results: usize) -> bool {
        self.check_limits(results) == PaginationState::HasNext
    }

    fn accept(&mut self, next: Option<Url>) -> Option<Url> {
        match next {
            Some(url) if !self.visited.contains(&visit_key(&url)) => Some(url),
            Some(url) => {
                tracing::debug!("Next page {} already visited", url);
                self.state = PaginationState::Exhausted;
                None
            }
            None => {
                self.state = PaginationState::Exhausted;
                None
            }
        }
    }

    fn explicit_next(&self, document: &Html, current: &Url) -> Option<Url> {
        let selector = self.next_selector.as_ref()?;
        document
            .select(selector)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| resolve_link(href, current))
    }
}

fn visit_key(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn rel_next(document: &Html, current: &Url) -> Option<Url> {
    let selector = Selector::parse(r#"a[rel~="next"][href], link[rel~="next"][href]"#).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| resolve_link(href, current))
}

/// Accepts an incremented URL only if the page links to it
fn confirmed_increment(document: &Html, current: &Url) -> Option<Url> {
    let candidates: Vec<Url> = match increment_page(current) {
        Some(next) => vec![next],
        // Page one often carries no number at all
        None => second_page_candidates(current),
    };
    if candidates.is_empty() {
        return None;
    }

    let selector = Selector::parse("a[href]").ok()?;
    let linked: HashSet<String> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_link(href, current))
        .map(|u| visit_key(&u))
        .collect();

    candidates
        .into_iter()
        .find(|candidate| linked.contains(&visit_key(candidate)))
}

/// Increments an explicit page number in the query or path
fn increment_page(url: &Url) -> Option<Url> {
    let page = url
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<u32>().ok());

    if let Some(page) = page {
        let next_page = page.checked_add(1)?.to_string();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if k == "page" {
                    (k.into_owned(), next_page.clone())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        let mut next = url.clone();
        next.query_pairs_mut().clear().extend_pairs(pairs);
        return Some(next);
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let position = segments
        .windows(2)
        .position(|w| w[0] == "page" && w[1].parse::<u32>().is_ok())?;
    let page: u32 = segments[position + 1].parse().ok()?;

    let mut new_segments: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
    new_segments[position + 1] = page.checked_add(1)?.to_string();

    let mut next = url.clone();
    next.set_path(&format!("/{}", new_segments.join("/")));
    Some(next)
}

fn second_page_candidates(url: &Url) -> Vec<Url> {
    let mut by_query = url.clone();
    by_query.query_pairs_mut().append_pair("page", "2");

    let mut by_path = url.clone();
    let base = url.path().trim_end_matches('/');
    by_path.set_path(&format!("{}/page/2", base));

    vec![by_query, by_path]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn doc(body: &str) -> Html {
        Html::parse_document(body)
    }

    #[test]
    fn test_disabled_is_terminal_from_start() {
        let mut controller = PaginationController::new(false, 10, 100, None).unwrap();
        assert_eq!(controller.state(), PaginationState::NoPagination);

        let page = url("https://shop.test/list");
        controller.record_visit(&page);
        let next = controller.advance(&doc(r#"<a rel="next" href="/list?page=2">n</a>"#), &page, 0);
        assert_eq!(next, None);
        assert_eq!(controller.state(), PaginationState::NoPagination);
    }

    #[test]
    fn test_explicit_selector_wins() {
        let mut controller = PaginationController::new(true, 10, 100, Some("a.forward")).unwrap();
        let page = url("https://shop.test/list");
        controller.record_visit(&page);

        let html = doc(r#"<a rel="next" href="/rel">r</a><a class="forward" href="/explicit">f</a>"#);
        let next = controller.advance(&html, &page, 0);
        assert_eq!(next, Some(url("https://shop.test/explicit")));
        assert_eq!(controller.state(), PaginationState::HasNext);
    }

    #[test]
    fn test_rel_next_link_element() {
        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        let page = url("https://shop.test/list");
        controller.record_visit(&page);

        let html = doc(r#"<html><head><link rel="next" href="/list?page=2"></head><body></body></html>"#);
        assert_eq!(
            controller.advance(&html, &page, 0),
            Some(url("https://shop.test/list?page=2"))
        );
    }

    #[test]
    fn test_numeric_increment_requires_link() {
        let page = url("https://shop.test/list?page=3&sort=asc");

        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        controller.record_visit(&page);
        let html = doc(r#"<a href="/list?sort=asc&page=4">4</a>"#);
        assert_eq!(
            controller.advance(&html, &page, 0),
            Some(url("https://shop.test/list?page=4&sort=asc"))
        );

        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        controller.record_visit(&page);
        assert_eq!(controller.advance(&doc("<p>no links</p>"), &page, 0), None);
        assert_eq!(controller.state(), PaginationState::Exhausted);
    }

    #[test]
    fn test_path_increment_from_first_page() {
        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        let page = url("https://blog.test/posts/");
        controller.record_visit(&page);

        let html = doc(r#"<a href="/posts/page/2/">Older</a>"#);
        assert_eq!(
            controller.advance(&html, &page, 0),
            Some(url("https://blog.test/posts/page/2"))
        );
    }

    #[test]
    fn test_visited_page_is_not_revisited() {
        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        let first = url("https://shop.test/list?page=1");
        let second = url("https://shop.test/list?page=2");

        controller.record_visit(&first);
        let next = controller.advance(&doc(r#"<a rel="next" href="?page=2">n</a>"#), &first, 0);
        assert_eq!(next, Some(second.clone()));

        controller.record_visit(&second);
        // A "next" link pointing back to page one
        let next = controller.advance(&doc(r#"<a rel="next" href="?page=1#top">n</a>"#), &second, 0);
        assert_eq!(next, None);
        assert_eq!(controller.state(), PaginationState::Exhausted);
    }

    #[test]
    fn test_max_pages_limit_wins() {
        let mut controller = PaginationController::new(true, 3, 100, None).unwrap();
        let mut current = url("https://shop.test/list?page=1");
        let mut fetched = Vec::new();

        loop {
            controller.record_visit(&current);
            fetched.push(current.clone());
            let page: u32 = current
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap();
            let html = doc(&format!(r#"<a rel="next" href="?page={}">next</a>"#, page + 1));
            match controller.advance(&html, &current, 0) {
                Some(next) => current = next,
                None => break,
            }
        }

        assert_eq!(fetched.len(), 3);
        assert_eq!(controller.pages_visited(), 3);
        assert_eq!(controller.state(), PaginationState::LimitReached);
    }

    #[test]
    fn test_max_results_limit_wins() {
        let mut controller = PaginationController::new(true, 10, 5, None).unwrap();
        let page = url("https://shop.test/list");
        controller.record_visit(&page);

        let html = doc(r#"<a rel="next" href="/list?page=2">n</a>"#);
        assert_eq!(controller.advance(&html, &page, 5), None);
        assert_eq!(controller.state(), PaginationState::LimitReached);
    }

    #[test]
    fn test_advance_after_failure() {
        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        let page = url("https://shop.test/list/page/4");
        controller.record_visit(&page);
        assert_eq!(
            controller.advance_after_failure(&page, 0),
            Some(url("https://shop.test/list/page/5"))
        );

        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        let page = url("https://shop.test/list");
        controller.record_visit(&page);
        assert_eq!(controller.advance_after_failure(&page, 0), None);
        assert_eq!(controller.state(), PaginationState::Exhausted);
    }

    #[test]
    fn test_increment_at_page_number_ceiling() {
        for last in [
            "https://shop.test/list?page=4294967295",
            "https://shop.test/list/page/4294967295",
        ] {
            let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
            let page = url(last);
            controller.record_visit(&page);
            assert_eq!(controller.advance_after_failure(&page, 0), None);
            assert_eq!(controller.state(), PaginationState::Exhausted);
        }
    }

    #[test]
    fn test_truncate() {
        let mut controller = PaginationController::new(true, 10, 100, None).unwrap();
        controller.truncate();
        assert_eq!(controller.state(), PaginationState::Exhausted);
    }
}
