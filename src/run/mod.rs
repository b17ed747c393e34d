//! Scrape requests, the run orchestrator and run results

mod orchestrator;
mod request;
mod result;
mod retry;
mod sitemap;

pub use orchestrator::{RunOptions, RunOrchestrator};
pub use request::{ScrapeRequest, ScrapeType, ScrapingStrategy, StrategySelectors};
pub use result::{RunError, RunErrorKind, ScrapedItem, ScrapingResult};
pub use retry::{RetryState, RetryVerdict};
pub use sitemap::parse_sitemap;
