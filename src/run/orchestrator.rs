//! Run orchestrator: the loop tying compliance, pacing, fetching, extraction,
//! scoring and pagination together
//!
//! A run only fails outright for an invalid request or when robots.txt
//! disallows the target URL. Every other failure is recorded in
//! [`ScrapingResult::errors`] and the run carries on with what it has.

use crate::config::EngineConfig;
use crate::extract::{parse_document, ExtractionOutcome, ItemScope, SchemaExtractor};
use crate::fetcher::{FetchResult, Fetcher, HttpFetcher, ResponseClass};
use crate::limiter::{RateLimiter, RequestOutcome};
use crate::pagination::{PaginationController, PaginationState};
use crate::quality::{item_issues, QualityScorer};
use crate::robots::{ComplianceDecision, ComplianceGuard};
use crate::run::result::{RunError, RunErrorKind, ScrapedItem, ScrapingResult};
use crate::run::retry::{RetryState, RetryVerdict};
use crate::run::sitemap::parse_sitemap;
use crate::run::{ScrapeRequest, ScrapeType};
use crate::url::{origin_of, parse_http_url};
use crate::{ComplianceError, Result, SiftError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Per-run controls supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Cancelling this token stops the run and returns a partial result
    pub cancel: CancellationToken,

    /// Stops the run after this long, like an external cancellation
    pub deadline: Option<Duration>,
}

impl RunOptions {
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum StopReason {
    Cancelled,
    Deadline,
}

/// Everything derived from the request that stays fixed for a run
struct RunPlan<'a> {
    request: &'a ScrapeRequest,
    extractor: SchemaExtractor,
    scope: ItemScope,
    max_results: usize,
    /// Cancelled when the run must stop starting new work
    stop: CancellationToken,
}

/// Mutable bookkeeping for one run
struct Accumulator {
    items: Vec<ScrapedItem>,
    rejected: Vec<ScrapedItem>,
    errors: Vec<RunError>,
    total_found: usize,
    total_scraped: usize,
    pagination: PaginationController,
    sitemap_state: Option<PaginationState>,
    degraded_origins: HashSet<String>,
}

impl Accumulator {
    fn new(pagination: PaginationController) -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
            errors: Vec::new(),
            total_found: 0,
            total_scraped: 0,
            pagination,
            sitemap_state: None,
            degraded_origins: HashSet::new(),
        }
    }

    /// Records a robots.txt degradation once per origin
    fn note_degraded(&mut self, url: &Url, degraded: Option<&ComplianceError>) {
        let Some(error) = degraded else {
            return;
        };
        let origin = origin_of(url).unwrap_or_else(|_| url.to_string());
        if self.degraded_origins.insert(origin) {
            self.errors.push(RunError::new(
                url.as_str(),
                RunErrorKind::ComplianceDegraded,
                error.to_string(),
            ));
        }
    }

    fn finish(self, execution_time: Duration) -> ScrapingResult {
        let overall_quality_score = if self.items.is_empty() {
            0.0
        } else {
            self.items.iter().map(|i| i.quality.score).sum::<f64>() / self.items.len() as f64
        };

        ScrapingResult {
            total_found: self.total_found,
            total_scraped: self.total_scraped,
            overall_quality_score,
            execution_time,
            pages_visited: self.pagination.pages_visited(),
            pagination_state: self.sitemap_state.unwrap_or(self.pagination.state()),
            items: self.items,
            rejected: self.rejected,
            errors: self.errors,
        }
    }
}

enum PageFetch {
    Fetched(FetchResult),
    Failed(RunError),
    /// The run stopped while waiting for a slot
    Stopped,
}

enum DetailOutcome {
    Denied(RunError),
    Extracted(Vec<ExtractionOutcome>),
    Failed(RunError),
    Stopped,
}

struct DetailVisit {
    url: Url,
    degraded: Option<ComplianceError>,
    outcome: DetailOutcome,
}

/// Drives scraping runs
///
/// One orchestrator can serve many runs; robots.txt policies and per-origin
/// pacing state are shared between them for the orchestrator's lifetime.
pub struct RunOrchestrator {
    config: EngineConfig,
    fetcher: Arc<dyn Fetcher>,
    guard: ComplianceGuard,
    limiter: RateLimiter,
    scorer: QualityScorer,
}

impl RunOrchestrator {
    pub fn new(config: EngineConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let guard = ComplianceGuard::new(
            fetcher.clone(),
            config.compliance.clone(),
            &config.user_agent.crawler_name,
        );
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let scorer = QualityScorer::new(config.quality.min_quality_score);

        Self {
            config,
            fetcher,
            guard,
            limiter,
            scorer,
        }
    }

    /// Creates an orchestrator backed by the reqwest fetcher
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(&config.user_agent, config.run.request_timeout())?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn guard(&self) -> &ComplianceGuard {
        &self.guard
    }

    /// Runs one scrape request to completion, cancellation or deadline
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapingResult)` - Always, unless the request is invalid or the
    ///   target URL is disallowed; partial failures are listed in `errors`
    /// * `Err(SiftError::Config)` - The request failed validation
    /// * `Err(SiftError::RobotsDenied)` - robots.txt disallows the target URL
    pub async fn run(&self, request: &ScrapeRequest, options: RunOptions) -> Result<ScrapingResult> {
        request.validate()?;
        let seed = parse_http_url(&request.target_url)?;
        let started = Instant::now();
        let deadline = options.deadline.map(|d| started + d);

        let plan = RunPlan {
            request,
            extractor: SchemaExtractor::new(&request.recipe)?,
            scope: request.strategy.item_scope()?,
            max_results: request.effective_max_results(),
            stop: options.cancel.child_token(),
        };
        let pagination = PaginationController::new(
            request.strategy.pagination_enabled && request.strategy.scrape_type != ScrapeType::Sitemap,
            request.strategy.max_pages,
            plan.max_results,
            request.strategy.selectors.next_page.as_deref(),
        )?;

        tracing::info!(
            "Starting {:?} run for {} with recipe '{}' ({} fields)",
            request.strategy.scrape_type,
            seed,
            request.recipe.name,
            request.recipe.fields.len()
        );

        let mut acc = Accumulator::new(pagination);

        let checked = tokio::select! {
            biased;
            reason = stop_signal(&options.cancel, deadline) => Err(reason),
            decision = self.guard.decide(&seed) => Ok(decision?),
        };

        let interrupted = match checked {
            // Stopped before the target was even checked
            Err(reason) => Some((reason, true)),
            Ok(decision) => {
                if !decision.allowed {
                    tracing::warn!("Target {} is disallowed by robots.txt, aborting run", seed);
                    return Err(SiftError::RobotsDenied {
                        url: seed.to_string(),
                    });
                }
                self.limiter
                    .set_crawl_delay(&origin_of(&seed)?, decision.crawl_delay);
                acc.note_degraded(&seed, decision.degraded.as_ref());

                let work = self.drive(&plan, &mut acc, seed);
                tokio::pin!(work);

                tokio::select! {
                    _ = &mut work => None,
                    reason = stop_signal(&options.cancel, deadline) => {
                        plan.stop.cancel();
                        let grace = self.config.run.cancel_grace();
                        let drained = tokio::time::timeout(grace, &mut work).await.is_ok();
                        Some((reason, drained))
                    }
                }
            }
        };

        if let Some((reason, drained)) = interrupted {
            let mut message = match reason {
                StopReason::Cancelled => "run cancelled".to_string(),
                StopReason::Deadline => "run deadline reached".to_string(),
            };
            if !drained {
                message.push_str(&format!(
                    "; in-flight work abandoned after {:?}",
                    self.config.run.cancel_grace()
                ));
            }
            tracing::warn!("{}", message);
            acc.errors.push(RunError::new(
                request.target_url.as_str(),
                RunErrorKind::Cancelled,
                message,
            ));
        }

        let result = acc.finish(started.elapsed());
        tracing::info!("{}", result.summary());
        Ok(result)
    }

    async fn drive(&self, plan: &RunPlan<'_>, acc: &mut Accumulator, seed: Url) {
        match plan.request.strategy.scrape_type {
            ScrapeType::Sitemap => self.crawl_sitemap(plan, acc, seed).await,
            ScrapeType::List | ScrapeType::Detail | ScrapeType::Search => {
                self.crawl_pages(plan, acc, seed).await
            }
        }
    }

    /// Follows pagination from the seed, one page at a time
    async fn crawl_pages(&self, plan: &RunPlan<'_>, acc: &mut Accumulator, seed: Url) {
        let mut next = Some(seed);
        let mut is_seed = true;

        while let Some(url) = next.take() {
            if plan.stop.is_cancelled() {
                break;
            }

            // The seed was admitted before the loop
            if !is_seed {
                match self.admit(&url).await {
                    Ok(decision) => acc.note_degraded(&url, decision.degraded.as_ref()),
                    Err(error) => {
                        tracing::info!("Stopping pagination at {}: {}", url, error.message);
                        acc.errors.push(error);
                        acc.pagination.truncate();
                        break;
                    }
                }
            }
            is_seed = false;

            acc.pagination.record_visit(&url);
            tracing::debug!("Fetching page {}: {}", acc.pagination.pages_visited(), url);

            next = match self.fetch_page(plan, &url).await {
                PageFetch::Fetched(result) => match self.process_page(plan, acc, &url, &result) {
                    Ok(next) => next,
                    Err(error) => {
                        tracing::warn!("Skipping {}: {}", url, error.message);
                        acc.errors.push(error);
                        acc.pagination.advance_after_failure(&url, acc.items.len())
                    }
                },
                PageFetch::Failed(error) => {
                    tracing::warn!("Skipping {}: {}", url, error.message);
                    acc.errors.push(error);
                    acc.pagination.advance_after_failure(&url, acc.items.len())
                }
                PageFetch::Stopped => None,
            };
        }
    }

    /// Extracts, scores and collects one page, then picks the next page
    ///
    /// Synchronous: the parsed document never lives across an await.
    fn process_page(
        &self,
        plan: &RunPlan<'_>,
        acc: &mut Accumulator,
        requested: &Url,
        fetched: &FetchResult,
    ) -> std::result::Result<Option<Url>, RunError> {
        let body = fetched.body.as_deref().unwrap_or_default();
        let document = parse_document(body, fetched.header("content-type")).map_err(|e| {
            RunError::new(requested.as_str(), RunErrorKind::Extraction, e.to_string())
        })?;

        let outcomes = plan
            .extractor
            .extract_document(&document, &fetched.url, &plan.scope);
        tracing::debug!("Extracted {} items from {}", outcomes.len(), requested);
        self.collect_items(plan, acc, outcomes, requested);

        Ok(acc
            .pagination
            .advance(&document, &fetched.url, acc.items.len()))
    }

    /// Fetches the sitemap, then its entries through the worker pool
    async fn crawl_sitemap(&self, plan: &RunPlan<'_>, acc: &mut Accumulator, sitemap_url: Url) {
        let body = match self.fetch_page(plan, &sitemap_url).await {
            PageFetch::Fetched(result) => result.body.unwrap_or_default(),
            PageFetch::Failed(error) => {
                tracing::warn!("Sitemap {} unavailable: {}", sitemap_url, error.message);
                acc.errors.push(error);
                acc.sitemap_state = Some(PaginationState::Exhausted);
                return;
            }
            PageFetch::Stopped => return,
        };

        let entries = parse_sitemap(&String::from_utf8_lossy(&body));
        let max_pages = plan.request.strategy.max_pages as usize;
        let mut limit_reached = entries.len() > max_pages;
        tracing::info!(
            "Sitemap lists {} pages, visiting up to {}",
            entries.len(),
            max_pages
        );

        let workers = self.config.run.workers.max(1) as usize;
        let mut visits = stream::iter(entries.into_iter().take(max_pages))
            .map(|url| self.visit_detail(plan, url))
            .buffered(workers);

        while let Some(visit) = visits.next().await {
            acc.note_degraded(&visit.url, visit.degraded.as_ref());

            match visit.outcome {
                DetailOutcome::Denied(error) => acc.errors.push(error),
                DetailOutcome::Extracted(outcomes) => {
                    acc.pagination.record_visit(&visit.url);
                    self.collect_items(plan, acc, outcomes, &visit.url);
                }
                DetailOutcome::Failed(error) => {
                    tracing::warn!("Skipping {}: {}", visit.url, error.message);
                    acc.pagination.record_visit(&visit.url);
                    acc.errors.push(error);
                }
                DetailOutcome::Stopped => break,
            }

            if acc.items.len() >= plan.max_results {
                limit_reached = true;
                break;
            }
        }

        acc.sitemap_state = Some(if limit_reached {
            PaginationState::LimitReached
        } else {
            PaginationState::Exhausted
        });
    }

    async fn visit_detail(&self, plan: &RunPlan<'_>, url: Url) -> DetailVisit {
        let decision = match self.admit(&url).await {
            Ok(decision) => decision,
            Err(error) => {
                return DetailVisit {
                    url,
                    degraded: None,
                    outcome: DetailOutcome::Denied(error),
                }
            }
        };

        let outcome = match self.fetch_page(plan, &url).await {
            PageFetch::Fetched(result) => {
                let body = result.body.as_deref().unwrap_or_default();
                match plan.extractor.extract(
                    body,
                    result.header("content-type"),
                    &result.url,
                    &plan.scope,
                ) {
                    Ok(outcomes) => DetailOutcome::Extracted(outcomes),
                    Err(e) => DetailOutcome::Failed(RunError::new(
                        url.as_str(),
                        RunErrorKind::Extraction,
                        e.to_string(),
                    )),
                }
            }
            PageFetch::Failed(error) => DetailOutcome::Failed(error),
            PageFetch::Stopped => DetailOutcome::Stopped,
        };

        DetailVisit {
            url,
            degraded: decision.degraded,
            outcome,
        }
    }

    /// Checks a discovered URL against robots.txt and records its crawl delay
    async fn admit(&self, url: &Url) -> std::result::Result<ComplianceDecision, RunError> {
        let decision = self
            .guard
            .decide(url)
            .await
            .map_err(|e| RunError::new(url.as_str(), RunErrorKind::InvalidUrl, e.to_string()))?;

        if !decision.allowed {
            return Err(RunError::new(
                url.as_str(),
                RunErrorKind::RobotsDenied,
                "disallowed by robots.txt",
            ));
        }

        if let Ok(origin) = origin_of(url) {
            self.limiter.set_crawl_delay(&origin, decision.crawl_delay);
        }
        Ok(decision)
    }

    /// Fetches a URL under the rate limiter, retrying soft failures
    async fn fetch_page(&self, plan: &RunPlan<'_>, url: &Url) -> PageFetch {
        let origin = match origin_of(url) {
            Ok(origin) => origin,
            Err(e) => {
                return PageFetch::Failed(RunError::new(
                    url.as_str(),
                    RunErrorKind::InvalidUrl,
                    e.to_string(),
                ))
            }
        };

        let max_retries = self.config.run.max_retries;
        let mut retry = RetryState::new(max_retries);

        loop {
            let admission = match self.limiter.acquire(&origin).await {
                Ok(admission) => admission,
                Err(e) => {
                    return PageFetch::Failed(RunError::new(
                        url.as_str(),
                        RunErrorKind::Network,
                        e.to_string(),
                    ))
                }
            };

            if !pause(&plan.stop, admission.wait()).await {
                return PageFetch::Stopped;
            }

            let result = self.fetcher.fetch(url).await;
            let class = result.classify();
            self.limiter.release(admission, request_outcome(&result, class));

            match retry.record(class) {
                RetryVerdict::Succeeded => return PageFetch::Fetched(result),
                RetryVerdict::Retry { attempt } => {
                    tracing::warn!(
                        "{} for {} (attempt {}/{}), retrying",
                        result.describe_failure(),
                        url,
                        attempt,
                        max_retries + 1
                    );
                }
                RetryVerdict::Exhausted { attempts } => {
                    return PageFetch::Failed(RunError::new(
                        url.as_str(),
                        failure_kind(&result),
                        format!("{} after {} attempts", result.describe_failure(), attempts),
                    ));
                }
                RetryVerdict::Failed => {
                    return PageFetch::Failed(RunError::new(
                        url.as_str(),
                        failure_kind(&result),
                        result.describe_failure(),
                    ));
                }
            }
        }
    }

    /// Scores items and applies the quality filter and result limit
    ///
    /// The limit caps emitted `items`, so unfiltered rejected items use up
    /// slots even when they do not count toward `total_scraped`.
    fn collect_items(
        &self,
        plan: &RunPlan<'_>,
        acc: &mut Accumulator,
        outcomes: Vec<ExtractionOutcome>,
        source: &Url,
    ) {
        let recipe = &plan.request.recipe;
        let quality = &self.config.quality;

        for fields in outcomes {
            if acc.items.len() >= plan.max_results {
                break;
            }

            acc.total_found += 1;
            let report = self.scorer.score(&fields, recipe);
            let item = ScrapedItem {
                source_url: source.to_string(),
                scraped_at: Utc::now(),
                issues: item_issues(&fields, recipe),
                fields,
                quality: report,
            };

            if item.quality.accepted {
                acc.total_scraped += 1;
                acc.items.push(item);
            } else if quality.enable_quality_filtering {
                tracing::debug!(
                    "Rejected item from {} (score {:.2}): {}",
                    source,
                    item.quality.score,
                    item.issues.join("; ")
                );
                acc.rejected.push(item);
            } else {
                if quality.count_rejected_as_scraped {
                    acc.total_scraped += 1;
                }
                acc.items.push(item);
            }
        }
    }
}

fn request_outcome(result: &FetchResult, class: ResponseClass) -> RequestOutcome {
    match class {
        ResponseClass::Success => RequestOutcome::Success,
        ResponseClass::SoftFailure => RequestOutcome::SoftFailure {
            retry_after: result.retry_after(),
        },
        ResponseClass::HardFailure => RequestOutcome::HardFailure,
    }
}

fn failure_kind(result: &FetchResult) -> RunErrorKind {
    if result.error.is_some() {
        RunErrorKind::Network
    } else {
        RunErrorKind::Http
    }
}

/// Sleeps for `wait` unless the run stops first; returns false if it stopped
async fn pause(stop: &CancellationToken, wait: Duration) -> bool {
    if stop.is_cancelled() {
        return false;
    }
    if wait.is_zero() {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(wait) => true,
        _ = stop.cancelled() => false,
    }
}

async fn stop_signal(cancel: &CancellationToken, deadline: Option<Instant>) -> StopReason {
    match deadline {
        Some(deadline) => tokio::select! {
            _ = cancel.cancelled() => StopReason::Cancelled,
            _ = tokio::time::sleep_until(deadline) => StopReason::Deadline,
        },
        None => {
            cancel.cancelled().await;
            StopReason::Cancelled
        }
    }
}
