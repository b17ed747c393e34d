use crate::extract::ExtractionOutcome;
use crate::pagination::PaginationState;
use crate::quality::QualityReport;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::time::Duration;

/// Category of a recorded run error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorKind {
    /// Timeout or connection failure, after retries
    Network,
    /// Non-success HTTP status
    Http,
    /// The page could not be read as a document
    Extraction,
    /// robots.txt unreachable; the origin was allowed with the default delay
    ComplianceDegraded,
    /// A discovered URL is disallowed by robots.txt
    RobotsDenied,
    /// A discovered URL could not be used
    InvalidUrl,
    /// The run was cancelled or hit its deadline
    Cancelled,
}

/// A failure that was absorbed by the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunError {
    pub url: String,
    #[serde(rename = "error_type")]
    pub kind: RunErrorKind,
    pub message: String,
}

impl RunError {
    pub fn new(url: impl Into<String>, kind: RunErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }
}

/// One extracted record with its quality verdict
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedItem {
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    pub fields: ExtractionOutcome,
    pub quality: QualityReport,
    pub issues: Vec<String>,
}

impl ScrapedItem {
    pub fn quality_score(&self) -> f64 {
        self.quality.score
    }
}

/// Field values at the top level, followed by the item's metadata
impl Serialize for ScrapedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 5))?;
        for (name, outcome) in self.fields.iter() {
            map.serialize_entry(name, &outcome.value)?;
        }
        map.serialize_entry("quality_score", &self.quality.score)?;
        map.serialize_entry("accepted", &self.quality.accepted)?;
        map.serialize_entry("source_url", &self.source_url)?;
        map.serialize_entry("scraped_at", &self.scraped_at)?;
        map.serialize_entry("issues", &self.issues)?;
        map.end()
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct ScrapingResult {
    /// Emitted items in discovery order
    pub items: Vec<ScrapedItem>,

    /// Items held back by the quality filter
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<ScrapedItem>,

    /// Items extracted and scored
    pub total_found: usize,

    /// Items counted as successfully scraped
    pub total_scraped: usize,

    /// Mean quality score of the emitted items
    pub overall_quality_score: f64,

    #[serde(rename = "execution_time_secs", serialize_with = "serialize_secs")]
    pub execution_time: Duration,

    pub pages_visited: u32,

    pub pagination_state: PaginationState,

    pub errors: Vec<RunError>,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl ScrapingResult {
    /// Share of found items that were scraped, in [0, 1]
    pub fn success_rate(&self) -> f64 {
        if self.total_found == 0 {
            0.0
        } else {
            self.total_scraped as f64 / self.total_found as f64
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.errors.iter().any(|e| e.kind == RunErrorKind::Cancelled)
    }

    /// One-paragraph description for people
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Scraped {} of {} items from {} page{} in {:.2}s ({:.0}% success, average quality {:.2}).",
            self.total_scraped,
            self.total_found,
            self.pages_visited,
            if self.pages_visited == 1 { "" } else { "s" },
            self.execution_time.as_secs_f64(),
            self.success_rate() * 100.0,
            self.overall_quality_score,
        );

        if !self.rejected.is_empty() {
            summary.push_str(&format!(
                " {} item{} rejected by the quality filter.",
                self.rejected.len(),
                if self.rejected.len() == 1 { " was" } else { "s were" }
            ));
        }

        if !self.errors.is_empty() {
            summary.push_str(&format!(
                " {} error{} recorded.",
                self.errors.len(),
                if self.errors.len() == 1 { "" } else { "s" }
            ));
        }

        summary
    }
}
