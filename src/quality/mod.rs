//! Quality scoring for extracted items
//!
//! Each field contributes a per-state score (found, malformed, missing)
//! weighted by its recipe weight. Required fields are a separate hard gate:
//! an item missing one is rejected whatever its aggregate score.

use crate::extract::{ExtractionOutcome, FieldState, SchemaRecipe};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score awarded to a field for each extraction state
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StateScores {
    pub found: f64,
    pub malformed: f64,
    pub missing: f64,
}

impl Default for StateScores {
    fn default() -> Self {
        Self {
            found: 1.0,
            malformed: 0.5,
            missing: 0.0,
        }
    }
}

impl StateScores {
    pub fn for_state(&self, state: FieldState) -> f64 {
        match state {
            FieldState::Found => self.found,
            FieldState::Malformed => self.malformed,
            FieldState::Missing => self.missing,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("found", self.found),
            ("malformed", self.malformed),
            ("missing", self.missing),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "score for '{}' fields must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Quality verdict for one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// Weighted score in [0, 1]
    pub score: f64,

    /// Per-field score before weighting
    pub field_scores: BTreeMap<String, f64>,

    pub accepted: bool,
}

/// Scores items against the recipe they were extracted with
#[derive(Debug, Clone)]
pub struct QualityScorer {
    min_quality_score: f64,
}

impl QualityScorer {
    pub fn new(min_quality_score: f64) -> Self {
        Self { min_quality_score }
    }

    pub fn min_quality_score(&self) -> f64 {
        self.min_quality_score
    }

    /// Scores one item
    ///
    /// The weighted average is normalized by the sum of the recipe's weights.
    /// When every weight is zero the unweighted mean is used instead.
    pub fn score(&self, outcome: &ExtractionOutcome, recipe: &SchemaRecipe) -> QualityReport {
        let mut field_scores = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut unweighted = 0.0;
        let mut required_missing = false;

        for field in &recipe.fields {
            let state = outcome.state(&field.name).unwrap_or(FieldState::Missing);
            let field_score = recipe.scoring.for_state(state);

            weighted += field.weight * field_score;
            total_weight += field.weight;
            unweighted += field_score;

            if field.required && state == FieldState::Missing {
                required_missing = true;
            }

            field_scores.insert(field.name.clone(), field_score);
        }

        let score = if total_weight > 0.0 {
            weighted / total_weight
        } else if !recipe.fields.is_empty() {
            unweighted / recipe.fields.len() as f64
        } else {
            0.0
        };
        let score = score.clamp(0.0, 1.0);

        QualityReport {
            score,
            field_scores,
            accepted: score >= self.min_quality_score && !required_missing,
        }
    }
}

/// Human-readable problems with an item, in recipe order
pub fn item_issues(outcome: &ExtractionOutcome, recipe: &SchemaRecipe) -> Vec<String> {
    recipe
        .fields
        .iter()
        .filter_map(|field| {
            match outcome.state(&field.name).unwrap_or(FieldState::Missing) {
                FieldState::Missing if field.required => {
                    Some(format!("required field '{}' is missing", field.name))
                }
                FieldState::Missing => Some(format!("field '{}' is missing", field.name)),
                FieldState::Malformed => Some(format!(
                    "field '{}' could not be read as {:?}",
                    field.name, field.field_type
                )),
                FieldState::Found => None,
            }
        })
        .collect()
}
