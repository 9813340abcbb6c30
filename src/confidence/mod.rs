//! Per-paper confidence estimation.
//!
//! Confidence is the unweighted mean of four factors, each in [0, 1]:
//! relevance to the query, citation impact, abstract richness and recency.

use thiserror::Error;

use crate::config::ConfidenceConfig;
use crate::models::{clamp_unit, PaperRecord};

/// Errors that can occur while estimating confidence.
#[derive(Debug, Error, PartialEq)]
pub enum ConfidenceError {
    /// An input to the estimate was NaN or infinite
    #[error("Non-finite input: {0}")]
    NonFinite(String),
}

/// Result type for confidence operations.
pub type ConfidenceResult<T> = Result<T, ConfidenceError>;

/// Abstract factor for abstracts at or below the length threshold.
const SHORT_ABSTRACT_FACTOR: f32 = 0.5;

/// Recency factor for papers published before the recency year.
const OLDER_PAPER_FACTOR: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct ConfidenceEstimator {
    config: ConfidenceConfig,
}

impl ConfidenceEstimator {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    /// Citation impact in [0, 1], saturating at the configured normalizer.
    pub fn citation_factor(&self, citation_count: u32) -> f32 {
        (citation_count as f32 / self.config.citation_normalizer).min(1.0)
    }

    /// Estimate the confidence of one paper.
    ///
    /// # Arguments
    /// * `paper` - The paper record
    /// * `relevance` - The paper's relevance to the query, in [0, 1]
    ///
    /// # Returns
    /// The mean of the four factors, clamped into [0, 1]
    ///
    /// # Errors
    /// Returns `ConfidenceError::NonFinite` if relevance is NaN or infinite
    pub fn estimate(&self, paper: &PaperRecord, relevance: f32) -> ConfidenceResult<f32> {
        if !relevance.is_finite() {
            return Err(ConfidenceError::NonFinite(format!(
                "relevance {} for '{}'",
                relevance, paper.title
            )));
        }

        let citations = self.citation_factor(paper.citation_count);
        let abstract_quality = if paper.abstract_text.chars().count() > self.config.min_abstract_chars {
            1.0
        } else {
            SHORT_ABSTRACT_FACTOR
        };

        let recency = if paper.year >= self.config.recency_year {
            1.0
        } else {
            OLDER_PAPER_FACTOR
        };

        Ok(clamp_unit((relevance + citations + abstract_quality + recency) / 4.0))
    }
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self::new(ConfidenceConfig::default())
    }
}
