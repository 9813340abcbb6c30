//! Consensus aggregation.
//!
//! Each paper's abstract is given a polarity from indicator phrases, scaled
//! by the paper's relevance and citation impact and squashed with `tanh`.
//! Polarities outside a small dead zone are weighted by the paper's
//! confidence and pooled into a positive share, which is then classified
//! against the corpus-average confidence.

use thiserror::Error;
use tracing::{debug, error};

use crate::config::{ConfidenceConfig, ConsensusConfig, InsightsConfig};
use crate::models::{ConsensusInsights, ConsensusResult, ConsensusVerdict, ScoredPaper};

/// Errors that can occur while aggregating consensus.
#[derive(Debug, Error, PartialEq)]
pub enum ConsensusError {
    /// A score or intermediate value was NaN or infinite
    #[error("Non-finite value: {0}")]
    NonFinite(String),
}

/// Result type for consensus operations.
pub type AggregateResult<T> = Result<T, ConsensusError>;

/// Percentage reported when no paper carries evidence either way.
pub const NEUTRAL_PERCENTAGE: f32 = 50.0;

/// Confidence-weighted evidence pooled over a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvidenceWeights {
    pub positive: f32,
    pub negative: f32,
}

impl EvidenceWeights {
    /// Share of the evidence that is positive, 0-100.
    pub fn positive_percentage(&self) -> f32 {
        let total = self.positive + self.negative;
        if total > 0.0 {
            self.positive / total * 100.0
        } else {
            NEUTRAL_PERCENTAGE
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusAggregator {
    config: ConsensusConfig,
    confidence: ConfidenceConfig,
    insights: InsightsConfig,
    positive: Vec<String>,
    negative: Vec<String>,
}

impl ConsensusAggregator {
    /// Create an aggregator.
    ///
    /// # Arguments
    /// * `config` - Thresholds, gates and indicator phrases
    /// * `confidence` - Supplies the citation normalizer and the
    ///   high-confidence threshold
    /// * `insights` - Recency year and explanation thresholds
    pub fn new(config: ConsensusConfig, confidence: ConfidenceConfig, insights: InsightsConfig) -> Self {
        let positive = config.positive_indicators.iter().map(|s| s.to_lowercase()).collect();
        let negative = config.negative_indicators.iter().map(|s| s.to_lowercase()).collect();
        Self {
            config,
            confidence,
            insights,
            positive,
            negative,
        }
    }

    /// Net indicator score of an abstract.
    ///
    /// Every indicator phrase found as a substring adds its weight once,
    /// regardless of how often it occurs.
    pub fn polarity(&self, abstract_text: &str) -> f32 {
        let text = abstract_text.to_lowercase();
        let count = |phrases: &[String]| phrases.iter().filter(|p| text.contains(p.as_str())).count();

        let positive = count(&self.positive) as f32 * self.config.indicator_weight;
        let negative = count(&self.negative) as f32 * self.config.indicator_weight;
        positive - negative
    }

    /// Sentiment of one paper in (-1, 1).
    pub fn sentiment(&self, paper: &ScoredPaper) -> f32 {
        let citation_boost =
            (paper.paper.citation_count as f32 / self.confidence.citation_normalizer).min(1.0);
        let raw = self.polarity(&paper.paper.abstract_text)
            * paper.scores.relevance
            * (1.0 + citation_boost);
        (raw / self.config.sentiment_scale).tanh()
    }

    /// Pool confidence-weighted sentiments, ignoring the dead zone.
    ///
    /// # Errors
    /// Returns `ConsensusError::NonFinite` if any sentiment or confidence is
    /// NaN or infinite
    pub fn evidence_weights(&self, papers: &[ScoredPaper]) -> AggregateResult<EvidenceWeights> {
        let mut weights = EvidenceWeights::default();

        for paper in papers {
            let sentiment = self.sentiment(paper);
            let confidence = paper.scores.confidence;
            if !sentiment.is_finite() || !confidence.is_finite() {
                return Err(ConsensusError::NonFinite(format!(
                    "sentiment {} / confidence {} for '{}'",
                    sentiment, confidence, paper.paper.title
                )));
            }

            if sentiment > self.config.dead_zone {
                weights.positive += sentiment * confidence;
            } else if sentiment < -self.config.dead_zone {
                weights.negative += sentiment.abs() * confidence;
            }
        }

        Ok(weights)
    }

    /// Classify a positive share against the corpus-average confidence.
    ///
    /// Rules are checked in order; the first match wins.
    pub fn classify(&self, percentage: f32, avg_confidence: f32) -> ConsensusVerdict {
        let c = &self.config;
        if percentage >= c.strong_positive_threshold && avg_confidence > c.strong_confidence_gate {
            ConsensusVerdict::StrongPositive
        } else if percentage >= c.moderate_positive_threshold && avg_confidence > c.moderate_confidence_gate {
            ConsensusVerdict::ModeratePositive
        } else if percentage <= c.strong_negative_threshold && avg_confidence > c.strong_confidence_gate {
            ConsensusVerdict::StrongNegative
        } else if percentage <= c.moderate_negative_threshold && avg_confidence > c.moderate_confidence_gate {
            ConsensusVerdict::ModerateNegative
        } else {
            ConsensusVerdict::Mixed
        }
    }

    /// Corpus statistics for a non-empty paper list.
    pub fn insights(&self, papers: &[ScoredPaper]) -> ConsensusInsights {
        let n = papers.len().max(1) as f32;
        ConsensusInsights {
            avg_relevance: papers.iter().map(|p| p.scores.relevance).sum::<f32>() / n,
            high_confidence_papers: self.high_confidence_count(papers),
            recent_papers_ratio: papers
                .iter()
                .filter(|p| p.paper.year >= self.insights.recent_year)
                .count() as f32
                / n,
            avg_citation_impact: papers.iter().map(|p| p.paper.citation_count as f32).sum::<f32>() / n,
        }
    }

    fn high_confidence_count(&self, papers: &[ScoredPaper]) -> usize {
        papers
            .iter()
            .filter(|p| p.scores.confidence > self.confidence.high_threshold)
            .count()
    }

    /// Human-readable summary of a consensus.
    ///
    /// # Arguments
    /// * `papers` - The analyzed papers
    /// * `percentage` - Unrounded positive share
    /// * `avg_confidence` - Unrounded average confidence
    pub fn explanation(&self, papers: &[ScoredPaper], percentage: f32, avg_confidence: f32) -> String {
        let n = papers.len();
        let mut explanation = format!("Analysis of {} papers shows ", n);

        if percentage >= self.config.strong_positive_threshold {
            explanation.push_str(&format!(
                "{:.1}% positive evidence with {:.1} confidence.",
                percentage, avg_confidence
            ));
        } else if percentage <= self.config.strong_negative_threshold {
            explanation.push_str(&format!(
                "{:.1}% negative evidence with {:.1} confidence.",
                100.0 - percentage,
                avg_confidence
            ));
        } else {
            explanation.push_str(&format!(
                "mixed results ({:.1}% positive) with {:.1} confidence.",
                percentage, avg_confidence
            ));
        }

        let high_confidence = self.high_confidence_count(papers);
        if high_confidence as f32 > n as f32 * self.insights.high_confidence_share {
            explanation.push_str(&format!(" {} papers show high confidence scores.", high_confidence));
        }

        let avg_relevance = papers.iter().map(|p| p.scores.relevance).sum::<f32>() / n.max(1) as f32;
        if avg_relevance > self.insights.high_relevance_threshold {
            explanation.push_str(" Strong topical relevance detected.");
        }

        explanation
    }

    /// Aggregate consensus, propagating failures.
    ///
    /// # Errors
    /// Returns `ConsensusError::NonFinite` if any score involved is NaN or
    /// infinite
    pub fn try_aggregate(&self, papers: &[ScoredPaper], question: &str) -> AggregateResult<ConsensusResult> {
        if papers.is_empty() {
            return Ok(ConsensusResult::insufficient_data());
        }

        let weights = self.evidence_weights(papers)?;
        let percentage = weights.positive_percentage();

        let avg_confidence =
            papers.iter().map(|p| p.scores.confidence).sum::<f32>() / papers.len() as f32;
        if !avg_confidence.is_finite() || !percentage.is_finite() {
            return Err(ConsensusError::NonFinite(format!(
                "percentage {} / average confidence {}",
                percentage, avg_confidence
            )));
        }

        let verdict = self.classify(percentage, avg_confidence);
        debug!(
            question,
            positive = weights.positive,
            negative = weights.negative,
            %verdict,
            "Consensus computed"
        );

        Ok(ConsensusResult {
            verdict,
            percentage: round_to(percentage, 1),
            confidence: round_to(avg_confidence, 2),
            total_papers: papers.len(),
            explanation: self.explanation(papers, percentage, avg_confidence),
            insights: Some(self.insights(papers)),
        })
    }

    /// Aggregate consensus over the scored papers.
    ///
    /// Never fails: an empty list yields `insufficient_data` and an internal
    /// failure yields an `error` verdict, which is logged.
    pub fn aggregate(&self, papers: &[ScoredPaper], question: &str) -> ConsensusResult {
        match self.try_aggregate(papers, question) {
            Ok(result) => result,
            Err(e) => {
                error!("Consensus aggregation failed: {}", e);
                ConsensusResult::error(papers.len())
            }
        }
    }
}

impl Default for ConsensusAggregator {
    fn default() -> Self {
        Self::new(
            ConsensusConfig::default(),
            ConfidenceConfig::default(),
            InsightsConfig::default(),
        )
    }
}

fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}
