//! Core data models for the paper consensus system.
//!
//! This module contains the fundamental data structures shared across the
//! pipeline: bibliographic paper records, the scores derived from them, and
//! the consensus verdict produced over a corpus.

use serde::{Deserialize, Serialize};

/// Bibliographic facts about a single paper.
///
/// Records are created by a provider and never mutated afterwards. Scores
/// derived by the pipeline are carried separately in [`PaperScores`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperRecord {
    /// Paper title
    pub title: String,

    /// Author names in publication order
    #[serde(default)]
    pub authors: Vec<String>,

    /// Year of publication (0 when unknown)
    #[serde(default)]
    pub year: i32,

    /// Abstract text
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Publication venue (journal or conference)
    #[serde(default)]
    pub venue: Option<String>,

    /// Total citation count
    #[serde(default)]
    pub citation_count: u32,

    /// Citations flagged as influential by the source
    #[serde(default)]
    pub influential_citation_count: u32,

    /// Field-of-study tags
    #[serde(default)]
    pub fields_of_study: Vec<String>,

    /// Identifier assigned by the scholarly source
    #[serde(default)]
    pub paper_id: Option<String>,

    /// Digital Object Identifier
    #[serde(default)]
    pub doi: Option<String>,

    /// Landing page URL
    #[serde(default)]
    pub url: Option<String>,

    /// Open-access PDF link
    #[serde(default)]
    pub pdf_url: Option<String>,

    /// One-sentence machine summary supplied by the source
    #[serde(default)]
    pub tldr: Option<String>,
}

impl PaperRecord {
    /// Create a record with the required fields; everything else is empty.
    ///
    /// # Arguments
    /// * `title` - Paper title
    /// * `abstract_text` - Abstract text
    /// * `year` - Year of publication (0 when unknown)
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            year,
            abstract_text: abstract_text.into(),
            venue: None,
            citation_count: 0,
            influential_citation_count: 0,
            fields_of_study: Vec::new(),
            paper_id: None,
            doi: None,
            url: None,
            pdf_url: None,
            tldr: None,
        }
    }

    /// The text that represents this paper in the vector space:
    /// title, abstract and field-of-study tags joined by spaces.
    pub fn document_text(&self) -> String {
        let mut text = format!("{} {}", self.title, self.abstract_text);
        if !self.fields_of_study.is_empty() {
            text.push(' ');
            text.push_str(&self.fields_of_study.join(" "));
        }
        text
    }

    /// Whether a provider should drop this record.
    pub fn is_incomplete(&self) -> bool {
        self.title.trim().is_empty() || self.abstract_text.trim().is_empty()
    }
}

/// Scores derived for one paper by the pipeline.
///
/// Both scores are clamped into [0, 1] on construction, so the invariant
/// holds no matter what the upstream computation produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaperScores {
    /// Cosine similarity to the query
    pub relevance: f32,

    /// Cluster label (-1 = unassigned)
    pub cluster: i32,

    /// Composite confidence estimate
    pub confidence: f32,
}

impl PaperScores {
    /// Cluster id used before clustering has run.
    pub const UNASSIGNED_CLUSTER: i32 = -1;

    /// Create scores, clamping relevance and confidence into [0, 1].
    ///
    /// Non-finite inputs are stored as 0.0.
    pub fn new(relevance: f32, cluster: i32, confidence: f32) -> Self {
        Self {
            relevance: clamp_unit(relevance),
            cluster,
            confidence: clamp_unit(confidence),
        }
    }

    /// Scores of a paper nothing has been computed for yet.
    pub fn unassigned() -> Self {
        Self::new(0.0, Self::UNASSIGNED_CLUSTER, 0.0)
    }
}

/// Clamp a score into [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Relevance classification for scored papers.
///
/// Papers are banded by their similarity to the query so that summaries and
/// the CLI can present a label instead of a raw score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceLevel {
    /// Relevance above the high threshold (default 0.6)
    High,

    /// Relevance above the medium threshold (default 0.3)
    Medium,

    /// Everything else
    Low,
}

impl RelevanceLevel {
    /// Determine the relevance level using the default thresholds.
    pub fn from_score(score: f32) -> Self {
        Self::from_thresholds(
            score,
            crate::config::defaults::DEFAULT_HIGH_RELEVANCE_THRESHOLD,
            crate::config::defaults::DEFAULT_MEDIUM_RELEVANCE_THRESHOLD,
        )
    }

    /// Determine the relevance level from explicit thresholds.
    ///
    /// # Arguments
    /// * `score` - Relevance score in [0, 1]
    /// * `high` - Scores strictly above this are `High`
    /// * `medium` - Scores strictly above this are `Medium`
    pub fn from_thresholds(score: f32, high: f32, medium: f32) -> Self {
        if score > high {
            RelevanceLevel::High
        } else if score > medium {
            RelevanceLevel::Medium
        } else {
            RelevanceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceLevel::High => "High",
            RelevanceLevel::Medium => "Medium",
            RelevanceLevel::Low => "Low",
        }
    }
}

/// A paper paired with its derived scores.
///
/// This is the primary per-paper output of the pipeline. `corpus_index` is
/// the paper's position in the corpus as it was vectorized, which stays valid
/// after the list is re-ordered by relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPaper {
    /// Position of the paper in the vectorized corpus
    pub corpus_index: usize,

    /// The untouched paper record
    pub paper: PaperRecord,

    /// Derived scores
    pub scores: PaperScores,

    /// Categorical relevance classification
    pub relevance: RelevanceLevel,
}

impl ScoredPaper {
    /// Create a scored paper, deriving the relevance label with the given
    /// thresholds.
    pub fn new(
        corpus_index: usize,
        paper: PaperRecord,
        scores: PaperScores,
        high_relevance: f32,
        medium_relevance: f32,
    ) -> Self {
        Self {
            corpus_index,
            paper,
            relevance: RelevanceLevel::from_thresholds(scores.relevance, high_relevance, medium_relevance),
            scores,
        }
    }
}

/// Overall direction of the evidence across a corpus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusVerdict {
    StrongPositive,
    ModeratePositive,
    Mixed,
    ModerateNegative,
    StrongNegative,
    /// No papers to analyze
    InsufficientData,
    /// Aggregation failed; the result carries no evidence
    Error,
}

impl ConsensusVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusVerdict::StrongPositive => "strong_positive",
            ConsensusVerdict::ModeratePositive => "moderate_positive",
            ConsensusVerdict::Mixed => "mixed",
            ConsensusVerdict::ModerateNegative => "moderate_negative",
            ConsensusVerdict::StrongNegative => "strong_negative",
            ConsensusVerdict::InsufficientData => "insufficient_data",
            ConsensusVerdict::Error => "error",
        }
    }
}

impl std::fmt::Display for ConsensusVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corpus statistics reported alongside a consensus verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusInsights {
    /// Mean relevance score
    pub avg_relevance: f32,

    /// Papers whose confidence exceeds the high-confidence threshold
    pub high_confidence_papers: usize,

    /// Fraction of papers published in or after the recent-year threshold
    pub recent_papers_ratio: f32,

    /// Mean citation count
    pub avg_citation_impact: f32,
}

/// The consensus estimate for one search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusResult {
    pub verdict: ConsensusVerdict,

    /// Share of weighted evidence that is positive, 0-100
    pub percentage: f32,

    /// Average paper confidence, 0-1
    pub confidence: f32,

    pub total_papers: usize,

    /// Human-readable summary of the fields above
    pub explanation: String,

    /// Absent for `insufficient_data` and `error`
    pub insights: Option<ConsensusInsights>,
}

impl ConsensusResult {
    /// Result for an empty corpus.
    pub fn insufficient_data() -> Self {
        Self {
            verdict: ConsensusVerdict::InsufficientData,
            percentage: 50.0,
            confidence: 0.0,
            total_papers: 0,
            explanation: "No papers were available to assess.".to_string(),
            insights: None,
        }
    }

    /// Degraded result returned when aggregation fails.
    pub fn error(total_papers: usize) -> Self {
        Self {
            verdict: ConsensusVerdict::Error,
            percentage: 50.0,
            confidence: 0.0,
            total_papers,
            explanation: "Consensus analysis could not be completed.".to_string(),
            insights: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_level_from_score() {
        assert_eq!(RelevanceLevel::from_score(0.95), RelevanceLevel::High);
        assert_eq!(RelevanceLevel::from_score(0.61), RelevanceLevel::High);
        assert_eq!(RelevanceLevel::from_score(0.6), RelevanceLevel::Medium);
        assert_eq!(RelevanceLevel::from_score(0.45), RelevanceLevel::Medium);
        assert_eq!(RelevanceLevel::from_score(0.3), RelevanceLevel::Low);
        assert_eq!(RelevanceLevel::from_score(0.0), RelevanceLevel::Low);
    }

    #[test]
    fn test_scores_are_clamped() {
        let scores = PaperScores::new(1.0000001, 2, -0.2);
        assert_eq!(scores.relevance, 1.0);
        assert_eq!(scores.confidence, 0.0);
        assert_eq!(scores.cluster, 2);

        let scores = PaperScores::new(f32::NAN, 0, f32::INFINITY);
        assert_eq!(scores.relevance, 0.0);
        assert_eq!(scores.confidence, 1.0);
    }

    #[test]
    fn test_unassigned_scores() {
        let scores = PaperScores::unassigned();
        assert_eq!(scores.cluster, -1);
        assert_eq!(scores.relevance, 0.0);
    }

    #[test]
    fn test_document_text_includes_fields() {
        let mut paper = PaperRecord::new("Sleep and memory", "We study sleep.", 2020);
        assert_eq!(paper.document_text(), "Sleep and memory We study sleep.");

        paper.fields_of_study = vec!["Medicine".to_string(), "Psychology".to_string()];
        assert_eq!(
            paper.document_text(),
            "Sleep and memory We study sleep. Medicine Psychology"
        );
    }

    #[test]
    fn test_incomplete_records() {
        assert!(PaperRecord::new("  ", "abstract", 2020).is_incomplete());
        assert!(PaperRecord::new("Title", "", 2020).is_incomplete());
        assert!(!PaperRecord::new("Title", "abstract", 2020).is_incomplete());
    }

    #[test]
    fn test_paper_record_json_uses_abstract_key() {
        let json = r#"{"title": "T", "abstract": "A", "year": 2019, "citation_count": 12}"#;
        let paper: PaperRecord = serde_json::from_str(json).unwrap();
        assert_eq!(paper.abstract_text, "A");
        assert_eq!(paper.citation_count, 12);
        assert!(paper.authors.is_empty());
    }

    #[test]
    fn test_verdict_serializes_snake_case() {
        let json = serde_json::to_string(&ConsensusVerdict::StrongPositive).unwrap();
        assert_eq!(json, "\"strong_positive\"");
        assert_eq!(ConsensusVerdict::InsufficientData.to_string(), "insufficient_data");
    }

    #[test]
    fn test_degraded_results() {
        let empty = ConsensusResult::insufficient_data();
        assert_eq!(empty.verdict, ConsensusVerdict::InsufficientData);
        assert_eq!(empty.confidence, 0.0);
        assert!(empty.insights.is_none());

        let failed = ConsensusResult::error(7);
        assert_eq!(failed.verdict, ConsensusVerdict::Error);
        assert_eq!(failed.total_papers, 7);
        assert_eq!(failed.confidence, 0.0);
    }
}
