//! Local per-paper summaries.
//!
//! Summaries are built from the abstract and the paper's scores alone; no
//! external service is involved.

use serde::{Deserialize, Serialize};

use crate::config::ConfidenceConfig;
use crate::models::{RelevanceLevel, ScoredPaper};

/// Citations a paper needs (together with high confidence) for strong evidence.
const STRONG_EVIDENCE_CITATIONS: u32 = 50;

/// Citations a paper needs (together with medium confidence) for moderate evidence.
const MODERATE_EVIDENCE_CITATIONS: u32 = 10;

const NO_KEY_FINDING: &str = "Key finding not available.";
const NO_METHODOLOGY: &str = "Methodology details not extracted locally.";

/// How much weight a paper's findings can bear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    Strong,
    Moderate,
    Limited,
}

impl EvidenceStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStrength::Strong => "Strong",
            EvidenceStrength::Moderate => "Moderate",
            EvidenceStrength::Limited => "Limited",
        }
    }
}

/// Structured summary of one paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperSummary {
    /// First sentence of the abstract
    pub key_finding: String,
    pub methodology: String,
    pub evidence_strength: EvidenceStrength,
    pub relevance: RelevanceLevel,
    /// Confidence and relevance as text, e.g. "Confidence: 0.82, Relevance: 0.64"
    pub scores: String,
    pub implications: String,
}

#[derive(Debug, Clone)]
pub struct Summarizer {
    high_confidence: f32,
    medium_confidence: f32,
}

impl Summarizer {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            high_confidence: config.high_threshold,
            medium_confidence: config.medium_threshold,
        }
    }

    pub fn evidence_strength(&self, confidence: f32, citation_count: u32) -> EvidenceStrength {
        if confidence > self.high_confidence && citation_count > STRONG_EVIDENCE_CITATIONS {
            EvidenceStrength::Strong
        } else if confidence > self.medium_confidence && citation_count > MODERATE_EVIDENCE_CITATIONS {
            EvidenceStrength::Moderate
        } else {
            EvidenceStrength::Limited
        }
    }

    pub fn summarize(&self, scored: &ScoredPaper) -> PaperSummary {
        let key_finding = first_sentence(&scored.paper.abstract_text)
            .unwrap_or_else(|| NO_KEY_FINDING.to_string());
        let evidence_strength =
            self.evidence_strength(scored.scores.confidence, scored.paper.citation_count);

        let year = if scored.paper.year > 0 {
            scored.paper.year.to_string()
        } else {
            "undated".to_string()
        };

        PaperSummary {
            key_finding,
            methodology: NO_METHODOLOGY.to_string(),
            evidence_strength,
            relevance: scored.relevance,
            scores: format!(
                "Confidence: {:.2}, Relevance: {:.2}",
                scored.scores.confidence, scored.scores.relevance
            ),
            implications: format!(
                "This {} study contributes {} evidence with {} relevance.",
                year,
                evidence_strength.as_str().to_lowercase(),
                scored.relevance.as_str().to_lowercase()
            ),
        }
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}

/// The text before the first period, trimmed; `None` if there is none.
fn first_sentence(text: &str) -> Option<String> {
    text.split('.')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
