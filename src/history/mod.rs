//! Append-only log of searches made in a session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConsensusResult, ConsensusVerdict};

/// Number of entries reported as recent by [`SearchHistory::stats`].
const RECENT_ENTRIES: usize = 5;

/// One completed search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchLogEntry {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub paper_count: usize,
    pub verdict: ConsensusVerdict,
    pub confidence: f32,
}

/// Aggregate view over the history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryStats {
    pub total_searches: usize,
    /// Mean number of papers per search (0 with no searches)
    pub avg_papers_per_search: f32,
    /// Up to the five latest entries, newest last
    pub recent: Vec<SearchLogEntry>,
    pub verdict_distribution: BTreeMap<ConsensusVerdict, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHistory {
    entries: Vec<SearchLogEntry>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for a finished search, timestamped now.
    pub fn record(&mut self, question: &str, paper_count: usize, consensus: &ConsensusResult) {
        self.push(SearchLogEntry {
            timestamp: Utc::now(),
            question: question.to_string(),
            paper_count,
            verdict: consensus.verdict,
            confidence: consensus.confidence,
        });
    }

    pub fn push(&mut self, entry: SearchLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SearchLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        let total = self.entries.len();
        let avg = if total == 0 {
            0.0
        } else {
            self.entries.iter().map(|e| e.paper_count).sum::<usize>() as f32 / total as f32
        };

        let mut verdict_distribution = BTreeMap::new();
        for entry in &self.entries {
            *verdict_distribution.entry(entry.verdict).or_insert(0) += 1;
        }

        HistoryStats {
            total_searches: total,
            avg_papers_per_search: avg,
            recent: self.entries[total.saturating_sub(RECENT_ENTRIES)..].to_vec(),
            verdict_distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus(verdict: ConsensusVerdict) -> ConsensusResult {
        ConsensusResult {
            verdict,
            percentage: 60.0,
            confidence: 0.55,
            total_papers: 3,
            explanation: String::new(),
            insights: None,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = SearchHistory::new().stats();
        assert_eq!(stats.total_searches, 0);
        assert_eq!(stats.avg_papers_per_search, 0.0);
        assert!(stats.recent.is_empty());
        assert!(stats.verdict_distribution.is_empty());
    }

    #[test]
    fn test_stats() {
        let mut history = SearchHistory::new();
        for i in 0..7 {
            let verdict = if i % 2 == 0 {
                ConsensusVerdict::Mixed
            } else {
                ConsensusVerdict::ModeratePositive
            };
            history.record(&format!("question {}", i), i * 2, &consensus(verdict));
        }

        let stats = history.stats();
        assert_eq!(stats.total_searches, 7);
        assert!((stats.avg_papers_per_search - 6.0).abs() < 1e-6);
        assert_eq!(stats.recent.len(), 5);
        assert_eq!(stats.recent[0].question, "question 2");
        assert_eq!(stats.recent[4].question, "question 6");
        assert_eq!(stats.verdict_distribution[&ConsensusVerdict::Mixed], 4);
        assert_eq!(stats.verdict_distribution[&ConsensusVerdict::ModeratePositive], 3);
    }

    #[test]
    fn test_record_copies_consensus_fields() {
        let mut history = SearchHistory::new();
        history.record("q", 3, &consensus(ConsensusVerdict::Mixed));
        let entry = &history.entries()[0];
        assert_eq!(entry.verdict, ConsensusVerdict::Mixed);
        assert_eq!(entry.confidence, 0.55);
        assert_eq!(entry.paper_count, 3);
        assert!(entry.timestamp <= Utc::now());
    }
}
