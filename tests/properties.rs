//! Property tests for the scoring pipeline.

use paper_consensus::config::AnalysisConfig;
use paper_consensus::consensus::{ConsensusAggregator, NEUTRAL_PERCENTAGE};
use paper_consensus::models::{ConsensusVerdict, PaperRecord, PaperScores, ScoredPaper};
use paper_consensus::pipeline::{NoProgress, ResearchAnalyzer};
use paper_consensus::vectorize::{CorpusVectors, VectorizeResult, Vectorizer};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Words that contain no consensus indicator phrase.
const NEUTRAL_WORDS: &[&str] = &[
    "sleep", "memory", "caffeine", "cortex", "neuron", "glucose", "protein", "cells", "river",
    "climate", "soil", "trial", "patients", "dose", "cohort", "plasma", "enzyme", "forest",
];

fn neutral_text(max_words: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(NEUTRAL_WORDS), 1..max_words)
        .prop_map(|words| words.join(" "))
}

fn paper_strategy() -> impl Strategy<Value = PaperRecord> {
    (neutral_text(5), neutral_text(40), 1990i32..2026, 0u32..500).prop_map(
        |(title, abstract_text, year, citations)| {
            let mut paper = PaperRecord::new(title, abstract_text, year);
            paper.citation_count = citations;
            paper
        },
    )
}

fn corpus_strategy(max: usize) -> impl Strategy<Value = Vec<PaperRecord>> {
    prop::collection::vec(paper_strategy(), 1..max)
}

/// Counts invocations without producing vectors.
struct CountingVectorizer(Arc<AtomicUsize>);

impl Vectorizer for CountingVectorizer {
    fn fit_transform(&self, documents: &[String], _query: &str) -> VectorizeResult<CorpusVectors> {
        self.0.fetch_add(1, Ordering::SeqCst);
        let rows = vec![vec![1.0]; documents.len() + 1];
        Ok(CorpusVectors::from_rows(vec!["term".to_string()], rows))
    }
}

/// Default decision table: first matching row wins.
fn expected_verdict(percentage: f32, confidence: f32) -> ConsensusVerdict {
    let rows = [
        (percentage >= 70.0 && confidence > 0.6, ConsensusVerdict::StrongPositive),
        (percentage >= 55.0 && confidence > 0.5, ConsensusVerdict::ModeratePositive),
        (percentage <= 30.0 && confidence > 0.6, ConsensusVerdict::StrongNegative),
        (percentage <= 45.0 && confidence > 0.5, ConsensusVerdict::ModerateNegative),
    ];
    rows.iter()
        .find(|(matches, _)| *matches)
        .map(|(_, verdict)| *verdict)
        .unwrap_or(ConsensusVerdict::Mixed)
}

proptest! {
    #[test]
    fn scores_are_bounded(papers in corpus_strategy(12), question in neutral_text(6)) {
        let analyzer = ResearchAnalyzer::new(AnalysisConfig::default());
        let report = analyzer.analyze(papers, &question, &NoProgress).unwrap();

        for p in &report.papers {
            prop_assert!((0.0..=1.0).contains(&p.scored.scores.relevance));
            prop_assert!((0.0..=1.0).contains(&p.scored.scores.confidence));
        }
        prop_assert!((0.0..=100.0).contains(&report.consensus.percentage));
        prop_assert!((0.0..=1.0).contains(&report.consensus.confidence));
    }

    #[test]
    fn ranking_is_descending_and_stable(papers in corpus_strategy(12), question in neutral_text(6)) {
        let n = papers.len();
        let analyzer = ResearchAnalyzer::new(AnalysisConfig::default());
        let report = analyzer.analyze(papers, &question, &NoProgress).unwrap();

        prop_assert_eq!(report.papers.len(), n);
        for pair in report.papers.windows(2) {
            let (a, b) = (&pair[0].scored, &pair[1].scored);
            prop_assert!(a.scores.relevance >= b.scores.relevance);
            if a.scores.relevance == b.scores.relevance {
                prop_assert!(a.corpus_index < b.corpus_index);
            }
        }
    }

    #[test]
    fn cluster_ids_in_range(papers in corpus_strategy(12), question in neutral_text(6)) {
        let n = papers.len();
        let config = AnalysisConfig::default();
        let k = config.clustering.max_clusters.min(n) as i32;
        let min_papers = config.clustering.min_papers;
        let report = ResearchAnalyzer::new(config)
            .analyze(papers, &question, &NoProgress)
            .unwrap();

        for p in &report.papers {
            if n <= min_papers {
                prop_assert_eq!(p.scored.scores.cluster, 0);
            } else {
                prop_assert!((0..k).contains(&p.scored.scores.cluster));
            }
        }
    }

    #[test]
    fn neutral_abstracts_give_even_split(papers in corpus_strategy(10), question in neutral_text(6)) {
        let report = ResearchAnalyzer::new(AnalysisConfig::default())
            .analyze(papers, &question, &NoProgress)
            .unwrap();

        prop_assert_eq!(report.consensus.percentage, NEUTRAL_PERCENTAGE);
        prop_assert_eq!(report.consensus.verdict, ConsensusVerdict::Mixed);
    }

    #[test]
    fn analysis_is_deterministic(papers in corpus_strategy(10), question in neutral_text(6)) {
        let analyzer = ResearchAnalyzer::new(AnalysisConfig::default());
        let first = analyzer.analyze(papers.clone(), &question, &NoProgress).unwrap();
        let second = analyzer.analyze(papers, &question, &NoProgress).unwrap();

        let scores = |papers: &[paper_consensus::pipeline::AnalyzedPaper]| -> Vec<(usize, PaperScores)> {
            papers.iter().map(|p| (p.scored.corpus_index, p.scored.scores)).collect()
        };
        prop_assert_eq!(scores(&first.papers), scores(&second.papers));
        prop_assert_eq!(first.consensus.verdict, second.consensus.verdict);
    }

    #[test]
    fn verdict_follows_decision_table(
        percentage in prop_oneof![
            0.0f32..=100.0,
            prop::sample::select(vec![30.0f32, 45.0, 55.0, 70.0]),
        ],
        confidence in prop_oneof![
            0.0f32..=1.0,
            prop::sample::select(vec![0.5f32, 0.6]),
        ],
    ) {
        let aggregator = ConsensusAggregator::default();
        prop_assert_eq!(
            aggregator.classify(percentage, confidence),
            expected_verdict(percentage, confidence)
        );
    }
}

#[test]
fn classify_examples() {
    let aggregator = ConsensusAggregator::default();
    assert_eq!(aggregator.classify(72.0, 0.65), ConsensusVerdict::StrongPositive);
    assert_eq!(aggregator.classify(72.0, 0.55), ConsensusVerdict::ModeratePositive);
    assert_eq!(aggregator.classify(48.0, 0.55), ConsensusVerdict::Mixed);
}

#[test]
fn empty_corpus_is_insufficient_data() {
    let calls = Arc::new(AtomicUsize::new(0));
    let analyzer = ResearchAnalyzer::with_vectorizer(
        CountingVectorizer(calls.clone()),
        AnalysisConfig::default(),
    );

    let report = analyzer.analyze(Vec::new(), "does anything work", &NoProgress).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.consensus.verdict, ConsensusVerdict::InsufficientData);
    assert_eq!(report.consensus.confidence, 0.0);
    assert_eq!(report.consensus.total_papers, 0);
}

#[test]
fn aggregate_of_empty_list() {
    let result = ConsensusAggregator::default().aggregate(&[] as &[ScoredPaper], "q");
    assert_eq!(result, paper_consensus::models::ConsensusResult::insufficient_data());
}
