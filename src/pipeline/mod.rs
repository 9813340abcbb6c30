//! Analysis pipeline module.
//!
//! This module wires the scoring components together and owns the
//! per-session state that outlives a single search.
//!
//! # Usage
//!
//! ```ignore
//! use paper_consensus::config::AnalysisConfig;
//! use paper_consensus::pipeline::{NoProgress, ResearchSession, SearchOutcome};
//! use paper_consensus::provider::SemanticScholarProvider;
//!
//! let config = AnalysisConfig::load(None)?;
//! let provider = SemanticScholarProvider::new(config.search.clone())?;
//! let mut session = ResearchSession::new(config);
//!
//! match session.search("Does caffeine improve endurance?", 20, &provider, &NoProgress).await? {
//!     SearchOutcome::Completed(report) => println!("{}", report.consensus.explanation),
//!     SearchOutcome::NoResults => println!("Nothing found"),
//!     SearchOutcome::FetchFailed(reason) => println!("Search failed: {}", reason),
//! }
//! ```
//!
//! Scoring runs in this order:
//! 1. Vectorize every paper together with the question
//! 2. Score relevance and assign clusters from the vectors
//! 3. Estimate per-paper confidence
//! 4. Rank by relevance
//! 5. Aggregate consensus and summarize each paper
//!
//! A failing component never fails the analysis. Its output is replaced by a
//! documented fallback, the substitution is logged and counted in
//! [`ScoringStats`], and every input paper still appears in the report.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::ResearchChat;
use crate::cluster::{group_by_cluster, ClusterAssigner, DEFAULT_CLUSTER};
use crate::confidence::ConfidenceEstimator;
use crate::config::AnalysisConfig;
use crate::consensus::ConsensusAggregator;
use crate::history::SearchHistory;
use crate::models::{ConsensusResult, PaperRecord, PaperScores, ScoredPaper};
use crate::provider::PaperProvider;
use crate::relevance::RelevanceScorer;
use crate::summary::{PaperSummary, Summarizer};
use crate::vectorize::{CorpusVectors, TfIdfVectorizer, Vectorizer};

/// Errors caused by invalid caller input.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// The research question is empty after trimming
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    /// The paper budget is zero
    #[error("Invalid paper limit: {0}")]
    InvalidLimit(String),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Progress notifications emitted during a search.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The provider is being queried
    Fetching { query: String },

    /// Papers were retrieved
    Fetched { count: usize },

    /// Relevance, clusters and confidence are known for every paper
    Scored { papers: usize },

    /// `done` of `total` papers have been summarized
    Summarized { done: usize, total: usize },

    /// The report is complete
    Finished,
}

/// Receives progress notifications.
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Fallback substitutions made while scoring.
///
/// All zero when every component succeeded.
#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct ScoringStats {
    /// Vectorization failed; relevance and clusters are placeholders
    pub vectorize_fallback: bool,

    /// Clustering failed; every paper is in the default cluster
    pub cluster_fallback: bool,

    /// Papers whose confidence is the placeholder value
    pub confidence_fallbacks: usize,
}

impl ScoringStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_vectorize_fallback(&mut self) {
        self.vectorize_fallback = true;
    }

    pub fn record_cluster_fallback(&mut self) {
        self.cluster_fallback = true;
    }

    pub fn record_confidence_fallback(&mut self) {
        self.confidence_fallbacks += 1;
    }

    /// Whether any fallback was used.
    pub fn is_degraded(&self) -> bool {
        self.vectorize_fallback || self.cluster_fallback || self.confidence_fallbacks > 0
    }
}

/// Corpus-level statistics for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CorpusInsights {
    pub avg_relevance: f32,
    pub high_confidence_papers: usize,
    pub recent_papers_ratio: f32,
    pub cluster_count: usize,

    /// Cluster id mapped to the corpus indices of its members
    pub clusters: BTreeMap<i32, Vec<usize>>,
}

/// A ranked paper with its local summary.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedPaper {
    pub scored: ScoredPaper,
    pub summary: PaperSummary,
}

/// Everything produced for one research question.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub question: String,

    /// Papers ranked by relevance, most relevant first
    pub papers: Vec<AnalyzedPaper>,

    pub consensus: ConsensusResult,
    pub insights: CorpusInsights,
    pub stats: ScoringStats,
}

/// A report together with the vectors it was computed from.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: AnalysisReport,

    /// `None` when vectorization fell back or the corpus was empty
    pub vectors: Option<CorpusVectors>,
}

/// Result of a search through a provider.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The provider could not be reached
    FetchFailed(String),

    /// The provider answered with no papers
    NoResults,

    Completed(Box<AnalysisReport>),
}

/// Runs the scoring components over a set of papers.
///
/// Generic over the vectorizer so alternative text representations can be
/// plugged in; the default is TF-IDF.
pub struct ResearchAnalyzer<V: Vectorizer = TfIdfVectorizer> {
    vectorizer: V,
    scorer: RelevanceScorer,
    assigner: ClusterAssigner,
    estimator: ConfidenceEstimator,
    aggregator: ConsensusAggregator,
    summarizer: Summarizer,
    config: AnalysisConfig,
}

impl ResearchAnalyzer<TfIdfVectorizer> {
    /// Create an analyzer using the TF-IDF vectorizer.
    pub fn new(config: AnalysisConfig) -> Self {
        let vectorizer = TfIdfVectorizer::new(config.vectorizer.clone());
        Self::with_vectorizer(vectorizer, config)
    }
}

impl<V: Vectorizer> ResearchAnalyzer<V> {
    /// Create an analyzer with a custom vectorizer.
    ///
    /// # Arguments
    /// * `vectorizer` - Produces the document and query vectors
    /// * `config` - Settings for every other component
    pub fn with_vectorizer(vectorizer: V, config: AnalysisConfig) -> Self {
        Self {
            vectorizer,
            scorer: RelevanceScorer::new(),
            assigner: ClusterAssigner::new(config.clustering.clone()),
            estimator: ConfidenceEstimator::new(config.confidence.clone()),
            aggregator: ConsensusAggregator::new(
                config.consensus.clone(),
                config.confidence.clone(),
                config.insights.clone(),
            ),
            summarizer: Summarizer::new(&config.confidence),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    /// Score and rank papers.
    ///
    /// # Returns
    /// The ranked papers (same count as the input) and the vectors, if
    /// vectorization succeeded
    pub fn score(
        &self,
        papers: Vec<PaperRecord>,
        question: &str,
        stats: &mut ScoringStats,
    ) -> (Vec<ScoredPaper>, Option<CorpusVectors>) {
        if papers.is_empty() {
            return (Vec::new(), None);
        }

        let n = papers.len();
        let documents: Vec<String> = papers.iter().map(PaperRecord::document_text).collect();

        let fitted = self
            .vectorizer
            .fit_transform(&documents, question)
            .and_then(|vectors| vectors.check_shape(n).map(|()| vectors));

        let (relevance, clusters, vectors) = match fitted {
            Ok(vectors) => {
                let relevance = self.scorer.score(&vectors);
                let clusters = match self.assigner.assign(&vectors) {
                    Ok(clusters) => clusters,
                    Err(e) => {
                        warn!("Clustering failed, using default cluster: {}", e);
                        stats.record_cluster_fallback();
                        vec![DEFAULT_CLUSTER; n]
                    }
                };
                (relevance, clusters, Some(vectors))
            }
            Err(e) => {
                warn!(
                    "Vectorization failed, using relevance {}: {}",
                    self.config.confidence.fallback_relevance, e
                );
                stats.record_vectorize_fallback();
                (
                    vec![self.config.confidence.fallback_relevance; n],
                    vec![DEFAULT_CLUSTER; n],
                    None,
                )
            }
        };

        let insights = &self.config.insights;
        let mut scored: Vec<ScoredPaper> = papers
            .into_iter()
            .zip(relevance)
            .zip(clusters)
            .enumerate()
            .map(|(index, ((paper, relevance), cluster))| {
                let confidence = match self.estimator.estimate(&paper, relevance) {
                    Ok(confidence) => confidence,
                    Err(e) => {
                        warn!("Confidence estimate failed for '{}': {}", paper.title, e);
                        stats.record_confidence_fallback();
                        self.config.confidence.fallback_confidence
                    }
                };
                ScoredPaper::new(
                    index,
                    paper,
                    PaperScores::new(relevance, cluster, confidence),
                    insights.high_relevance_threshold,
                    insights.medium_relevance_threshold,
                )
            })
            .collect();

        self.scorer.rank(&mut scored);
        (scored, vectors)
    }

    /// Run the full analysis.
    ///
    /// # Arguments
    /// * `papers` - Paper records, in provider order
    /// * `question` - The research question
    /// * `listener` - Receives progress events
    ///
    /// # Errors
    /// Returns `AnalysisError::InvalidQuestion` if the question is blank
    pub fn run(
        &self,
        papers: Vec<PaperRecord>,
        question: &str,
        listener: &dyn ProgressListener,
    ) -> AnalysisResult<Analysis> {
        let question = validate_question(question)?;
        let mut stats = ScoringStats::new();

        let (scored, vectors) = self.score(papers, question, &mut stats);
        listener.on_event(&ProgressEvent::Scored { papers: scored.len() });

        let consensus = self.aggregator.aggregate(&scored, question);

        let total = scored.len();
        let mut analyzed = Vec::with_capacity(total);
        for (i, paper) in scored.into_iter().enumerate() {
            let summary = self.summarizer.summarize(&paper);
            analyzed.push(AnalyzedPaper { scored: paper, summary });
            listener.on_event(&ProgressEvent::Summarized { done: i + 1, total });
        }

        let insights = self.insights(&analyzed);
        if stats.is_degraded() {
            warn!("Analysis used fallback scores: {:?}", stats);
        }
        info!(
            "Analyzed {} papers: {} ({:.1}% positive)",
            total, consensus.verdict, consensus.percentage
        );
        listener.on_event(&ProgressEvent::Finished);

        Ok(Analysis {
            report: AnalysisReport {
                question: question.to_string(),
                papers: analyzed,
                consensus,
                insights,
                stats,
            },
            vectors,
        })
    }

    /// Run the full analysis and keep only the report.
    ///
    /// # Errors
    /// Returns `AnalysisError::InvalidQuestion` if the question is blank
    pub fn analyze(
        &self,
        papers: Vec<PaperRecord>,
        question: &str,
        listener: &dyn ProgressListener,
    ) -> AnalysisResult<AnalysisReport> {
        self.run(papers, question, listener).map(|analysis| analysis.report)
    }

    fn insights(&self, papers: &[AnalyzedPaper]) -> CorpusInsights {
        let n = papers.len().max(1) as f32;
        let clusters = group_by_cluster(papers.iter().map(|p| &p.scored));
        let distinct: BTreeSet<i32> = clusters.keys().copied().collect();

        CorpusInsights {
            avg_relevance: papers.iter().map(|p| p.scored.scores.relevance).sum::<f32>() / n,
            high_confidence_papers: papers
                .iter()
                .filter(|p| p.scored.scores.confidence > self.config.confidence.high_threshold)
                .count(),
            recent_papers_ratio: papers
                .iter()
                .filter(|p| p.scored.paper.year >= self.config.insights.recent_year)
                .count() as f32
                / n,
            cluster_count: distinct.len(),
            clusters,
        }
    }
}

fn validate_question(question: &str) -> AnalysisResult<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::InvalidQuestion(
            "question must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// A paper similar to another one in the last search.
#[derive(Debug, Clone)]
pub struct SimilarPaper<'a> {
    /// 1-based rank in the report
    pub rank: usize,
    pub paper: &'a AnalyzedPaper,
    pub similarity: f32,
}

/// State kept across searches: the last analysis, the search log and the
/// follow-up conversation.
///
/// Searches take `&mut self`, so one session runs one search at a time.
pub struct ResearchSession<V: Vectorizer = TfIdfVectorizer> {
    analyzer: ResearchAnalyzer<V>,
    last: Option<Analysis>,
    history: SearchHistory,
    chat: ResearchChat,
}

impl ResearchSession<TfIdfVectorizer> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_analyzer(ResearchAnalyzer::new(config))
    }
}

impl<V: Vectorizer> ResearchSession<V> {
    pub fn with_analyzer(analyzer: ResearchAnalyzer<V>) -> Self {
        Self {
            analyzer,
            last: None,
            history: SearchHistory::new(),
            chat: ResearchChat::new(),
        }
    }

    /// Fetch papers for a question and analyze them.
    ///
    /// # Arguments
    /// * `question` - The research question
    /// * `limit` - Paper budget, capped at `search.max_papers`
    /// * `provider` - Source of paper records
    /// * `listener` - Receives progress events
    ///
    /// # Returns
    /// `FetchFailed` or `NoResults` when the provider has nothing to analyze;
    /// otherwise the completed report, which also becomes the session's last
    /// analysis
    ///
    /// # Errors
    /// Returns `AnalysisError` for a blank question or a zero limit, before
    /// the provider is called
    pub async fn search<P>(
        &mut self,
        question: &str,
        limit: usize,
        provider: &P,
        listener: &dyn ProgressListener,
    ) -> AnalysisResult<SearchOutcome>
    where
        P: PaperProvider + ?Sized,
    {
        let question = validate_question(question)?;
        if limit == 0 {
            return Err(AnalysisError::InvalidLimit(
                "at least one paper must be requested".to_string(),
            ));
        }
        let limit = limit.min(self.analyzer.config().search.max_papers);

        listener.on_event(&ProgressEvent::Fetching {
            query: question.to_string(),
        });

        let papers = match provider.search(question, limit).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!("Provider '{}' failed: {}", provider.name(), e);
                return Ok(SearchOutcome::FetchFailed(e.to_string()));
            }
        };
        listener.on_event(&ProgressEvent::Fetched { count: papers.len() });

        if papers.is_empty() {
            info!("No papers found for '{}'", question);
            return Ok(SearchOutcome::NoResults);
        }

        let analysis = self.analyzer.run(papers, question, listener)?;
        self.history.record(
            question,
            analysis.report.papers.len(),
            &analysis.report.consensus,
        );
        self.chat.clear();

        let report = analysis.report.clone();
        self.last = Some(analysis);
        Ok(SearchOutcome::Completed(Box::new(report)))
    }

    /// The report of the last completed search.
    pub fn last_report(&self) -> Option<&AnalysisReport> {
        self.last.as_ref().map(|analysis| &analysis.report)
    }

    /// Papers most similar to the one at `rank` (1-based) in the last report.
    ///
    /// Empty when there is no last search, vectorization fell back, or the
    /// rank is out of range.
    pub fn similar_papers(&self, rank: usize, top_k: usize) -> Vec<SimilarPaper<'_>> {
        let Some(analysis) = &self.last else {
            return Vec::new();
        };
        let Some(vectors) = &analysis.vectors else {
            return Vec::new();
        };
        let papers = &analysis.report.papers;
        let Some(target) = rank.checked_sub(1).and_then(|i| papers.get(i)) else {
            return Vec::new();
        };

        self.analyzer
            .scorer()
            .similar_papers(vectors, target.scored.corpus_index, top_k)
            .into_iter()
            .filter_map(|(corpus_index, similarity)| {
                papers
                    .iter()
                    .position(|p| p.scored.corpus_index == corpus_index)
                    .map(|position| SimilarPaper {
                        rank: position + 1,
                        paper: &papers[position],
                        similarity,
                    })
            })
            .collect()
    }

    /// Answer a follow-up question about the last report.
    pub fn ask(&mut self, question: &str) -> String {
        let papers = self
            .last
            .as_ref()
            .map(|analysis| analysis.report.papers.as_slice())
            .unwrap_or(&[]);
        self.chat.respond(question, papers)
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn chat(&self) -> &ResearchChat {
        &self.chat
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.analyzer.config()
    }
}
