//! Paper Consensus - relevance, clustering and consensus scoring for research papers.
//!
//! This library retrieves academic papers for a research question, scores
//! them with classical bag-of-words techniques and estimates whether the
//! literature leans for or against the question.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (PaperRecord, PaperScores, ConsensusResult, etc.)
//! - **config**: Layered configuration with every threshold and keyword list
//! - **vectorize**: TF-IDF vectors for papers and the query in one space
//! - **relevance**: Cosine similarity scoring and ranking
//! - **cluster**: Seeded k-means grouping of papers into themes
//! - **confidence**: Per-paper confidence from relevance and metadata
//! - **consensus**: Keyword polarity aggregated into a verdict
//! - **summary**: Local per-paper summaries
//! - **chat**: Pattern-based answers to follow-up questions
//! - **history**: Log of searches made in a session
//! - **provider**: Paper sources (Semantic Scholar API, JSON files)
//! - **pipeline**: Wires the components together
//!
//! # Workflow
//!
//! 1. Fetch papers for the question from a provider
//! 2. Vectorize paper text and the question together
//! 3. Score relevance, assign clusters, estimate confidence
//! 4. Rank papers by relevance
//! 5. Aggregate keyword polarity into a consensus verdict
//!
//! # Example
//!
//! ```ignore
//! use paper_consensus::{
//!     config::AnalysisConfig,
//!     pipeline::{NoProgress, ResearchAnalyzer},
//!     provider::{JsonFileProvider, PaperProvider},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::load(None)?;
//!     let provider = JsonFileProvider::new("papers.json");
//!     let papers = provider.search("sleep and memory", 20).await?;
//!
//!     let analyzer = ResearchAnalyzer::new(config);
//!     let report = analyzer.analyze(papers, "Does sleep improve memory?", &NoProgress)?;
//!
//!     for paper in &report.papers {
//!         println!("{}: {:.2}", paper.scored.paper.title, paper.scored.scores.relevance);
//!     }
//!     println!("{}", report.consensus.explanation);
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod chat;
pub mod cluster;
pub mod confidence;
pub mod config;
pub mod consensus;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod relevance;
pub mod summary;
pub mod vectorize;

// Re-export commonly used types at the crate root
pub use config::AnalysisConfig;
pub use models::{
    ConsensusResult, ConsensusVerdict, PaperRecord, PaperScores, RelevanceLevel, ScoredPaper,
};
pub use pipeline::{
    AnalysisReport, ProgressEvent, ProgressListener, ResearchAnalyzer, ResearchSession,
    SearchOutcome,
};
pub use provider::PaperProvider;
pub use vectorize::Vectorizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
