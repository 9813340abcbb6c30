//! Paper provider module.
//!
//! This module defines the interface for sourcing paper records and includes
//! implementations for the Semantic Scholar search API and local JSON files.
//!
//! The `PaperProvider` trait abstracts the source of paper data, allowing the
//! analysis session to work with different backends without coupling to
//! specific implementations.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::models::PaperRecord;

pub mod json;
pub mod semantic_scholar;

pub use json::JsonFileProvider;
pub use semantic_scholar::SemanticScholarProvider;

/// Errors that can occur when fetching papers from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),

    /// API rate limit exceeded, even after backing off
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The API answered with a non-success status
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for sourcing paper records for a research question.
///
/// # Design Notes
///
/// - An empty result is not an error; it means nothing matched
/// - Providers only return records with a non-empty title and abstract
/// - Providers are responsible for their own rate limiting and retries
#[async_trait]
pub trait PaperProvider: Send + Sync {
    /// Search for papers matching a query.
    ///
    /// # Arguments
    /// * `query` - The research question or keywords
    /// * `limit` - Maximum number of papers to return
    ///
    /// # Returns
    /// Up to `limit` complete paper records, possibly none
    ///
    /// # Errors
    /// Returns `ProviderError` if the source cannot be reached or parsed
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<PaperRecord>>;

    /// Get a human-readable name/description of this provider.
    ///
    /// This is useful for logging and debugging.
    fn name(&self) -> &str;
}

/// Turn a natural-language question into a keyword query.
///
/// Lowercases, drops question words (does, what, how, ...), replaces
/// punctuation other than hyphens with spaces and collapses whitespace.
pub fn clean_query(query: &str) -> String {
    static QUESTION_WORDS: OnceLock<Regex> = OnceLock::new();
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();

    let question_words = QUESTION_WORDS.get_or_init(|| {
        Regex::new(r"\b(does|do|is|are|what|how|why|when|where|can|will|should)\b")
            .expect("question word pattern is valid")
    });
    let punctuation =
        PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s-]").expect("punctuation pattern is valid"));

    let lowered = query.to_lowercase();
    let without_questions = question_words.replace_all(&lowered, "");
    let without_punctuation = punctuation.replace_all(&without_questions, " ");
    without_punctuation.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop incomplete records and cap the list at `limit`.
pub(crate) fn retain_complete(papers: Vec<PaperRecord>, limit: usize) -> Vec<PaperRecord> {
    papers
        .into_iter()
        .filter(|paper| !paper.is_incomplete())
        .take(limit)
        .collect()
}
