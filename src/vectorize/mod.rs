//! Text vectorization.
//!
//! This module turns paper documents and the research question into vectors
//! in one shared space. The query is vectorized as the last row of the same
//! corpus as the documents: vectorizing it on its own would produce a
//! different vocabulary and the similarities would be meaningless.
//!
//! The default implementation is a bag-of-n-grams TF-IDF weighting with a
//! fixed English stop-word list, smoothed idf and L2-normalized rows.

mod stop_words;

use std::collections::{HashMap, HashSet};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::config::VectorizerConfig;

pub use stop_words::ENGLISH_STOP_WORDS;

/// Errors that can occur during vectorization.
#[derive(Debug, Error, PartialEq)]
pub enum VectorizeError {
    /// There were no documents to vectorize
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Every token was a stop word or too short
    #[error("Empty vocabulary: {0}")]
    EmptyVocabulary(String),

    /// Rows do not match the corpus size or the vocabulary dimension
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Result type for vectorization operations.
pub type VectorizeResult<T> = Result<T, VectorizeError>;

/// Dense vectors for one search: N document rows followed by the query row.
///
/// Built from scratch for every search and never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusVectors {
    vocabulary: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl CorpusVectors {
    /// Build from precomputed rows, the query row last.
    ///
    /// Used by alternative [`Vectorizer`] implementations.
    pub fn from_rows(vocabulary: Vec<String>, rows: Vec<Vec<f32>>) -> Self {
        Self { vocabulary, rows }
    }

    /// Number of document rows (the query row is not counted).
    pub fn document_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Feature dimension shared by every row.
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    /// The terms behind each dimension, in index order.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// All document rows, excluding the query.
    pub fn documents(&self) -> &[Vec<f32>] {
        &self.rows[..self.document_count()]
    }

    /// A single document row.
    pub fn document(&self, index: usize) -> Option<&[f32]> {
        self.documents().get(index).map(Vec::as_slice)
    }

    /// The query row.
    pub fn query(&self) -> &[f32] {
        self.rows.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check that there is one row per document plus the query row, each
    /// with `dimension()` entries.
    ///
    /// # Errors
    /// Returns `VectorizeError::ShapeMismatch` describing the first problem
    pub fn check_shape(&self, documents: usize) -> VectorizeResult<()> {
        if self.rows.len() != documents + 1 {
            return Err(VectorizeError::ShapeMismatch(format!(
                "expected {} rows ({} documents and the query), got {}",
                documents + 1,
                documents,
                self.rows.len()
            )));
        }
        let dim = self.dimension();
        if let Some((i, row)) = self.rows.iter().enumerate().find(|(_, row)| row.len() != dim) {
            return Err(VectorizeError::ShapeMismatch(format!(
                "row {} has {} dimensions, expected {}",
                i,
                row.len(),
                dim
            )));
        }
        Ok(())
    }
}

/// Trait for text vectorizers.
///
/// Implementors turn a corpus of documents plus one query into comparable
/// vectors in a shared space.
pub trait Vectorizer: Send + Sync {
    /// Vectorize `documents` and `query` together.
    ///
    /// # Arguments
    /// * `documents` - One text per paper, in corpus order
    /// * `query` - The research question
    ///
    /// # Returns
    /// `documents.len() + 1` rows, the query last
    ///
    /// # Errors
    /// Returns `VectorizeError::EmptyCorpus` when `documents` is empty and
    /// `VectorizeError::EmptyVocabulary` when no terms survive tokenization
    fn fit_transform(&self, documents: &[String], query: &str) -> VectorizeResult<CorpusVectors>;
}

/// TF-IDF vectorizer over word n-grams.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    config: VectorizerConfig,
    token_pattern: Regex,
    stop_words: HashSet<&'static str>,
}

impl TfIdfVectorizer {
    /// Create a new vectorizer.
    ///
    /// # Arguments
    /// * `config` - Feature cap and n-gram range
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            token_pattern: Regex::new(r"\b\w\w+\b").expect("Invalid token pattern"),
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Split text into lowercase n-grams, dropping stop words first.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(token))
            .collect();

        let mut terms = Vec::new();
        for n in self.config.ngram_min..=self.config.ngram_max {
            if n == 0 || tokens.len() < n {
                continue;
            }
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }

    /// Keep the `max_features` most frequent terms, ties broken
    /// alphabetically, then index the survivors alphabetically.
    fn select_vocabulary(&self, corpus_frequency: &HashMap<String, u64>) -> Vec<String> {
        let mut ranked: Vec<(&String, u64)> =
            corpus_frequency.iter().map(|(term, &count)| (term, count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.config.max_features);

        let mut vocabulary: Vec<String> = ranked.into_iter().map(|(term, _)| term.clone()).collect();
        vocabulary.sort();
        vocabulary
    }
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}

impl Vectorizer for TfIdfVectorizer {
    fn fit_transform(&self, documents: &[String], query: &str) -> VectorizeResult<CorpusVectors> {
        if documents.is_empty() {
            return Err(VectorizeError::EmptyCorpus(
                "at least one document is required".to_string(),
            ));
        }

        let row_counts: Vec<HashMap<String, u32>> = documents
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(query))
            .map(|text| {
                let mut counts = HashMap::new();
                for term in self.analyze(text) {
                    *counts.entry(term).or_insert(0u32) += 1;
                }
                counts
            })
            .collect();

        let mut corpus_frequency: HashMap<String, u64> = HashMap::new();
        let mut document_frequency: HashMap<String, u32> = HashMap::new();
        for counts in &row_counts {
            for (term, &count) in counts {
                *corpus_frequency.entry(term.clone()).or_insert(0) += count as u64;
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        if corpus_frequency.is_empty() {
            return Err(VectorizeError::EmptyVocabulary(
                "no terms remain after stop-word removal".to_string(),
            ));
        }

        let vocabulary = self.select_vocabulary(&corpus_frequency);
        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.as_str(), i))
            .collect();

        let n_rows = row_counts.len() as f32;
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f32;
                ((1.0 + n_rows) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let rows: Vec<Vec<f32>> = row_counts
            .iter()
            .map(|counts| {
                let mut row = vec![0.0f32; vocabulary.len()];
                for (term, &count) in counts {
                    if let Some(&j) = index.get(term.as_str()) {
                        row[j] = count as f32 * idf[j];
                    }
                }
                l2_normalize(&mut row);
                row
            })
            .collect();

        debug!(
            "Vectorized {} documents into {} features",
            documents.len(),
            vocabulary.len()
        );

        Ok(CorpusVectors { vocabulary, rows })
    }
}

/// Scale a vector to unit length in place. A zero vector is left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Normalizes free text for matching:
/// lowercase, trimmed, with whitespace runs collapsed to one space.
///
/// # Example
/// ```ignore
/// let normalized = normalize_text("  Hello   World  ");
/// assert_eq!(normalized, "hello world");
/// ```
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_check_shape() {
        let vocabulary = vec!["a".to_string(), "b".to_string()];
        let good = CorpusVectors::from_rows(vocabulary.clone(), vec![vec![1.0, 0.0]; 3]);
        assert!(good.check_shape(2).is_ok());

        let missing_query = CorpusVectors::from_rows(vocabulary.clone(), vec![vec![1.0, 0.0]; 2]);
        assert!(matches!(missing_query.check_shape(2), Err(VectorizeError::ShapeMismatch(_))));

        let short_query = CorpusVectors::from_rows(
            vocabulary,
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0]],
        );
        assert!(matches!(short_query.check_shape(2), Err(VectorizeError::ShapeMismatch(_))));
    }

    #[test]
    fn test_fit_transform_shape_is_valid() {
        let documents = docs(&["sleep memory", "diet weight", "exercise mood"]);
        let vectors = TfIdfVectorizer::default().fit_transform(&documents, "sleep").unwrap();
        assert!(vectors.check_shape(3).is_ok());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Hello World"), "hello world");
        assert_eq!(normalize_text("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_text("UPPERCASE"), "uppercase");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_analyze_removes_stop_words_before_bigrams() {
        let vectorizer = TfIdfVectorizer::default();
        let terms = vectorizer.analyze("The effect of exercise on the memory");

        assert!(terms.contains(&"effect".to_string()));
        assert!(terms.contains(&"exercise memory".to_string()));
        assert!(terms.contains(&"effect exercise".to_string()));
        assert!(!terms.iter().any(|t| t.contains("the")));
    }

    #[test]
    fn test_analyze_drops_single_characters() {
        let vectorizer = TfIdfVectorizer::default();
        let terms = vectorizer.analyze("x y vitamin d");
        assert_eq!(terms, vec!["vitamin".to_string()]);
    }

    #[test]
    fn test_rows_include_query_last() {
        let vectorizer = TfIdfVectorizer::default();
        let vectors = vectorizer
            .fit_transform(&docs(&["coffee improves focus", "tea reduces stress"]), "coffee focus")
            .unwrap();

        assert_eq!(vectors.document_count(), 2);
        assert_eq!(vectors.documents().len(), 2);
        assert_eq!(vectors.query().len(), vectors.dimension());

        let coffee = vectors.vocabulary().iter().position(|t| t == "coffee").unwrap();
        assert!(vectors.query()[coffee] > 0.0);
        assert!(vectors.document(0).unwrap()[coffee] > 0.0);
        assert_eq!(vectors.document(1).unwrap()[coffee], 0.0);
        assert!(vectors.document(2).is_none());
    }

    #[test]
    fn test_rows_are_unit_length() {
        let vectorizer = TfIdfVectorizer::default();
        let vectors = vectorizer
            .fit_transform(&docs(&["sleep memory consolidation", "sleep deprivation"]), "sleep")
            .unwrap();

        for row in vectors.documents() {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unknown_query_is_zero_row() {
        let vectorizer = TfIdfVectorizer::default();
        let vectors = vectorizer
            .fit_transform(&docs(&["sleep memory"]), "the of and")
            .unwrap();
        assert!(vectors.query().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_vocabulary_is_capped_and_sorted() {
        let vectorizer = TfIdfVectorizer::new(VectorizerConfig {
            max_features: 3,
            ngram_min: 1,
            ngram_max: 1,
        });
        let vectors = vectorizer
            .fit_transform(
                &docs(&["apple apple apple banana banana cherry", "date"]),
                "apple",
            )
            .unwrap();

        assert_eq!(vectors.dimension(), 3);
        assert_eq!(vectors.vocabulary(), &["apple", "banana", "cherry"]);
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let vectorizer = TfIdfVectorizer::new(VectorizerConfig {
            max_features: 100,
            ngram_min: 1,
            ngram_max: 1,
        });
        let vectors = vectorizer
            .fit_transform(&docs(&["common rare", "common", "common"]), "query")
            .unwrap();

        let common = vectors.vocabulary().iter().position(|t| t == "common").unwrap();
        let rare = vectors.vocabulary().iter().position(|t| t == "rare").unwrap();
        let row = vectors.document(0).unwrap();
        assert!(row[rare] > row[common]);
    }

    #[test]
    fn test_empty_corpus() {
        let vectorizer = TfIdfVectorizer::default();
        let result = vectorizer.fit_transform(&[], "query");
        assert!(matches!(result, Err(VectorizeError::EmptyCorpus(_))));
    }

    #[test]
    fn test_empty_vocabulary() {
        let vectorizer = TfIdfVectorizer::default();
        let result = vectorizer.fit_transform(&docs(&["the and of", "a"]), "is it");
        assert!(matches!(result, Err(VectorizeError::EmptyVocabulary(_))));
    }

    #[test]
    fn test_deterministic() {
        let vectorizer = TfIdfVectorizer::default();
        let corpus = docs(&["neural networks learn", "networks of neurons", "learning rates"]);
        let a = vectorizer.fit_transform(&corpus, "neural learning").unwrap();
        let b = vectorizer.fit_transform(&corpus, "neural learning").unwrap();
        assert_eq!(a, b);
    }
}
