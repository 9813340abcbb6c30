//! Relevance scoring and ranking.
//!
//! Relevance is the cosine similarity between a paper's vector and the
//! query's vector in the shared [`CorpusVectors`] space. The same similarity
//! drives "papers like this one" lookups.

use std::cmp::Ordering;

use crate::models::{clamp_unit, ScoredPaper};
use crate::vectorize::CorpusVectors;

/// Compute cosine similarity between two vectors.
///
/// Ranges from -1 to 1, where 1 means the vectors point in the same
/// direction. A zero-magnitude vector has similarity 0 with everything, and
/// vectors of different lengths are compared over their common prefix.
///
/// # Arguments
/// * `a` - First vector
/// * `b` - Second vector
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Scores documents against the query row of a corpus.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer;

impl RelevanceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Relevance of every document to the query, in corpus order.
    ///
    /// Each score is clamped into [0, 1].
    pub fn score(&self, vectors: &CorpusVectors) -> Vec<f32> {
        let query = vectors.query();
        vectors
            .documents()
            .iter()
            .map(|row| clamp_unit(cosine_similarity(row, query)))
            .collect()
    }

    /// Sort papers by relevance, highest first.
    ///
    /// The sort is stable: papers with equal relevance keep their order.
    pub fn rank(&self, papers: &mut [ScoredPaper]) {
        papers.sort_by(|a, b| {
            b.scores
                .relevance
                .partial_cmp(&a.scores.relevance)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Find the documents most similar to document `index`.
    ///
    /// # Arguments
    /// * `vectors` - The corpus the index refers to
    /// * `index` - Corpus index of the target document
    /// * `top_k` - Maximum number of neighbours to return
    ///
    /// # Returns
    /// `(corpus_index, similarity)` pairs, most similar first, never
    /// including `index` itself. Empty when `index` is out of range.
    pub fn similar_papers(&self, vectors: &CorpusVectors, index: usize, top_k: usize) -> Vec<(usize, f32)> {
        let Some(target) = vectors.document(index) else {
            return Vec::new();
        };

        let mut neighbours: Vec<(usize, f32)> = vectors
            .documents()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(i, row)| (i, cosine_similarity(row, target)))
            .collect();

        neighbours.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        neighbours.truncate(top_k);
        neighbours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperRecord, PaperScores};
    use crate::vectorize::{TfIdfVectorizer, Vectorizer};

    fn scored(index: usize, relevance: f32) -> ScoredPaper {
        ScoredPaper::new(
            index,
            PaperRecord::new(format!("Paper {}", index), "Abstract", 2020),
            PaperScores::new(relevance, 0, 0.5),
            0.6,
            0.3,
        )
    }

    fn corpus(texts: &[&str], query: &str) -> CorpusVectors {
        let documents: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        TfIdfVectorizer::default().fit_transform(&documents, query).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_similarity(&a, &b) - 0.0).abs() < 1e-6);

        let a = vec![1.0, 1.0];
        let b = vec![1.0, 1.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_scores_follow_query_overlap() {
        let vectors = corpus(
            &[
                "caffeine improves reaction time in athletes",
                "soil bacteria in tropical forests",
            ],
            "caffeine reaction time",
        );
        let scores = RelevanceScorer::new().score(&vectors);

        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
        assert_eq!(scores[1], 0.0);
        for score in scores {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_rank_descending() {
        let mut papers = vec![scored(0, 0.2), scored(1, 0.9), scored(2, 0.5)];
        RelevanceScorer::new().rank(&mut papers);

        let order: Vec<usize> = papers.iter().map(|p| p.corpus_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut papers = vec![scored(0, 0.5), scored(1, 0.7), scored(2, 0.5), scored(3, 0.5)];
        RelevanceScorer::new().rank(&mut papers);

        let order: Vec<usize> = papers.iter().map(|p| p.corpus_index).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_similar_papers_excludes_target() {
        let vectors = corpus(
            &[
                "deep learning for protein folding",
                "protein folding with deep networks",
                "medieval trade routes",
            ],
            "protein",
        );
        let similar = RelevanceScorer::new().similar_papers(&vectors, 0, 3);

        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].0, 1);
        assert!(similar.iter().all(|(i, _)| *i != 0));
        assert!(similar[0].1 >= similar[1].1);
    }

    #[test]
    fn test_similar_papers_top_k_and_bounds() {
        let vectors = corpus(&["alpha beta", "beta gamma", "gamma delta"], "beta");
        let scorer = RelevanceScorer::new();

        assert_eq!(scorer.similar_papers(&vectors, 1, 1).len(), 1);
        assert!(scorer.similar_papers(&vectors, 3, 3).is_empty());
    }
}
