//! Thematic clustering of papers.
//!
//! Papers are partitioned with k-means over their document vectors (the query
//! row is excluded). Initialization is k-means++ driven by a seeded ChaCha8
//! RNG, so identical corpora always produce identical labels.
//!
//! Small corpora are not clustered: below the configured minimum every paper
//! is placed in cluster 0. Cluster ids carry no ordering meaning.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

use crate::config::ClusteringConfig;
use crate::models::ScoredPaper;
use crate::vectorize::CorpusVectors;

/// Errors that can occur during clustering.
#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    /// Rows have different lengths or contain non-finite values
    #[error("Invalid input vectors: {0}")]
    InvalidInput(String),
}

/// Result type for clustering operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Cluster id given to every paper when clustering is skipped.
pub const DEFAULT_CLUSTER: i32 = 0;

/// Assigns papers to clusters.
#[derive(Debug, Clone)]
pub struct ClusterAssigner {
    config: ClusteringConfig,
}

impl ClusterAssigner {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// Number of clusters that will be used for a corpus of `n` papers.
    pub fn cluster_count(&self, n: usize) -> usize {
        if n == 0 {
            0
        } else if n <= self.config.min_papers {
            1
        } else {
            self.config.max_clusters.min(n)
        }
    }

    /// Cluster id for every document, in corpus order.
    ///
    /// # Errors
    /// Returns `ClusterError::InvalidInput` if the document rows are ragged or
    /// contain NaN/infinite values
    pub fn assign(&self, vectors: &CorpusVectors) -> ClusterResult<Vec<i32>> {
        let documents = vectors.documents();
        let n = documents.len();

        if n <= self.config.min_papers {
            debug!("Skipping clustering for {} papers", n);
            return Ok(vec![DEFAULT_CLUSTER; n]);
        }

        let k = self.cluster_count(n);
        let labels = self.kmeans(documents, k)?;
        Ok(labels.into_iter().map(|label| label as i32).collect())
    }

    /// Lloyd's algorithm with k-means++ seeding.
    fn kmeans(&self, points: &[Vec<f32>], k: usize) -> ClusterResult<Vec<usize>> {
        let dim = points.first().map(Vec::len).unwrap_or(0);
        for (i, point) in points.iter().enumerate() {
            if point.len() != dim {
                return Err(ClusterError::InvalidInput(format!(
                    "row {} has {} dimensions, expected {}",
                    i,
                    point.len(),
                    dim
                )));
            }
            if point.iter().any(|x| !x.is_finite()) {
                return Err(ClusterError::InvalidInput(format!(
                    "row {} contains a non-finite value",
                    i
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut centroids = kmeans_plus_plus_init(points, k, &mut rng);
        let mut labels = vec![0usize; points.len()];

        for iteration in 0..self.config.max_iterations {
            for (label, point) in labels.iter_mut().zip(points) {
                *label = nearest_centroid(point, &centroids);
            }

            let updated = compute_centroids(points, &labels, &centroids);
            let shift = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new).sqrt())
                .fold(0.0f32, f32::max);
            centroids = updated;

            if shift < self.config.tolerance {
                debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        Ok(labels)
    }
}

/// Choose `k` initial centroids, each new one sampled with probability
/// proportional to its squared distance from the nearest chosen centroid.
fn kmeans_plus_plus_init(points: &[Vec<f32>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    let mut min_distances = vec![f32::MAX; n];

    while centroids.len() < k {
        if let Some(last) = centroids.last() {
            for (i, point) in points.iter().enumerate() {
                min_distances[i] = min_distances[i].min(squared_distance(point, last));
            }
        }

        let total: f32 = min_distances.iter().sum();
        let next = if total <= 0.0 {
            // Every point coincides with a centroid.
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f32>() * total;
            let mut chosen = n - 1;
            for (i, &distance) in min_distances.iter().enumerate() {
                if target < distance {
                    chosen = i;
                    break;
                }
                target -= distance;
            }
            chosen
        };
        centroids.push(points[next].clone());
    }

    centroids
}

fn nearest_centroid(point: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Mean of the points assigned to each cluster. Empty clusters keep their
/// previous centroid.
fn compute_centroids(points: &[Vec<f32>], labels: &[usize], previous: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let dim = previous.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0f32; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (sum, x) in sums[label].iter_mut().zip(point) {
            *sum += x;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((mut sum, count), old)| {
            if count == 0 {
                return old.clone();
            }
            for value in sum.iter_mut() {
                *value /= count as f32;
            }
            sum
        })
        .collect()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Group papers by cluster id for display.
///
/// # Returns
/// Cluster id mapped to the corpus indices of its members, in the order the
/// papers appear in `papers`
pub fn group_by_cluster<'a, I>(papers: I) -> BTreeMap<i32, Vec<usize>>
where
    I: IntoIterator<Item = &'a ScoredPaper>,
{
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for paper in papers {
        groups
            .entry(paper.scores.cluster)
            .or_default()
            .push(paper.corpus_index);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperRecord, PaperScores};
    use crate::vectorize::{TfIdfVectorizer, Vectorizer};

    fn corpus(texts: &[&str]) -> CorpusVectors {
        let documents: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        TfIdfVectorizer::default()
            .fit_transform(&documents, "query")
            .unwrap()
    }

    fn assigner() -> ClusterAssigner {
        ClusterAssigner::new(ClusteringConfig::default())
    }

    #[test]
    fn test_small_corpus_uses_default_cluster() {
        let vectors = corpus(&["sleep memory", "diet weight", "exercise mood", "coffee focus"]);
        let labels = assigner().assign(&vectors).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 0]);
        assert_eq!(assigner().cluster_count(4), 1);
    }

    #[test]
    fn test_labels_within_range() {
        let vectors = corpus(&[
            "sleep memory consolidation",
            "sleep deprivation memory",
            "diet weight loss",
            "diet calorie weight",
            "solar panel efficiency",
            "solar cell efficiency",
        ]);
        let labels = assigner().assign(&vectors).unwrap();

        assert_eq!(labels.len(), 6);
        assert!(labels.iter().all(|&l| (0..3).contains(&l)));
    }

    #[test]
    fn test_separates_distinct_topics() {
        let vectors = corpus(&[
            "sleep memory consolidation",
            "sleep memory consolidation",
            "diet weight calorie",
            "diet weight calorie",
            "solar panel efficiency",
            "solar panel efficiency",
        ]);
        let labels = assigner().assign(&vectors).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[4], labels[5]);
    }

    #[test]
    fn test_clustering_is_reproducible() {
        let vectors = corpus(&[
            "alpha beta", "beta gamma", "gamma delta", "delta epsilon", "epsilon zeta",
            "zeta theta", "theta iota",
        ]);
        let first = assigner().assign(&vectors).unwrap();
        let second = assigner().assign(&vectors).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_k_capped_by_corpus_size() {
        let assigner = ClusterAssigner::new(ClusteringConfig {
            max_clusters: 10,
            min_papers: 1,
            ..ClusteringConfig::default()
        });
        let vectors = corpus(&["alpha beta", "gamma delta", "epsilon zeta"]);
        let labels = assigner.assign(&vectors).unwrap();

        assert_eq!(assigner.cluster_count(3), 3);
        assert!(labels.iter().all(|&l| (0..3).contains(&l)));
    }

    #[test]
    fn test_identical_documents() {
        let vectors = corpus(&["same text here"; 6]);
        let labels = assigner().assign(&vectors).unwrap();
        assert!(labels.iter().all(|&l| (0..3).contains(&l)));
    }

    #[test]
    fn test_group_by_cluster() {
        let papers: Vec<ScoredPaper> = [(0, 1), (1, 0), (2, 1)]
            .iter()
            .map(|&(index, cluster)| {
                ScoredPaper::new(
                    index,
                    PaperRecord::new("T", "A", 2020),
                    PaperScores::new(0.5, cluster, 0.5),
                    0.6,
                    0.3,
                )
            })
            .collect();

        let groups = group_by_cluster(&papers);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&0], vec![1]);
        assert_eq!(groups[&1], vec![0, 2]);
    }
}
