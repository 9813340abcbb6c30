//! Analysis configuration.
//!
//! Every threshold, keyword list and tuning knob used by the scoring pipeline
//! lives in [`AnalysisConfig`]. Components receive the section they need at
//! construction time; nothing reads configuration from global state.
//!
//! Configuration is layered, lowest priority first:
//!
//! 1. Compiled-in defaults (see [`defaults`])
//! 2. An optional TOML file (any subset of keys may be present)
//! 3. Environment variable overrides
//! 4. CLI flags, applied by the binary after loading

pub mod defaults;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Config file not readable: {path}: {message}")]
    FileNotReadable { path: String, message: String },

    /// The configuration file is not valid TOML for this schema
    #[error("Config parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    /// A value is outside its permitted range
    #[error("Invalid config value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// TF-IDF vectorizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Maximum vocabulary size (feature dimension)
    pub max_features: usize,
    /// Smallest n-gram length
    pub ngram_min: usize,
    /// Largest n-gram length
    pub ngram_max: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: defaults::DEFAULT_MAX_FEATURES,
            ngram_min: defaults::DEFAULT_NGRAM_MIN,
            ngram_max: defaults::DEFAULT_NGRAM_MAX,
        }
    }
}

/// K-means clustering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Upper bound on the number of clusters
    pub max_clusters: usize,
    /// Clustering runs only when the corpus has strictly more papers than this
    pub min_papers: usize,
    /// RNG seed for k-means++ initialization
    pub seed: u64,
    /// Lloyd iteration cap
    pub max_iterations: usize,
    /// Stop when no centroid moves further than this
    pub tolerance: f32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_clusters: defaults::DEFAULT_MAX_CLUSTERS,
            min_papers: defaults::DEFAULT_MIN_PAPERS_FOR_CLUSTERING,
            seed: defaults::DEFAULT_CLUSTER_SEED,
            max_iterations: defaults::DEFAULT_MAX_ITERATIONS,
            tolerance: defaults::DEFAULT_CONVERGENCE_TOLERANCE,
        }
    }
}

/// Per-paper confidence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Citation count that saturates the citation factor
    pub citation_normalizer: f32,
    /// Abstracts longer than this (in characters) count as rich
    pub min_abstract_chars: usize,
    /// Papers from this year onward get the full recency factor
    pub recency_year: i32,
    /// Papers above this confidence count as high-confidence
    pub high_threshold: f32,
    /// Papers above this confidence count as medium-confidence
    pub medium_threshold: f32,
    /// Relevance substituted when vectorization fails
    pub fallback_relevance: f32,
    /// Confidence substituted when a paper's estimate fails
    pub fallback_confidence: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            citation_normalizer: defaults::DEFAULT_CITATION_NORMALIZER,
            min_abstract_chars: defaults::DEFAULT_MIN_ABSTRACT_CHARS,
            recency_year: defaults::DEFAULT_CONFIDENCE_RECENCY_YEAR,
            high_threshold: defaults::DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
            medium_threshold: defaults::DEFAULT_MEDIUM_CONFIDENCE_THRESHOLD,
            fallback_relevance: defaults::DEFAULT_FALLBACK_RELEVANCE,
            fallback_confidence: defaults::DEFAULT_FALLBACK_CONFIDENCE,
        }
    }
}

/// Consensus classification settings.
///
/// Percentages are on a 0-100 scale; gates compare against the corpus-average
/// confidence and are exclusive (`avg > gate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub strong_positive_threshold: f32,
    pub moderate_positive_threshold: f32,
    pub moderate_negative_threshold: f32,
    pub strong_negative_threshold: f32,
    pub strong_confidence_gate: f32,
    pub moderate_confidence_gate: f32,
    /// Sentiments within (-dead_zone, dead_zone) carry no weight
    pub dead_zone: f32,
    /// Contribution of each matched indicator phrase
    pub indicator_weight: f32,
    /// Divisor applied before the tanh squash
    pub sentiment_scale: f32,
    pub positive_indicators: Vec<String>,
    pub negative_indicators: Vec<String>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            strong_positive_threshold: defaults::DEFAULT_STRONG_POSITIVE_THRESHOLD,
            moderate_positive_threshold: defaults::DEFAULT_MODERATE_POSITIVE_THRESHOLD,
            moderate_negative_threshold: defaults::DEFAULT_MODERATE_NEGATIVE_THRESHOLD,
            strong_negative_threshold: defaults::DEFAULT_STRONG_NEGATIVE_THRESHOLD,
            strong_confidence_gate: defaults::DEFAULT_STRONG_CONFIDENCE_GATE,
            moderate_confidence_gate: defaults::DEFAULT_MODERATE_CONFIDENCE_GATE,
            dead_zone: defaults::DEFAULT_SENTIMENT_DEAD_ZONE,
            indicator_weight: defaults::DEFAULT_INDICATOR_WEIGHT,
            sentiment_scale: defaults::DEFAULT_SENTIMENT_SCALE,
            positive_indicators: to_owned_list(defaults::DEFAULT_POSITIVE_INDICATORS),
            negative_indicators: to_owned_list(defaults::DEFAULT_NEGATIVE_INDICATORS),
        }
    }
}

/// Corpus-level insight settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Papers from this year onward count as recent
    pub recent_year: i32,
    pub high_relevance_threshold: f32,
    pub medium_relevance_threshold: f32,
    /// Share of high-confidence papers that earns a mention in the explanation
    pub high_confidence_share: f32,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            recent_year: defaults::DEFAULT_RECENT_YEAR_THRESHOLD,
            high_relevance_threshold: defaults::DEFAULT_HIGH_RELEVANCE_THRESHOLD,
            medium_relevance_threshold: defaults::DEFAULT_MEDIUM_RELEVANCE_THRESHOLD,
            high_confidence_share: defaults::DEFAULT_HIGH_CONFIDENCE_SHARE,
        }
    }
}

/// Scholarly search API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    /// Optional API key sent as `x-api-key`
    pub api_key: Option<String>,
    pub default_papers: usize,
    pub max_papers: usize,
    pub fields: String,
    pub request_delay_ms: u64,
    pub rate_limit_backoff_secs: u64,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            default_papers: defaults::DEFAULT_PAPER_LIMIT,
            max_papers: defaults::DEFAULT_MAX_PAPER_LIMIT,
            fields: defaults::DEFAULT_SEARCH_FIELDS.to_string(),
            request_delay_ms: defaults::DEFAULT_REQUEST_DELAY_MS,
            rate_limit_backoff_secs: defaults::DEFAULT_RATE_LIMIT_BACKOFF_SECS,
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Top-level configuration for the analysis pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub vectorizer: VectorizerConfig,
    pub clustering: ClusteringConfig,
    pub confidence: ConfidenceConfig,
    pub consensus: ConsensusConfig,
    pub insights: InsightsConfig,
    pub search: SearchConfig,
}

impl AnalysisConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// environment overrides. The result is validated.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed, or if the
    /// final values fail validation
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileNotReadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        debug!("Loaded config file {}", path.display());

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("SEMANTIC_SCHOLAR_API_KEY") {
            if !key.trim().is_empty() {
                self.search.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("PAPER_CONSENSUS_BASE_URL") {
            if !url.trim().is_empty() {
                self.search.base_url = url;
            }
        }
        if let Ok(value) = std::env::var("PAPER_CONSENSUS_MAX_PAPERS") {
            if let Some(max) = parse_max_papers(&value) {
                self.search.max_papers = max;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationFailed` naming the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        let v = &self.vectorizer;
        if v.max_features == 0 {
            return Err(invalid("vectorizer.max_features", "must be greater than 0"));
        }
        if v.ngram_min == 0 || v.ngram_min > v.ngram_max {
            return Err(invalid(
                "vectorizer.ngram_min",
                "must be at least 1 and no larger than ngram_max",
            ));
        }

        let c = &self.clustering;
        if c.max_clusters == 0 {
            return Err(invalid("clustering.max_clusters", "must be greater than 0"));
        }
        if c.max_iterations == 0 {
            return Err(invalid("clustering.max_iterations", "must be greater than 0"));
        }
        if !(c.tolerance.is_finite() && c.tolerance > 0.0) {
            return Err(invalid("clustering.tolerance", "must be a finite positive number"));
        }

        let conf = &self.confidence;
        if !(conf.citation_normalizer.is_finite() && conf.citation_normalizer > 0.0) {
            return Err(invalid("confidence.citation_normalizer", "must be positive"));
        }
        for (field, value) in [
            ("confidence.high_threshold", conf.high_threshold),
            ("confidence.medium_threshold", conf.medium_threshold),
            ("confidence.fallback_relevance", conf.fallback_relevance),
            ("confidence.fallback_confidence", conf.fallback_confidence),
            ("consensus.strong_confidence_gate", self.consensus.strong_confidence_gate),
            ("consensus.moderate_confidence_gate", self.consensus.moderate_confidence_gate),
            ("consensus.dead_zone", self.consensus.dead_zone),
            ("insights.high_relevance_threshold", self.insights.high_relevance_threshold),
            ("insights.medium_relevance_threshold", self.insights.medium_relevance_threshold),
            ("insights.high_confidence_share", self.insights.high_confidence_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, "must be between 0.0 and 1.0"));
            }
        }

        let cons = &self.consensus;
        for (field, value) in [
            ("consensus.strong_positive_threshold", cons.strong_positive_threshold),
            ("consensus.moderate_positive_threshold", cons.moderate_positive_threshold),
            ("consensus.moderate_negative_threshold", cons.moderate_negative_threshold),
            ("consensus.strong_negative_threshold", cons.strong_negative_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(field, "must be between 0 and 100"));
            }
        }
        if cons.strong_positive_threshold < cons.moderate_positive_threshold {
            return Err(invalid(
                "consensus.strong_positive_threshold",
                "must not be below moderate_positive_threshold",
            ));
        }
        if cons.strong_negative_threshold > cons.moderate_negative_threshold {
            return Err(invalid(
                "consensus.strong_negative_threshold",
                "must not be above moderate_negative_threshold",
            ));
        }
        if !(cons.sentiment_scale.is_finite() && cons.sentiment_scale > 0.0) {
            return Err(invalid("consensus.sentiment_scale", "must be positive"));
        }

        let s = &self.search;
        if s.max_papers == 0 {
            return Err(invalid("search.max_papers", "must be greater than 0"));
        }
        if s.default_papers == 0 || s.default_papers > s.max_papers {
            return Err(invalid(
                "search.default_papers",
                "must be between 1 and search.max_papers",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Parse a `PAPER_CONSENSUS_MAX_PAPERS` value; unparsable values are
/// logged and ignored.
fn parse_max_papers(value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(max) => Some(max),
        Err(e) => {
            warn!(
                "Ignoring PAPER_CONSENSUS_MAX_PAPERS={:?}, keeping configured limit: {}",
                value, e
            );
            None
        }
    }
}
