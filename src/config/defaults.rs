// Single source of truth for all default values.

// --- Vectorizer ---
pub const DEFAULT_MAX_FEATURES: usize = 1000;
pub const DEFAULT_NGRAM_MIN: usize = 1;
pub const DEFAULT_NGRAM_MAX: usize = 2;

// --- Clustering ---
pub const DEFAULT_MAX_CLUSTERS: usize = 3;
pub const DEFAULT_MIN_PAPERS_FOR_CLUSTERING: usize = 4;
pub const DEFAULT_CLUSTER_SEED: u64 = 42;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_CONVERGENCE_TOLERANCE: f32 = 1e-4;

// --- Confidence ---
pub const DEFAULT_CITATION_NORMALIZER: f32 = 100.0;
pub const DEFAULT_MIN_ABSTRACT_CHARS: usize = 100;
pub const DEFAULT_CONFIDENCE_RECENCY_YEAR: i32 = 2015;
pub const DEFAULT_HIGH_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MEDIUM_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_FALLBACK_RELEVANCE: f32 = 0.5;
pub const DEFAULT_FALLBACK_CONFIDENCE: f32 = 0.5;

// --- Consensus ---
pub const DEFAULT_STRONG_POSITIVE_THRESHOLD: f32 = 70.0;
pub const DEFAULT_MODERATE_POSITIVE_THRESHOLD: f32 = 55.0;
pub const DEFAULT_MODERATE_NEGATIVE_THRESHOLD: f32 = 45.0;
pub const DEFAULT_STRONG_NEGATIVE_THRESHOLD: f32 = 30.0;
pub const DEFAULT_STRONG_CONFIDENCE_GATE: f32 = 0.6;
pub const DEFAULT_MODERATE_CONFIDENCE_GATE: f32 = 0.5;
pub const DEFAULT_SENTIMENT_DEAD_ZONE: f32 = 0.1;
pub const DEFAULT_INDICATOR_WEIGHT: f32 = 2.0;
pub const DEFAULT_SENTIMENT_SCALE: f32 = 10.0;

pub const DEFAULT_POSITIVE_INDICATORS: &[&str] = &[
    "effective",
    "improves",
    "increases",
    "beneficial",
    "positive",
    "significantly",
    "reduces",
    "decreases",
    "prevents",
    "enhances",
    "better",
    "successful",
    "improvement",
    "correlation",
    "associated with",
    "leads to",
];

pub const DEFAULT_NEGATIVE_INDICATORS: &[&str] = &[
    "ineffective",
    "no effect",
    "no difference",
    "harmful",
    "negative",
    "worse",
    "fails",
    "unsuccessful",
    "no significant",
    "not significant",
    "no improvement",
    "no correlation",
    "unrelated",
];

// --- Insights ---
pub const DEFAULT_RECENT_YEAR_THRESHOLD: i32 = 2020;
pub const DEFAULT_HIGH_RELEVANCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_MEDIUM_RELEVANCE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_HIGH_CONFIDENCE_SHARE: f32 = 0.6;

// --- Search ---
pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
pub const DEFAULT_PAPER_LIMIT: usize = 20;
pub const DEFAULT_MAX_PAPER_LIMIT: usize = 50;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1_200;
pub const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SEARCH_FIELDS: &str = "paperId,title,authors,year,abstract,url,citationCount,venue,externalIds,tldr,fieldsOfStudy,influentialCitationCount,openAccessPdf";
