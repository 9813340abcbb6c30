//! Semantic Scholar search provider.
//!
//! Queries the Graph API `paper/search` endpoint, most-cited papers first.
//! Requests are spaced by a minimum delay and a single HTTP 429 answer is
//! retried once after a back-off.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{clean_query, PaperProvider, ProviderError, ProviderResult};
use crate::config::SearchConfig;
use crate::models::PaperRecord;

const USER_AGENT: &str = concat!("paper-consensus/", env!("CARGO_PKG_VERSION"));

/// Spaces consecutive requests by at least `min_interval`.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Provider backed by the Semantic Scholar Graph API.
pub struct SemanticScholarProvider {
    http_client: reqwest::Client,
    config: SearchConfig,
    rate_limiter: RateLimiter,
}

impl SemanticScholarProvider {
    /// Create a provider.
    ///
    /// # Arguments
    /// * `config` - Base URL, optional API key, pacing and timeout settings
    ///
    /// # Errors
    /// Returns `ProviderError::ConfigError` if the HTTP client cannot be built
    pub fn new(config: SearchConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(Duration::from_millis(config.request_delay_ms)),
            config,
        })
    }

    async fn send(&self, url: &str, params: &[(&str, String)]) -> ProviderResult<reqwest::Response> {
        self.rate_limiter.wait().await;

        let mut request = self.http_client.get(url).query(params);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }

        request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))
    }
}

#[async_trait]
impl PaperProvider for SemanticScholarProvider {
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<PaperRecord>> {
        let cleaned = clean_query(query);
        if cleaned.is_empty() {
            warn!("Query '{}' has no searchable terms", query);
            return Ok(Vec::new());
        }

        let limit = limit.min(self.config.max_papers);
        let url = format!("{}/paper/search", self.config.base_url.trim_end_matches('/'));
        let params = [
            ("query", cleaned.clone()),
            ("limit", limit.to_string()),
            ("fields", self.config.fields.clone()),
            ("sort", "citationCount:desc".to_string()),
        ];

        info!("Searching Semantic Scholar: {}", cleaned);

        let mut response = self.send(&url, &params).await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                "Rate limited by Semantic Scholar, retrying in {}s",
                self.config.rate_limit_backoff_secs
            );
            tokio::time::sleep(Duration::from_secs(self.config.rate_limit_backoff_secs)).await;
            response = self.send(&url, &params).await?;
        }

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded(format!(
                "still limited after {}s back-off",
                self.config.rate_limit_backoff_secs
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;
        let mut papers = parse_search_response(&body)?;
        papers.truncate(limit);

        info!("Retrieved {} papers from Semantic Scholar", papers.len());
        Ok(papers)
    }

    fn name(&self) -> &str {
        "semantic-scholar"
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ApiPaper>,
}

/// A string or an object carrying a `name`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Named {
    Plain(String),
    Object { name: Option<String> },
}

impl Named {
    fn into_name(self) -> Option<String> {
        match self {
            Named::Plain(name) => Some(name),
            Named::Object { name } => name,
        }
        .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLink {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPaper {
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    authors: Vec<ApiAuthor>,
    year: Option<i32>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
    external_ids: Option<HashMap<String, serde_json::Value>>,
    venue: Option<Named>,
    citation_count: Option<u32>,
    influential_citation_count: Option<u32>,
    tldr: Option<ApiText>,
    fields_of_study: Option<Vec<Named>>,
    open_access_pdf: Option<ApiLink>,
}

impl ApiPaper {
    /// Convert to a record, or `None` when the title or abstract is missing.
    fn into_record(self) -> Option<PaperRecord> {
        let title = self.title.unwrap_or_default().trim().to_string();
        let abstract_text = self.abstract_text.unwrap_or_default().trim().to_string();
        if title.is_empty() || abstract_text.is_empty() {
            return None;
        }

        let mut record = PaperRecord::new(title, abstract_text, self.year.unwrap_or(0));
        record.authors = self.authors.into_iter().filter_map(|a| a.name).collect();
        record.venue = self.venue.and_then(Named::into_name);
        record.citation_count = self.citation_count.unwrap_or(0);
        record.influential_citation_count = self.influential_citation_count.unwrap_or(0);
        record.fields_of_study = self
            .fields_of_study
            .unwrap_or_default()
            .into_iter()
            .filter_map(Named::into_name)
            .collect();
        record.paper_id = self.paper_id.filter(|id| !id.is_empty());
        record.doi = self
            .external_ids
            .and_then(|ids| ids.get("DOI").and_then(|v| v.as_str().map(str::to_string)));
        record.url = self.url.filter(|url| !url.is_empty());
        record.pdf_url = self.open_access_pdf.and_then(|pdf| pdf.url);
        record.tldr = self.tldr.and_then(|t| t.text);

        Some(record)
    }
}

/// Parse a `paper/search` response body, dropping incomplete records.
///
/// # Errors
/// Returns `ProviderError::ParseError` if the body is not the expected JSON
pub fn parse_search_response(body: &str) -> ProviderResult<Vec<PaperRecord>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    Ok(response
        .data
        .into_iter()
        .filter_map(ApiPaper::into_record)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "total": 3,
        "data": [
            {
                "paperId": "abc123",
                "title": "  Caffeine and Athletic Performance ",
                "authors": [{"authorId": "1", "name": "J. Smith"}, {"authorId": "2", "name": null}],
                "year": 2019,
                "abstract": "Caffeine improves endurance performance.",
                "url": "https://www.semanticscholar.org/paper/abc123",
                "externalIds": {"DOI": "10.1000/xyz", "CorpusId": 42},
                "venue": "Sports Medicine",
                "citationCount": 250,
                "influentialCitationCount": 12,
                "tldr": {"model": "tldr@v2", "text": "Caffeine helps."},
                "fieldsOfStudy": ["Medicine", {"name": "Biology"}],
                "openAccessPdf": {"url": "https://example.org/paper.pdf"}
            },
            {
                "paperId": "def456",
                "title": "No abstract here",
                "abstract": null,
                "year": 2020
            },
            {
                "paperId": "ghi789",
                "title": "Minimal",
                "abstract": "Short.",
                "year": null,
                "venue": {"name": "Journal of Things"},
                "fieldsOfStudy": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_record() {
        let papers = parse_search_response(SAMPLE).unwrap();
        assert_eq!(papers.len(), 2);

        let paper = &papers[0];
        assert_eq!(paper.title, "Caffeine and Athletic Performance");
        assert_eq!(paper.authors, vec!["J. Smith".to_string()]);
        assert_eq!(paper.year, 2019);
        assert_eq!(paper.venue.as_deref(), Some("Sports Medicine"));
        assert_eq!(paper.citation_count, 250);
        assert_eq!(paper.influential_citation_count, 12);
        assert_eq!(paper.doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(paper.paper_id.as_deref(), Some("abc123"));
        assert_eq!(paper.tldr.as_deref(), Some("Caffeine helps."));
        assert_eq!(paper.fields_of_study, vec!["Medicine".to_string(), "Biology".to_string()]);
        assert_eq!(paper.pdf_url.as_deref(), Some("https://example.org/paper.pdf"));
    }

    #[test]
    fn test_parse_minimal_record() {
        let papers = parse_search_response(SAMPLE).unwrap();
        let paper = &papers[1];
        assert_eq!(paper.title, "Minimal");
        assert_eq!(paper.year, 0);
        assert_eq!(paper.venue.as_deref(), Some("Journal of Things"));
        assert!(paper.fields_of_study.is_empty());
        assert!(paper.doi.is_none());
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_search_response(r#"{"total": 0}"#).unwrap().is_empty());
        assert!(matches!(
            parse_search_response("<html>"),
            Err(ProviderError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let provider = SemanticScholarProvider::new(SearchConfig::default()).unwrap();
        let papers = provider.search("What is?", 10).await.unwrap();
        assert!(papers.is_empty());
        assert_eq!(provider.name(), "semantic-scholar");
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
