//! Local JSON file provider.
//!
//! Reads a JSON array of [`PaperRecord`] values, for offline runs and
//! reproducible analyses. The query is not used for filtering: every complete
//! record is returned (up to the limit) and relevance ranking is left to the
//! pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{retain_complete, PaperProvider, ProviderError, ProviderResult};
use crate::models::PaperRecord;

#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
    name: String,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("json:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse every record in the file, complete or not.
    ///
    /// # Errors
    /// Returns `ProviderError::IoError` if the file cannot be read and
    /// `ProviderError::ParseError` if it is not a JSON array of papers
    pub async fn load_all(&self) -> ProviderResult<Vec<PaperRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content).map_err(|e| {
            ProviderError::ParseError(format!("{}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl PaperProvider for JsonFileProvider {
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<PaperRecord>> {
        let all = self.load_all().await?;
        let incomplete = all.iter().filter(|p| p.is_incomplete()).count();
        if incomplete > 0 {
            warn!("Skipping {} incomplete records in {}", incomplete, self.path.display());
        }

        let papers = retain_complete(all, limit);
        debug!("Loaded {} papers for '{}' from {}", papers.len(), query, self.name);

        Ok(papers)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_loads_complete_records() {
        let file = write_file(
            r#"[
                {"title": "Sleep and memory", "abstract": "Sleep improves recall.", "year": 2020,
                 "authors": ["A. Author"], "citation_count": 40},
                {"title": "", "abstract": "No title here."},
                {"title": "Coffee", "abstract": "", "year": 2019},
                {"title": "Naps", "abstract": "Short naps help.", "year": 2018}
            ]"#,
        );

        let provider = JsonFileProvider::new(file.path());
        let papers = provider.search("sleep", 10).await.unwrap();

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Sleep and memory");
        assert_eq!(papers[0].authors, vec!["A. Author".to_string()]);
        assert_eq!(papers[0].citation_count, 40);
        assert_eq!(papers[1].title, "Naps");
    }

    #[tokio::test]
    async fn test_respects_limit() {
        let file = write_file(
            r#"[
                {"title": "One", "abstract": "First."},
                {"title": "Two", "abstract": "Second."},
                {"title": "Three", "abstract": "Third."}
            ]"#,
        );

        let papers = JsonFileProvider::new(file.path()).search("q", 2).await.unwrap();
        assert_eq!(papers.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let file = write_file("{ not json");
        let result = JsonFileProvider::new(file.path()).search("q", 5).await;
        assert!(matches!(result, Err(ProviderError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let provider = JsonFileProvider::new("/nonexistent/papers.json");
        assert!(matches!(provider.search("q", 5).await, Err(ProviderError::IoError(_))));
        assert!(provider.name().starts_with("json:"));
    }
}
