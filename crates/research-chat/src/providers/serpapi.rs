//! SerpAPI web search client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::{Error, Result};

use super::search::{SearchHit, WebSearchProvider};

/// Google results through SerpAPI
pub struct SerpApiClient {
    client: Client,
    base_url: String,
    engine: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// SerpAPI reports an empty result page through the `error` field
fn is_empty_result(error: &str) -> bool {
    error.contains("hasn't returned any results")
}

impl SerpApiClient {
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .serpapi_api_key
            .clone()
            .ok_or_else(|| Error::Config("SERPAPI_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            engine: config.engine.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl WebSearchProvider for SerpApiClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search.json", self.base_url);
        let num = limit.to_string();

        tracing::debug!("Web search: {}", query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Search(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Search(format!("HTTP {} - {}", status, body)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Search(format!("Failed to parse search response: {}", e)))?;

        if let Some(error) = parsed.error {
            if is_empty_result(&error) {
                tracing::debug!("No web results for '{}'", query);
                return Ok(Vec::new());
            }
            return Err(Error::Search(error));
        }

        Ok(parsed
            .organic_results
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                link: r.link,
                snippet: r.snippet,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SerpApiClient {
        let config = SearchConfig {
            serpapi_api_key: Some("serp-test".to_string()),
            base_url: server.uri(),
            ..SearchConfig::default()
        };
        SerpApiClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_organic_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("engine", "google"))
            .and(query_param("q", "rust async"))
            .and(query_param("api_key", "serp-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic_results": [
                    {"title": "Async Book", "link": "https://rust-lang.github.io/async-book/", "snippet": "Asynchronous programming in Rust"},
                    {"title": "Tokio", "link": "https://tokio.rs", "snippet": "Runtime"},
                    {"title": "Extra", "link": "https://example.com"}
                ]
            })))
            .mount(&server)
            .await;

        let hits = client(&server).search("rust async", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Async Book");
        assert_eq!(hits[1].link, "https://tokio.rs");
    }

    #[tokio::test]
    async fn test_api_error_field_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "Invalid API key."})),
            )
            .mount(&server)
            .await;

        let err = client(&server).search("anything", 5).await.unwrap_err();
        assert!(matches!(err, Error::Search(ref m) if m == "Invalid API key."));
    }

    #[tokio::test]
    async fn test_no_results_error_is_empty_hit_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "zzqxqzzy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_metadata": {"status": "Success"},
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        let hits = client(&server).search("zzqxqzzy", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = SerpApiClient::new(&SearchConfig::default(), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
