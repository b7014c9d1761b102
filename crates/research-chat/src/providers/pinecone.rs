//! Pinecone serverless vector index provider
//!
//! Index management goes through the control plane; upserts and queries go to
//! the per-index data plane host, which is looked up once and cached.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};

use super::vector_store::{IndexSpec, Metric, VectorMatch, VectorRecord, VectorStoreProvider};

/// Attempts made while waiting for a fresh index to become ready
const READY_POLL_ATTEMPTS: u32 = 60;

/// Pinecone REST provider
pub struct PineconeIndex {
    client: Client,
    control_plane_url: String,
    api_key: String,
    api_version: String,
    cloud: String,
    region: String,
    upsert_batch_size: usize,
    ready_poll_interval: Duration,
    /// index name -> data plane base URL
    hosts: DashMap<String, String>,
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    metric: Metric,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeIndex {
    /// Create from config
    pub fn new(config: &VectorDbConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("PINECONE_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.api_version.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            upsert_batch_size: config.upsert_batch_size.max(1),
            ready_poll_interval: Duration::from_secs(1),
            hosts: DashMap::new(),
        })
    }

    /// Override the readiness poll interval
    pub fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    /// Hosts come back without a scheme
    fn normalize_host(host: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    async fn describe(&self, name: &str) -> Result<IndexModel> {
        let url = format!("{}/indexes/{}", self.control_plane_url, name);
        let response = self.authed(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "describe index '{}' failed: HTTP {} - {}",
                name, status, body
            )));
        }

        response
            .json::<IndexModel>()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid describe response: {}", e)))
    }

    async fn host_for(&self, name: &str) -> Result<String> {
        if let Some(host) = self.hosts.get(name) {
            return Ok(host.clone());
        }

        let model = self.describe(name).await?;
        let host = model
            .host
            .as_deref()
            .map(Self::normalize_host)
            .ok_or_else(|| Error::vector_db(format!("Index '{}' has no host yet", name)))?;
        self.hosts.insert(name.to_string(), host.clone());
        Ok(host)
    }

    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        for attempt in 1..=READY_POLL_ATTEMPTS {
            let model = self.describe(name).await?;
            if model.status.map(|s| s.ready).unwrap_or(false) {
                if let Some(host) = model.host.as_deref() {
                    self.hosts.insert(name.to_string(), Self::normalize_host(host));
                }
                return Ok(());
            }
            tracing::debug!("Index '{}' not ready yet (attempt {})", name, attempt);
            tokio::time::sleep(self.ready_poll_interval).await;
        }
        Err(Error::vector_db(format!(
            "Index '{}' did not become ready after {} checks",
            name, READY_POLL_ATTEMPTS
        )))
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeIndex {
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        let url = format!("{}/indexes", self.control_plane_url);
        let response = self.authed(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "list indexes failed: HTTP {} - {}",
                status, body
            )));
        }

        let list: IndexList = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid list response: {}", e)))?;

        Ok(list
            .indexes
            .into_iter()
            .map(|model| {
                if let Some(host) = model.host.as_deref() {
                    self.hosts.insert(model.name.clone(), Self::normalize_host(host));
                }
                IndexSpec::new(model.name, model.dimension, model.metric)
            })
            .collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.control_plane_url);
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric,
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });

        let response = self.authed(self.client.post(&url)).json(&body).send().await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!("Created index: {}", spec.name);
                self.wait_until_ready(&spec.name).await
            }
            StatusCode::CONFLICT => {
                tracing::info!("Index {} already exists.", spec.name);
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::vector_db(format!(
                    "create index '{}' failed: HTTP {} - {}",
                    spec.name, status, body
                )))
            }
        }
    }

    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
        let host = self.host_for(index).await?;
        let url = format!("{}/vectors/upsert", host);
        let mut written = 0;

        for batch in records.chunks(self.upsert_batch_size) {
            let response = self
                .authed(self.client.post(&url))
                .json(&UpsertRequest { vectors: batch })
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::vector_db(format!(
                    "upsert into '{}' failed: HTTP {} - {}",
                    index, status, body
                )));
            }

            let parsed: UpsertResponse = response
                .json()
                .await
                .map_err(|e| Error::vector_db(format!("Invalid upsert response: {}", e)))?;
            written += parsed.upserted_count;
        }

        Ok(written)
    }

    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let host = self.host_for(index).await?;
        let url = format!("{}/query", host);

        let response = self
            .authed(self.client.post(&url))
            .json(&QueryRequest {
                vector,
                top_k,
                include_metadata: true,
                include_values: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "query on '{}' failed: HTTP {} - {}",
                index, status, body
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid query response: {}", e)))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
