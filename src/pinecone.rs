//! Serverless vector-index backend over HTTP.
//!
//! Provides [`PineconeVectorIndex`], which implements [`VectorIndex`]
//! against a Pinecone-style REST API: index provisioning on the control
//! plane, upsert and query on the per-index data host. Only available
//! when the `pinecone` feature is enabled.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::document::{IndexEntry, Metric, SearchResult};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// The control-plane endpoint for index management.
const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// A [`VectorIndex`] backed by a remote serverless vector database.
///
/// Upsert and index creation mutate persistent remote state; query is
/// read-only. The data host and dimension of each index are discovered
/// from the control plane and cached for the life of the handle.
pub struct PineconeVectorIndex {
    client: reqwest::Client,
    api_key: String,
    cloud: String,
    region: String,
    control_url: String,
    handles: RwLock<HashMap<String, IndexHandle>>,
}

#[derive(Clone)]
struct IndexHandle {
    host: String,
    dimension: usize,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    serverless: ServerlessParams<'a>,
}

#[derive(Serialize)]
struct ServerlessParams<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
    dimension: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexEntry],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<SearchResult>,
}

impl PineconeVectorIndex {
    /// Create a new handle with the given API key and serverless
    /// placement (e.g. cloud `"aws"`, region `"us-east-1"`).
    pub fn new(
        api_key: impl Into<String>,
        cloud: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::from_client(reqwest::Client::new(), api_key, cloud, region)
    }

    /// Create a handle from an existing HTTP client.
    pub fn from_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        cloud: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            cloud: cloud.into(),
            region: region.into(),
            control_url: CONTROL_PLANE_URL.to_string(),
            handles: RwLock::new(HashMap::new()),
        }
    }

    fn backend_err(message: impl Into<String>) -> RagError {
        RagError::IndexBackend { backend: "pinecone".to_string(), message: message.into() }
    }

    /// Fetch the index description, returning `None` on 404.
    async fn describe(&self, name: &str) -> Result<Option<IndexDescription>> {
        let response = self
            .client
            .get(format!("{}/indexes/{name}", self.control_url))
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Self::backend_err(format!("describe request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::backend_err(format!("describe returned {status}")));
        }

        let description: IndexDescription = response
            .json()
            .await
            .map_err(|e| Self::backend_err(format!("malformed describe response: {e}")))?;
        Ok(Some(description))
    }

    /// Resolve the cached data host and dimension for `name`, describing
    /// the index on first use.
    async fn handle(&self, name: &str) -> Result<IndexHandle> {
        if let Some(handle) = self.handles.read().await.get(name) {
            return Ok(handle.clone());
        }

        let description = self
            .describe(name)
            .await?
            .ok_or_else(|| Self::backend_err(format!("index '{name}' does not exist")))?;
        let handle = IndexHandle {
            host: format!("https://{}", description.host),
            dimension: description.dimension,
        };
        self.handles.write().await.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    fn check_dimension(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(RagError::DimensionMismatch { expected, actual })
        }
    }
}

#[async_trait]
impl VectorIndex for PineconeVectorIndex {
    async fn create_if_absent(&self, name: &str, dimension: usize, metric: Metric) -> Result<()> {
        if let Some(description) = self.describe(name).await? {
            debug!(index = name, "index already exists, skipping creation");
            let handle = IndexHandle {
                host: format!("https://{}", description.host),
                dimension: description.dimension,
            };
            self.handles.write().await.insert(name.to_string(), handle);
            return Ok(());
        }

        let request = CreateIndexRequest {
            name,
            dimension,
            metric: metric.as_str(),
            spec: ServerlessSpec {
                serverless: ServerlessParams { cloud: &self.cloud, region: &self.region },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.control_url))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::IndexProvisioning(format!("create request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(index = name, %status, "index creation failed");
            return Err(RagError::IndexProvisioning(format!(
                "create returned {status}: {body}"
            )));
        }

        let description: IndexDescription = response
            .json()
            .await
            .map_err(|e| RagError::IndexProvisioning(format!("malformed create response: {e}")))?;
        let handle = IndexHandle {
            host: format!("https://{}", description.host),
            dimension: description.dimension,
        };
        self.handles.write().await.insert(name.to_string(), handle);

        debug!(index = name, dimension, "created index");
        Ok(())
    }

    async fn upsert(&self, name: &str, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let handle = self.handle(name).await?;
        for entry in entries {
            Self::check_dimension(handle.dimension, entry.values.len())?;
        }

        let response = self
            .client
            .post(format!("{}/vectors/upsert", handle.host))
            .header("Api-Key", &self.api_key)
            .json(&UpsertRequest { vectors: entries })
            .send()
            .await
            .map_err(|e| Self::backend_err(format!("upsert request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(index = name, %status, "upsert failed");
            return Err(Self::backend_err(format!("upsert returned {status}: {body}")));
        }

        debug!(index = name, count = entries.len(), "upserted entries");
        Ok(())
    }

    async fn query(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchResult>> {
        let handle = self.handle(name).await?;
        Self::check_dimension(handle.dimension, vector.len())?;

        let response = self
            .client
            .post(format!("{}/query", handle.host))
            .header("Api-Key", &self.api_key)
            .json(&QueryRequest { vector, top_k, include_metadata })
            .send()
            .await
            .map_err(|e| Self::backend_err(format!("query request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(index = name, %status, "query failed");
            return Err(Self::backend_err(format!("query returned {status}: {body}")));
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| Self::backend_err(format!("malformed query response: {e}")))?;

        Ok(query_response.matches)
    }
}
