use crate::error::StoreError;
use crate::store::{Batch, BulkResponse};
use crate::traits::DocumentStore;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const BACKEND: &str = "opensearch";

/// OpenSearch / Elasticsearch over HTTP. Requests are spread round-robin
/// over the configured nodes.
pub struct OpenSearchStore {
    client: Client,
    endpoints: Vec<Url>,
    index_name: String,
    next_endpoint: AtomicUsize,
}

impl OpenSearchStore {
    pub fn new<I, S>(
        endpoints: I,
        index_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| parse_endpoint(endpoint.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(StoreError::Request(
                "no store endpoints configured".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoints,
            index_name: index_name.into(),
            next_endpoint: AtomicUsize::new(0),
        })
    }

    fn endpoint(&self) -> &Url {
        let position = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        &self.endpoints[position % self.endpoints.len()]
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        Ok(self.endpoint().join(path)?)
    }

    fn index_url(&self) -> Result<Url, StoreError> {
        self.url(&self.index_name)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, StoreError> {
    let raw = raw.trim();
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}

async fn backend_error(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        details: format!("{status}: {body}"),
    }
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    async fn check_connection(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.url("")?).send().await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(())
    }

    async fn create_schema(&self, definition: &Value) -> Result<(), StoreError> {
        let response = self.client.head(self.index_url()?).send().await?;

        if response.status() == StatusCode::OK {
            debug!(index = %self.index_name, "index already present");
            return Ok(());
        }

        if !response.status().is_client_error() {
            return Err(backend_error(response).await);
        }

        let response = self
            .client
            .put(self.index_url()?)
            .json(definition)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(index = %self.index_name, "index created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception") {
            debug!(index = %self.index_name, "index created concurrently");
            return Ok(());
        }

        Err(StoreError::BackendResponse {
            backend: BACKEND.to_string(),
            details: format!("index setup failed with {status}: {body}"),
        })
    }

    async fn bulk_upsert(&self, batch: &Batch) -> Result<BulkResponse, StoreError> {
        if batch.is_empty() {
            return Ok(BulkResponse::succeeded(0));
        }

        let response = self
            .client
            .post(self.url(&format!("{}/_bulk", self.index_name))?)
            .header("Content-Type", "application/x-ndjson")
            .body(batch.to_ndjson())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let raw: Value = response.json().await?;
        Ok(BulkResponse::from_value(raw))
    }
}
