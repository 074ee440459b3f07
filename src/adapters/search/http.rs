//! Elasticsearch / OpenSearch REST adapter

use super::traits::{index_mappings, SearchIndex};
use crate::config::SearchConfig;
use crate::domain::{Result, SearchIndexError, VellumError};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// [`SearchIndex`] backed by a search cluster's REST API
pub struct HttpSearchIndex {
    base_url: Url,
    client: Client,
    auth_header: Option<String>,
}

impl HttpSearchIndex {
    /// Builds the HTTP client from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparsable endpoint and a connection
    /// error when the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint).map_err(|e| {
            VellumError::Configuration(format!(
                "Invalid search endpoint '{}': {e}",
                config.endpoint
            ))
        })?;

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));
        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }
        let client = client_builder
            .build()
            .map_err(|e| SearchIndexError::ConnectionFailed(e.to_string()))?;

        let auth_header = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{username}:{}", password.expose_secret());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        };

        Ok(Self {
            base_url,
            client,
            auth_header,
        })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                VellumError::Configuration(format!(
                    "Search endpoint {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        let mut request = self.client.request(method, url);
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| SearchIndexError::ConnectionFailed(e.to_string()).into())
    }
}

async fn failure_message(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.send(self.request(Method::HEAD, &[index])?).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => {
                let (status, message) = failure_message(response).await;
                Err(SearchIndexError::InvalidResponse { status, message }.into())
            }
        }
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        let request = self.request(Method::PUT, &[index])?.json(&index_mappings());
        let response = self.send(request).await?;
        if response.status().is_success() {
            return Ok(());
        }

        let (status, body) = failure_message(response).await;
        if status == StatusCode::BAD_REQUEST.as_u16()
            && body.contains("resource_already_exists_exception")
        {
            tracing::debug!(index = %index, "Index was created concurrently");
            return Ok(());
        }
        Err(SearchIndexError::IndexCreationFailed(format!("{index}: {status} {body}")).into())
    }

    async fn upsert_document(&self, index: &str, id: &str, document: &Value) -> Result<()> {
        let body = json!({"doc": document, "doc_as_upsert": true});
        let request = self
            .request(Method::POST, &[index, "_update", id])?
            .json(&body);
        let response = self.send(request).await?;
        if response.status().is_success() {
            return Ok(());
        }

        let (status, message) = failure_message(response).await;
        Err(SearchIndexError::UpsertFailed(format!("{index}/{id}: {status} {message}")).into())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
        let response = self
            .send(self.request(Method::DELETE, &[index, "_doc", id])?)
            .await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let (status, message) = failure_message(response).await;
        Err(SearchIndexError::DeleteFailed(format!("{index}/{id}: {status} {message}")).into())
    }
}
