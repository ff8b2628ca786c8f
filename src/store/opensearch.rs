//! OpenSearch REST client.

use super::{DocumentStore, IndexStatus};
use crate::config::OpenSearchConfig;
use crate::error::{DocShardError, Result};
use crate::schema::EntitySchema;
use crate::types::{DocumentId, Payload};
use async_trait::async_trait;
use dashmap::DashSet;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use std::time::Duration;

/// Conflicting concurrent updates of one document are retried store-side.
const RETRY_ON_CONFLICT: u32 = 10;

pub struct OpenSearchStore {
    base_url: String,
    endpoint: Url,
    http_client: reqwest::Client,
    credentials: Option<(String, Option<String>)>,
    known_indices: DashSet<String>,
}

impl OpenSearchStore {
    pub fn new(config: &OpenSearchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocShardError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        let endpoint = Url::parse(&base_url).map_err(|e| {
            DocShardError::Config(format!("invalid OpenSearch URL '{}': {}", base_url, e))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(DocShardError::Config(format!(
                "invalid OpenSearch URL '{}'",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            endpoint,
            http_client,
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
            known_indices: DashSet::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL with `segments` appended as percent-encoded path segments.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let request = self.http_client.request(method, self.url(segments));
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_deref()),
            None => request,
        }
    }
}

fn error_type(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("type")?
        .as_str()
        .map(str::to_string)
}

fn status_error(context: &str, status: StatusCode, body: &str) -> DocShardError {
    let detail = format!("{} returned {}: {}", context, status, body);
    match status {
        StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => DocShardError::Unavailable(detail),
        _ => DocShardError::Store(detail),
    }
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    async fn ensure_index(&self, index: &str, schema: &EntitySchema) -> Result<IndexStatus> {
        if self.known_indices.contains(index) {
            return Ok(IndexStatus::AlreadyExists);
        }

        let body = json!({ "mappings": schema.mapping() });
        let response = self
            .request(Method::PUT, &[index])
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            tracing::info!("created OpenSearch index {}", index);
            self.known_indices.insert(index.to_string());
            return Ok(IndexStatus::Created);
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST
            && error_type(&text).as_deref() == Some("resource_already_exists_exception")
        {
            self.known_indices.insert(index.to_string());
            return Ok(IndexStatus::AlreadyExists);
        }

        tracing::error!("creating index {} failed with {}", index, status);
        Err(status_error(&format!("PUT /{}", index), status, &text))
    }

    async fn upsert_document(
        &self,
        index: &str,
        doc_id: DocumentId,
        document: &Payload,
    ) -> Result<()> {
        let id = doc_id.to_string();
        let body = json!({ "doc": document, "doc_as_upsert": true });
        let response = self
            .request(Method::POST, &[index, "_update", &id])
            .query(&[("retry_on_conflict", RETRY_ON_CONFLICT)])
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            tracing::debug!("[{}] upserted document {}", index, doc_id);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            // deleted behind our back; recreate on the next ensure_index
            self.known_indices.remove(index);
        }
        tracing::warn!("[{}] upsert of {} failed with {}", index, doc_id, status);
        Err(status_error(
            &format!("POST /{}/_update/{}", index, doc_id),
            status,
            &text,
        ))
    }

    async fn get_document(&self, index: &str, doc_id: DocumentId) -> Result<Option<Payload>> {
        let id = doc_id.to_string();
        let path = format!("{}/_doc/{}", index, id);
        let response = self
            .request(Method::GET, &[index, "_doc", &id])
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(&format!("GET /{}", path), status, &text));
        }

        let body: Value = response.json().await?;
        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        match body.get("_source") {
            Some(Value::Object(source)) => Ok(Some(source.clone())),
            _ => Err(DocShardError::Store(format!(
                "GET /{} returned no _source",
                path
            ))),
        }
    }

    async fn ping(&self) -> Result<()> {
        let response = self.request(Method::GET, &[]).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DocShardError::Unavailable(format!(
                "{} answered ping with {}",
                self.base_url,
                response.status()
            )))
        }
    }
}
