use crate::error::{DocShardError, Result};
use crate::store::{Backend, InMemoryStore};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Tantivy,
    OpenSearch,
}

impl FromStr for BackendKind {
    type Err = DocShardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "tantivy" => Ok(BackendKind::Tantivy),
            "opensearch" => Ok(BackendKind::OpenSearch),
            other => Err(DocShardError::Config(format!(
                "unknown DOCSHARD_BACKEND '{}' (expected memory, tantivy or opensearch)",
                other
            ))),
        }
    }
}

/// Connection settings for the OpenSearch backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request deadline.
    pub timeout_secs: u64,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        OpenSearchConfig {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

impl OpenSearchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        OpenSearchConfig {
            url: env::var("DOCSHARD_OPENSEARCH_URL").unwrap_or(defaults.url),
            username: env::var("DOCSHARD_OPENSEARCH_USERNAME").ok(),
            password: env::var("DOCSHARD_OPENSEARCH_PASSWORD").ok(),
            timeout_secs: env::var("DOCSHARD_OPENSEARCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Limits applied to writers of the embedded Tantivy backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterBudgetConfig {
    pub max_concurrent_writers: usize,
    pub max_doc_mb: usize,
    /// How long a write queues for a free writer before giving up.
    pub writer_wait_ms: u64,
}

impl Default for WriterBudgetConfig {
    fn default() -> Self {
        WriterBudgetConfig {
            max_concurrent_writers: 40,
            max_doc_mb: 3,
            writer_wait_ms: 30_000,
        }
    }
}

impl WriterBudgetConfig {
    pub fn from_env() -> Self {
        WriterBudgetConfig {
            max_concurrent_writers: env::var("DOCSHARD_MAX_CONCURRENT_WRITERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(40),
            max_doc_mb: env::var("DOCSHARD_MAX_DOC_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            writer_wait_ms: env::var("DOCSHARD_WRITER_WAIT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),
        }
    }

    pub fn max_doc_bytes(&self) -> usize {
        self.max_doc_mb * 1024 * 1024
    }
}

/// Which store to write through, and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Base directory of the Tantivy backend.
    pub data_dir: PathBuf,
    pub opensearch: OpenSearchConfig,
    pub writer_budget: WriterBudgetConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: BackendKind::Memory,
            data_dir: PathBuf::from("./data"),
            opensearch: OpenSearchConfig::default(),
            writer_budget: WriterBudgetConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load config from `DOCSHARD_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("DOCSHARD_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => BackendKind::Memory,
        };
        Ok(StoreConfig {
            backend,
            data_dir: PathBuf::from(
                env::var("DOCSHARD_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            opensearch: OpenSearchConfig::from_env(),
            writer_budget: WriterBudgetConfig::from_env(),
        })
    }

    /// Build the configured store client.
    pub fn build(&self) -> Result<Backend> {
        tracing::info!("using {:?} document store backend", self.backend);
        match self.backend {
            BackendKind::Memory => Ok(Backend::Memory(InMemoryStore::new())),
            #[cfg(feature = "tantivy-store")]
            BackendKind::Tantivy => {
                let budget = crate::store::tantivy_store::WriterBudget::new(&self.writer_budget);
                Ok(Backend::Tantivy(
                    crate::store::TantivyStore::with_budget(
                        &self.data_dir,
                        std::sync::Arc::new(budget),
                    )?,
                ))
            }
            #[cfg(not(feature = "tantivy-store"))]
            BackendKind::Tantivy => Err(DocShardError::Config(
                "built without the tantivy-store feature".to_string(),
            )),
            #[cfg(feature = "opensearch")]
            BackendKind::OpenSearch => Ok(Backend::OpenSearch(
                crate::store::OpenSearchStore::new(&self.opensearch)?,
            )),
            #[cfg(not(feature = "opensearch"))]
            BackendKind::OpenSearch => Err(DocShardError::Config(
                "built without the opensearch feature".to_string(),
            )),
        }
    }
}
