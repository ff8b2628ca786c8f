use docshard::config::{BackendKind, OpenSearchConfig, StoreConfig, WriterBudgetConfig};
use docshard::DocShardError;
use serial_test::serial;
use std::env;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "DOCSHARD_BACKEND",
    "DOCSHARD_DATA_DIR",
    "DOCSHARD_OPENSEARCH_URL",
    "DOCSHARD_OPENSEARCH_USERNAME",
    "DOCSHARD_OPENSEARCH_PASSWORD",
    "DOCSHARD_OPENSEARCH_TIMEOUT_SECS",
    "DOCSHARD_MAX_CONCURRENT_WRITERS",
    "DOCSHARD_MAX_DOC_MB",
    "DOCSHARD_WRITER_WAIT_MS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_env() {
    clear_env();
    let config = StoreConfig::from_env().unwrap();
    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.opensearch.url, "http://localhost:9200");
    assert_eq!(config.writer_budget.max_concurrent_writers, 40);
    assert_eq!(config.build().unwrap().name(), "memory");
}

#[test]
#[serial]
fn unknown_backend_is_a_config_error() {
    clear_env();
    env::set_var("DOCSHARD_BACKEND", "cassandra");
    let err = StoreConfig::from_env().unwrap_err();
    clear_env();
    assert!(matches!(err, DocShardError::Config(ref m) if m.contains("cassandra")));
}

#[test]
#[serial]
fn tantivy_backend_uses_data_dir() {
    clear_env();
    let tmp = TempDir::new().unwrap();
    env::set_var("DOCSHARD_BACKEND", "tantivy");
    env::set_var("DOCSHARD_DATA_DIR", tmp.path());
    env::set_var("DOCSHARD_MAX_DOC_MB", "1");
    env::set_var("DOCSHARD_WRITER_WAIT_MS", "250");

    let config = StoreConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.data_dir, tmp.path());
    assert_eq!(config.writer_budget.max_doc_bytes(), 1024 * 1024);
    assert_eq!(config.writer_budget.writer_wait_ms, 250);
    assert_eq!(config.build().unwrap().name(), "tantivy");
}

#[test]
#[serial]
fn opensearch_settings_from_env() {
    clear_env();
    env::set_var("DOCSHARD_BACKEND", "OpenSearch");
    env::set_var("DOCSHARD_OPENSEARCH_URL", "https://search.example.org:9200");
    env::set_var("DOCSHARD_OPENSEARCH_USERNAME", "writer");
    env::set_var("DOCSHARD_OPENSEARCH_PASSWORD", "pw");
    env::set_var("DOCSHARD_OPENSEARCH_TIMEOUT_SECS", "30");

    let config = StoreConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.backend, BackendKind::OpenSearch);
    assert_eq!(config.opensearch.url, "https://search.example.org:9200");
    assert_eq!(config.opensearch.username.as_deref(), Some("writer"));
    assert_eq!(config.opensearch.timeout_secs, 30);
    assert_eq!(config.build().unwrap().name(), "opensearch");
}

#[test]
#[serial]
fn bad_numbers_fall_back_to_defaults() {
    clear_env();
    env::set_var("DOCSHARD_OPENSEARCH_TIMEOUT_SECS", "0");
    env::set_var("DOCSHARD_MAX_CONCURRENT_WRITERS", "many");

    let opensearch = OpenSearchConfig::from_env();
    let budget = WriterBudgetConfig::from_env();
    clear_env();

    assert_eq!(opensearch.timeout_secs, 10);
    assert_eq!(budget.max_concurrent_writers, 40);
}
