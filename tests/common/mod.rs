#![allow(dead_code)]

use async_trait::async_trait;
use docshard::store::{DocumentStore, IndexStatus};
use docshard::{DocShardError, DocumentId, EntitySchema, Payload, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn payload(value: Value) -> Payload {
    value
        .as_object()
        .expect("payload must be a JSON object")
        .clone()
}

/// Accepts index creation, then fails every write like an unreachable cluster.
#[derive(Default)]
pub struct FailingStore {
    pub ensure_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
}

impl FailingStore {
    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn ensures(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn ensure_index(&self, _index: &str, _schema: &EntitySchema) -> Result<IndexStatus> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IndexStatus::AlreadyExists)
    }

    async fn upsert_document(
        &self,
        _index: &str,
        _doc_id: DocumentId,
        _document: &Payload,
    ) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        Err(DocShardError::Unavailable("connection refused".to_string()))
    }

    async fn get_document(&self, _index: &str, _doc_id: DocumentId) -> Result<Option<Payload>> {
        Err(DocShardError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        Err(DocShardError::Unavailable("connection refused".to_string()))
    }
}
