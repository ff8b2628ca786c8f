use super::{merge_fields, DocumentStore, IndexStatus};
use crate::error::Result;
use crate::schema::EntitySchema;
use crate::types::{DocumentId, Payload};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-local store. Indices are created on first write, like a store
/// with index auto-creation enabled.
#[derive(Default)]
pub struct InMemoryStore {
    indices: DashMap<String, DashMap<DocumentId, Payload>>,
    mappings: DashMap<String, Value>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `upsert_document` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.indices.get(index).map(|docs| docs.len()).unwrap_or(0)
    }

    /// Mapping recorded by `ensure_index`, if the index was created that way.
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.mappings.get(index).map(|m| m.clone())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ensure_index(&self, index: &str, schema: &EntitySchema) -> Result<IndexStatus> {
        let mut created = false;
        self.indices.entry(index.to_string()).or_insert_with(|| {
            created = true;
            DashMap::new()
        });
        if created {
            self.mappings.insert(index.to_string(), schema.mapping());
            tracing::info!("created in-memory index {}", index);
            Ok(IndexStatus::Created)
        } else {
            Ok(IndexStatus::AlreadyExists)
        }
    }

    async fn upsert_document(
        &self,
        index: &str,
        doc_id: DocumentId,
        document: &Payload,
    ) -> Result<()> {
        let docs = self.indices.entry(index.to_string()).or_default();
        docs.entry(doc_id)
            .and_modify(|existing| merge_fields(existing, document))
            .or_insert_with(|| document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_document(&self, index: &str, doc_id: DocumentId) -> Result<Option<Payload>> {
        Ok(self
            .indices
            .get(index)
            .and_then(|docs| docs.get(&doc_id).map(|d| d.clone())))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
