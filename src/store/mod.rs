//! Document store clients.
//!
//! [`DocumentStore`] is the contract the upsert path writes through. The
//! adapters here cover embedding and tests ([`InMemoryStore`]), a local
//! on-disk store ([`TantivyStore`], feature `tantivy-store`) and a remote
//! OpenSearch cluster ([`OpenSearchStore`], feature `opensearch`).
//! [`Backend`] picks one at runtime from [`crate::config::StoreConfig`].

pub mod in_memory;
#[cfg(feature = "opensearch")]
pub mod opensearch;
#[cfg(feature = "tantivy-store")]
pub mod tantivy_store;

use crate::error::Result;
use crate::schema::EntitySchema;
use crate::types::{DocumentId, Payload};
use async_trait::async_trait;
use std::sync::Arc;

pub use in_memory::InMemoryStore;
#[cfg(feature = "opensearch")]
pub use opensearch::OpenSearchStore;
#[cfg(feature = "tantivy-store")]
pub use tantivy_store::TantivyStore;

/// Outcome of [`DocumentStore::ensure_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    /// The index was there already, possibly created by a concurrent writer.
    AlreadyExists,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Make sure `index` exists with the schema's field mapping.
    ///
    /// Finding the index already present is success, never an error.
    async fn ensure_index(&self, index: &str, schema: &EntitySchema) -> Result<IndexStatus>;

    /// Insert `document` under `doc_id`, or merge its fields into the
    /// stored document when one exists. Fields absent from `document` keep
    /// their stored values.
    async fn upsert_document(
        &self,
        index: &str,
        doc_id: DocumentId,
        document: &Payload,
    ) -> Result<()>;

    async fn get_document(&self, index: &str, doc_id: DocumentId) -> Result<Option<Payload>>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn ensure_index(&self, index: &str, schema: &EntitySchema) -> Result<IndexStatus> {
        (**self).ensure_index(index, schema).await
    }

    async fn upsert_document(
        &self,
        index: &str,
        doc_id: DocumentId,
        document: &Payload,
    ) -> Result<()> {
        (**self).upsert_document(index, doc_id, document).await
    }

    async fn get_document(&self, index: &str, doc_id: DocumentId) -> Result<Option<Payload>> {
        (**self).get_document(index, doc_id).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}

/// Store selected at runtime.
pub enum Backend {
    Memory(InMemoryStore),
    #[cfg(feature = "tantivy-store")]
    Tantivy(TantivyStore),
    #[cfg(feature = "opensearch")]
    OpenSearch(OpenSearchStore),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            #[cfg(feature = "tantivy-store")]
            Backend::Tantivy(_) => "tantivy",
            #[cfg(feature = "opensearch")]
            Backend::OpenSearch(_) => "opensearch",
        }
    }
}

#[async_trait]
impl DocumentStore for Backend {
    async fn ensure_index(&self, index: &str, schema: &EntitySchema) -> Result<IndexStatus> {
        match self {
            Backend::Memory(s) => s.ensure_index(index, schema).await,
            #[cfg(feature = "tantivy-store")]
            Backend::Tantivy(s) => s.ensure_index(index, schema).await,
            #[cfg(feature = "opensearch")]
            Backend::OpenSearch(s) => s.ensure_index(index, schema).await,
        }
    }

    async fn upsert_document(
        &self,
        index: &str,
        doc_id: DocumentId,
        document: &Payload,
    ) -> Result<()> {
        match self {
            Backend::Memory(s) => s.upsert_document(index, doc_id, document).await,
            #[cfg(feature = "tantivy-store")]
            Backend::Tantivy(s) => s.upsert_document(index, doc_id, document).await,
            #[cfg(feature = "opensearch")]
            Backend::OpenSearch(s) => s.upsert_document(index, doc_id, document).await,
        }
    }

    async fn get_document(&self, index: &str, doc_id: DocumentId) -> Result<Option<Payload>> {
        match self {
            Backend::Memory(s) => s.get_document(index, doc_id).await,
            #[cfg(feature = "tantivy-store")]
            Backend::Tantivy(s) => s.get_document(index, doc_id).await,
            #[cfg(feature = "opensearch")]
            Backend::OpenSearch(s) => s.get_document(index, doc_id).await,
        }
    }

    async fn ping(&self) -> Result<()> {
        match self {
            Backend::Memory(s) => s.ping().await,
            #[cfg(feature = "tantivy-store")]
            Backend::Tantivy(s) => s.ping().await,
            #[cfg(feature = "opensearch")]
            Backend::OpenSearch(s) => s.ping().await,
        }
    }
}

/// Shallow `doc_as_upsert` merge: top-level keys of `update` replace those
/// of `existing`.
pub(crate) fn merge_fields(existing: &mut Payload, update: &Payload) {
    for (key, value) in update {
        existing.insert(key.clone(), value.clone());
    }
}
