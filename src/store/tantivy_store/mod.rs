//! Embedded document store: one Tantivy index directory per physical index.
//!
//! Loaded indices are cached in a `DashMap`; writes to one index are
//! serialized behind an async mutex, and each write waits for a writer slot,
//! replaces the document by its `_id` term, commits and reloads the reader so
//! the next read sees it.

mod budget;
mod document;
mod writer;

pub use budget::{WriterBudget, WriterGuard};
pub use document::{build_tantivy_schema, DocumentConverter, ID_FIELD, SOURCE_FIELD};
pub use writer::ManagedIndexWriter;

use super::{merge_fields, DocumentStore, IndexStatus};
use crate::error::{DocShardError, Result};
use crate::schema::EntitySchema;
use crate::types::{DocumentId, Payload};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{Index as TantivyIndex, IndexReader, ReloadPolicy, TantivyDocument};

/// A single physical index on disk.
pub struct LocalIndex {
    name: String,
    inner: TantivyIndex,
    reader: IndexReader,
    converter: DocumentConverter,
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalIndex {
    pub const WRITER_BUFFER_SIZE: usize = 20_000_000;

    fn create(name: &str, path: &Path, schema: &EntitySchema) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let inner = TantivyIndex::create_in_dir(path, build_tantivy_schema(schema))?;
        Self::from_tantivy(name, inner)
    }

    fn open(name: &str, path: &Path) -> Result<Self> {
        let inner = TantivyIndex::open_in_dir(path)?;
        Self::from_tantivy(name, inner)
    }

    fn from_tantivy(name: &str, inner: TantivyIndex) -> Result<Self> {
        let reader = inner
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let converter = DocumentConverter::new(&inner.schema())?;
        Ok(LocalIndex {
            name: name.to_string(),
            inner,
            reader,
            converter,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn writer(&self, slot: WriterGuard) -> Result<ManagedIndexWriter> {
        let writer = self
            .inner
            .writer_with_num_threads(1, Self::WRITER_BUFFER_SIZE)?;
        Ok(ManagedIndexWriter::new(writer, &self.name, slot))
    }

    fn read(&self, doc_id: DocumentId) -> Result<Option<Payload>> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(self.converter.id_term(doc_id), IndexRecordOption::Basic);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_score, address)) = top_docs.first() else {
            return Ok(None);
        };
        let stored: TantivyDocument = searcher.doc(*address)?;
        Ok(Some(self.converter.from_tantivy(&stored)?))
    }

    /// Merge `update` into the stored document (if any) and replace it.
    /// Callers hold `write_lock` and a writer slot from the budget.
    fn upsert(
        &self,
        budget: &WriterBudget,
        slot: WriterGuard,
        doc_id: DocumentId,
        update: &Payload,
    ) -> Result<()> {
        let merged = match self.read(doc_id)? {
            Some(mut existing) => {
                merge_fields(&mut existing, update);
                existing
            }
            None => update.clone(),
        };

        let estimated_size = serde_json::to_string(&merged).map(|s| s.len()).unwrap_or(0);
        budget.check_document_size(estimated_size)?;

        let tantivy_doc = self.converter.to_tantivy(doc_id, &merged)?;
        let mut writer = self.writer(slot)?;
        writer.replace(self.converter.id_term(doc_id), tantivy_doc)?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }
}

pub struct TantivyStore {
    base_path: PathBuf,
    loaded: DashMap<String, Arc<LocalIndex>>,
    budget: Arc<WriterBudget>,
}

impl TantivyStore {
    /// Store rooted at `base_path`; index `name` lives in `{base_path}/{name}/`.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        Self::with_budget(base_path, Arc::new(WriterBudget::default()))
    }

    pub fn with_budget<P: AsRef<Path>>(base_path: P, budget: Arc<WriterBudget>) -> Result<Self> {
        std::fs::create_dir_all(base_path.as_ref())?;
        Ok(TantivyStore {
            base_path: base_path.as_ref().to_path_buf(),
            loaded: DashMap::new(),
            budget,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn budget(&self) -> &Arc<WriterBudget> {
        &self.budget
    }

    fn index_path(&self, index: &str) -> PathBuf {
        self.base_path.join(index)
    }

    /// Loaded index, or the one on disk. `None` if it was never created.
    pub async fn get_or_load(&self, index: &str) -> Result<Option<Arc<LocalIndex>>> {
        if let Some(loaded) = self.loaded.get(index) {
            return Ok(Some(Arc::clone(&loaded)));
        }

        let path = self.index_path(index);
        if !path.join("meta.json").exists() {
            return Ok(None);
        }

        let name = index.to_string();
        let opened = tokio::task::spawn_blocking(move || LocalIndex::open(&name, &path)).await??;
        let entry = self
            .loaded
            .entry(index.to_string())
            .or_insert_with(|| Arc::new(opened));
        Ok(Some(Arc::clone(&entry)))
    }
}

#[async_trait]
impl DocumentStore for TantivyStore {
    async fn ensure_index(&self, index: &str, schema: &EntitySchema) -> Result<IndexStatus> {
        if self.get_or_load(index).await?.is_some() {
            return Ok(IndexStatus::AlreadyExists);
        }

        let name = index.to_string();
        let path = self.index_path(index);
        let schema = schema.clone();
        let created = tokio::task::spawn_blocking(move || {
            match LocalIndex::create(&name, &path, &schema) {
                Ok(idx) => Ok((idx, IndexStatus::Created)),
                // a concurrent caller created it between our check and create
                Err(DocShardError::Tantivy(_)) if path.join("meta.json").exists() => {
                    LocalIndex::open(&name, &path).map(|idx| (idx, IndexStatus::AlreadyExists))
                }
                Err(e) => Err(e),
            }
        })
        .await?;

        let (local, status) = created.map_err(|e| {
            tracing::error!("failed to create index {}: {}", index, e);
            e
        })?;

        self.loaded
            .entry(index.to_string())
            .or_insert_with(|| Arc::new(local));
        if status == IndexStatus::Created {
            tracing::info!("created index {} at {}", index, self.index_path(index).display());
        }
        Ok(status)
    }

    async fn upsert_document(
        &self,
        index: &str,
        doc_id: DocumentId,
        document: &Payload,
    ) -> Result<()> {
        let local = self
            .get_or_load(index)
            .await?
            .ok_or_else(|| DocShardError::Store(format!("index {} does not exist", index)))?;

        let _write = local.write_lock.lock().await;
        let slot = self.budget.acquire_writer().await?;
        let budget = Arc::clone(&self.budget);
        let target = Arc::clone(&local);
        let document = document.clone();
        let result = tokio::task::spawn_blocking(move || {
            target.upsert(&budget, slot, doc_id, &document)
        })
        .await?;

        match result {
            Ok(()) => {
                tracing::debug!("[{}] upserted document {}", index, doc_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[{}] upsert of {} failed: {}", index, doc_id, e);
                Err(e)
            }
        }
    }

    async fn get_document(&self, index: &str, doc_id: DocumentId) -> Result<Option<Payload>> {
        let Some(local) = self.get_or_load(index).await? else {
            return Ok(None);
        };
        tokio::task::spawn_blocking(move || local.read(doc_id)).await?
    }

    async fn ping(&self) -> Result<()> {
        if self.base_path.is_dir() {
            Ok(())
        } else {
            Err(DocShardError::Unavailable(format!(
                "data directory {} is missing",
                self.base_path.display()
            )))
        }
    }
}
