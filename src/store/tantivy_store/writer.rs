use super::budget::WriterGuard;
use crate::error::{DocShardError, Result};
use tantivy::{TantivyDocument, Term};

/// Tantivy writer for one physical index, holding a slot of the
/// [`super::WriterBudget`] until dropped.
pub struct ManagedIndexWriter {
    inner: tantivy::IndexWriter,
    index_name: String,
    _guard: WriterGuard,
}

impl ManagedIndexWriter {
    pub(crate) fn new(inner: tantivy::IndexWriter, index_name: &str, guard: WriterGuard) -> Self {
        ManagedIndexWriter {
            inner,
            index_name: index_name.to_string(),
            _guard: guard,
        }
    }

    /// Stage `doc` in place of every document matching `id_term`.
    pub fn replace(&mut self, id_term: Term, doc: TantivyDocument) -> Result<()> {
        self.inner.delete_term(id_term);
        self.inner.add_document(doc)?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.inner.commit())) {
            Ok(Ok(_opstamp)) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!("[{}] commit error: {}", self.index_name, e);
                Err(e.into())
            }
            Err(panic_info) => {
                let msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else {
                    "unknown panic in tantivy commit".to_string()
                };
                tracing::error!("[{}] PANIC during commit: {}", self.index_name, msg);
                Err(DocShardError::Tantivy(msg))
            }
        }
    }
}
