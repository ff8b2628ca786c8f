use crate::config::WriterBudgetConfig;
use crate::error::{DocShardError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps on concurrent index writers and on stored document size.
///
/// Writers beyond the cap queue for a slot instead of failing; only a wait
/// longer than the configured deadline turns into
/// [`DocShardError::TooManyConcurrentWrites`].
pub struct WriterBudget {
    slots: Arc<Semaphore>,
    max_concurrent_writers: usize,
    max_document_size_bytes: usize,
    slot_wait: Duration,
}

impl WriterBudget {
    pub fn new(config: &WriterBudgetConfig) -> Self {
        let max_concurrent_writers = config.max_concurrent_writers.max(1);
        WriterBudget {
            slots: Arc::new(Semaphore::new(max_concurrent_writers)),
            max_concurrent_writers,
            max_document_size_bytes: config.max_doc_bytes(),
            slot_wait: Duration::from_millis(config.writer_wait_ms),
        }
    }

    /// Wait for a free writer slot, up to the configured deadline.
    pub async fn acquire_writer(&self) -> Result<WriterGuard> {
        let slots = Arc::clone(&self.slots);
        match tokio::time::timeout(self.slot_wait, slots.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(WriterGuard { _permit: permit }),
            Ok(Err(_closed)) => Err(DocShardError::Store(
                "writer budget has been shut down".to_string(),
            )),
            Err(_elapsed) => {
                tracing::warn!(
                    "no writer slot freed up within {:?} ({} in use)",
                    self.slot_wait,
                    self.active_writers()
                );
                Err(DocShardError::TooManyConcurrentWrites {
                    current: self.active_writers(),
                    max: self.max_concurrent_writers,
                })
            }
        }
    }

    pub fn check_document_size(&self, size_bytes: usize) -> Result<()> {
        match size_bytes {
            size if size > self.max_document_size_bytes => Err(DocShardError::DocumentTooLarge {
                size,
                max: self.max_document_size_bytes,
            }),
            _ => Ok(()),
        }
    }

    pub fn active_writers(&self) -> usize {
        self.max_concurrent_writers - self.slots.available_permits()
    }

    pub fn max_concurrent_writers(&self) -> usize {
        self.max_concurrent_writers
    }
}

impl Default for WriterBudget {
    fn default() -> Self {
        WriterBudget::new(&WriterBudgetConfig::default())
    }
}

/// A held writer slot, returned to the budget on drop.
pub struct WriterGuard {
    _permit: OwnedSemaphorePermit,
}
