//! Upsert path: validate, stamp, resolve, write.

use crate::clock::{Clock, SystemClock};
use crate::error::{DocShardError, Result};
use crate::resolver::resolve_index_name;
use crate::schema::EntitySchema;
use crate::store::{DocumentStore, IndexStatus};
use crate::types::{DocumentId, Payload, TenantId};
use serde_json::Value;
use std::sync::Arc;

/// Confirmation of a committed upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReceipt {
    pub index: String,
    pub doc_id: DocumentId,
    /// Write time stamped into the document.
    pub timestamp_ms: i64,
    pub index_status: IndexStatus,
}

/// Writes documents of one entity type for any number of tenants.
///
/// Holds no mutable state of its own: the schema is immutable and all writes
/// go to the store, so one `Upserter` can be shared across tasks freely.
/// Concurrent upserts of the same `(tenant, id)` are ordered by the store.
///
/// # Examples
///
/// ```rust,no_run
/// use docshard::entities::job_parameters;
/// use docshard::store::InMemoryStore;
/// use docshard::Upserter;
/// use serde_json::json;
///
/// # async fn run() -> docshard::Result<()> {
/// let db = Upserter::new(job_parameters(), InMemoryStore::new());
/// let payload = json!({"Status": "Running"}).as_object().unwrap().clone();
/// let receipt = db.upsert("LHCb", 2_450_321u64, payload).await?;
/// assert_eq!(receipt.index, "job_parameters_lhcb_2m");
/// # Ok(())
/// # }
/// ```
pub struct Upserter<S, C = SystemClock> {
    schema: Arc<EntitySchema>,
    store: S,
    clock: C,
}

impl<S: DocumentStore> Upserter<S, SystemClock> {
    pub fn new(schema: Arc<EntitySchema>, store: S) -> Self {
        Self::with_clock(schema, store, SystemClock)
    }
}

impl<S: DocumentStore, C: Clock> Upserter<S, C> {
    pub fn with_clock(schema: Arc<EntitySchema>, store: S, clock: C) -> Self {
        Upserter {
            schema,
            store,
            clock,
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Physical index holding `doc_id` for `tenant`.
    pub fn index_name<I>(&self, tenant: &str, doc_id: I) -> Result<String>
    where
        I: TryInto<DocumentId>,
        I::Error: Into<DocShardError>,
    {
        let doc_id = doc_id.try_into().map_err(Into::into)?;
        let tenant = TenantId::parse(tenant)?;
        Ok(resolve_index_name(
            self.schema.prefix(),
            tenant.normalized(),
            doc_id,
        ))
    }

    /// Outgoing document: identity and write-time fields first, then the
    /// caller's fields. Reserved keys in `payload` are dropped in favor of
    /// the injected values.
    pub fn build_document(&self, doc_id: DocumentId, payload: Payload, now_ms: i64) -> Payload {
        let mut document = Payload::with_capacity(payload.len() + 2);
        document.insert(
            self.schema.identity_field().to_string(),
            Value::from(doc_id.get()),
        );
        document.insert(
            self.schema.timestamp_field().to_string(),
            Value::from(now_ms),
        );
        for (key, value) in payload {
            if !self.schema.is_reserved(&key) {
                document.insert(key, value);
            }
        }
        document
    }

    /// Insert or update `doc_id` for `tenant`.
    ///
    /// Identifier, tenant and schema checks all run before the store is
    /// touched. Store failures are returned as-is; nothing is retried.
    pub async fn upsert<I>(&self, tenant: &str, doc_id: I, payload: Payload) -> Result<UpsertReceipt>
    where
        I: TryInto<DocumentId>,
        I::Error: Into<DocShardError>,
    {
        let doc_id = doc_id.try_into().map_err(Into::into)?;
        let tenant = TenantId::parse(tenant)?;
        self.schema.validate(&payload)?;

        let index = resolve_index_name(self.schema.prefix(), tenant.normalized(), doc_id);
        let timestamp_ms = self.clock.now_millis();
        let document = self.build_document(doc_id, payload, timestamp_ms);

        let index_status = self.store.ensure_index(&index, &self.schema).await?;
        self.store
            .upsert_document(&index, doc_id, &document)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "upsert of {} {} for tenant {} failed: {}",
                    self.schema.prefix(),
                    doc_id,
                    tenant,
                    e
                );
                e
            })?;

        tracing::debug!(
            "upserted {} {} for tenant {} into {}",
            self.schema.prefix(),
            doc_id,
            tenant,
            index
        );
        Ok(UpsertReceipt {
            index,
            doc_id,
            timestamp_ms,
            index_status,
        })
    }

    /// Stored document for `doc_id`, if any.
    pub async fn get<I>(&self, tenant: &str, doc_id: I) -> Result<Option<Payload>>
    where
        I: TryInto<DocumentId>,
        I::Error: Into<DocShardError>,
    {
        let doc_id = doc_id.try_into().map_err(Into::into)?;
        let index = self.index_name(tenant, doc_id)?;
        self.store.get_document(&index, doc_id).await
    }
}
