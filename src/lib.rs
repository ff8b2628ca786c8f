//! # docshard
//!
//! Schema-driven, tenant- and range-sharded document persistence for
//! append-mostly monitoring records.
//!
//! Each logical entity type declares its fields once in an
//! [`EntitySchema`]. Documents are keyed by a numeric id and written per
//! tenant into physical indices named `{entity}_{tenant}_{id / 1_000_000}m`,
//! so one tenant's records for one entity never sit in an unbounded index
//! and repeated writes of an id always land in the same place.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use docshard::entities::job_parameters_db;
//! use docshard::store::InMemoryStore;
//! use serde_json::json;
//!
//! # async fn run() -> docshard::Result<()> {
//! let db = job_parameters_db(InMemoryStore::new());
//!
//! let payload = json!({"Status": "Running", "HostName": "wn-042"})
//!     .as_object()
//!     .unwrap()
//!     .clone();
//! let receipt = db.upsert("LHCb", 2_450_321u64, payload).await?;
//! assert_eq!(receipt.index, "job_parameters_lhcb_2m");
//!
//! let stored = db.get("LHCb", 2_450_321u64).await?.unwrap();
//! assert_eq!(stored["JobID"], 2_450_321);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! | Feature | Store | Use case |
//! |---------|-------|----------|
//! | (always) | [`store::InMemoryStore`] | tests, embedding |
//! | `tantivy-store` | [`store::TantivyStore`] | local on-disk indices |
//! | `opensearch` | [`store::OpenSearchStore`] | OpenSearch cluster |
//!
//! [`config::StoreConfig::from_env`] selects one from `DOCSHARD_BACKEND`.

pub mod clock;
pub mod config;
pub mod entities;
pub mod error;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod types;
pub mod upsert;

pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use error::{DocShardError, Result};
pub use resolver::{resolve_index_name, shard_bucket, BUCKET_WIDTH};
pub use schema::{EntitySchema, FieldType, UnknownFieldPolicy};
pub use store::{Backend, DocumentStore, IndexStatus};
pub use types::{DocumentId, Payload, TenantId};
pub use upsert::{UpsertReceipt, Upserter};

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Meant for binaries and tools embedding the crate; calling it twice is a
/// no-op.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
