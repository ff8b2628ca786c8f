//! Per-job runtime parameters reported by running jobs.

use crate::clock::SystemClock;
use crate::schema::{EntitySchema, FieldType, UnknownFieldPolicy};
use crate::store::DocumentStore;
use crate::upsert::Upserter;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub const PREFIX: &str = "job_parameters";
pub const IDENTITY_FIELD: &str = "JobID";
pub const TIMESTAMP_FIELD: &str = "timestamp";

static SCHEMA: Lazy<Arc<EntitySchema>> = Lazy::new(|| {
    let schema = EntitySchema::builder(PREFIX)
        .identity_field(IDENTITY_FIELD)
        .timestamp_field(TIMESTAMP_FIELD)
        .add_field("CPUNormalizationFactor", FieldType::Long)
        .add_field("NormCPUTime(s)", FieldType::Long)
        .add_field("Memory(kB)", FieldType::Long)
        .add_field("TotalCPUTime(s)", FieldType::Long)
        .add_field("MemoryUsed(kb)", FieldType::Long)
        .add_field("HostName", FieldType::Keyword)
        .add_field("GridCE", FieldType::Keyword)
        .add_field("ModelName", FieldType::Keyword)
        .add_field("Status", FieldType::Keyword)
        .add_field("JobType", FieldType::Keyword)
        .unknown_fields(UnknownFieldPolicy::Reject)
        .build()
        .expect("job_parameters schema is well-formed");
    Arc::new(schema)
});

pub fn job_parameters() -> Arc<EntitySchema> {
    Arc::clone(&SCHEMA)
}

pub type JobParametersDb<S, C = SystemClock> = Upserter<S, C>;

pub fn job_parameters_db<S: DocumentStore>(store: S) -> JobParametersDb<S> {
    Upserter::new(job_parameters(), store)
}
