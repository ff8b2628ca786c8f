//! Built-in entity declarations.

pub mod job_parameters;

pub use job_parameters::{job_parameters, job_parameters_db, JobParametersDb};
