//! spi-jobs: job resources and workflow state.
//!
//! Contains:
//! - types (job, parameters, data objects)
//! - status (status parsing and display labels)
//! - step (current step, step list, upload summaries)
//! - data (missing data, schema-path lookup, required columns)
//! - api (REST collaborator traits and upload/submit workflows)

pub mod api;
pub mod data;
pub mod status;
pub mod step;
pub mod types;

use std::path::Path;

use spi_mapping::MappingError;
use spi_system::IndexError;
use uuid::Uuid;

pub use api::{
    ApiResponse, JobsApi, SystemsApi, Token, create_job, fetch_job, fetch_results, fetch_system,
    list_systems, submit_job, upload_mapped_data,
};
pub use data::{
    JobClass, data_types, expected_columns, job_class, missing_data_objects, required_columns,
    resolve_data_object,
};
pub use status::JobStatusKind;
pub use step::{Step, data_object_status, data_step_status, infer_step, job_steps};
pub use types::*;

pub type JobResult<T> = Result<T, JobError>;

#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("Unknown job status: {status}")]
    UnknownStatus { status: String },

    #[error("Unknown data type: {data_type}")]
    UnknownDataType { data_type: String },

    #[error("Job has not been created yet")]
    NotCreated,

    #[error("Data object {object_id} is not part of this job")]
    UnknownDataObject { object_id: Uuid },

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads a job resource; `.yaml`/`.yml` is read as YAML, anything else as JSON.
pub fn load_job(path: &Path) -> JobResult<Job> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
        _ => Ok(serde_json::from_str(&content)?),
    }
}
