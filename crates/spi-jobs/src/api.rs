//! REST collaborator seams and the workflows built on them.
//!
//! Transport, retries and timeouts belong to the implementations; nothing
//! here retries or batches.

use std::fmt;

use serde::de::DeserializeOwned;
use spi_mapping::{Mapping, MappingError, Rows, map_to_csv};
use spi_system::{StoredSystem, System};
use tracing::{debug, info};
use uuid::Uuid;

use crate::data::required_columns;
use crate::step::{Step, infer_step};
use crate::types::{Job, JobDefinition};
use crate::{JobError, JobResult};

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Status code and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails with [`JobError::Api`] on a non-2xx status.
    pub fn error_for_status(self) -> JobResult<Self> {
        if self.ok() {
            Ok(self)
        } else {
            Err(JobError::Api {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> JobResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub trait JobsApi {
    fn create(&self, token: &Token, job: &JobDefinition) -> JobResult<ApiResponse>;
    fn read(&self, token: &Token, job_id: Uuid) -> JobResult<ApiResponse>;
    /// Uploads canonical CSV for one data object.
    fn add_data(&self, token: &Token, job_id: Uuid, data_id: Uuid, csv: &str)
    -> JobResult<ApiResponse>;
    fn get_results(&self, token: &Token, job_id: Uuid) -> JobResult<ApiResponse>;
    fn compute(&self, token: &Token, job_id: Uuid) -> JobResult<ApiResponse>;
}

pub trait SystemsApi {
    fn list(&self, token: &Token) -> JobResult<ApiResponse>;
    fn get(&self, token: &Token, system_id: Uuid) -> JobResult<ApiResponse>;
    fn create(&self, token: &Token, system: &System) -> JobResult<ApiResponse>;
    fn delete(&self, token: &Token, system_id: Uuid) -> JobResult<ApiResponse>;
}

pub fn fetch_job(api: &impl JobsApi, token: &Token, job_id: Uuid) -> JobResult<Job> {
    api.read(token, job_id)?.error_for_status()?.json()
}

pub fn fetch_system(
    api: &impl SystemsApi,
    token: &Token,
    system_id: Uuid,
) -> JobResult<StoredSystem> {
    api.get(token, system_id)?.error_for_status()?.json()
}

pub fn list_systems(api: &impl SystemsApi, token: &Token) -> JobResult<Vec<StoredSystem>> {
    api.list(token)?.error_for_status()?.json()
}

/// Creates the job and reads it back with its data objects.
pub fn create_job(api: &impl JobsApi, token: &Token, definition: &JobDefinition) -> JobResult<Job> {
    let created: serde_json::Value = api.create(token, definition)?.error_for_status()?.json()?;
    let job_id = created
        .get("object_id")
        .and_then(|id| id.as_str())
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or(JobError::NotCreated)?;
    info!(%job_id, "job created");
    fetch_job(api, token, job_id)
}

/// Maps `rows`, uploads them for one data object and returns the refreshed
/// job with its new step.
pub fn upload_mapped_data(
    api: &impl JobsApi,
    token: &Token,
    job: &Job,
    data_id: Uuid,
    rows: Rows,
    mapping: &Mapping,
) -> JobResult<(Job, Step)> {
    let job_id = job.object_id.ok_or(JobError::NotCreated)?;
    let object = job
        .data_object(data_id)
        .ok_or(JobError::UnknownDataObject { object_id: data_id })?;

    let missing: Vec<String> = required_columns(&job.definition.parameters, object)?
        .into_iter()
        .filter(|column| mapping.get(column).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(MappingError::Incomplete {
            missing: missing.join(", "),
        }
        .into());
    }

    let csv = map_to_csv(rows, mapping)?;
    debug!(%job_id, %data_id, bytes = csv.len(), "uploading mapped data");
    api.add_data(token, job_id, data_id, &csv)?.error_for_status()?;

    let refreshed = fetch_job(api, token, job_id)?;
    let step = infer_step(&refreshed)?;
    info!(%job_id, %step, "data uploaded");
    Ok((refreshed, step))
}

/// Submits the job for calculation and returns it refreshed.
pub fn submit_job(api: &impl JobsApi, token: &Token, job: &Job) -> JobResult<Job> {
    let job_id = job.object_id.ok_or(JobError::NotCreated)?;
    api.compute(token, job_id)?.error_for_status()?;
    fetch_job(api, token, job_id)
}

/// Reads the results of a submitted job, decoded as `T`.
pub fn fetch_results<T: DeserializeOwned>(
    api: &impl JobsApi,
    token: &Token,
    job: &Job,
) -> JobResult<T> {
    let job_id = job.object_id.ok_or(JobError::NotCreated)?;
    api.get_results(token, job_id)?.error_for_status()?.json()
}
