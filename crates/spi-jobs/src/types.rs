//! Job and data-object resources as returned by the jobs API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spi_system::{IndexResult, SchemaPath, System};
use uuid::Uuid;

use crate::JobResult;
use crate::status::JobStatusKind;

fn job_object_type() -> String {
    "job".to_string()
}

fn data_object_type() -> String {
    "job_data".to_string()
}

/// A calculation job. `object_id` is `None` until the API has created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<Uuid>,
    #[serde(default = "job_object_type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    pub definition: JobDefinition,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub data_objects: Vec<DataObject>,
}

impl Job {
    pub fn new(definition: JobDefinition) -> Self {
        Self {
            object_id: None,
            object_type: job_object_type(),
            created_at: None,
            modified_at: None,
            definition,
            status: JobStatus::default(),
            data_objects: Vec::new(),
        }
    }

    pub fn is_created(&self) -> bool {
        self.object_id.is_some()
    }

    pub fn data_object(&self, object_id: Uuid) -> Option<&DataObject> {
        self.data_objects.iter().find(|d| d.object_id == object_id)
    }

    pub fn status_kind(&self) -> JobResult<JobStatusKind> {
        self.status.status.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub system_definition: System,
    pub parameters: JobParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<Uuid>,
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_parameters: Option<TimeParameters>,
    /// Level at which weather data is supplied: `system`, `inverter` or `array`.
    #[serde(
        default,
        alias = "weather_granularity",
        skip_serializing_if = "Option::is_none"
    )]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_granularity: Option<String>,
    pub irradiance_type: IrradianceType,
    pub temperature_type: TemperatureType,
}

/// `{"calculate": "..."}` or `{"compare": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Calculate(String),
    Compare(String),
}

impl JobType {
    pub fn description(&self) -> &str {
        match self {
            JobType::Calculate(what) | JobType::Compare(what) => what,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeParameters {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Interval as `MM:SS`.
    pub step: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrradianceType {
    Standard,
    Poa,
    Effective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureType {
    Air,
    Module,
    Cell,
}

/// Raw status as sent by the API. The string is kept unparsed so that an
/// unknown value can be reported where it is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change: Option<DateTime<Utc>>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            status: JobStatusKind::Incomplete.as_str().to_string(),
            last_change: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub object_id: Uuid,
    #[serde(default = "data_object_type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    pub definition: DataObjectDefinition,
}

impl DataObject {
    pub fn data_type(&self) -> &str {
        &self.definition.data_type
    }

    pub fn is_present(&self) -> bool {
        self.definition.present
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObjectDefinition {
    /// Schema path of the system node the data belongs to.
    pub schema_path: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub present: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl DataObjectDefinition {
    pub fn schema_path(&self) -> IndexResult<SchemaPath> {
        SchemaPath::parse(&self.schema_path)
    }
}
