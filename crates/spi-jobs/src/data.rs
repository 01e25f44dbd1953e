//! Data objects: what is missing, where it belongs, which columns it needs.

use spi_system::Node;
use tracing::debug;

use crate::types::{DataObject, IrradianceType, Job, JobParameters, JobType, TemperatureType};
use crate::{JobError, JobResult};

pub const ACTUAL_PERFORMANCE: &str = "actual performance data";

/// `calculate` or `compare`, from the job type key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobClass {
    Calculate,
    Compare,
}

impl JobClass {
    pub fn as_str(self) -> &'static str {
        match self {
            JobClass::Calculate => "calculate",
            JobClass::Compare => "compare",
        }
    }
}

pub fn job_class(parameters: &JobParameters) -> JobClass {
    match parameters.job_type {
        JobType::Calculate(_) => JobClass::Calculate,
        JobType::Compare(_) => JobClass::Compare,
    }
}

/// Data objects not yet uploaded, in job order.
pub fn missing_data_objects(job: &Job) -> impl Iterator<Item = &DataObject> {
    job.data_objects.iter().filter(|d| !d.is_present())
}

/// Distinct data types in order of first appearance.
pub fn data_types(job: &Job) -> Vec<&str> {
    let mut types: Vec<&str> = Vec::new();
    for object in &job.data_objects {
        if !types.contains(&object.data_type()) {
            types.push(object.data_type());
        }
    }
    types
}

/// Resolves the system node a data object belongs to.
pub fn resolve_data_object<'j>(job: &'j Job, object: &DataObject) -> JobResult<Node<'j>> {
    let path = object.definition.schema_path()?;
    Ok(job.definition.system_definition.resolve(path)?)
}

fn irradiance_columns(kind: IrradianceType) -> &'static [&'static str] {
    match kind {
        IrradianceType::Standard => &["ghi", "dni", "dhi"],
        IrradianceType::Poa => &["poa_global", "poa_direct", "poa_diffuse"],
        IrradianceType::Effective => &["effective_irradiance"],
    }
}

fn temperature_columns(kind: TemperatureType) -> &'static [&'static str] {
    match kind {
        TemperatureType::Air => &["temp_air", "wind_speed"],
        TemperatureType::Module => &["module_temperature"],
        TemperatureType::Cell => &["cell_temperature"],
    }
}

/// Canonical columns a data type needs under `parameters`, starting with
/// `time`.
pub fn expected_columns(
    parameters: &JobParameters,
    data_type: &str,
) -> JobResult<Vec<&'static str>> {
    let mut columns = vec!["time"];
    if data_type == ACTUAL_PERFORMANCE {
        columns.push("performance");
    } else if data_type.ends_with("weather data") {
        columns.extend_from_slice(irradiance_columns(parameters.irradiance_type));
        columns.extend_from_slice(temperature_columns(parameters.temperature_type));
    } else {
        return Err(JobError::UnknownDataType {
            data_type: data_type.to_string(),
        });
    }
    Ok(columns)
}

/// Columns to map for `object`: its explicit list when the API sent one,
/// otherwise derived from the job parameters.
pub fn required_columns(parameters: &JobParameters, object: &DataObject) -> JobResult<Vec<String>> {
    if !object.definition.data_columns.is_empty() {
        return Ok(object.definition.data_columns.clone());
    }
    debug!(data_type = object.data_type(), "no data_columns on data object, deriving");
    Ok(expected_columns(parameters, object.data_type())?
        .into_iter()
        .map(str::to_string)
        .collect())
}
