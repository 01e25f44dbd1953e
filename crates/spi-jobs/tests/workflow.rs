use std::cell::RefCell;

use spi_jobs::*;
use spi_mapping::{ColumnLocator, FieldSource, Mapping, MappingError, Rows, parse_csv};
use spi_system::{Node, System};
use uuid::Uuid;

const JOB_ID: &str = "e1772e64-43ac-11ea-bc12-0242ac120002";
const WEATHER_ID: &str = "ecaa5a40-43ac-11ea-bc12-0242ac120002";

fn fixture() -> Job {
    let text = format!(
        r#"{{
  "object_id": "{JOB_ID}",
  "object_type": "job",
  "created_at": "2020-01-30T15:00:00+00:00",
  "modified_at": "2020-01-30T15:00:00+00:00",
  "definition": {{
    "system_definition": {{
      "name": "Test PV System",
      "latitude": 33.98,
      "longitude": -115.323,
      "elevation": 2300,
      "inverters": [{{
        "name": "Inverter 1",
        "make_model": "ABB__MICRO_0_25_I_OUTD_US_208__208V_",
        "inverter_parameters": {{
          "Paco": 250, "Pdco": 259.52, "Vdco": 40.24, "Pso": 1.77,
          "C0": -4.1e-05, "C1": -9.1e-05, "C2": 0.000494, "C3": -0.013171,
          "Pnt": 0.075
        }},
        "losses": {{}},
        "arrays": [{{
          "name": "Array 1",
          "make_model": "Canadian_Solar_Inc__CS5P_220M",
          "module_parameters": {{
            "alpha_sc": 0.004539, "a_ref": 2.6373, "I_L_ref": 5.114,
            "I_o_ref": 8.196e-10, "R_sh_ref": 381.68, "R_s": 1.065,
            "cells_in_series": 96, "Adjust": 8.7
          }},
          "temperature_model_parameters": {{"u_c": 29.0, "u_v": 0.0}},
          "tracking": {{"tilt": 20, "azimuth": 180}},
          "albedo": 0.2,
          "modules_per_string": 7,
          "strings": 5
        }}]
      }}]
    }},
    "parameters": {{
      "system_id": "6b61d9ac-2e89-11eb-be2a-4dc7a6bcd0d9",
      "job_type": {{"calculate": "predicted performance"}},
      "time_parameters": {{
        "start": "2020-01-01T00:00:00+00:00",
        "end": "2020-12-31T23:59:59+00:00",
        "step": "15:00",
        "timezone": "America/Denver"
      }},
      "weather_granularity": "array",
      "irradiance_type": "poa",
      "temperature_type": "module"
    }}
  }},
  "status": {{"status": "incomplete", "last_change": "2020-01-30T15:00:00+00:00"}},
  "data_objects": [{{
    "object_id": "{WEATHER_ID}",
    "object_type": "job_data",
    "created_at": "2020-01-30T15:00:00+00:00",
    "modified_at": "2020-01-30T15:00:00+00:00",
    "definition": {{
      "schema_path": "/inverters/0/arrays/0",
      "type": "original weather data",
      "present": false,
      "data_columns": ["time", "poa_global", "poa_direct", "poa_diffuse", "module_temperature"]
    }}
  }}]
}}"#
    );
    serde_json::from_str(&text).unwrap()
}

fn weather_id() -> Uuid {
    Uuid::parse_str(WEATHER_ID).unwrap()
}

/// In-memory jobs API; an upload marks the data object present.
struct FakeJobs {
    job: RefCell<Job>,
    uploads: RefCell<Vec<(Uuid, String)>>,
    upload_status: u16,
}

impl FakeJobs {
    fn new(job: Job) -> Self {
        Self {
            job: RefCell::new(job),
            uploads: RefCell::new(Vec::new()),
            upload_status: 200,
        }
    }
}

impl JobsApi for FakeJobs {
    fn create(&self, _token: &Token, _job: &JobDefinition) -> JobResult<ApiResponse> {
        Ok(ApiResponse::new(201, format!(r#"{{"object_id": "{JOB_ID}"}}"#)))
    }

    fn read(&self, _token: &Token, job_id: Uuid) -> JobResult<ApiResponse> {
        let job = self.job.borrow();
        if job.object_id != Some(job_id) {
            return Ok(ApiResponse::new(404, "not found"));
        }
        Ok(ApiResponse::new(200, serde_json::to_string(&*job)?))
    }

    fn add_data(
        &self,
        _token: &Token,
        _job_id: Uuid,
        data_id: Uuid,
        csv: &str,
    ) -> JobResult<ApiResponse> {
        if self.upload_status != 200 {
            return Ok(ApiResponse::new(self.upload_status, "bad upload"));
        }
        self.uploads.borrow_mut().push((data_id, csv.to_string()));
        for object in &mut self.job.borrow_mut().data_objects {
            if object.object_id == data_id {
                object.definition.present = true;
            }
        }
        Ok(ApiResponse::new(200, ""))
    }

    fn get_results(&self, _token: &Token, _job_id: Uuid) -> JobResult<ApiResponse> {
        if self.job.borrow().status.status != "complete" {
            return Ok(ApiResponse::new(409, "results not ready"));
        }
        Ok(ApiResponse::new(
            200,
            r#"[{"schema_path": "/", "type": "monthly summary"}]"#,
        ))
    }

    fn compute(&self, _token: &Token, _job_id: Uuid) -> JobResult<ApiResponse> {
        self.job.borrow_mut().status.status = "queued".to_string();
        Ok(ApiResponse::new(202, ""))
    }
}

fn weather_rows() -> Rows {
    parse_csv(
        "timestamp,global,direct,diffuse,tmod\n\
         2020-01-01T00:00:00Z,0,0,0,1.5\n\
         2020-01-01T00:15:00Z,12,3,9,1.7\n",
        true,
    )
    .unwrap()
}

fn weather_mapping() -> Mapping {
    [
        ("time", "timestamp"),
        ("poa_global", "global"),
        ("poa_direct", "direct"),
        ("poa_diffuse", "diffuse"),
        ("module_temperature", "tmod"),
    ]
    .into_iter()
    .fold(Mapping::default(), |mapping, (field, header)| {
        mapping.with(
            field,
            FieldSource::new(ColumnLocator::Header(header.to_string())),
        )
    })
}

#[test]
fn fixture_narrows_and_starts_at_data_step() {
    let job = fixture();
    let inverter = &job.definition.system_definition.inverters[0];
    assert_eq!(inverter.inverter_parameters.model(), "sandia");
    assert!(inverter.losses.is_none());
    assert_eq!(
        job.definition.parameters.granularity.as_deref(),
        Some("array")
    );
    assert_eq!(
        infer_step(&job).unwrap(),
        Step::Data("original weather data".to_string())
    );
    assert_eq!(
        job_steps(&job),
        vec!["setup", "original weather data", "submit", "results"]
    );

    let node = resolve_data_object(&job, &job.data_objects[0]).unwrap();
    assert!(matches!(node, Node::Array(array) if array.name == "Array 1"));
}

#[test]
fn upload_moves_job_to_calculate() {
    let api = FakeJobs::new(fixture());
    let token = Token::new("secret");
    let job = fixture();

    let (refreshed, step) =
        upload_mapped_data(&api, &token, &job, weather_id(), weather_rows(), &weather_mapping())
            .unwrap();

    assert_eq!(step, Step::Calculate);
    assert_eq!(data_object_status(&refreshed), "All Data Uploaded");
    let uploads = api.uploads.borrow();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, weather_id());
    assert_eq!(
        uploads[0].1,
        "time,poa_global,poa_direct,poa_diffuse,module_temperature\r\n\
         2020-01-01T00:00:00Z,0,0,0,1.5\r\n\
         2020-01-01T00:15:00Z,12,3,9,1.7"
    );

    let submitted = submit_job(&api, &token, &refreshed).unwrap();
    assert_eq!(infer_step(&submitted).unwrap(), Step::Results);
    assert_eq!(submitted.status_kind().unwrap().results_label(), "Queued");
}

#[test]
fn results_are_read_once_the_job_completes() {
    let api = FakeJobs::new(fixture());
    let token = Token::new("secret");
    let job = fixture();

    let err = fetch_results::<serde_json::Value>(&api, &token, &job).unwrap_err();
    assert!(matches!(err, JobError::Api { status: 409, .. }));

    api.job.borrow_mut().status.status = "complete".to_string();
    let results: Vec<serde_json::Value> = fetch_results(&api, &token, &job).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["type"], "monthly summary");

    let mut uncreated = fixture();
    uncreated.object_id = None;
    assert!(matches!(
        fetch_results::<serde_json::Value>(&api, &token, &uncreated),
        Err(JobError::NotCreated)
    ));
}

#[test]
fn incomplete_mapping_is_not_uploaded() {
    let api = FakeJobs::new(fixture());
    let mut mapping = weather_mapping();
    mapping.remove("poa_direct");

    let err = upload_mapped_data(
        &api,
        &Token::new("secret"),
        &fixture(),
        weather_id(),
        weather_rows(),
        &mapping,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        JobError::Mapping(MappingError::Incomplete { ref missing }) if missing == "poa_direct"
    ));
    assert!(api.uploads.borrow().is_empty());
}

#[test]
fn rejected_upload_surfaces_status_and_body() {
    let mut api = FakeJobs::new(fixture());
    api.upload_status = 422;

    let err = upload_mapped_data(
        &api,
        &Token::new("secret"),
        &fixture(),
        weather_id(),
        weather_rows(),
        &weather_mapping(),
    )
    .unwrap_err();

    assert!(matches!(err, JobError::Api { status: 422, ref body } if body == "bad upload"));
}

#[test]
fn upload_needs_created_job_and_known_object() {
    let api = FakeJobs::new(fixture());
    let token = Token::new("secret");

    let mut uncreated = fixture();
    uncreated.object_id = None;
    assert!(matches!(
        upload_mapped_data(
            &api,
            &token,
            &uncreated,
            weather_id(),
            weather_rows(),
            &weather_mapping(),
        ),
        Err(JobError::NotCreated)
    ));

    assert!(matches!(
        upload_mapped_data(
            &api,
            &token,
            &fixture(),
            Uuid::new_v4(),
            weather_rows(),
            &weather_mapping(),
        ),
        Err(JobError::UnknownDataObject { .. })
    ));
}

#[test]
fn create_reads_back_the_job() {
    let api = FakeJobs::new(fixture());
    let definition = fixture().definition;
    let job = create_job(&api, &Token::new("secret"), &definition).unwrap();
    assert_eq!(job.object_id, Some(Uuid::parse_str(JOB_ID).unwrap()));
    assert_eq!(job.data_objects.len(), 1);
}

#[test]
fn token_is_redacted_in_debug() {
    let token = Token::new("very-secret");
    assert_eq!(format!("{token:?}"), "Token(..)");
    assert_eq!(token.bearer(), "Bearer very-secret");
}

#[test]
fn job_loads_from_yaml_and_json() {
    let job = fixture();
    let json_path = std::env::temp_dir().join("spi_jobs_fixture.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(&job).unwrap()).unwrap();
    assert_eq!(load_job(&json_path).unwrap(), job);

    let yaml_path = std::env::temp_dir().join("spi_jobs_fixture.yaml");
    std::fs::write(&yaml_path, serde_yaml::to_string(&job).unwrap()).unwrap();
    assert_eq!(load_job(&yaml_path).unwrap(), job);
}

#[test]
fn default_system_job_has_no_data_to_resolve() {
    let job = Job::new(JobDefinition {
        system_definition: System::default(),
        parameters: fixture().definition.parameters,
    });
    assert!(!job.is_created());
    assert_eq!(infer_step(&job).unwrap(), Step::Setup);
    assert!(data_types(&job).is_empty());
}
