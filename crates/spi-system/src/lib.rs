//! spi-system: PV system configuration tree.
//!
//! Contains:
//! - params (model parameter sets and their untagged unions)
//! - tree (system, inverters, arrays, stored systems)
//! - path (schema-path addressing into a tree)
//! - validate (range and name checks applied before persistence)

mod fields;
pub mod params;
pub mod path;
pub mod tree;
pub mod validate;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use fields::{FieldValue, Fields};
pub use params::*;
pub use path::{IndexError, IndexResult, IntoSchemaPath, Node, SchemaPath, resolve};
pub use tree::{ArrayRef, Inverter, PVArray, StoredSystem, System};
pub use validate::{ValidationError, validate_system, validation_errors};

pub type SystemResult<T> = Result<T, SystemError>;

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Expected an object for {what}")]
    NotAnObject { what: &'static str },

    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A persisted document: validated on load and before save.
pub trait Document: Serialize + DeserializeOwned {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Document for System {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_system(self)
    }
}

impl Document for StoredSystem {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_system(&self.definition)
    }
}

pub fn load_yaml<T: Document>(path: &Path) -> SystemResult<T> {
    let content = std::fs::read_to_string(path)?;
    let document: T = serde_yaml::from_str(&content)?;
    document.validate()?;
    Ok(document)
}

pub fn save_yaml<T: Document>(path: &Path, document: &T) -> SystemResult<()> {
    document.validate()?;
    let content = serde_yaml::to_string(document)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json<T: Document>(path: &Path) -> SystemResult<T> {
    let content = std::fs::read_to_string(path)?;
    let document: T = serde_json::from_str(&content)?;
    document.validate()?;
    Ok(document)
}

pub fn save_json<T: Document>(path: &Path, document: &T) -> SystemResult<()> {
    document.validate()?;
    let content = serde_json::to_string_pretty(document)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> SystemResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => Err(SystemError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Reads a document without validating it, choosing YAML or JSON from the
/// file extension. Variant inference still runs.
pub fn read<T: DeserializeOwned>(path: &Path) -> SystemResult<T> {
    let format = format_of(path)?;
    debug!(path = %path.display(), ?format, "reading document");
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Yaml => Ok(serde_yaml::from_str(&content)?),
        Format::Json => Ok(serde_json::from_str(&content)?),
    }
}

/// Loads and validates a document, choosing YAML or JSON from the file
/// extension.
pub fn load<T: Document>(path: &Path) -> SystemResult<T> {
    let document: T = read(path)?;
    document.validate()?;
    Ok(document)
}

pub fn save<T: Document>(path: &Path, document: &T) -> SystemResult<()> {
    match format_of(path)? {
        Format::Yaml => save_yaml(path, document),
        Format::Json => save_json(path, document),
    }
}

pub fn load_system(path: &Path) -> SystemResult<System> {
    load(path)
}

pub fn save_system(path: &Path, system: &System) -> SystemResult<()> {
    save(path, system)
}
