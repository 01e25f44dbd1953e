//! spi-mapping: user supplied CSV data to the canonical upload format.
//!
//! Contains:
//! - parse (CSV text to typed rows)
//! - rows (headered records and positional rows)
//! - mapping (column locators, ordered mappings, interactive builder)
//! - engine (unit conversion and canonical CSV output)

pub mod engine;
pub mod mapping;
pub mod parse;
pub mod rows;

use std::path::Path;

pub use engine::{field_converter, map_to_csv, placeholder};
pub use mapping::{ColumnLocator, FieldSource, Mapping, MappingBuilder};
pub use parse::parse_csv;
pub use rows::{Cell, Record, Rows};

pub type MappingResult<T> = Result<T, MappingError>;

#[derive(thiserror::Error, Debug)]
pub enum MappingError {
    #[error("Row {row} does not match the shape of the first row")]
    RowShape { row: usize },

    #[error("Column {column} is mapped to both {first} and {second}")]
    AliasedColumn {
        column: String,
        first: String,
        second: String,
    },

    #[error("Field {field} must be located by {expected}")]
    LocatorMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("Header '{header}' not found in row {row}")]
    UnknownHeader { header: String, row: usize },

    #[error("Field {field} is mapped to column {index}, but rows have {width} column(s)")]
    ColumnOutOfRange {
        field: String,
        index: usize,
        width: usize,
    },

    #[error("Units {units} cannot be converted for field {field}")]
    UnsupportedUnits { field: String, units: String },

    #[error("Field {field} is not required by this mapping")]
    UnknownField { field: String },

    #[error("Mapping is incomplete, missing: {missing}")]
    Incomplete { missing: String },

    #[error("Mapping has no fields")]
    EmptyMapping,

    #[error("Column {column} has an empty header")]
    MissingHeader { column: usize },

    #[error("Numeric header '{header}', header row may be missing?")]
    NumericHeader { header: String },

    #[error("Duplicate header '{header}'")]
    DuplicateHeader { header: String },

    #[error("Output is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads a mapping file; `.yaml`/`.yml` is read as YAML, anything else as JSON.
pub fn load_mapping(path: &Path) -> MappingResult<Mapping> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
        _ => Ok(serde_json::from_str(&content)?),
    }
}

pub fn save_mapping(path: &Path, mapping: &Mapping) -> MappingResult<()> {
    let content = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => serde_yaml::to_string(mapping)?,
        _ => serde_json::to_string_pretty(mapping)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}

/// Reads a CSV file and maps it in one pass.
pub fn map_csv_file(path: &Path, has_headers: bool, mapping: &Mapping) -> MappingResult<String> {
    let text = std::fs::read_to_string(path)?;
    map_to_csv(parse_csv(&text, has_headers)?, mapping)
}
