//! Tabular input: header-keyed records or positional rows.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{MappingError, MappingResult};

/// One dynamically typed CSV cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Empty,
            Value::Number(n) => n.as_f64().map_or_else(|| Cell::Text(n.to_string()), Cell::Number),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Magnitudes outside this range are written in exponent form.
const PLAIN_MIN: f64 = 1e-6;
const PLAIN_MAX: f64 = 1e21;

fn write_number(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    let magnitude = v.abs();
    if magnitude == 0.0 || (PLAIN_MIN..PLAIN_MAX).contains(&magnitude) {
        return write!(f, "{v}");
    }
    let text = format!("{v:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            write!(f, "{mantissa}e+{exponent}")
        }
        _ => f.write_str(&text),
    }
}

/// Numbers use the shortest form that round-trips: `4`, not `4.0`, and
/// `8.196e-10` or `1e+25` outside `[1e-6, 1e21)`.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write_number(f, *v),
            Cell::Text(s) => f.write_str(s),
            Cell::Empty => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(v) => serializer.serialize_f64(*v),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Empty => serializer.serialize_none(),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// A header-keyed row. Keeps the source column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    cells: Vec<(String, Cell)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `header`, replacing an existing cell in place.
    pub fn insert(&mut self, header: impl Into<String>, cell: impl Into<Cell>) {
        let header = header.into();
        let cell = cell.into();
        match self.get_mut(&header) {
            Some(slot) => *slot = cell,
            None => self.cells.push((header, cell)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, c)| c)
    }

    pub fn get_mut(&mut self, header: &str) -> Option<&mut Cell> {
        self.cells
            .iter_mut()
            .find(|(h, _)| h == header)
            .map(|(_, c)| c)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, C: Into<Cell>> FromIterator<(K, C)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (header, cell) in iter {
            record.insert(header, cell);
        }
        record
    }
}

/// Parsed table, shaped by whether the source had a header row.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    Records(Vec<Record>),
    Positional(Vec<Vec<Cell>>),
}

impl Default for Rows {
    fn default() -> Self {
        Rows::Records(Vec::new())
    }
}

impl Rows {
    /// Reads a JSON array of objects or of arrays. The first row decides
    /// the shape; a later row of the other shape is rejected. Record keys
    /// come out in `serde_json` map order, not source order.
    pub fn from_json(value: &Value) -> MappingResult<Rows> {
        let items = value.as_array().ok_or(MappingError::RowShape { row: 0 })?;
        let Some(first) = items.first() else {
            return Ok(Rows::default());
        };
        if first.is_array() {
            items
                .iter()
                .enumerate()
                .map(|(row, item)| {
                    item.as_array()
                        .map(|cells| cells.iter().map(Cell::from_json).collect::<Vec<_>>())
                        .ok_or(MappingError::RowShape { row })
                })
                .collect::<MappingResult<_>>()
                .map(Rows::Positional)
        } else {
            items
                .iter()
                .enumerate()
                .map(|(row, item)| {
                    item.as_object()
                        .map(|map| {
                            map.iter()
                                .map(|(k, v)| (k.as_str(), Cell::from_json(v)))
                                .collect::<Record>()
                        })
                        .ok_or(MappingError::RowShape { row })
                })
                .collect::<MappingResult<_>>()
                .map(Rows::Records)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Rows::Records(rows) => rows.len(),
            Rows::Positional(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_headers(&self) -> bool {
        matches!(self, Rows::Records(_))
    }

    /// Column headers in source order, from the first record.
    pub fn headers(&self) -> Vec<&str> {
        match self {
            Rows::Records(rows) => rows.first().map(|r| r.headers().collect()).unwrap_or_default(),
            Rows::Positional(_) => Vec::new(),
        }
    }

    /// Widest positional row.
    pub fn width(&self) -> usize {
        match self {
            Rows::Records(rows) => rows.iter().map(Record::len).max().unwrap_or(0),
            Rows::Positional(rows) => rows.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}
