//! Rewrites mapped input rows as canonical CSV.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use csv::{Terminator, WriterBuilder};
use spi_core::{Converter, canonical_units, convert};
use tracing::{debug, warn};

use crate::mapping::{ColumnLocator, Mapping};
use crate::rows::{Cell, Rows};
use crate::{MappingError, MappingResult};

const LINE_END: &str = "\r\n";

pub fn placeholder(index: usize) -> String {
    format!("_missing_col_{index}")
}

/// Converter from the declared source units to the field's canonical units.
///
/// `Ok(None)` when nothing needs converting.
pub fn field_converter(field: &str, units: Option<&str>) -> MappingResult<Option<Converter>> {
    let Some(units) = units else {
        return Ok(None);
    };
    let unsupported = || MappingError::UnsupportedUnits {
        field: field.to_string(),
        units: units.to_string(),
    };
    let canonical = canonical_units(field).ok_or_else(unsupported)?;
    if canonical == units {
        return Ok(None);
    }
    let converter = convert(units, canonical).ok_or_else(unsupported)?;
    debug!(field, from = units, to = canonical, factor = converter.factor(), "field converter");
    Ok(Some(converter))
}

/// One source column and the conversion applied to it.
struct Column<'m> {
    field: &'m str,
    converter: Option<Converter>,
}

/// Groups mapped fields by source column, rejecting conflicting aliases.
///
/// `strict` rejects any shared column; otherwise sharing is allowed when the
/// conversions agree.
fn plan<'m, K>(
    mapping: &'m Mapping,
    key_of: impl Fn(&'m ColumnLocator) -> Option<K>,
    expected: &'static str,
    strict: bool,
) -> MappingResult<Vec<(K, Column<'m>)>>
where
    K: std::hash::Hash + Eq + Clone + std::fmt::Display,
{
    let mut seen: HashMap<K, Column<'m>> = HashMap::new();
    let mut columns = Vec::new();
    for (field, source) in mapping.iter() {
        let key = key_of(&source.csv_header).ok_or_else(|| MappingError::LocatorMismatch {
            field: field.to_string(),
            expected,
        })?;
        let converter = field_converter(field, source.units.as_deref())?;
        match seen.entry(key.clone()) {
            Entry::Occupied(first) => {
                let first = first.get();
                if strict || first.converter != converter {
                    return Err(MappingError::AliasedColumn {
                        column: key.to_string(),
                        first: first.field.to_string(),
                        second: field.to_string(),
                    });
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Column { field, converter });
            }
        }
        columns.push((key, Column { field, converter }));
    }
    Ok(columns)
}

fn apply(cell: &mut Cell, converter: Converter, field: &str) {
    match cell {
        Cell::Number(v) => *v = converter.apply(*v),
        Cell::Empty => {}
        Cell::Text(text) => warn!(field, text = %text, "non-numeric cell left unconverted"),
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> MappingResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| MappingError::Io(err.into_error()))?;
    let mut text = String::from_utf8(bytes).map_err(|err| MappingError::Encoding(err.to_string()))?;
    if text.ends_with(LINE_END) {
        text.truncate(text.len() - LINE_END.len());
    }
    Ok(text)
}

/// Maps `rows` onto canonical fields and serializes them.
///
/// Declared units are converted in place on the source cells before
/// serialization, so `rows` is consumed. Headered output lists the mapped
/// fields in mapping order. Headerless output keeps every source position:
/// mapped positions take their field name, others a `_missing_col_<i>`
/// placeholder. A mapped position outside the source rows is an error; with
/// no rows at all only the mapped fields are listed, by position. Rows end in
/// `\r\n` except the last.
pub fn map_to_csv(rows: Rows, mapping: &Mapping) -> MappingResult<String> {
    if mapping.is_empty() {
        return Err(MappingError::EmptyMapping);
    }
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .flexible(true)
        .from_writer(Vec::new());

    match rows {
        Rows::Records(mut records) => {
            let columns = plan(
                mapping,
                |locator| match locator {
                    ColumnLocator::Header(name) => Some(name.as_str()),
                    ColumnLocator::Index { .. } => None,
                },
                "a header name",
                false,
            )?;

            for (row, record) in records.iter().enumerate() {
                for (header, _) in &columns {
                    if record.get(header).is_none() {
                        return Err(MappingError::UnknownHeader {
                            header: header.to_string(),
                            row,
                        });
                    }
                }
            }

            let mut converted = Vec::new();
            for (header, column) in &columns {
                let Some(converter) = column.converter else {
                    continue;
                };
                if converted.contains(header) {
                    continue;
                }
                converted.push(*header);
                for record in &mut records {
                    if let Some(cell) = record.get_mut(header) {
                        apply(cell, converter, column.field);
                    }
                }
            }

            writer.write_record(mapping.fields())?;
            for record in &records {
                writer.write_record(columns.iter().map(|(header, _)| {
                    record.get(header).map(Cell::to_string).unwrap_or_default()
                }))?;
            }
            debug!(rows = records.len(), columns = columns.len(), "mapped headered rows");
        }
        Rows::Positional(mut rows) => {
            let columns = plan(
                mapping,
                |locator| match locator {
                    ColumnLocator::Index { header_index } => Some(*header_index),
                    ColumnLocator::Header(_) => None,
                },
                "a header_index",
                true,
            )?;

            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            if !rows.is_empty() {
                if let Some((index, column)) = columns.iter().find(|(index, _)| *index >= width) {
                    return Err(MappingError::ColumnOutOfRange {
                        field: column.field.to_string(),
                        index: *index,
                        width,
                    });
                }
            }

            for (index, column) in &columns {
                if let Some(converter) = column.converter {
                    for row in &mut rows {
                        if let Some(cell) = row.get_mut(*index) {
                            apply(cell, converter, column.field);
                        }
                    }
                }
            }

            let header: Vec<String> = if rows.is_empty() {
                let mut mapped: Vec<&(usize, Column<'_>)> = columns.iter().collect();
                mapped.sort_by_key(|(index, _)| *index);
                mapped.iter().map(|(_, column)| column.field.to_string()).collect()
            } else {
                let mut header: Vec<String> = (0..width).map(placeholder).collect();
                for (index, column) in &columns {
                    header[*index] = column.field.to_string();
                }
                header
            };
            writer.write_record(&header)?;
            for row in &rows {
                writer.write_record((0..width).map(|i| {
                    row.get(i).map(Cell::to_string).unwrap_or_default()
                }))?;
            }
            debug!(rows = rows.len(), width, "mapped headerless rows");
        }
    }

    finish(writer)
}
