//! CSV text to [`Rows`], with dynamic typing of numeric-looking cells.

use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord};
use spi_core::parse_number;
use tracing::debug;

use crate::rows::{Cell, Record, Rows};
use crate::{MappingError, MappingResult};

fn typed(text: &str) -> Cell {
    if text.trim().is_empty() {
        return Cell::Empty;
    }
    parse_number(text).map_or_else(|| Cell::Text(text.to_string()), Cell::Number)
}

fn check_headers(headers: &StringRecord) -> MappingResult<Vec<String>> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            let header = header.trim();
            if header.is_empty() {
                return Err(MappingError::MissingHeader { column });
            }
            if parse_number(header).is_some() {
                return Err(MappingError::NumericHeader {
                    header: header.to_string(),
                });
            }
            if !seen.insert(header.to_string()) {
                return Err(MappingError::DuplicateHeader {
                    header: header.to_string(),
                });
            }
            Ok(header.to_string())
        })
        .collect()
}

/// Parses CSV text.
///
/// Lines starting with `#` and blank lines are skipped. With headers, every
/// header must be non-empty, unique and not look like a number (a numeric
/// header usually means the header row is missing). Short rows are padded
/// with [`Cell::Empty`]; cells past the last header are dropped.
pub fn parse_csv(text: &str, has_headers: bool) -> MappingResult<Rows> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(text.as_bytes());

    if !has_headers {
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(typed).collect());
        }
        debug!(rows = rows.len(), "parsed headerless csv");
        return Ok(Rows::Positional(rows));
    }

    let headers = check_headers(reader.headers()?)?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Record = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.as_str(), record.get(i).map_or(Cell::Empty, typed)))
            .collect();
        rows.push(row);
    }
    debug!(rows = rows.len(), columns = headers.len(), "parsed csv");
    Ok(Rows::Records(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEATHER: &str = "t,glob,dir\n\
                           2020-01-01T00:00Z,1,4\n\
                           # comment\n\
                           \n\
                           2020-01-01T01:00Z,2,3\n";

    #[test]
    fn headered_cells_are_typed() {
        let Rows::Records(rows) = parse_csv(WEATHER, true).unwrap() else {
            panic!("expected records");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].headers().collect::<Vec<_>>(), ["t", "glob", "dir"]);
        assert_eq!(rows[0].get("t"), Some(&Cell::Text("2020-01-01T00:00Z".into())));
        assert_eq!(rows[1].get("dir"), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn headerless_keeps_every_row() {
        let Rows::Positional(rows) = parse_csv("a,1\nb,,2.5\n", false).unwrap() else {
            panic!("expected positional rows");
        };
        assert_eq!(rows[0], vec![Cell::Text("a".into()), Cell::Number(1.0)]);
        assert_eq!(
            rows[1],
            vec![Cell::Text("b".into()), Cell::Empty, Cell::Number(2.5)]
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let Rows::Records(rows) = parse_csv("a,b\n1\n", true).unwrap() else {
            panic!("expected records");
        };
        assert_eq!(rows[0].get("b"), Some(&Cell::Empty));
    }

    #[test]
    fn bad_headers_are_rejected() {
        assert!(matches!(
            parse_csv("1,2\n3,4\n", true),
            Err(MappingError::NumericHeader { .. })
        ));
        assert!(matches!(
            parse_csv("a,,c\n1,2,3\n", true),
            Err(MappingError::MissingHeader { column: 1 })
        ));
        assert!(matches!(
            parse_csv("a,a\n1,2\n", true),
            Err(MappingError::DuplicateHeader { .. })
        ));
    }
}
