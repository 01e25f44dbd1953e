use proptest::prelude::*;
use serde_json::json;
use spi_mapping::*;

fn weather_records() -> Rows {
    Rows::from_json(&json!([
        {"t": "2020-01-01T00:00Z", "glob": 1, "dir": 4},
        {"t": "2020-01-01T01:00Z", "glob": 2, "dir": 3},
        {"t": "2020-01-01T02:00Z", "glob": 3, "dir": 2},
        {"t": "2020-01-01T03:00Z", "glob": 4, "dir": 1}
    ]))
    .unwrap()
}

fn weather_positional() -> Rows {
    Rows::from_json(&json!([
        ["2020-01-01T00:00Z", 1, 4],
        ["2020-01-01T01:00Z", 2, 3],
        ["2020-01-01T02:00Z", 3, 2],
        ["2020-01-01T03:00Z", 4, 1]
    ]))
    .unwrap()
}

fn mapping_from(fields: &[(&str, usize)]) -> Mapping {
    fields.iter().fold(Mapping::new(), |mapping, (field, index)| {
        mapping.with(*field, FieldSource::new(ColumnLocator::index(*index)))
    })
}

/// Parsed from text so that document order is kept.
fn mapping(text: &str) -> Mapping {
    serde_json::from_str(text).unwrap()
}

#[test]
fn headered_without_units() {
    let mapping = mapping(r#"{
        "time": {"csv_header": "t"},
        "dni": {"csv_header": "dir"}
    }"#);
    assert_eq!(
        map_to_csv(weather_records(), &mapping).unwrap(),
        [
            "time,dni",
            "2020-01-01T00:00Z,4",
            "2020-01-01T01:00Z,3",
            "2020-01-01T02:00Z,2",
            "2020-01-01T03:00Z,1",
        ]
        .join("\r\n")
    );
}

#[test]
fn headered_with_unit_conversion() {
    let mapping = mapping(r#"{
        "time": {"csv_header": "t"},
        "performance": {"csv_header": "dir", "units": "kW"}
    }"#);
    assert_eq!(
        map_to_csv(weather_records(), &mapping).unwrap(),
        [
            "time,performance",
            "2020-01-01T00:00Z,4000",
            "2020-01-01T01:00Z,3000",
            "2020-01-01T02:00Z,2000",
            "2020-01-01T03:00Z,1000",
        ]
        .join("\r\n")
    );
}

#[test]
fn output_follows_mapping_order() {
    let mapping = mapping(r#"{
        "dni": {"csv_header": "dir"},
        "time": {"csv_header": "t"},
        "ghi": {"csv_header": "glob"}
    }"#);
    let csv = map_to_csv(weather_records(), &mapping).unwrap();
    assert!(csv.starts_with("dni,time,ghi\r\n4,2020-01-01T00:00Z,1\r\n"));
}

#[test]
fn headerless_partial_coverage_keeps_unmapped_columns() {
    let mapping = mapping(r#"{
        "time": {"csv_header": {"header_index": 0}},
        "dni": {"csv_header": {"header_index": 2}}
    }"#);
    assert_eq!(
        map_to_csv(weather_positional(), &mapping).unwrap(),
        [
            "time,_missing_col_1,dni",
            "2020-01-01T00:00Z,1,4",
            "2020-01-01T01:00Z,2,3",
            "2020-01-01T02:00Z,3,2",
            "2020-01-01T03:00Z,4,1",
        ]
        .join("\r\n")
    );
}

#[test]
fn headerless_output_is_sorted_by_position() {
    let mapping = mapping(r#"{
        "dni": {"csv_header": {"header_index": 2}},
        "time": {"csv_header": {"header_index": 0}},
        "ghi": {"csv_header": {"header_index": 1}, "units": "kW/m^2"}
    }"#);
    let csv = map_to_csv(weather_positional(), &mapping).unwrap();
    let mut lines = csv.split("\r\n");
    assert_eq!(lines.next(), Some("time,ghi,dni"));
    assert_eq!(lines.next(), Some("2020-01-01T00:00Z,1000,4"));
}

#[test]
fn shared_header_with_same_units_is_allowed() {
    let mapping = mapping(r#"{
        "time": {"csv_header": "t"},
        "ghi": {"csv_header": "glob"},
        "poa_global": {"csv_header": "glob"}
    }"#);
    let csv = map_to_csv(weather_records(), &mapping).unwrap();
    assert!(csv.starts_with("time,ghi,poa_global\r\n2020-01-01T00:00Z,1,1\r\n"));

    let converted = mapping_with_units("kW/m^2", "kW/m^2");
    let csv = map_to_csv(weather_records(), &converted).unwrap();
    assert!(csv.contains("2020-01-01T00:00Z,1000,1000"));
}

fn mapping_with_units(first: &str, second: &str) -> Mapping {
    mapping(&format!(
        r#"{{
            "time": {{"csv_header": "t"}},
            "ghi": {{"csv_header": "glob", "units": "{first}"}},
            "poa_global": {{"csv_header": "glob", "units": "{second}"}}
        }}"#
    ))
}

#[test]
fn shared_header_with_conflicting_units_is_rejected() {
    let err = map_to_csv(weather_records(), &mapping_with_units("kW/m^2", "W/m^2")).unwrap_err();
    assert!(matches!(
        err,
        MappingError::AliasedColumn { ref column, ref first, ref second }
            if column == "glob" && first == "ghi" && second == "poa_global"
    ));
}

#[test]
fn shared_index_is_rejected() {
    let mapping = mapping(r#"{
        "time": {"csv_header": {"header_index": 0}},
        "ghi": {"csv_header": {"header_index": 1}},
        "dhi": {"csv_header": {"header_index": 1}}
    }"#);
    assert!(matches!(
        map_to_csv(weather_positional(), &mapping),
        Err(MappingError::AliasedColumn { .. })
    ));
}

#[test]
fn locator_kind_must_match_row_shape() {
    let by_index = mapping(r#"{"time": {"csv_header": {"header_index": 0}}}"#);
    assert!(matches!(
        map_to_csv(weather_records(), &by_index),
        Err(MappingError::LocatorMismatch { .. })
    ));
    let by_name = mapping(r#"{"time": {"csv_header": "t"}}"#);
    assert!(matches!(
        map_to_csv(weather_positional(), &by_name),
        Err(MappingError::LocatorMismatch { .. })
    ));
}

#[test]
fn unknown_header_is_reported() {
    let mapping = mapping(r#"{"time": {"csv_header": "timestamp"}}"#);
    assert!(matches!(
        map_to_csv(weather_records(), &mapping),
        Err(MappingError::UnknownHeader { ref header, row: 0 }) if header == "timestamp"
    ));
}

#[test]
fn cross_family_units_are_rejected() {
    let mapping = mapping(r#"{
        "time": {"csv_header": "t"},
        "ghi": {"csv_header": "glob", "units": "MW"}
    }"#);
    assert!(matches!(
        map_to_csv(weather_records(), &mapping),
        Err(MappingError::UnsupportedUnits { .. })
    ));
}

#[test]
fn mapped_index_past_the_data_is_rejected() {
    let mapping = mapping(r#"{
        "time": {"csv_header": {"header_index": 0}},
        "dni": {"csv_header": {"header_index": 7}}
    }"#);
    let err = map_to_csv(weather_positional(), &mapping).unwrap_err();
    assert!(matches!(
        err,
        MappingError::ColumnOutOfRange { ref field, index: 7, width: 3 } if field == "dni"
    ));

    let just_past = mapping_from(&[("time", 0), ("dni", 3)]);
    assert!(matches!(
        map_to_csv(weather_positional(), &just_past),
        Err(MappingError::ColumnOutOfRange { index: 3, .. })
    ));
}

#[test]
fn largest_index_is_rejected_without_overflow() {
    let mapping = mapping_from(&[("time", 0), ("dni", usize::MAX)]);
    assert!(matches!(
        map_to_csv(weather_positional(), &mapping),
        Err(MappingError::ColumnOutOfRange { index: usize::MAX, width: 3, .. })
    ));
}

#[test]
fn headerless_without_rows_lists_mapped_fields_by_position() {
    let mapping = mapping_from(&[("dni", usize::MAX), ("time", 0)]);
    assert_eq!(
        map_to_csv(Rows::Positional(Vec::new()), &mapping).unwrap(),
        "time,dni"
    );
}

#[test]
fn parsed_csv_maps_end_to_end() {
    let text = "# exported\nstamp,power_kw\n2020-01-01T00:00Z,1.5\n2020-01-01T01:00Z,\n";
    let rows = parse_csv(text, true).unwrap();
    let mut builder = MappingBuilder::new(["time", "performance"]);
    builder.assign("time", ColumnLocator::header("stamp"), None).unwrap();
    builder
        .assign("performance", ColumnLocator::header("power_kw"), Some("kW"))
        .unwrap();
    let csv = map_to_csv(rows, &builder.build().unwrap()).unwrap();
    assert_eq!(
        csv,
        "time,performance\r\n2020-01-01T00:00Z,1500\r\n2020-01-01T01:00Z,"
    );
}

#[test]
fn mapping_files_round_trip() {
    let original = mapping_with_units("kW/m^2", "kW/m^2");
    for name in ["spi_mapping_roundtrip.yaml", "spi_mapping_roundtrip.json"] {
        let path = std::env::temp_dir().join(name);
        save_mapping(&path, &original).unwrap();
        assert_eq!(load_mapping(&path).unwrap(), original);
    }
}

proptest! {
    #[test]
    fn headered_output_has_one_line_per_row(
        values in prop::collection::vec(-1.0e6_f64..1.0e6, 0..20),
    ) {
        let rows = Rows::Records(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    [("t", Cell::Number(i as f64)), ("v", Cell::Number(*v))]
                        .into_iter()
                        .collect::<Record>()
                })
                .collect(),
        );
        let mapping = Mapping::new()
            .with("time", FieldSource::new(ColumnLocator::header("t")))
            .with("performance", FieldSource::new(ColumnLocator::header("v")).with_units("kW"));
        let csv = map_to_csv(rows, &mapping).unwrap();
        prop_assert!(!csv.ends_with("\r\n"));
        let lines: Vec<&str> = csv.split("\r\n").collect();
        prop_assert_eq!(lines.len(), values.len() + 1);
        prop_assert_eq!(lines[0], "time,performance");
        for (line, v) in lines[1..].iter().zip(&values) {
            let cell = line.split(',').nth(1).unwrap();
            let parsed: f64 = cell.parse().unwrap();
            prop_assert_eq!(parsed, *v * 1000.0);
        }
    }
}
