// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use std::io::Write;
use tempfile::NamedTempFile;
use vista::data_handler::{load_csv, load_csv_str, CsvReader, DataType, TableSchema, Value};
use vista::{DataError, SchemaError};

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn schema() -> TableSchema {
    TableSchema::new()
        .key("Country code", DataType::String)
        .key("Year", DataType::Int64)
        .feature("Visas issued", DataType::Float64)
        .with_inferred_features()
}

#[test]
fn test_load_from_disk_records_source_and_types() {
    let file = write_csv("Country code,Year,Visas issued,Total population\nCHN,2017,100,1400.5\nIND,2018,80,1300\n");
    let loaded = load_csv(file.path(), "visas".to_string(), schema()).unwrap();
    assert_eq!(loaded.table.row_count(), 2);
    assert_eq!(loaded.table.metadata.source_path.as_deref(), Some(file.path()));
    assert_eq!(loaded.table.data_type("Year").unwrap(), DataType::Int64);
    assert_eq!(loaded.table.data_type("Visas issued").unwrap(), DataType::Float64);
    assert_eq!(loaded.table.data_type("Total population").unwrap(), DataType::Float64);
    assert_eq!(
        loaded.schema.features(),
        vec!["Visas issued".to_string(), "Total population".to_string()]
    );
    assert_eq!(loaded.report.dropped_rows, 0);
}

#[test]
fn test_null_keys_are_dropped() {
    let loaded = load_csv_str(
        "Country code,Year,Visas issued\nCHN,2017,100\n,2017,5\nIND,NA,7\nRUS,2018,\n",
        "visas".to_string(),
        schema(),
    )
    .unwrap();
    assert_eq!(loaded.report.dropped_rows, 2);
    assert_eq!(loaded.table.row_count(), 2);
    assert_eq!(loaded.table.value(1, "Visas issued").unwrap(), Value::Null);
}

#[test]
fn test_missing_declared_column_fails_at_load() {
    let err = load_csv_str("Country code,Visas issued\nCHN,1\n", "visas".to_string(), schema()).unwrap_err();
    assert!(matches!(
        err,
        DataError::Schema(SchemaError::MissingColumn { ref column }) if column == "Year"
    ));
}

#[test]
fn test_wrong_kind_fails_at_load() {
    let err = load_csv_str(
        "Country code,Year,Visas issued\nCHN,2017,many\n",
        "visas".to_string(),
        schema(),
    )
    .unwrap_err();
    assert!(matches!(err, DataError::Parse { ref column, .. } if column == "Visas issued"));
}

#[test]
fn test_spreadsheet_style_years_parse_as_integers() {
    let loaded = load_csv_str("Country code,Year,Visas issued\nCHN,2017.0,1\n", "visas".to_string(), schema()).unwrap();
    assert_eq!(loaded.table.value(0, "Year").unwrap(), Value::Int(2017));
}

#[test]
fn test_reader_without_headers_names_columns() {
    let table = CsvReader::new()
        .with_headers(false)
        .read_str("a,1\nb,2\n", "raw".to_string())
        .unwrap();
    assert_eq!(table.column_names(), ["column_0".to_string(), "column_1".to_string()]);
    assert_eq!(table.data_type("column_1").unwrap(), DataType::Int64);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_csv(dir.path().join("absent.csv"), "visas".to_string(), schema()).unwrap_err();
    assert!(matches!(err, DataError::Io(_)));
}

#[test]
fn test_row_wider_than_header_is_rejected() {
    let err = CsvReader::new()
        .read_str("a,b\n1,2,3\n4,5\n", "raw".to_string())
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::ExtraFields {
            line: 2,
            expected: 2,
            found: 3
        }
    ));
}

#[test]
fn test_unquoted_comma_in_country_name_fails_load() {
    let csv = "Country code,Year,Visas issued\nKOR,2017,10\nKorea, Republic of,2018,12\n";
    let err = load_csv_str(csv, "visas".to_string(), schema()).unwrap_err();
    assert!(matches!(err, DataError::ExtraFields { line: 3, .. }));
}

#[test]
fn test_short_row_pads_with_nulls() {
    let table = CsvReader::new()
        .read_str("a,b\n1,2\n3\n", "raw".to_string())
        .unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.value(1, "b").unwrap(), Value::Null);
}
