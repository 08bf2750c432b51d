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

pub mod column;
pub mod common;
pub mod dataframe;
pub mod io;
pub mod schema;
pub mod transformation;

pub use column::{Column, ColumnBuilder};
pub use common::{DataType, DatasetId, DatasetMetadata, Value};
pub use dataframe::Table;
pub use io::CsvReader;
pub use schema::{ColumnRole, ColumnSchema, ConformReport, TableSchema};

pub use transformation::{
    aggregate, filter, group_by, join, top_n, AggregateFunction, AggregateOperation,
    CategoryMatch, Filter, GroupByOperation, Predicate,
};

use crate::error::DataResult;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub schema: TableSchema,
    pub report: ConformReport,
}

/// Reads `path`, parses declared columns with their declared types and
/// conforms the result to `schema`.
pub fn load_csv<P: AsRef<Path>>(path: P, name: String, schema: TableSchema) -> DataResult<LoadedTable> {
    let raw = CsvReader::new()
        .with_schema(schema.clone())
        .read_file(path.as_ref(), name)?;
    conform(raw, schema)
}

pub fn load_csv_str(data: &str, name: String, schema: TableSchema) -> DataResult<LoadedTable> {
    let raw = CsvReader::new().with_schema(schema.clone()).read_str(data, name)?;
    conform(raw, schema)
}

fn conform(raw: Table, mut schema: TableSchema) -> DataResult<LoadedTable> {
    let (table, report) = schema.conform(&raw)?;
    if report.dropped_rows > 0 {
        info!(dropped = report.dropped_rows, "rows with null key columns dropped");
    }
    Ok(LoadedTable {
        table,
        schema,
        report,
    })
}
