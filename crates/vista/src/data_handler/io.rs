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

use crate::data_handler::column::{Column, ColumnBuilder};
use crate::data_handler::common::DatasetMetadata;
use crate::data_handler::dataframe::Table;
use crate::data_handler::schema::TableSchema;
use crate::error::{DataError, DataResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const MAX_FIELDS: usize = 10000;

#[derive(Debug)]
pub struct CsvReader {
    has_headers: bool,
    quote_char: u8,
    schema: Option<TableSchema>,
}

impl CsvReader {
    pub fn new() -> Self {
        Self {
            has_headers: true,
            quote_char: b'"',
            schema: None,
        }
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Declared columns are parsed with their declared type instead of the
    /// inferred one.
    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn read_file(&self, path: &Path, dataset_name: String) -> DataResult<Table> {
        let file = File::open(path)?;
        let mut table = self.read_from(file, dataset_name)?;
        table.metadata.source_path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "table loaded"
        );
        Ok(table)
    }

    pub fn read_str(&self, data: &str, dataset_name: String) -> DataResult<Table> {
        self.read_from(data.as_bytes(), dataset_name)
    }

    fn read_from<R: Read>(&self, source: R, dataset_name: String) -> DataResult<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .quote(self.quote_char)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);
        let mut names: Vec<String> = if self.has_headers {
            reader.headers()?.iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        let mut row_count = 0;
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > MAX_FIELDS {
                return Err(DataError::Parse {
                    column: format!("line {}", line + 1),
                    value: record.len().to_string(),
                    expected: format!("at most {MAX_FIELDS} fields"),
                });
            }
            if names.is_empty() {
                names = (0..record.len()).map(|i| format!("column_{i}")).collect();
                cells = vec![Vec::new(); names.len()];
            }
            if record.len() > names.len() {
                return Err(DataError::ExtraFields {
                    line: record.position().map_or(line as u64 + 1, csv::Position::line),
                    expected: names.len(),
                    found: record.len(),
                });
            }
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(record.get(i).map(str::to_string));
            }
            row_count += 1;
        }
        let mut table = Table::new(DatasetMetadata::named(dataset_name));
        for (name, values) in names.into_iter().zip(cells) {
            let declared = self
                .schema
                .as_ref()
                .and_then(|s| s.get(&name))
                .map(|c| c.data_type);
            let column = match declared {
                Some(data_type) => Column::from_strings(&name, &values, data_type)?,
                None => {
                    let mut builder = ColumnBuilder::with_capacity(name.as_str(), values.len());
                    for value in values {
                        builder.push(value);
                    }
                    builder.build()?
                }
            };
            table.add_column(name, column)?;
        }
        debug!(rows = row_count, columns = table.column_count(), "csv decoded");
        Ok(table)
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}
