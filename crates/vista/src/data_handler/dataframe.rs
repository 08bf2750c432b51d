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

use crate::data_handler::column::Column;
use crate::data_handler::common::{DataType, DatasetMetadata, Value};
use crate::error::{DataError, DataResult, SchemaError};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Immutable column-oriented table. Every derived operation returns a new
/// `Table`; columns are shared through `Arc` until they are re-sliced.
#[derive(Debug, Clone)]
pub struct Table {
    columns: HashMap<String, Arc<Column>>,
    pub metadata: DatasetMetadata,
    column_order: Vec<String>,
}

impl Table {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            columns: HashMap::new(),
            metadata,
            column_order: Vec::new(),
        }
    }

    pub(crate) fn from_parts(name: String, columns: Vec<(String, Column)>) -> Self {
        let mut metadata = DatasetMetadata::named(name);
        metadata.row_count = columns.first().map_or(0, |(_, c)| c.len());
        metadata.column_count = columns.len();
        let column_order = columns.iter().map(|(n, _)| n.clone()).collect();
        Self {
            columns: columns.into_iter().map(|(n, c)| (n, Arc::new(c))).collect(),
            metadata,
            column_order,
        }
    }

    pub fn add_column(&mut self, name: String, column: Column) -> DataResult<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(DataError::LengthMismatch {
                expected: self.row_count(),
                found: column.len(),
            });
        }
        if self.columns.contains_key(&name) {
            return Err(SchemaError::DuplicateColumn { column: name }.into());
        }
        self.metadata.row_count = column.len();
        self.column_order.push(name.clone());
        self.columns.insert(name, Arc::new(column));
        self.metadata.column_count = self.columns.len();
        Ok(())
    }

    pub fn replace_column(&mut self, name: &str, column: Column) -> DataResult<()> {
        if column.len() != self.row_count() {
            return Err(DataError::LengthMismatch {
                expected: self.row_count(),
                found: column.len(),
            });
        }
        let slot = self
            .columns
            .get_mut(name)
            .ok_or_else(|| SchemaError::UnknownColumn {
                column: name.to_string(),
            })?;
        *slot = Arc::new(column);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }

    pub fn column_count(&self) -> usize {
        self.metadata.column_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(AsRef::as_ref)
    }

    pub fn column(&self, name: &str) -> Result<&Column, SchemaError> {
        self.get_column(name).ok_or_else(|| SchemaError::UnknownColumn {
            column: name.to_string(),
        })
    }

    pub fn numeric_column(&self, name: &str) -> Result<&Column, SchemaError> {
        let column = self.column(name)?;
        if column.data_type().is_numeric() {
            Ok(column)
        } else {
            Err(SchemaError::TypeMismatch {
                column: name.to_string(),
                expected: "numeric".to_string(),
                found: column.data_type().to_string(),
            })
        }
    }

    pub fn data_type(&self, name: &str) -> Result<DataType, SchemaError> {
        self.column(name).map(Column::data_type)
    }

    pub fn value(&self, row: usize, column: &str) -> Result<Value, SchemaError> {
        self.column(column).map(|c| c.get(row))
    }

    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .column_order
            .iter()
            .map(|name| (name.clone(), self.columns[name].select_rows(indices)))
            .collect();
        let mut table = Table::from_parts(self.metadata.name.clone(), columns);
        table.metadata.row_count = indices.len();
        table.metadata.source_path = self.metadata.source_path.clone();
        table
    }

    pub fn filter_rows<P>(&self, predicate: P) -> Table
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        let indices: Vec<usize> = (0..self.row_count())
            .into_par_iter()
            .filter(|&i| predicate(i))
            .collect();
        self.select_rows(&indices)
    }

    /// Stable sort on one column; nulls go last in either direction.
    pub fn sort_by(&self, column_name: &str, ascending: bool) -> Result<Table, SchemaError> {
        let column = self.column(column_name)?;
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        indices.par_sort_by(|&a, &b| match (column.is_null(a), column.is_null(b)) {
            (false, false) if ascending => column.compare_rows(a, b),
            (false, false) => column.compare_rows(b, a),
            _ => column.compare_rows(a, b),
        });
        Ok(self.select_rows(&indices))
    }

    pub fn head(&self, n: usize) -> Table {
        let end = n.min(self.row_count());
        self.select_rows(&(0..end).collect::<Vec<_>>())
    }

    /// Distinct non-null values rendered as strings, sorted alphabetically.
    pub fn distinct_values(&self, column_name: &str) -> Result<Vec<String>, SchemaError> {
        let column = self.column(column_name)?;
        let values: BTreeSet<String> = (0..self.row_count())
            .filter_map(|i| column.get_string(i))
            .collect();
        Ok(values.into_iter().collect())
    }

    pub fn numeric_bounds(&self, column_name: &str) -> Result<Option<(f64, f64)>, SchemaError> {
        let column = self.numeric_column(column_name)?;
        Ok((0..self.row_count())
            .filter_map(|i| column.to_f64(i))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }))
    }

    pub fn numeric_values(&self, column_name: &str) -> Result<Vec<Option<f64>>, SchemaError> {
        let column = self.numeric_column(column_name)?;
        Ok((0..self.row_count()).map(|i| column.to_f64(i)).collect())
    }

    pub fn string_values(&self, column_name: &str) -> Result<Vec<Option<String>>, SchemaError> {
        let column = self.column(column_name)?;
        Ok((0..self.row_count()).map(|i| column.get_string(i)).collect())
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.column_order == other.column_order
            && self.row_count() == other.row_count()
            && self
                .column_order
                .iter()
                .all(|name| self.columns[name] == other.columns[name])
    }
}
