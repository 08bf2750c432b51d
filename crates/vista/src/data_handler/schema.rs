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

//! Declared column layout of a dataset.
//!
//! A [`TableSchema`] is checked once, when the source file is loaded, so a
//! dashboard never discovers a missing column while evaluating an output.
//! Key columns must be present and non-null in every row; rows violating
//! that are dropped by [`TableSchema::conform`] and counted.

use crate::data_handler::common::DataType;
use crate::data_handler::dataframe::Table;
use crate::error::{DataResult, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Key,
    Feature,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
    pub role: ColumnRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
    #[serde(default)]
    infer_features: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConformReport {
    pub dropped_rows: usize,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnSchema {
            name: name.into(),
            data_type,
            role: ColumnRole::Key,
        });
        self
    }

    pub fn feature(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnSchema {
            name: name.into(),
            data_type,
            role: ColumnRole::Feature,
        });
        self
    }

    /// Treat every undeclared numeric column of the source as a feature.
    pub fn with_inferred_features(mut self) -> Self {
        self.infer_features = true;
        self
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.role == ColumnRole::Key)
    }

    pub fn features(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.role == ColumnRole::Feature)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Coerces declared columns to their declared types, adds inferred
    /// numeric features, and drops rows with a null key.
    pub fn conform(&mut self, table: &Table) -> DataResult<(Table, ConformReport)> {
        self.validate()?;
        let mut conformed = table.clone();
        for column in &self.columns {
            let source = table
                .get_column(&column.name)
                .ok_or_else(|| SchemaError::MissingColumn {
                    column: column.name.clone(),
                })?;
            if source.data_type() != column.data_type {
                if column.data_type.is_numeric() && !source.data_type().is_numeric() && source.null_count() < source.len() {
                    return Err(SchemaError::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.data_type.to_string(),
                        found: source.data_type().to_string(),
                    }
                    .into());
                }
                conformed.replace_column(&column.name, source.cast(&column.name, column.data_type)?)?;
            }
        }
        if self.infer_features {
            for name in table.column_names() {
                let inferred = table.get_column(name).map(|c| c.data_type());
                if let Some(data_type) = inferred.filter(|t| t.is_numeric()) {
                    if !self.contains(name) {
                        self.columns.push(ColumnSchema {
                            name: name.clone(),
                            data_type,
                            role: ColumnRole::Feature,
                        });
                    }
                }
            }
        }
        let keys: Vec<&str> = self.keys().map(|c| c.name.as_str()).collect();
        let kept: Vec<usize> = (0..conformed.row_count())
            .filter(|&row| {
                keys.iter().all(|key| {
                    conformed
                        .get_column(key)
                        .is_some_and(|column| !column.is_null(row))
                })
            })
            .collect();
        let dropped_rows = conformed.row_count() - kept.len();
        if dropped_rows > 0 {
            conformed = conformed.select_rows(&kept);
        }
        Ok((conformed, ConformReport { dropped_rows }))
    }
}
