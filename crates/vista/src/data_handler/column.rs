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

use crate::data_handler::common::{DataType, Value};
use crate::error::{DataError, DataResult};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Arc<[Option<i64>]>),
    Float64(Arc<[Option<f64>]>),
    String(Arc<[Option<Arc<str>>]>),
    Boolean(Arc<[Option<bool>]>),
    Date(Arc<[Option<NaiveDate>]>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int64(data) => data.len(),
            Column::Float64(data) => data.len(),
            Column::String(data) => data.len(),
            Column::Boolean(data) => data.len(),
            Column::Date(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Int64(_) => DataType::Int64,
            Column::Float64(_) => DataType::Float64,
            Column::String(_) => DataType::String,
            Column::Boolean(_) => DataType::Boolean,
            Column::Date(_) => DataType::Date,
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.get(index).is_null()
    }

    pub fn get(&self, index: usize) -> Value {
        let value = match self {
            Column::Int64(data) => data.get(index).copied().flatten().map(Value::Int),
            Column::Float64(data) => data
                .get(index)
                .copied()
                .flatten()
                .filter(|v| !v.is_nan())
                .map(Value::Float),
            Column::String(data) => data.get(index).cloned().flatten().map(Value::Text),
            Column::Boolean(data) => data.get(index).copied().flatten().map(Value::Bool),
            Column::Date(data) => data.get(index).copied().flatten().map(Value::Date),
        };
        value.unwrap_or(Value::Null)
    }

    pub fn get_string(&self, index: usize) -> Option<String> {
        match self.get(index) {
            Value::Null => None,
            value => Some(value.to_string()),
        }
    }

    pub fn to_f64(&self, index: usize) -> Option<f64> {
        self.get(index).as_f64()
    }

    /// Orders two rows of this column; nulls sort after every value.
    pub fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        match (self.get(a), self.get(b)) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Text(x), Value::Text(y)) => x.cmp(&y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(&y),
            (Value::Date(x), Value::Date(y)) => x.cmp(&y),
            (Value::Int(x), Value::Int(y)) => x.cmp(&y),
            (x, y) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => x.to_string().cmp(&y.to_string()),
            },
        }
    }

    pub fn from_strings(name: &str, values: &[Option<String>], data_type: DataType) -> DataResult<Self> {
        let parse_error = |value: &str| DataError::Parse {
            column: name.to_string(),
            value: value.to_string(),
            expected: data_type.to_string(),
        };
        let cells: Vec<Option<&str>> = values
            .iter()
            .map(|v| v.as_deref().map(str::trim).filter(|s| !is_missing(s)))
            .collect();
        Ok(match data_type {
            DataType::Int64 => {
                let parsed: DataResult<Vec<Option<i64>>> = cells
                    .par_iter()
                    .map(|cell| cell.map(|s| parse_int(s).ok_or_else(|| parse_error(s))).transpose())
                    .collect();
                Column::Int64(parsed?.into())
            }
            DataType::Float64 => {
                let parsed: DataResult<Vec<Option<f64>>> = cells
                    .par_iter()
                    .map(|cell| cell.map(|s| parse_float(s).ok_or_else(|| parse_error(s))).transpose())
                    .collect();
                Column::Float64(parsed?.into())
            }
            DataType::Boolean => {
                let parsed: DataResult<Vec<Option<bool>>> = cells
                    .par_iter()
                    .map(|cell| cell.map(|s| parse_bool(s).ok_or_else(|| parse_error(s))).transpose())
                    .collect();
                Column::Boolean(parsed?.into())
            }
            DataType::Date => {
                let parsed: DataResult<Vec<Option<NaiveDate>>> = cells
                    .par_iter()
                    .map(|cell| cell.map(|s| parse_date(s).ok_or_else(|| parse_error(s))).transpose())
                    .collect();
                Column::Date(parsed?.into())
            }
            DataType::String => {
                let strings: Vec<Option<Arc<str>>> =
                    cells.iter().map(|cell| cell.map(Arc::from)).collect();
                Column::String(strings.into())
            }
        })
    }

    pub fn from_values(data_type: DataType, values: &[Value]) -> Self {
        match data_type {
            DataType::Int64 => Column::Int64(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect(),
            ),
            DataType::Float64 => Column::Float64(values.iter().map(Value::as_f64).collect()),
            DataType::String => Column::String(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Null => None,
                        Value::Text(s) => Some(s.clone()),
                        other => Some(Arc::from(other.to_string().as_str())),
                    })
                    .collect(),
            ),
            DataType::Boolean => Column::Boolean(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect(),
            ),
            DataType::Date => Column::Date(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Date(d) => Some(*d),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    }

    /// Converts to `target`, used when a declared schema disagrees with the
    /// inferred type. Int64 widens to Float64 losslessly.
    pub fn cast(&self, name: &str, target: DataType) -> DataResult<Self> {
        if self.data_type() == target {
            return Ok(self.clone());
        }
        match (self, target) {
            (Column::Int64(data), DataType::Float64) => Ok(Column::Float64(
                data.iter().map(|v| v.map(|i| i as f64)).collect(),
            )),
            _ => {
                let raw: Vec<Option<String>> = (0..self.len()).map(|i| self.get_string(i)).collect();
                Column::from_strings(name, &raw, target)
            }
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone + Send + Sync>(data: &[Option<T>], indices: &[usize]) -> Arc<[Option<T>]> {
            indices
                .par_iter()
                .map(|&i| data.get(i).cloned().flatten())
                .collect::<Vec<_>>()
                .into()
        }
        match self {
            Column::Int64(data) => Column::Int64(pick(data, indices)),
            Column::Float64(data) => Column::Float64(pick(data, indices)),
            Column::String(data) => Column::String(pick(data, indices)),
            Column::Boolean(data) => Column::Boolean(pick(data, indices)),
            Column::Date(data) => Column::Date(pick(data, indices)),
        }
    }
}

fn parse_int(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        // "2015.0" style years exported by spreadsheet tools
        let f = s.parse::<f64>().ok()?;
        (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
    })
}

/// Missing-value markers treated as null, matching common CSV exports.
pub fn is_missing(s: &str) -> bool {
    matches!(s, "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None")
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

#[derive(Debug)]
pub struct ColumnBuilder {
    name: String,
    values: Vec<Option<String>>,
    inferred_type: Option<DataType>,
}

impl ColumnBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            inferred_type: None,
        }
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            values: Vec::with_capacity(capacity),
            inferred_type: None,
        }
    }

    pub fn push(&mut self, value: Option<String>) {
        if let Some(sample) = value.as_deref().map(str::trim).filter(|s| !is_missing(s)) {
            let observed = Self::infer_type(sample);
            self.inferred_type = Some(match self.inferred_type {
                None => observed,
                Some(current) => Self::widen(current, observed),
            });
        }
        self.values.push(value);
    }

    pub fn build(self) -> DataResult<Column> {
        let data_type = self.inferred_type.unwrap_or(DataType::String);
        Column::from_strings(&self.name, &self.values, data_type)
    }

    fn infer_type(sample: &str) -> DataType {
        if sample.parse::<i64>().is_ok() {
            DataType::Int64
        } else if parse_float(sample).is_some() {
            DataType::Float64
        } else if parse_bool(sample).is_some() {
            DataType::Boolean
        } else if parse_date(sample).is_some() {
            DataType::Date
        } else {
            DataType::String
        }
    }

    fn widen(current: DataType, observed: DataType) -> DataType {
        match (current, observed) {
            (a, b) if a == b => a,
            (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
                DataType::Float64
            }
            _ => DataType::String,
        }
    }
}
