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
use crate::data_handler::common::{DataType, Value};
use crate::data_handler::dataframe::Table;
use crate::error::SchemaError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMatch {
    All,
    Value(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Equals { column: String, value: CategoryMatch },
    Range { column: String, lo: f64, hi: f64 },
}

/// Conjunction of predicates. An empty filter keeps every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, column: impl Into<String>, value: CategoryMatch) -> Self {
        self.predicates.push(Predicate::Equals {
            column: column.into(),
            value,
        });
        self
    }

    /// Equality against `value`, or no constraint when `value == all_label`.
    pub fn equals_or_all(self, column: impl Into<String>, value: &str, all_label: &str) -> Self {
        let matcher = if value == all_label {
            CategoryMatch::All
        } else {
            CategoryMatch::Value(value.to_string())
        };
        self.equals(column, matcher)
    }

    pub fn range(mut self, column: impl Into<String>, lo: f64, hi: f64) -> Self {
        self.predicates.push(Predicate::Range {
            column: column.into(),
            lo,
            hi,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Debug)]
enum CompiledPredicate<'a> {
    Always,
    TextEqual(&'a Column, String),
    NumberEqual(&'a Column, f64),
    Between(&'a Column, f64, f64),
}

impl CompiledPredicate<'_> {
    fn evaluate(&self, index: usize) -> bool {
        match self {
            CompiledPredicate::Always => true,
            CompiledPredicate::TextEqual(column, val) => {
                column.get_string(index).is_some_and(|s| s == *val)
            }
            CompiledPredicate::NumberEqual(column, val) => {
                column.to_f64(index).is_some_and(|v| v == *val)
            }
            CompiledPredicate::Between(column, lo, hi) => {
                column.to_f64(index).is_some_and(|v| v >= *lo && v <= *hi)
            }
        }
    }
}

fn compile<'a>(table: &'a Table, predicate: &Predicate) -> Result<CompiledPredicate<'a>, SchemaError> {
    match predicate {
        Predicate::Equals { column, value } => {
            let source = table.column(column)?;
            match value {
                CategoryMatch::All => Ok(CompiledPredicate::Always),
                CategoryMatch::Value(v) if source.data_type().is_numeric() => v
                    .parse::<f64>()
                    .map(|n| CompiledPredicate::NumberEqual(source, n))
                    .map_err(|_| SchemaError::TypeMismatch {
                        column: column.clone(),
                        expected: source.data_type().to_string(),
                        found: DataType::String.to_string(),
                    }),
                CategoryMatch::Value(v) => Ok(CompiledPredicate::TextEqual(source, v.clone())),
            }
        }
        Predicate::Range { column, lo, hi } => {
            let source = table.numeric_column(column)?;
            Ok(CompiledPredicate::Between(source, *lo, *hi))
        }
    }
}

/// Rows of `table` satisfying every predicate, in their original order.
pub fn filter(table: &Table, filter: &Filter) -> Result<Table, SchemaError> {
    let compiled = filter
        .predicates
        .iter()
        .map(|p| compile(table, p))
        .collect::<Result<Vec<_>, _>>()?;
    if compiled.iter().all(|p| matches!(p, CompiledPredicate::Always)) {
        return Ok(table.clone());
    }
    Ok(table.filter_rows(|i| compiled.iter().all(|p| p.evaluate(i))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Median,
    Count,
    Mean,
    Sum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateOperation {
    pub column: String,
    pub function: AggregateFunction,
    pub alias: Option<String>,
}

impl AggregateOperation {
    pub fn new(column: impl Into<String>, function: AggregateFunction) -> Self {
        Self {
            column: column.into(),
            function,
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupByOperation {
    pub group_columns: Vec<String>,
    pub aggregations: Vec<AggregateOperation>,
}

/// `aggregate(table, group_key, value_key, op)`: one row per distinct
/// group key, sorted by key, with the aggregated value under `value_key`.
pub fn aggregate(
    table: &Table,
    group_key: &str,
    value_key: &str,
    function: AggregateFunction,
) -> Result<Table, SchemaError> {
    group_by(
        table,
        &GroupByOperation {
            group_columns: vec![group_key.to_string()],
            aggregations: vec![AggregateOperation::new(value_key, function)],
        },
    )
}

/// Groups rows by the rendered values of `group_columns`. Rows with a null
/// group value are skipped; aggregations ignore null cells.
pub fn group_by(table: &Table, operation: &GroupByOperation) -> Result<Table, SchemaError> {
    let group_sources = operation
        .group_columns
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>, _>>()?;
    for agg in &operation.aggregations {
        match agg.function {
            AggregateFunction::Count => {
                table.column(&agg.column)?;
            }
            _ => {
                table.numeric_column(&agg.column)?;
            }
        }
    }
    let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for row in 0..table.row_count() {
        let key: Option<Vec<String>> = group_sources.iter().map(|c| c.get_string(row)).collect();
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }
    let representatives: Vec<usize> = groups.values().map(|rows| rows[0]).collect();
    let mut columns: Vec<(String, Column)> = operation
        .group_columns
        .iter()
        .zip(&group_sources)
        .map(|(name, source)| (name.clone(), source.select_rows(&representatives)))
        .collect();
    for agg in &operation.aggregations {
        let source = table.column(&agg.column)?;
        let column = match agg.function {
            AggregateFunction::Count => {
                let counts: Vec<Option<i64>> = groups
                    .values()
                    .map(|rows| {
                        let n = rows.iter().filter(|&&i| !source.is_null(i)).count();
                        Some(i64::try_from(n).unwrap_or(i64::MAX))
                    })
                    .collect();
                Column::Int64(counts.into())
            }
            function => {
                let values: Vec<Option<f64>> = groups
                    .values()
                    .collect::<Vec<_>>()
                    .par_iter()
                    .map(|rows| reduce(function, rows.iter().filter_map(|&i| source.to_f64(i)).collect()))
                    .collect();
                Column::Float64(values.into())
            }
        };
        columns.push((agg.output_name().to_string(), column));
    }
    Ok(Table::from_parts(format!("{}_grouped", table.metadata.name), columns))
}

fn reduce(function: AggregateFunction, mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match function {
        AggregateFunction::Median => {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            Some(if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            })
        }
        AggregateFunction::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        AggregateFunction::Sum => Some(values.iter().sum()),
        AggregateFunction::Count => Some(values.len() as f64),
    }
}

/// First `n` rows after a stable sort on `sort_key`.
pub fn top_n(table: &Table, sort_key: &str, n: usize, ascending: bool) -> Result<Table, SchemaError> {
    Ok(table.sort_by(sort_key, ascending)?.head(n))
}

/// Left join on `key`: every row of `left` keeps its position and gains the
/// non-key columns of the first matching `right` row (nulls when unmatched).
pub fn join(left: &Table, right: &Table, key: &str) -> Result<Table, SchemaError> {
    let left_key = left.column(key)?;
    let right_key = right.column(key)?;
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    for row in 0..right.row_count() {
        if let Some(k) = right_key.get_string(row) {
            index.entry(k).or_insert(row);
        }
    }
    let matches: Vec<Option<usize>> = (0..left.row_count())
        .map(|row| left_key.get_string(row).and_then(|k| index.get(&k).copied()))
        .collect();
    let mut columns: Vec<(String, Column)> = left
        .column_names()
        .iter()
        .map(|name| left.column(name).map(|c| (name.clone(), c.clone())))
        .collect::<Result<_, _>>()?;
    for name in right.column_names() {
        if name == key || left.get_column(name).is_some() {
            continue;
        }
        let source = right.column(name)?;
        let values: Vec<Value> = matches
            .iter()
            .map(|m| m.map_or(Value::Null, |row| source.get(row)))
            .collect();
        columns.push((name.clone(), Column::from_values(source.data_type(), &values)));
    }
    let mut joined = Table::from_parts(format!("{}_joined", left.metadata.name), columns);
    joined.metadata.row_count = left.row_count();
    Ok(joined)
}
