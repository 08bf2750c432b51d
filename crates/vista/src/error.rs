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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Control domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Data loading error: {0}")]
    Data(#[from] DataError),
    #[error("Output evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Recomputation graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },
    #[error("Thread safety error: {0}")]
    ThreadSafety(String),
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Column '{column}' not found in table")]
    UnknownColumn { column: String },
    #[error("Required column '{column}' is missing from the source file")]
    MissingColumn { column: String },
    #[error("Column '{column}' has type {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("Column '{column}' is declared more than once")]
    DuplicateColumn { column: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Control '{name}' is not registered")]
    UnknownControl { name: String },
    #[error("Control '{name}' is already registered")]
    DuplicateControl { name: String },
    #[error("Value {value} is outside the domain of control '{name}'")]
    OutOfDomain { name: String, value: String },
    #[error("Control '{name}' expects a {expected} value, got {found}")]
    KindMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("Range [{lo}, {hi}] for control '{name}' has its bounds crossed")]
    InvertedRange { name: String, lo: i64, hi: i64 },
    #[error("Control '{name}' has an empty domain")]
    EmptyDomain { name: String },
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV decoding error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Cannot parse '{value}' in column '{column}' as {expected}")]
    Parse {
        column: String,
        value: String,
        expected: String,
    },
    #[error("Column length mismatch: expected {expected}, got {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Line {line} has {found} fields but the header declares {expected}")]
    ExtraFields { line: u64, expected: usize, found: usize },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Column '{column}' cannot be plotted on a numeric axis")]
    NonNumeric { column: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Output '{name}' is not bound")]
    UnknownOutput { name: String },
    #[error("Output '{output}' read control '{control}' without declaring it")]
    UndeclaredDependency { output: String, control: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Output '{name}' is bound more than once")]
    DuplicateOutput { name: String },
    #[error("Output '{output}' depends on unknown control '{control}'")]
    UnknownDependency { output: String, control: String },
}

pub type Result<T> = std::result::Result<T, DashboardError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type EvalResult<T> = std::result::Result<T, EvaluationError>;
