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

use crate::data_handler::Table;
use crate::error::{RenderError, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// What to draw and which columns feed each channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartSpec {
    Choropleth {
        locations: String,
        value: String,
        hover_name: String,
    },
    Bar {
        category: String,
        value: String,
    },
    Scatter {
        x: String,
        y: String,
        size: Option<String>,
        label: String,
        highlight: Option<Highlight>,
    },
    Line {
        x: String,
        y: String,
        x_range: Option<(f64, f64)>,
    },
}

/// Marks points whose `column` renders equal to `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub size: Option<f64>,
    pub highlighted: bool,
}

/// Library-neutral figure. Serialises to the JSON handed to the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Figure {
    Empty,
    Text {
        text: String,
    },
    Choropleth {
        title: String,
        locations: Vec<String>,
        values: Vec<Option<f64>>,
        hover_text: Vec<String>,
    },
    Bar {
        x_label: String,
        y_label: String,
        categories: Vec<String>,
        values: Vec<Option<f64>>,
    },
    Scatter {
        x_label: String,
        y_label: String,
        size_label: Option<String>,
        points: Vec<ScatterPoint>,
    },
    Line {
        x_label: String,
        y_label: String,
        x: Vec<Option<f64>>,
        y: Vec<Option<f64>>,
        x_range: Option<(f64, f64)>,
    },
}

impl Figure {
    pub fn text(text: impl Into<String>) -> Self {
        Figure::Text { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Figure::Empty)
    }

    /// Number of plotted marks; zero for text and placeholders.
    pub fn len(&self) -> usize {
        match self {
            Figure::Empty | Figure::Text { .. } => 0,
            Figure::Choropleth { locations, .. } => locations.len(),
            Figure::Bar { categories, .. } => categories.len(),
            Figure::Scatter { points, .. } => points.len(),
            Figure::Line { x, .. } => x.len(),
        }
    }
}

/// Turns a filtered table and a chart description into a figure.
pub trait Renderer: Send + Sync + Debug {
    fn render(&self, table: &Table, spec: &ChartSpec) -> Result<Figure, RenderError>;
}

/// Builds trace-level figures straight from table columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceRenderer;

impl TraceRenderer {
    fn numeric(table: &Table, column: &str) -> Result<Vec<Option<f64>>, RenderError> {
        table.numeric_values(column).map_err(|e| match e {
            SchemaError::TypeMismatch { column, .. } => RenderError::NonNumeric { column },
            other => RenderError::Schema(other),
        })
    }

    fn labels(table: &Table, column: &str) -> Result<Vec<String>, RenderError> {
        Ok(table
            .string_values(column)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect())
    }
}

impl Renderer for TraceRenderer {
    fn render(&self, table: &Table, spec: &ChartSpec) -> Result<Figure, RenderError> {
        match spec {
            ChartSpec::Choropleth {
                locations,
                value,
                hover_name,
            } => {
                let values = Self::numeric(table, value)?
                    .into_iter()
                    .map(|v| v.map(round2))
                    .collect();
                let hover_text = Self::labels(table, hover_name)?
                    .into_iter()
                    .map(|name| format!("Feature: {value}<br>Country: {name}"))
                    .collect();
                Ok(Figure::Choropleth {
                    title: value.clone(),
                    locations: Self::labels(table, locations)?,
                    values,
                    hover_text,
                })
            }
            ChartSpec::Bar { category, value } => Ok(Figure::Bar {
                x_label: category.clone(),
                y_label: value.clone(),
                values: Self::numeric(table, value)?,
                categories: Self::labels(table, category)?,
            }),
            ChartSpec::Scatter {
                x,
                y,
                size,
                label,
                highlight,
            } => {
                let xs = Self::numeric(table, x)?;
                let ys = Self::numeric(table, y)?;
                let sizes = match size {
                    Some(column) => Self::numeric(table, column)?,
                    None => vec![None; table.row_count()],
                };
                let labels = Self::labels(table, label)?;
                let marks = match highlight {
                    Some(h) => table
                        .string_values(&h.column)?
                        .into_iter()
                        .map(|v| v.as_deref() == Some(h.value.as_str()))
                        .collect(),
                    None => vec![false; table.row_count()],
                };
                let points = labels
                    .into_iter()
                    .zip(xs)
                    .zip(ys)
                    .zip(sizes)
                    .zip(marks)
                    .map(|((((label, x), y), size), highlighted)| ScatterPoint {
                        label,
                        x,
                        y,
                        size,
                        highlighted,
                    })
                    .collect();
                Ok(Figure::Scatter {
                    x_label: x.clone(),
                    y_label: y.clone(),
                    size_label: size.clone(),
                    points,
                })
            }
            ChartSpec::Line { x, y, x_range } => {
                let xs = Self::numeric(table, x)?;
                let ys = Self::numeric(table, y)?;
                let mut pairs: Vec<(Option<f64>, Option<f64>)> = xs.into_iter().zip(ys).collect();
                pairs.sort_by(|a, b| match (a.0, b.0) {
                    (Some(l), Some(r)) => l.total_cmp(&r),
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, None) => std::cmp::Ordering::Equal,
                });
                let (x_values, y_values) = pairs.into_iter().unzip();
                Ok(Figure::Line {
                    x_label: x.clone(),
                    y_label: y.clone(),
                    x: x_values,
                    y: y_values,
                    x_range: *x_range,
                })
            }
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
