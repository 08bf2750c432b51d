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

//! Schengen visa statistics dashboard: world map, ranked bars, a
//! correlation bubble chart and a per-country time series.

use crate::controls::Control;
use crate::dashboard::Dashboard;
use crate::data_handler::{aggregate, top_n, AggregateFunction, DataType, Filter, LoadedTable, TableSchema};
use crate::error::{DomainError, EvalResult, Result};
use crate::figure::{ChartSpec, Figure, Highlight};
use crate::graph::{Inputs, OutputBinding};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SCHENGEN_COUNTRY: &str = "schengen_country";
pub const FEATURE_1: &str = "feature_1";
pub const FEATURE_2: &str = "feature_2";
pub const YEAR_RANGE: &str = "year_range";
pub const ORDER_TOGGLE: &str = "order_toggle";
pub const MAP_HOVER: &str = "map_hover";
pub const WORLDMAP: &str = "worldmap";
pub const BARPLOT: &str = "barplot";
pub const TOGGLE_LABEL: &str = "toggle_label";
pub const BUBBLE_PLOT: &str = "bubble_plot";
pub const LINE_PLOT: &str = "line_plot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchengenLayout {
    pub country_code: String,
    pub country: String,
    pub schengen_country: String,
    pub year: String,
    pub bubble_size: String,
    pub all_label: String,
    /// Numeric columns never offered as a feature.
    pub excluded_features: Vec<String>,
    pub default_hover: Option<String>,
    pub top_n: usize,
}

impl Default for SchengenLayout {
    fn default() -> Self {
        Self {
            country_code: "Country code".to_string(),
            country: "Country".to_string(),
            schengen_country: "Schengen country".to_string(),
            year: "Year".to_string(),
            bubble_size: "Number of visa applications".to_string(),
            all_label: "All countries".to_string(),
            excluded_features: vec!["Sch code".to_string()],
            default_hover: Some("DEU".to_string()),
            top_n: 10,
        }
    }
}

impl SchengenLayout {
    pub fn schema(&self) -> TableSchema {
        TableSchema::new()
            .key(&self.country_code, DataType::String)
            .key(&self.country, DataType::String)
            .key(&self.schengen_country, DataType::String)
            .key(&self.year, DataType::Int64)
            .feature(&self.bubble_size, DataType::Float64)
            .with_inferred_features()
    }

    /// Selectable features: numeric non-key columns, minus the exclusions.
    pub fn features(&self, loaded: &LoadedTable) -> Vec<String> {
        let mut features: Vec<String> = loaded
            .schema
            .features()
            .into_iter()
            .filter(|f| !self.excluded_features.contains(f))
            .filter(|f| {
                loaded
                    .table
                    .data_type(f)
                    .is_ok_and(DataType::is_numeric)
            })
            .collect();
        features.sort();
        features
    }

    fn filter(&self, inputs: &Inputs<'_>) -> EvalResult<Filter> {
        let (lo, hi) = inputs.range(YEAR_RANGE)?;
        Ok(Filter::new()
            .equals_or_all(&self.schengen_country, inputs.choice(SCHENGEN_COUNTRY)?, &self.all_label)
            .range(&self.year, lo as f64, hi as f64))
    }

    pub fn build(&self, loaded: LoadedTable) -> Result<Dashboard> {
        let layout = Arc::new(self.clone());
        let features = self.features(&loaded);
        let table = &loaded.table;
        let (min_year, max_year) = table
            .numeric_bounds(&self.year)?
            .ok_or_else(|| DomainError::EmptyDomain {
                name: YEAR_RANGE.to_string(),
            })?;
        let codes = table.distinct_values(&self.country_code)?;
        let hover_default = self.default_hover.as_deref().filter(|d| codes.iter().any(|c| c == d));
        let builder = Dashboard::builder("schengen", loaded.table.clone())
            .control(
                Control::dropdown_with_all(
                    SCHENGEN_COUNTRY,
                    table.distinct_values(&self.schengen_country)?,
                    &self.all_label,
                    None,
                )?
                .with_label(self.schengen_country.clone()),
            )?
            .control(Control::dropdown(FEATURE_1, features.clone(), None)?.with_label("Country feature 1"))?
            .control(Control::dropdown(FEATURE_2, features, None)?.with_label("Country feature 2"))?
            .control(Control::range_slider(YEAR_RANGE, min_year as i64, max_year as i64)?.with_label("Years"))?
            .control(Control::toggle(ORDER_TOGGLE, true).with_label("Change order"))?
            .control(Control::dropdown(MAP_HOVER, codes.clone(), hover_default)?.with_label("Map location"))?;
        let l = Arc::clone(&layout);
        let f = Arc::clone(&layout);
        let builder = builder.output(
            OutputBinding::new(WORLDMAP, &[SCHENGEN_COUNTRY, FEATURE_1, YEAR_RANGE], move |view, inputs, renderer| {
                let spec = ChartSpec::Choropleth {
                    locations: l.country_code.clone(),
                    value: inputs.choice(FEATURE_1)?.to_string(),
                    hover_name: l.country.clone(),
                };
                Ok(renderer.render(view, &spec)?)
            })
            .with_filter(move |inputs| f.filter(inputs)),
        )?;
        let l = Arc::clone(&layout);
        let f = Arc::clone(&layout);
        let builder = builder.output(
            OutputBinding::new(
                BARPLOT,
                &[ORDER_TOGGLE, FEATURE_1, SCHENGEN_COUNTRY, YEAR_RANGE],
                move |view, inputs, renderer| {
                    let feature = inputs.choice(FEATURE_1)?;
                    let medians = aggregate(view, &l.country, feature, AggregateFunction::Median)?;
                    let ranked = top_n(&medians, feature, l.top_n, inputs.toggle(ORDER_TOGGLE)?)?;
                    let spec = ChartSpec::Bar {
                        category: l.country.clone(),
                        value: feature.to_string(),
                    };
                    Ok(renderer.render(&ranked, &spec)?)
                },
            )
            .with_filter(move |inputs| f.filter(inputs)),
        )?;
        let builder = builder.output(OutputBinding::new(TOGGLE_LABEL, &[ORDER_TOGGLE], |_, inputs, _| {
            let state = if inputs.toggle(ORDER_TOGGLE)? { "True" } else { "False" };
            Ok(Figure::text(format!("Change order: {state}.")))
        }))?;
        let l = Arc::clone(&layout);
        let f = Arc::clone(&layout);
        let builder = builder.output(
            OutputBinding::new(
                BUBBLE_PLOT,
                &[SCHENGEN_COUNTRY, MAP_HOVER, FEATURE_1, FEATURE_2, YEAR_RANGE],
                move |view, inputs, renderer| {
                    let spec = ChartSpec::Scatter {
                        x: inputs.choice(FEATURE_2)?.to_string(),
                        y: inputs.choice(FEATURE_1)?.to_string(),
                        size: Some(l.bubble_size.clone()),
                        label: l.country.clone(),
                        highlight: Some(Highlight {
                            column: l.country_code.clone(),
                            value: inputs.choice(MAP_HOVER)?.to_string(),
                        }),
                    };
                    Ok(renderer.render(view, &spec)?)
                },
            )
            .with_filter(move |inputs| f.filter(inputs)),
        )?;
        let l = Arc::clone(&layout);
        let f = Arc::clone(&layout);
        let x_range = Some((min_year, max_year));
        let builder = builder.output(
            OutputBinding::new(
                LINE_PLOT,
                &[SCHENGEN_COUNTRY, MAP_HOVER, FEATURE_1, YEAR_RANGE],
                move |view, inputs, renderer| {
                    let spec = ChartSpec::Line {
                        x: l.year.clone(),
                        y: inputs.choice(FEATURE_1)?.to_string(),
                        x_range,
                    };
                    Ok(renderer.render(view, &spec)?)
                },
            )
            .with_filter(move |inputs| {
                Ok(f.filter(inputs)?.equals_or_all(&f.country_code, inputs.choice(MAP_HOVER)?, &f.all_label))
            }),
        )?;
        Ok(builder.build())
    }
}
