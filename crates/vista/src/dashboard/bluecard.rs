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

use crate::controls::Control;
use crate::dashboard::Dashboard;

use crate::data_handler::{
    group_by, join, AggregateFunction, AggregateOperation, DataType, Filter, GroupByOperation,
    LoadedTable, Table, TableSchema,
};

use crate::error::{Result, SchemaError};
use crate::figure::ChartSpec;
use crate::graph::OutputBinding;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const COUNTRY: &str = "country";
pub const FEATURE: &str = "feature";
pub const BUBBLEPLOT: &str = "bubbleplot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluecardLayout {
    pub group: String,
    pub y: String,
    pub client_count: String,
    pub default_feature: String,
    pub all_label: String,
}

impl Default for BluecardLayout {
    fn default() -> Self {
        Self {
            group: "nationality_country".to_string(),
            y: "duration_days".to_string(),
            client_count: "total_clients".to_string(),
            default_feature: "age".to_string(),
            all_label: "All countries".to_string(),
        }
    }
}

impl BluecardLayout {
    pub fn schema(&self) -> TableSchema {
        TableSchema::new()
            .key(&self.group, DataType::String)
            .feature(&self.y, DataType::Float64)
            .with_inferred_features()
    }

    fn numeric_columns(&self, table: &Table) -> Vec<String> {
        table
            .column_names()
            .iter()
            .filter(|name| **name != self.group)
            .filter(|name| table.data_type(name).is_ok_and(DataType::is_numeric))
            .cloned()
            .collect()
    }

    /// One row per group: the median of every numeric column plus the
    /// group size under `client_count`.
    pub fn prepare(&self, raw: &Table) -> std::result::Result<Table, SchemaError> {
        let medians = group_by(
            raw,
            &GroupByOperation {
                group_columns: vec![self.group.clone()],
                aggregations: self
                    .numeric_columns(raw)
                    .into_iter()
                    .map(|c| AggregateOperation::new(c, AggregateFunction::Median))
                    .collect(),
            },
        )?;
        let sizes = group_by(
            raw,
            &GroupByOperation {
                group_columns: vec![self.group.clone()],
                aggregations: vec![AggregateOperation::new(&self.group, AggregateFunction::Count)
                    .alias(&self.client_count)],
            },
        )?;
        let prepared = join(&medians, &sizes, &self.group)?;
        debug!(groups = prepared.row_count(), "blue card table aggregated");
        Ok(prepared)
    }

    pub fn build(&self, loaded: LoadedTable) -> Result<Dashboard> {
        let layout = Arc::new(self.clone());
        let features = self.numeric_columns(&loaded.table);
        let default = features
            .iter()
            .any(|f| *f == self.default_feature)
            .then_some(self.default_feature.as_str());
        let countries = loaded.table.distinct_values(&self.group)?;
        let prepared = self.prepare(&loaded.table)?;
        let l = Arc::clone(&layout);
        let f = Arc::clone(&layout);
        let dashboard = Dashboard::builder("bluecard", prepared)
            .control(
                Control::dropdown_with_all(COUNTRY, countries, &self.all_label, None)?
                    .with_label("Country of origin"),
            )?
            .control(Control::dropdown(FEATURE, features, default)?.with_label("Feature"))?
            .output(
                OutputBinding::new(BUBBLEPLOT, &[COUNTRY, FEATURE], move |view, inputs, renderer| {
                    let spec = ChartSpec::Scatter {
                        x: inputs.choice(FEATURE)?.to_string(),
                        y: l.y.clone(),
                        size: Some(l.client_count.clone()),
                        label: l.group.clone(),
                        highlight: None,
                    };
                    Ok(renderer.render(view, &spec)?)
                })
                .with_filter(move |inputs| {
                    Ok(Filter::new().equals_or_all(&f.group, inputs.choice(COUNTRY)?, &f.all_label))
                }),
            )?
            .build();
        Ok(dashboard)
    }
}
