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

pub mod bluecard;
pub mod schengen;

pub use bluecard::BluecardLayout;
pub use schengen::SchengenLayout;
use crate::controls::{Control, ControlRegistry};
use crate::data_handler::{load_csv, Table};
use crate::error::{DashboardError, Result};
use crate::figure::{Renderer, TraceRenderer};
use crate::graph::{BindingSet, OutputBinding};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Schengen,
    Bluecard,
}

impl Variant {
    pub fn default_data_path(self) -> &'static str {
        match self {
            Variant::Schengen => "data/df_iso_schengen_origin.csv",
            Variant::Bluecard => "data/talent_bluecard.csv",
        }
    }

    /// Loads the variant's source file and wires its controls and outputs.
    pub fn load(self, path: &Path, schengen: &SchengenLayout, bluecard: &BluecardLayout) -> Result<Dashboard> {
        let dashboard = match self {
            Variant::Schengen => schengen.build(load_csv(path, "schengen_visas".to_string(), schengen.schema())?)?,
            Variant::Bluecard => bluecard.build(load_csv(path, "talent_bluecard".to_string(), bluecard.schema())?)?,
        };
        info!(
            variant = %self,
            controls = dashboard.controls().len(),
            outputs = dashboard.bindings().len(),
            "dashboard ready"
        );
        Ok(dashboard)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Variant::Schengen => f.write_str("schengen"),
            Variant::Bluecard => f.write_str("bluecard"),
        }
    }
}

impl FromStr for Variant {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "schengen" => Ok(Variant::Schengen),
            "bluecard" => Ok(Variant::Bluecard),
            other => Err(DashboardError::Config {
                reason: format!("unknown dashboard variant '{other}'"),
            }),
        }
    }
}

/// Immutable template shared by every session: the loaded table, the
/// control prototypes and the output bindings.
#[derive(Debug)]
pub struct Dashboard {
    name: String,
    table: Arc<Table>,
    controls: ControlRegistry,
    bindings: Arc<BindingSet>,
    renderer: Arc<dyn Renderer>,
}

impl Dashboard {
    pub fn builder(name: impl Into<String>, table: Table) -> DashboardBuilder {
        DashboardBuilder {
            name: name.into(),
            table: Arc::new(table),
            controls: ControlRegistry::new(),
            bindings: BindingSet::new(),
            renderer: Arc::new(TraceRenderer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    pub fn bindings(&self) -> &Arc<BindingSet> {
        &self.bindings
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self))
    }
}

#[derive(Debug)]
pub struct DashboardBuilder {
    name: String,
    table: Arc<Table>,
    controls: ControlRegistry,
    bindings: BindingSet,
    renderer: Arc<dyn Renderer>,
}

impl DashboardBuilder {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn control(mut self, control: Control) -> Result<Self> {
        self.controls.register(control)?;
        Ok(self)
    }

    /// Controls must be registered before the outputs that read them.
    pub fn output(mut self, binding: OutputBinding) -> Result<Self> {
        self.bindings.bind(binding, &self.controls)?;
        Ok(self)
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn build(self) -> Dashboard {
        Dashboard {
            name: self.name,
            table: self.table,
            controls: self.controls,
            bindings: Arc::new(self.bindings),
            renderer: self.renderer,
        }
    }
}
