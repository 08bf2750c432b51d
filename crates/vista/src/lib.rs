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

pub mod controls;
pub mod dashboard;
pub mod data_handler;
pub mod error;
pub mod figure;
pub mod graph;
pub mod session;

pub use controls::{Control, ControlDomain, ControlRegistry, ControlValue};
pub use dashboard::{BluecardLayout, Dashboard, DashboardBuilder, SchengenLayout, Variant};
pub use data_handler::{LoadedTable, Table, TableSchema};

pub use error::{
    DashboardError, DataError, DomainError, EvaluationError, GraphError, RenderError, Result,
    SchemaError,
};

pub use figure::{ChartSpec, Figure, Renderer, TraceRenderer};
pub use graph::{BindingSet, Inputs, OutputBinding, OutputState, RecomputeGraph};
pub use session::{Session, SessionStore};
