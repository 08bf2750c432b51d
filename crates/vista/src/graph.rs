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

//! Reactive recomputation graph.
//!
//! Each output is bound to the list of controls it reads and to a pure
//! function of the table and those controls. Setting a control marks
//! exactly its dependents stale; a stale output is re-evaluated on the next
//! read and cached until one of its controls changes again.

use crate::controls::{ControlRegistry, ControlValue};
use crate::data_handler::{filter, Filter, Table};
use crate::error::{DomainError, EvalResult, EvaluationError, GraphError};
use crate::figure::{Figure, Renderer};
use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub type FilterFn = dyn Fn(&Inputs<'_>) -> EvalResult<Filter> + Send + Sync;
pub type RenderFn = dyn Fn(&Table, &Inputs<'_>, &dyn Renderer) -> EvalResult<Figure> + Send + Sync;

/// Read-only view of the controls an output declared.
pub struct Inputs<'a> {
    output: &'a str,
    declared: &'a [String],
    registry: &'a ControlRegistry,
}

impl<'a> Inputs<'a> {
    pub fn new(output: &'a str, declared: &'a [String], registry: &'a ControlRegistry) -> Self {
        Self {
            output,
            declared,
            registry,
        }
    }

    pub fn get(&self, name: &str) -> EvalResult<&'a ControlValue> {
        if !self.declared.iter().any(|d| d == name) {
            return Err(EvaluationError::UndeclaredDependency {
                output: self.output.to_string(),
                control: name.to_string(),
            });
        }
        Ok(self.registry.get(name)?)
    }

    pub fn choice(&self, name: &str) -> EvalResult<&'a str> {
        match self.get(name)? {
            ControlValue::Choice(v) => Ok(v.as_str()),
            other => Err(kind_mismatch(name, "choice", other)),
        }
    }

    pub fn range(&self, name: &str) -> EvalResult<(i64, i64)> {
        match self.get(name)? {
            ControlValue::Range([lo, hi]) => Ok((*lo, *hi)),
            other => Err(kind_mismatch(name, "range", other)),
        }
    }

    pub fn toggle(&self, name: &str) -> EvalResult<bool> {
        match self.get(name)? {
            ControlValue::Toggle(v) => Ok(*v),
            other => Err(kind_mismatch(name, "toggle", other)),
        }
    }
}

fn kind_mismatch(name: &str, expected: &str, found: &ControlValue) -> EvaluationError {
    DomainError::KindMismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
    .into()
}

pub struct OutputBinding {
    name: String,
    dependencies: Vec<String>,
    filter: Option<Box<FilterFn>>,
    render: Box<RenderFn>,
}

impl OutputBinding {
    pub fn new<F>(name: impl Into<String>, dependencies: &[&str], render: F) -> Self
    where
        F: Fn(&Table, &Inputs<'_>, &dyn Renderer) -> EvalResult<Figure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            filter: None,
            render: Box::new(render),
        }
    }

    /// Predicates applied to the table before the render function runs.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Inputs<'_>) -> EvalResult<Filter> + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn depends_on(&self, control: &str) -> bool {
        self.dependencies.iter().any(|d| d == control)
    }

    pub fn evaluate(
        &self,
        table: &Table,
        registry: &ControlRegistry,
        renderer: &dyn Renderer,
    ) -> EvalResult<Figure> {
        let inputs = Inputs::new(&self.name, &self.dependencies, registry);
        let view = match &self.filter {
            Some(predicates) => {
                let view = filter(table, &predicates(&inputs)?)?;
                debug!(output = %self.name, rows = view.row_count(), "binding filtered");
                Cow::Owned(view)
            }
            None => Cow::Borrowed(table),
        };
        (self.render)(&view, &inputs, renderer)
    }
}

impl fmt::Debug for OutputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBinding")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Validated output bindings shared by every session of a dashboard.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: IndexMap<String, Arc<OutputBinding>>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when the output name is taken or a dependency is not a
    /// registered control.
    pub fn bind(&mut self, binding: OutputBinding, controls: &ControlRegistry) -> Result<(), GraphError> {
        if self.bindings.contains_key(&binding.name) {
            return Err(GraphError::DuplicateOutput { name: binding.name });
        }
        if let Some(missing) = binding.dependencies.iter().find(|d| !controls.contains(d)) {
            return Err(GraphError::UnknownDependency {
                output: binding.name.clone(),
                control: missing.clone(),
            });
        }
        self.bindings.insert(binding.name.clone(), Arc::new(binding));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<OutputBinding>> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<OutputBinding>> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    Stale,
    Fresh,
}

#[derive(Debug, Clone)]
struct OutputSlot {
    state: OutputState,
    figure: Option<Arc<Figure>>,
    last_error: Option<EvaluationError>,
    evaluations: u64,
}

impl OutputSlot {
    fn new() -> Self {
        Self {
            state: OutputState::Stale,
            figure: None,
            last_error: None,
            evaluations: 0,
        }
    }
}

/// Per-session cache and freshness of every bound output.
#[derive(Debug, Clone)]
pub struct RecomputeGraph {
    bindings: Arc<BindingSet>,
    renderer: Arc<dyn Renderer>,
    slots: IndexMap<String, OutputSlot>,
}

impl RecomputeGraph {
    pub fn new(bindings: Arc<BindingSet>, renderer: Arc<dyn Renderer>) -> Self {
        let slots = bindings
            .names()
            .map(|name| (name.to_string(), OutputSlot::new()))
            .collect();
        Self {
            bindings,
            renderer,
            slots,
        }
    }

    /// Marks every output depending on `control` stale and returns their names.
    pub fn invalidate(&mut self, control: &str) -> Vec<String> {
        let mut touched = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.depends_on(control)) {
            if let Some(slot) = self.slots.get_mut(binding.name()) {
                slot.state = OutputState::Stale;
                touched.push(binding.name().to_string());
            }
        }
        touched
    }

    pub fn state(&self, output: &str) -> EvalResult<OutputState> {
        self.slot(output).map(|s| s.state)
    }

    pub fn stale(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.state == OutputState::Stale)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Last successfully computed figure, or [`Figure::Empty`] before the
    /// first success.
    pub fn cached(&self, output: &str) -> EvalResult<Arc<Figure>> {
        let slot = self.slot(output)?;
        Ok(slot.figure.clone().unwrap_or_else(|| Arc::new(Figure::Empty)))
    }

    pub fn last_error(&self, output: &str) -> EvalResult<Option<&EvaluationError>> {
        self.slot(output).map(|s| s.last_error.as_ref())
    }

    pub fn evaluation_count(&self, output: &str) -> EvalResult<u64> {
        self.slot(output).map(|s| s.evaluations)
    }

    /// Returns the cached figure of a fresh output; evaluates a stale one.
    /// A failed evaluation leaves the output stale with its previous figure.
    pub fn read(
        &mut self,
        output: &str,
        table: &Table,
        registry: &ControlRegistry,
    ) -> EvalResult<Arc<Figure>> {
        let binding = self
            .bindings
            .get(output)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownOutput {
                name: output.to_string(),
            })?;
        let renderer = Arc::clone(&self.renderer);
        let slot = self
            .slots
            .get_mut(output)
            .ok_or_else(|| EvaluationError::UnknownOutput {
                name: output.to_string(),
            })?;
        if slot.state == OutputState::Fresh {
            if let Some(figure) = &slot.figure {
                return Ok(Arc::clone(figure));
            }
        }
        let started = Instant::now();
        match binding.evaluate(table, registry, renderer.as_ref()) {
            Ok(figure) => {
                let figure = Arc::new(figure);
                slot.figure = Some(Arc::clone(&figure));
                slot.state = OutputState::Fresh;
                slot.last_error = None;
                slot.evaluations += 1;
                debug!(
                    output,
                    marks = figure.len(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "output evaluated"
                );
                Ok(figure)
            }
            Err(e) => {
                warn!(output, error = %e, "output evaluation failed, keeping previous figure");
                slot.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Evaluates every stale output once, in binding order.
    pub fn refresh(
        &mut self,
        table: &Table,
        registry: &ControlRegistry,
    ) -> IndexMap<String, EvalResult<Arc<Figure>>> {
        self.stale()
            .into_iter()
            .map(|name| {
                let result = self.read(&name, table, registry);
                (name, result)
            })
            .collect()
    }

    fn slot(&self, output: &str) -> EvalResult<&OutputSlot> {
        self.slots.get(output).ok_or_else(|| EvaluationError::UnknownOutput {
            name: output.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Control;

    fn registry() -> ControlRegistry {
        let mut registry = ControlRegistry::new();
        registry.register(Control::toggle("order", true)).unwrap();
        registry.register(Control::range_slider("years", 2015, 2020).unwrap()).unwrap();
        registry
    }

    #[test]
    fn inputs_only_expose_declared_controls() {
        let registry = registry();
        let declared = vec!["order".to_string()];
        let inputs = Inputs::new("bars", &declared, &registry);
        assert!(inputs.toggle("order").unwrap());
        assert_eq!(
            inputs.range("years").unwrap_err(),
            EvaluationError::UndeclaredDependency {
                output: "bars".to_string(),
                control: "years".to_string(),
            }
        );
    }

    #[test]
    fn typed_reads_reject_other_kinds() {
        let registry = registry();
        let declared = vec!["order".to_string()];
        let inputs = Inputs::new("bars", &declared, &registry);
        assert!(matches!(
            inputs.choice("order"),
            Err(EvaluationError::Domain(DomainError::KindMismatch { .. }))
        ));
    }

    #[test]
    fn bind_rejects_unknown_and_duplicate_outputs() {
        let registry = registry();
        let mut set = BindingSet::new();
        let render = |_: &Table, _: &Inputs<'_>, _: &dyn Renderer| Ok::<_, EvaluationError>(Figure::Empty);
        set.bind(OutputBinding::new("a", &["order"], render), &registry).unwrap();
        assert_eq!(
            set.bind(OutputBinding::new("a", &["order"], render), &registry),
            Err(GraphError::DuplicateOutput { name: "a".to_string() })
        );
        assert_eq!(
            set.bind(OutputBinding::new("b", &["missing"], render), &registry),
            Err(GraphError::UnknownDependency {
                output: "b".to_string(),
                control: "missing".to_string(),
            })
        );
    }
}
