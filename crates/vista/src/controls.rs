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

use crate::error::DomainError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlDomain {
    Options { options: Vec<String> },
    IntRange { min: i64, max: i64 },
    Toggle,
}

impl ControlDomain {
    fn kind(&self) -> &'static str {
        match self {
            ControlDomain::Options { .. } => "choice",
            ControlDomain::IntRange { .. } => "range",
            ControlDomain::Toggle => "toggle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Toggle(bool),
    Range([i64; 2]),
    Choice(String),
}

impl ControlValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlValue::Choice(_) => "choice",
            ControlValue::Range(_) => "range",
            ControlValue::Toggle(_) => "toggle",
        }
    }

    pub fn range(lo: i64, hi: i64) -> Self {
        ControlValue::Range([lo, hi])
    }

    pub fn choice(value: impl Into<String>) -> Self {
        ControlValue::Choice(value.into())
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlValue::Choice(v) => write!(f, "'{v}'"),
            ControlValue::Range([lo, hi]) => write!(f, "[{lo}, {hi}]"),
            ControlValue::Toggle(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    pub label: String,
    pub domain: ControlDomain,
    pub default: ControlValue,
    pub value: ControlValue,
}

impl Control {
    /// Dropdown over the distinct `options`, sorted alphabetically. The
    /// default is `default` when given, otherwise the first option.
    pub fn dropdown<I, S>(name: &str, options: I, default: Option<&str>) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self::with_options(name, options, default)
    }

    /// Like [`Control::dropdown`] with a synthetic `all_label` option listed
    /// first; it is also the default unless `default` names another option.
    pub fn dropdown_with_all<I, S>(
        name: &str,
        options: I,
        all_label: &str,
        default: Option<&str>,
    ) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: BTreeSet<String> = options.into_iter().map(Into::into).collect();
        sorted.remove(all_label);
        let mut all = vec![all_label.to_string()];
        all.extend(sorted);
        Self::with_options(name, all, default.or(Some(all_label)))
    }

    fn with_options(name: &str, options: Vec<String>, default: Option<&str>) -> Result<Self, DomainError> {
        let first = options.first().cloned().ok_or_else(|| DomainError::EmptyDomain {
            name: name.to_string(),
        })?;
        let default = match default {
            Some(d) if options.iter().any(|o| o == d) => d.to_string(),
            Some(d) => {
                return Err(DomainError::OutOfDomain {
                    name: name.to_string(),
                    value: format!("'{d}'"),
                })
            }
            None => first,
        };
        Ok(Self::new(
            name,
            ControlDomain::Options { options },
            ControlValue::Choice(default),
        ))
    }

    /// Two-handle integer slider over `[min, max]`, defaulting to the full span.
    pub fn range_slider(name: &str, min: i64, max: i64) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::InvertedRange {
                name: name.to_string(),
                lo: min,
                hi: max,
            });
        }
        Ok(Self::new(
            name,
            ControlDomain::IntRange { min, max },
            ControlValue::Range([min, max]),
        ))
    }

    pub fn toggle(name: &str, default: bool) -> Self {
        Self::new(name, ControlDomain::Toggle, ControlValue::Toggle(default))
    }

    fn new(name: &str, domain: ControlDomain, default: ControlValue) -> Self {
        Self {
            name: name.to_string(),
            label: name.replace('_', " "),
            domain,
            value: default.clone(),
            default,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn validate(&self, value: &ControlValue) -> Result<(), DomainError> {
        let out_of_domain = || DomainError::OutOfDomain {
            name: self.name.clone(),
            value: value.to_string(),
        };
        match (&self.domain, value) {
            (ControlDomain::Options { options }, ControlValue::Choice(choice)) => {
                if options.iter().any(|o| o == choice) {
                    Ok(())
                } else {
                    Err(out_of_domain())
                }
            }
            (ControlDomain::IntRange { min, max }, ControlValue::Range([lo, hi])) => {
                if lo > hi {
                    Err(DomainError::InvertedRange {
                        name: self.name.clone(),
                        lo: *lo,
                        hi: *hi,
                    })
                } else if lo < min || hi > max {
                    Err(out_of_domain())
                } else {
                    Ok(())
                }
            }
            (ControlDomain::Toggle, ControlValue::Toggle(_)) => Ok(()),
            (domain, value) => Err(DomainError::KindMismatch {
                name: self.name.clone(),
                expected: domain.kind().to_string(),
                found: value.kind().to_string(),
            }),
        }
    }
}

/// Current values of every named input of one session.
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    controls: IndexMap<String, Control>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, control: Control) -> Result<(), DomainError> {
        if self.controls.contains_key(&control.name) {
            return Err(DomainError::DuplicateControl { name: control.name });
        }
        control.validate(&control.default)?;
        self.controls.insert(control.name.clone(), control);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controls.contains_key(name)
    }

    pub fn control(&self, name: &str) -> Result<&Control, DomainError> {
        self.controls.get(name).ok_or_else(|| DomainError::UnknownControl {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Result<&ControlValue, DomainError> {
        self.control(name).map(|c| &c.value)
    }

    pub fn validate(&self, name: &str, value: &ControlValue) -> Result<(), DomainError> {
        self.control(name)?.validate(value)
    }

    /// Rejects out-of-domain values without touching the current one.
    pub fn set(&mut self, name: &str, value: ControlValue) -> Result<(), DomainError> {
        let control = self.controls.get_mut(name).ok_or_else(|| DomainError::UnknownControl {
            name: name.to_string(),
        })?;
        control.validate(&value)?;
        debug!(control = name, value = %value, "control set");
        control.value = value;
        Ok(())
    }

    pub fn reset(&mut self) {
        for control in self.controls.values_mut() {
            control.value = control.default.clone();
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
