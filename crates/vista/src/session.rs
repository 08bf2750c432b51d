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

use crate::controls::{ControlRegistry, ControlValue};
use crate::dashboard::Dashboard;
use crate::error::{DashboardError, DomainError, EvalResult, Result};
use crate::figure::Figure;
use crate::graph::{OutputState, RecomputeGraph};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// One viewer's controls and output cache over a shared [`Dashboard`].
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    dashboard: Arc<Dashboard>,
    controls: ControlRegistry,
    graph: RecomputeGraph,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        let controls = dashboard.controls().clone();
        let graph = RecomputeGraph::new(Arc::clone(dashboard.bindings()), Arc::clone(dashboard.renderer()));
        Self {
            id: Uuid::new_v4(),
            dashboard,
            controls,
            graph,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    pub fn get(&self, name: &str) -> std::result::Result<&ControlValue, DomainError> {
        self.controls.get(name)
    }

    /// Sets one control and returns the outputs that became stale. A value
    /// outside the domain leaves every output untouched.
    pub fn set(&mut self, name: &str, value: ControlValue) -> std::result::Result<Vec<String>, DomainError> {
        self.controls.set(name, value)?;
        Ok(self.graph.invalidate(name))
    }

    /// Applies a batch of changes. Every value is checked first; if any is
    /// rejected nothing is applied.
    pub fn apply(
        &mut self,
        changes: IndexMap<String, ControlValue>,
    ) -> std::result::Result<Vec<String>, DomainError> {
        for (name, value) in &changes {
            self.controls.validate(name, value)?;
        }
        let mut stale = Vec::new();
        for (name, value) in changes {
            for output in self.set(&name, value)? {
                if !stale.contains(&output) {
                    stale.push(output);
                }
            }
        }
        debug!(session = %self.id, stale = stale.len(), "control batch applied");
        Ok(stale)
    }

    /// Restores every control to its default. Only outputs reading a
    /// control that actually moved become stale; their names are returned.
    pub fn reset(&mut self) -> Vec<String> {
        let moved: Vec<String> = self
            .controls
            .controls()
            .filter(|c| c.value != c.default)
            .map(|c| c.name.clone())
            .collect();
        self.controls.reset();
        let mut stale = Vec::new();
        for name in &moved {
            for output in self.graph.invalidate(name) {
                if !stale.contains(&output) {
                    stale.push(output);
                }
            }
        }
        debug!(session = %self.id, moved = moved.len(), stale = stale.len(), "controls reset");
        stale
    }

    pub fn read(&mut self, output: &str) -> EvalResult<Arc<Figure>> {
        let table = Arc::clone(self.dashboard.table());
        self.graph.read(output, &table, &self.controls)
    }

    pub fn cached(&self, output: &str) -> EvalResult<Arc<Figure>> {
        self.graph.cached(output)
    }

    /// Single evaluation pass over every stale output.
    pub fn refresh(&mut self) -> IndexMap<String, EvalResult<Arc<Figure>>> {
        let table = Arc::clone(self.dashboard.table());
        self.graph.refresh(&table, &self.controls)
    }

    pub fn state(&self, output: &str) -> EvalResult<OutputState> {
        self.graph.state(output)
    }

    pub fn graph(&self) -> &RecomputeGraph {
        &self.graph
    }
}

#[derive(Debug)]
struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_used: u64,
}

/// Live sessions keyed by id. Creating a session beyond `max_sessions`
/// evicts the least recently used one.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dashboard: Arc<Dashboard>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    clock: Arc<AtomicU64>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(dashboard: Arc<Dashboard>, max_sessions: usize) -> Self {
        Self {
            dashboard,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn create(&self) -> Result<(Uuid, Arc<Mutex<Session>>)> {
        let session = self.dashboard.session();
        let id = session.id();
        let session = Arc::new(Mutex::new(session));
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| DashboardError::ThreadSafety("Failed to acquire write lock".to_string()))?;
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(evicted) => {
                    sessions.remove(&evicted);
                    info!(session = %evicted, "session evicted");
                }
                None => break,
            }
        }
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_used: self.tick(),
            },
        );
        debug!(session = %id, live = sessions.len(), "session created");
        Ok((id, session))
    }

    pub fn get(&self, id: &Uuid) -> Result<Arc<Mutex<Session>>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| DashboardError::ThreadSafety("Failed to acquire write lock".to_string()))?;
        let entry = sessions.get_mut(id).ok_or_else(|| DashboardError::SessionNotFound { id: id.to_string() })?;
        entry.last_used = self.tick();
        Ok(Arc::clone(&entry.session))
    }

    /// Runs `f` with the session locked.
    pub fn with_session<T, F>(&self, id: &Uuid, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let session = self.get(id)?;
        let mut guard = session
            .lock()
            .map_err(|_| DashboardError::ThreadSafety("Failed to lock session".to_string()))?;
        Ok(f(&mut guard))
    }

    pub fn remove(&self, id: &Uuid) -> Result<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| DashboardError::ThreadSafety("Failed to acquire write lock".to_string()))?;
        Ok(sessions.remove(id).is_some())
    }

    pub fn len(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| DashboardError::ThreadSafety("Failed to acquire read lock".to_string()))?;
        Ok(sessions.len())
    }

    pub fn contains(&self, id: &Uuid) -> Result<bool> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| DashboardError::ThreadSafety("Failed to acquire read lock".to_string()))?;
        Ok(sessions.contains_key(id))
    }
}
