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

use crate::http::{ApiError, AppState};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use vista::{Control, ControlValue, EvaluationError, Figure, OutputState, Session};

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub dashboard: String,
    pub controls: Vec<Control>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ControlChanges {
    pub changes: IndexMap<String, ControlValue>,
}

#[derive(Debug, Serialize)]
pub struct OutputReport {
    pub state: OutputState,
    pub figure: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshReport {
    pub stale: Vec<String>,
    pub outputs: IndexMap<String, OutputReport>,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    let sessions = state.store.len()?;
    Ok(Json(json!({
        "status": "ok",
        "dashboard": state.store.dashboard().name(),
        "sessions": sessions,
    })))
}

fn controls_of(session: &Session) -> Vec<Control> {
    session.controls().controls().cloned().collect()
}

pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (session_id, _) = state.store.create()?;
    let body = state.store.with_session(&session_id, |session| SessionCreated {
        session_id,
        created_at: session.created_at(),
        dashboard: session.dashboard().name().to_string(),
        controls: controls_of(session),
        outputs: session.dashboard().bindings().names().map(str::to_string).collect(),
    })?;
    info!(session = %session_id, "session opened");
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn get_controls(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Control>>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.store.with_session(&id, |session| controls_of(session))?))
}

fn report(
    session: &Session,
    name: &str,
    result: Result<Arc<Figure>, EvaluationError>,
) -> Result<OutputReport, ApiError> {
    let state = session.state(name)?;
    Ok(match result {
        Ok(figure) => OutputReport {
            state,
            figure: serde_json::to_value(figure.as_ref())?,
            error: None,
        },
        Err(e) => {
            warn!(output = name, error = %e, "output failed during refresh");
            OutputReport {
                state,
                figure: serde_json::to_value(session.cached(name)?.as_ref())?,
                error: Some(e.to_string()),
            }
        }
    })
}

fn refresh_report(session: &mut Session, stale: Vec<String>) -> Result<RefreshReport, ApiError> {
    let mut outputs = IndexMap::new();
    for (name, result) in session.refresh() {
        let entry = report(session, &name, result)?;
        outputs.insert(name, entry);
    }
    Ok(RefreshReport { stale, outputs })
}

/// Applies every change or none, then refreshes the stale outputs once.
pub async fn put_controls(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ControlChanges>, JsonRejection>,
) -> Result<Json<RefreshReport>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let refreshed = state.store.with_session(&id, |session| -> Result<RefreshReport, ApiError> {
        let stale = session.apply(body.changes)?;
        refresh_report(session, stale)
    })??;
    Ok(Json(refreshed))
}

/// Restores the defaults and refreshes whatever that made stale.
pub async fn reset_controls(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RefreshReport>, ApiError> {
    let Path(id) = id?;
    let refreshed = state.store.with_session(&id, |session| -> Result<RefreshReport, ApiError> {
        let stale = session.reset();
        refresh_report(session, stale)
    })??;
    Ok(Json(refreshed))
}

pub async fn get_output(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
) -> Result<Json<OutputReport>, ApiError> {
    let Path((id, name)) = path?;
    let report = state.store.with_session(&id, |session| -> Result<OutputReport, ApiError> {
        let figure = session.read(&name)?;
        Ok(OutputReport {
            state: session.state(&name)?,
            figure: serde_json::to_value(figure.as_ref())?,
            error: None,
        })
    })??;
    Ok(Json(report))
}

pub async fn delete_session(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if state.store.remove(&id)? {
        info!(session = %id, "session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(vista::DashboardError::SessionNotFound { id: id.to_string() }.into())
    }
}
