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

pub mod routes;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;
use vista::{DashboardError, DomainError, EvaluationError, SchemaError, SessionStore};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: SessionStore,
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/v1/sessions", post(routes::create_session))
        .route("/v1/sessions/{id}", axum::routing::delete(routes::delete_session))
        .route(
            "/v1/sessions/{id}/controls",
            get(routes::get_controls).put(routes::put_controls),
        )
        .route("/v1/sessions/{id}/controls/reset", post(routes::reset_controls))
        .route("/v1/sessions/{id}/outputs/{name}", get(routes::get_output))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub request_id: String,
    #[serde(skip)]
    status: StatusCode,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            request_id: Uuid::new_v4().to_string(),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        let (status, code) = match &e {
            DashboardError::SessionNotFound { .. } => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            DashboardError::Domain(DomainError::UnknownControl { .. }) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_CONTROL")
            }
            DashboardError::Domain(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DOMAIN_ERROR"),
            DashboardError::Evaluation(EvaluationError::UnknownOutput { .. }) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_OUTPUT")
            }
            DashboardError::Evaluation(EvaluationError::Schema(_)) | DashboardError::Schema(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_ERROR")
            }
            DashboardError::Evaluation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EVALUATION_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        Self::new(status, code, e.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        DashboardError::from(e).into()
    }
}

impl From<EvaluationError> for ApiError {
    fn from(e: EvaluationError) -> Self {
        DashboardError::from(e).into()
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        DashboardError::from(e).into()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR", e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "INVALID_BODY", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), "INVALID_PATH", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(self);
        (status, body).into_response()
    }
}
