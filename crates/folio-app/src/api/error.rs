// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// API error responses: `{detail, message, suggestion, retriable}` with a
// status per error kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_core::error::FolioError;
use folio_core::human_errors::{Severity, humanize_error};
use serde::{Deserialize, Serialize};

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error itself; device messages pass through verbatim.
    pub detail: String,
    /// Plain-language summary for the operator.
    pub message: String,
    pub suggestion: String,
    /// Whether repeating the same request can succeed.
    pub retriable: bool,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn status_for(err: &FolioError) -> StatusCode {
        match err {
            FolioError::Acquisition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FolioError::NotFound(_) => StatusCode::NOT_FOUND,
            FolioError::InvalidTransition { .. } => StatusCode::CONFLICT,
            FolioError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            FolioError::ImageError(_)
            | FolioError::OsdUnavailable(_)
            | FolioError::Config(_)
            | FolioError::Io(_)
            | FolioError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FolioError> for ApiError {
    fn from(err: FolioError) -> Self {
        let status = Self::status_for(&err);
        let human = humanize_error(&err);
        match human.severity {
            Severity::Permanent => tracing::error!(error = %err, %status, "Request failed"),
            Severity::Transient => tracing::warn!(error = %err, %status, "Request failed"),
            Severity::ActionRequired => tracing::debug!(error = %err, %status, "Request rejected"),
        }
        Self {
            status,
            body: ErrorBody {
                detail: err.to_string(),
                message: human.message,
                suggestion: human.suggestion,
                retriable: human.retriable,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
