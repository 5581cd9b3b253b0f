// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// API request handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use folio_core::types::SpreadIndex;

use super::error::ApiError;
use super::types::{
    ApiState, CancelResponse, IndexRequest, ProcessRequest, ScanRequest, SetStateRequest,
    SpreadView, StateResponse,
};

const OPERATOR_PAGE: &str = include_str!("../../assets/index.html");

type ApiResult<T> = Result<Json<T>, ApiError>;

fn index(value: u32) -> Result<SpreadIndex, ApiError> {
    Ok(SpreadIndex::new(value)?)
}

pub async fn page_handler() -> Html<&'static str> {
    Html(OPERATOR_PAGE)
}

/// The body is optional; a bare `POST /api/scan` scans the next spread.
pub async fn scan_handler(
    State(state): State<ApiState>,
    body: Option<Json<ScanRequest>>,
) -> ApiResult<SpreadView> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let spread = match request.rescan_for_index {
        Some(value) => state.workflow.rescan(index(value)?).await?,
        None => state.workflow.scan(None).await?,
    };
    Ok(Json(spread.into()))
}

pub async fn cancel_scan_handler(State(state): State<ApiState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.workflow.cancel_scan(),
    })
}

pub async fn process_handler(
    State(state): State<ApiState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<SpreadView> {
    let spread = state
        .workflow
        .process(index(request.index)?, request.to_grayscale)
        .await?;
    Ok(Json(spread.into()))
}

pub async fn rotate_handler(
    State(state): State<ApiState>,
    Json(request): Json<IndexRequest>,
) -> ApiResult<SpreadView> {
    let spread = state.workflow.rotate_180(index(request.index)?).await?;
    Ok(Json(spread.into()))
}

pub async fn deskew_handler(
    State(state): State<ApiState>,
    Json(request): Json<IndexRequest>,
) -> ApiResult<SpreadView> {
    let spread = state.workflow.deskew(index(request.index)?).await?;
    Ok(Json(spread.into()))
}

pub async fn crop_handler(
    State(state): State<ApiState>,
    Json(request): Json<IndexRequest>,
) -> ApiResult<SpreadView> {
    let spread = state.workflow.crop_borders(index(request.index)?).await?;
    Ok(Json(spread.into()))
}

pub async fn approve_handler(
    State(state): State<ApiState>,
    Json(request): Json<IndexRequest>,
) -> ApiResult<SpreadView> {
    let spread = state.workflow.approve(index(request.index)?).await?;
    Ok(Json(spread.into()))
}

pub async fn get_state_handler(State(state): State<ApiState>) -> Json<StateResponse> {
    Json(state.workflow.snapshot().await.into())
}

pub async fn put_state_handler(
    State(state): State<ApiState>,
    Json(request): Json<SetStateRequest>,
) -> ApiResult<StateResponse> {
    state.workflow.set_next_index(request.next_scan_index).await?;
    Ok(Json(state.workflow.snapshot().await.into()))
}

pub async fn list_spreads_handler(State(state): State<ApiState>) -> Json<Vec<SpreadView>> {
    let snapshot = state.workflow.snapshot().await;
    Json(snapshot.spreads.into_iter().map(SpreadView::from).collect())
}

pub async fn get_spread_handler(
    State(state): State<ApiState>,
    Path(value): Path<u32>,
) -> ApiResult<SpreadView> {
    let spread = state.workflow.spread(index(value)?).await?;
    Ok(Json(spread.into()))
}

/// Serve a scan or cleaned image as PNG.
pub async fn serve_image_handler(
    State(state): State<ApiState>,
    Path((area, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.workflow.store().resolve_served(&area, &file)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(folio_core::error::FolioError::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    ))
}
