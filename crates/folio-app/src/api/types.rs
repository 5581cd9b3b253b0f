// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request and response bodies.

use std::path::Path;
use std::sync::Arc;

use folio_core::types::{SessionId, Spread};
use folio_session::{SessionSnapshot, WorkflowController};
use serde::{Deserialize, Serialize};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub workflow: Arc<WorkflowController>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    /// Re-acquire this existing spread instead of scanning the next one.
    #[serde(default)]
    pub rescan_for_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub index: u32,
    #[serde(default)]
    pub to_grayscale: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub index: u32,
}

#[derive(Debug, Deserialize)]
pub struct SetStateRequest {
    pub next_scan_index: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// A spread plus the URLs the operator page loads its images from.
#[derive(Debug, Serialize)]
pub struct SpreadView {
    #[serde(flatten)]
    pub spread: Spread,
    pub raw_url: Option<String>,
    pub cleaned_url: Option<String>,
}

impl From<Spread> for SpreadView {
    fn from(spread: Spread) -> Self {
        let version = spread.updated_at.timestamp_millis();
        let raw_url = image_url("scans", &spread.raw_path, version);
        let cleaned_url = spread
            .cleaned_path
            .as_deref()
            .and_then(|path| image_url("cleaned", path, version));
        Self {
            spread,
            raw_url,
            cleaned_url,
        }
    }
}

/// `/api/serve/<area>/<file>?v=<version>`; the query defeats browser caching
/// when an image is rewritten in place.
fn image_url(area: &str, path: &Path, version: i64) -> Option<String> {
    let file = path.file_name()?.to_str()?;
    Some(format!("/api/serve/{area}/{file}?v={version}"))
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub session_id: SessionId,
    pub next_scan_index: u32,
    pub spreads: Vec<SpreadView>,
}

impl From<SessionSnapshot> for StateResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            session_id: snapshot.session_id,
            next_scan_index: snapshot.next_index.get(),
            spreads: snapshot.spreads.into_iter().map(SpreadView::from).collect(),
        }
    }
}
