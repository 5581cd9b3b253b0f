// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Build the workflow controller from configuration.

use std::sync::Arc;

use folio_core::config::AppConfig;
use folio_core::error::Result;
use folio_document::{OrientationDetector, TesseractOsd};
use folio_session::WorkflowController;
use folio_session::acquire::acquirer_from_config;
use tracing::info;

/// Subdirectory of the work directory where scanner output lands before it
/// is stored.
const STAGING_DIR: &str = "staging";

/// Open the session described by `config` with the configured scanner and
/// orientation detector.
pub fn open_workflow(config: &AppConfig) -> Result<Arc<WorkflowController>> {
    let acquirer = acquirer_from_config(&config.scanner, config.work_dir.join(STAGING_DIR));
    let osd: Option<Arc<dyn OrientationDetector>> = if config.osd.enabled {
        Some(Arc::new(TesseractOsd::from_config(&config.osd)))
    } else {
        info!("Orientation detection disabled");
        None
    };
    Ok(Arc::new(WorkflowController::open(config, acquirer, osd)?))
}
