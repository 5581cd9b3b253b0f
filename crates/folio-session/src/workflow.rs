// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Workflow controller — the operator-facing operations on a session.
//
// Every operation takes the session lock for its whole duration, validates
// the transition before touching any file, writes images atomically, then
// updates the state and saves `session.json`. A failing operation leaves the
// session exactly as it was.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use folio_core::config::{AppConfig, CropConfig, DeskewConfig};
use folio_core::error::{FolioError, Result};
use folio_core::types::{Operation, Spread, SpreadIndex};
use folio_document::OrientationDetector;
use folio_document::scan::pipeline::{
    ProcessOptions, crop_borders_png, deskew_png, process_raw, rotate_180_png,
};
use tokio::sync::{Mutex, Notify};
use tracing::{info, instrument, warn};

use crate::acquire::Acquirer;
use crate::persist;
use crate::state::{SessionSnapshot, SessionState};
use crate::store::SpreadStore;

/// Drives one digitization session.
pub struct WorkflowController {
    store: SpreadStore,
    state: Mutex<SessionState>,
    acquirer: Arc<dyn Acquirer>,
    osd: Option<Arc<dyn OrientationDetector>>,
    process_options: ProcessOptions,
    deskew: DeskewConfig,
    crop: CropConfig,
    scan_timeout: Duration,
    cancel: Notify,
    scanning: AtomicBool,
}

impl WorkflowController {
    /// Open the session in `config.work_dir`, resuming `session.json` if it
    /// exists and rebuilding from the images on disk otherwise.
    pub fn open(
        config: &AppConfig,
        acquirer: Arc<dyn Acquirer>,
        osd: Option<Arc<dyn OrientationDetector>>,
    ) -> Result<Self> {
        let store = SpreadStore::new(&config.work_dir, config.index_digits);
        let state = persist::load_or_rebuild(&store)?;
        info!(
            session_id = %state.id(),
            work_dir = %store.root().display(),
            acquirer = acquirer.name(),
            osd = osd.as_ref().map(|d| d.name()),
            "Workflow ready"
        );
        Ok(Self {
            store,
            state: Mutex::new(state),
            acquirer,
            osd,
            process_options: ProcessOptions::from(&config.processing),
            deskew: config.deskew,
            crop: config.crop,
            scan_timeout: config.scanner.timeout(),
            cancel: Notify::new(),
            scanning: AtomicBool::new(false),
        })
    }

    pub fn store(&self) -> &SpreadStore {
        &self.store
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn spread(&self, index: SpreadIndex) -> Result<Spread> {
        let state = self.state.lock().await;
        state
            .spread(index)
            .cloned()
            .ok_or_else(|| FolioError::NotFound(format!("spread {index} has not been scanned")))
    }

    /// Acquire a spread. Without `index` the session counter picks the
    /// target and advances; with it, that index is (re)written.
    #[instrument(skip(self))]
    pub async fn scan(&self, index: Option<SpreadIndex>) -> Result<Spread> {
        let mut state = self.state.lock().await;
        let target = match index {
            Some(index) => index,
            None => state.auto_scan_target()?,
        };
        state.check(target, Operation::Scan)?;

        let bytes = self.acquire().await?;
        let raw_path = self.store.save_raw(target, &bytes)?;
        let spread = state.record_scan(target, raw_path, index.is_none());
        self.persist(&state);
        info!(index = %target, next_index = %state.next_index(), "Spread scanned");
        Ok(spread)
    }

    /// Re-acquire an existing spread. The session counter is not touched.
    #[instrument(skip(self))]
    pub async fn rescan(&self, index: SpreadIndex) -> Result<Spread> {
        let mut state = self.state.lock().await;
        state.check(index, Operation::Rescan)?;

        let bytes = self.acquire().await?;
        let raw_path = self.store.save_raw(index, &bytes)?;
        let spread = state.record_rescan(index, raw_path)?;
        self.persist(&state);
        info!(%index, "Spread rescanned");
        Ok(spread)
    }

    /// Interrupt a scan in progress. Returns whether one was running.
    pub fn cancel_scan(&self) -> bool {
        let running = self.scanning.load(Ordering::SeqCst);
        if running {
            info!("Cancelling scan");
            self.cancel.notify_waiters();
        }
        running
    }

    /// Clean the raw scan into the processed image.
    #[instrument(skip(self))]
    pub async fn process(&self, index: SpreadIndex, to_grayscale: Option<bool>) -> Result<Spread> {
        let mut state = self.state.lock().await;
        state.check(index, Operation::Process)?;

        let raw = self.store.load_raw(index)?;
        let options = self.process_options.with_grayscale(to_grayscale);
        let osd = self.osd.clone();
        let processed =
            run_blocking(move || process_raw(&raw, &options, osd.as_deref())).await?;

        let cleaned_path = self.store.save_cleaned(index, &processed.png)?;
        let spread = state.record_process(index, cleaned_path, processed.osd_rotation)?;
        self.persist(&state);
        info!(%index, osd_rotation = ?processed.osd_rotation, "Spread processed");
        Ok(spread)
    }

    #[instrument(skip(self))]
    pub async fn rotate_180(&self, index: SpreadIndex) -> Result<Spread> {
        let mut state = self.state.lock().await;
        state.check(index, Operation::Rotate180)?;

        let png = self.store.load_cleaned(index)?;
        let rotated = run_blocking(move || rotate_180_png(&png)).await?;
        self.store.save_cleaned(index, &rotated)?;
        let spread = state.record_rotate_180(index)?;
        self.persist(&state);
        Ok(spread)
    }

    #[instrument(skip(self))]
    pub async fn deskew(&self, index: SpreadIndex) -> Result<Spread> {
        let mut state = self.state.lock().await;
        state.check(index, Operation::Deskew)?;

        let png = self.store.load_cleaned(index)?;
        let config = self.deskew;
        let (straightened, angle) = run_blocking(move || deskew_png(&png, config)).await?;
        self.store.save_cleaned(index, &straightened)?;
        let spread = state.record_deskew(index, angle)?;
        self.persist(&state);
        info!(%index, angle, "Spread deskewed");
        Ok(spread)
    }

    #[instrument(skip(self))]
    pub async fn crop_borders(&self, index: SpreadIndex) -> Result<Spread> {
        let mut state = self.state.lock().await;
        state.check(index, Operation::CropBorders)?;

        let png = self.store.load_cleaned(index)?;
        let config = self.crop;
        let cropped = run_blocking(move || crop_borders_png(&png, &config)).await?;
        self.store.save_cleaned(index, &cropped)?;
        let spread = state.record_crop(index)?;
        self.persist(&state);
        Ok(spread)
    }

    #[instrument(skip(self))]
    pub async fn approve(&self, index: SpreadIndex) -> Result<Spread> {
        let mut state = self.state.lock().await;
        let spread = state.record_approve(index)?;
        self.persist(&state);
        info!(%index, "Spread approved");
        Ok(spread)
    }

    /// Point future auto-indexed scans at `value` (must be >= 1).
    #[instrument(skip(self))]
    pub async fn set_next_index(&self, value: u32) -> Result<SpreadIndex> {
        let mut state = self.state.lock().await;
        let index = state.set_next_index(value)?;
        self.persist(&state);
        info!(next_index = %index, "Next scan index set");
        Ok(index)
    }

    /// Run the acquirer, bounded by the scan timeout and operator cancel.
    async fn acquire(&self) -> Result<Vec<u8>> {
        let cancelled = self.cancel.notified();
        let _scanning = ScanningFlag::raise(&self.scanning);
        tokio::select! {
            outcome = tokio::time::timeout(self.scan_timeout, self.acquirer.acquire()) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?self.scan_timeout, "Scan timed out");
                    Err(FolioError::Acquisition(format!(
                        "Scan timed out after {} seconds.",
                        self.scan_timeout.as_secs()
                    )))
                }
            },
            () = cancelled => {
                warn!("Scan cancelled by operator");
                Err(FolioError::Acquisition("Scan cancelled by operator.".into()))
            }
        }
    }

    fn persist(&self, state: &SessionState) {
        if let Err(err) = persist::save(&self.store, state) {
            warn!(error = %err, "Failed to save session file");
        }
    }
}

/// Marks a scan as in flight; cleared on drop, also when the scan future is dropped.
struct ScanningFlag<'a>(&'a AtomicBool);

impl<'a> ScanningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ScanningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run CPU-bound image work off the async runtime.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| FolioError::ImageError(format!("image task failed: {err}")))?
}
