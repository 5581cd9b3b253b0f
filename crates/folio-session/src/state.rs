// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session state machine.
//
// Holds the running index counter and every spread in scan order. All status
// changes go through `transition`, so an operation that is not allowed for a
// spread's current status is rejected before anything is touched.

use std::path::PathBuf;

use folio_core::error::{FolioError, Result};
use folio_core::types::{Operation, SessionId, Spread, SpreadIndex, SpreadStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::{ImageArea, SpreadStore};

/// Status a spread moves to when `operation` runs on it, or `None` if the
/// operation is not allowed from `status`.
///
/// | Operation                        | Scanned   | Processed | Approved  |
/// |----------------------------------|-----------|-----------|-----------|
/// | Scan / Rescan                    | Scanned   | Scanned   | Scanned   |
/// | Process                          | Processed | Processed | Processed |
/// | Rotate180 / Deskew / CropBorders | -         | Processed | Processed |
/// | Approve                          | -         | Approved  | -         |
pub fn transition(status: SpreadStatus, operation: Operation) -> Option<SpreadStatus> {
    use Operation::*;
    use SpreadStatus::*;

    match (operation, status) {
        (Scan | Rescan, _) => Some(Scanned),
        (Process, _) => Some(Processed),
        (Rotate180 | Deskew | CropBorders, Processed | Approved) => Some(Processed),
        (Approve, Processed) => Some(Approved),
        _ => None,
    }
}

/// Read-only view of the session handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub next_index: SpreadIndex,
    pub spreads: Vec<Spread>,
}

/// The single active digitization session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    id: SessionId,
    next_index: SpreadIndex,
    /// Scan order; indices are unique.
    spreads: Vec<Spread>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            next_index: SpreadIndex::FIRST,
            spreads: Vec::new(),
        }
    }

    /// Rebuild a session from the images already in `store`.
    ///
    /// Each raw scan becomes a spread; those with a cleaned image are taken
    /// as processed. Approval is not recorded on disk, so nothing comes back
    /// approved. The counter continues after the highest index found.
    pub fn from_store(store: &SpreadStore) -> Result<Self> {
        let mut state = Self::new();
        for index in store.indices_on_disk(ImageArea::Scans)? {
            let mut spread = Spread::scanned(index, store.raw_path(index));
            if store.has_cleaned(index) {
                spread.cleaned_path = Some(store.cleaned_path(index));
                spread.status = SpreadStatus::Processed;
            }
            if let Some(after) = index.next() {
                state.next_index = state.next_index.max(after);
            }
            state.spreads.push(spread);
        }
        info!(
            spreads = state.spreads.len(),
            next_index = %state.next_index,
            "Session rebuilt from work directory"
        );
        Ok(state)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn next_index(&self) -> SpreadIndex {
        self.next_index
    }

    /// Spreads in scan order.
    pub fn spreads(&self) -> &[Spread] {
        &self.spreads
    }

    pub fn spread(&self, index: SpreadIndex) -> Option<&Spread> {
        self.spreads.iter().find(|s| s.index == index)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            next_index: self.next_index,
            spreads: self.spreads.clone(),
        }
    }

    /// Check that `operation` may run on the spread at `index` and return
    /// the status it would move to. Scan is allowed on a missing index.
    pub fn check(&self, index: SpreadIndex, operation: Operation) -> Result<SpreadStatus> {
        match self.spread(index) {
            Some(spread) => transition(spread.status, operation).ok_or(
                FolioError::InvalidTransition {
                    operation,
                    index,
                    status: spread.status,
                },
            ),
            None if operation == Operation::Scan => Ok(SpreadStatus::Scanned),
            None => Err(not_found(index)),
        }
    }

    /// Record a successful acquisition at `index`.
    ///
    /// An auto-indexed scan (`advance == true`) moves the counter past
    /// `index`; an explicit scan of a new index only moves it forward if it
    /// would otherwise point at or before that index.
    pub fn record_scan(&mut self, index: SpreadIndex, raw_path: PathBuf, advance: bool) -> Spread {
        let position = self.spreads.iter().position(|s| s.index == index);
        let is_new = position.is_none();
        let spread = match position {
            Some(pos) => {
                reset_to_scanned(&mut self.spreads[pos], raw_path);
                self.spreads[pos].clone()
            }
            None => {
                let spread = Spread::scanned(index, raw_path);
                self.spreads.push(spread.clone());
                spread
            }
        };

        if let Some(after) = index.next().filter(|_| advance || is_new) {
            self.next_index = self.next_index.max(after);
        }
        debug!(%index, next_index = %self.next_index, is_new, "Scan recorded");
        spread
    }

    /// Record a rescan of an existing spread. Never moves the counter.
    pub fn record_rescan(&mut self, index: SpreadIndex, raw_path: PathBuf) -> Result<Spread> {
        self.apply(index, Operation::Rescan, |spread| reset_to_scanned(spread, raw_path))
    }

    pub fn record_process(
        &mut self,
        index: SpreadIndex,
        cleaned_path: PathBuf,
        osd_rotation: Option<u16>,
    ) -> Result<Spread> {
        self.apply(index, Operation::Process, |spread| {
            spread.cleaned_path = Some(cleaned_path);
            spread.osd_rotation = osd_rotation;
            spread.clear_adjustments();
        })
    }

    /// Toggle the manual rotation between 0 and 180.
    pub fn record_rotate_180(&mut self, index: SpreadIndex) -> Result<Spread> {
        self.apply(index, Operation::Rotate180, |spread| {
            spread.rotation_applied = (spread.rotation_applied + 180) % 360;
        })
    }

    pub fn record_deskew(&mut self, index: SpreadIndex, angle: f32) -> Result<Spread> {
        self.apply(index, Operation::Deskew, |spread| {
            spread.skew_corrected = true;
            spread.skew_angle = Some(angle);
        })
    }

    pub fn record_crop(&mut self, index: SpreadIndex) -> Result<Spread> {
        self.apply(index, Operation::CropBorders, |spread| {
            spread.borders_cropped = true;
        })
    }

    pub fn record_approve(&mut self, index: SpreadIndex) -> Result<Spread> {
        self.apply(index, Operation::Approve, |_| {})
    }

    /// Target of the next auto-indexed scan. Fails when the counter could
    /// not move past it, so auto scans never land on the same index twice.
    pub fn auto_scan_target(&self) -> Result<SpreadIndex> {
        match self.next_index.next() {
            Some(_) => Ok(self.next_index),
            None => Err(FolioError::InvalidArgument(format!(
                "next scan index {} is the highest possible; set a lower one",
                self.next_index
            ))),
        }
    }

    /// Point future auto-indexed scans at `value`.
    pub fn set_next_index(&mut self, value: u32) -> Result<SpreadIndex> {
        let index = SpreadIndex::new(value).map_err(|_| {
            FolioError::InvalidArgument(format!("next scan index must be >= 1, got {value}"))
        })?;
        self.next_index = index;
        Ok(index)
    }

    /// Reject duplicate indices and cleaned paths that disagree with status.
    pub fn validate(&self) -> Result<()> {
        for (i, spread) in self.spreads.iter().enumerate() {
            if self.spreads[..i].iter().any(|s| s.index == spread.index) {
                return Err(FolioError::Config(format!(
                    "session lists spread {} more than once",
                    spread.index
                )));
            }
            if spread.cleaned_path.is_some() != spread.status.has_cleaned_image() {
                return Err(FolioError::Config(format!(
                    "spread {} is {} but its cleaned image is {}",
                    spread.index,
                    spread.status,
                    if spread.cleaned_path.is_some() { "set" } else { "missing" }
                )));
            }
        }
        Ok(())
    }

    fn spread_mut(&mut self, index: SpreadIndex) -> Option<&mut Spread> {
        self.spreads.iter_mut().find(|s| s.index == index)
    }

    fn apply(
        &mut self,
        index: SpreadIndex,
        operation: Operation,
        update: impl FnOnce(&mut Spread),
    ) -> Result<Spread> {
        let spread = self.spread_mut(index).ok_or_else(|| not_found(index))?;
        let status = transition(spread.status, operation).ok_or(FolioError::InvalidTransition {
            operation,
            index,
            status: spread.status,
        })?;
        update(spread);
        spread.status = status;
        spread.touch();
        debug!(%index, %operation, %status, "Spread updated");
        Ok(spread.clone())
    }
}

fn reset_to_scanned(spread: &mut Spread, raw_path: PathBuf) {
    spread.raw_path = raw_path;
    spread.status = SpreadStatus::Scanned;
    spread.cleaned_path = None;
    spread.osd_rotation = None;
    spread.clear_adjustments();
    spread.scanned_at = chrono::Utc::now();
    spread.touch();
}

fn not_found(index: SpreadIndex) -> FolioError {
    FolioError::NotFound(format!("spread {index} has not been scanned"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(n: u32) -> SpreadIndex {
        SpreadIndex::new(n).expect("valid index")
    }

    fn raw(n: u32) -> PathBuf {
        PathBuf::from(format!("scans/image_{n:03}.png"))
    }

    fn cleaned(n: u32) -> PathBuf {
        PathBuf::from(format!("cleaned/image_{n:03}.png"))
    }

    /// Session with spread 1 processed.
    fn processed_session() -> SessionState {
        let mut state = SessionState::new();
        state.record_scan(idx(1), raw(1), true);
        state.record_process(idx(1), cleaned(1), None).expect("process");
        state
    }

    #[test]
    fn transition_table() {
        use Operation::*;
        use SpreadStatus::*;

        for status in [Scanned, Processed, Approved] {
            assert_eq!(transition(status, Scan), Some(Scanned));
            assert_eq!(transition(status, Rescan), Some(Scanned));
            assert_eq!(transition(status, Process), Some(Processed));
        }
        for op in [Rotate180, Deskew, CropBorders] {
            assert_eq!(transition(Scanned, op), None);
            assert_eq!(transition(Processed, op), Some(Processed));
            assert_eq!(transition(Approved, op), Some(Processed));
        }
        assert_eq!(transition(Scanned, Approve), None);
        assert_eq!(transition(Processed, Approve), Some(Approved));
        assert_eq!(transition(Approved, Approve), None);
    }

    #[test]
    fn auto_scans_count_up() {
        let mut state = SessionState::new();
        for n in 1..=4 {
            let target = state.next_index();
            assert_eq!(target, idx(n));
            let spread = state.record_scan(target, raw(n), true);
            assert_eq!(spread.status, SpreadStatus::Scanned);
        }
        assert_eq!(state.next_index(), idx(5));
        assert_eq!(state.spreads().len(), 4);
    }

    #[test]
    fn rescan_keeps_counter_and_resets_spread() {
        let mut state = processed_session();
        state.record_deskew(idx(1), 1.5).expect("deskew");
        state.record_approve(idx(1)).expect("approve");

        let spread = state.record_rescan(idx(1), raw(1)).expect("rescan");
        assert_eq!(spread.status, SpreadStatus::Scanned);
        assert_eq!(spread.cleaned_path, None);
        assert!(!spread.skew_corrected);
        assert_eq!(spread.skew_angle, None);
        assert_eq!(state.next_index(), idx(2));
    }

    #[test]
    fn rescan_of_unknown_index_is_not_found() {
        let mut state = SessionState::new();
        assert!(matches!(
            state.record_rescan(idx(3), raw(3)),
            Err(FolioError::NotFound(_))
        ));
        assert!(state.spreads().is_empty());
    }

    #[test]
    fn approve_from_scanned_is_rejected_without_change() {
        let mut state = SessionState::new();
        state.record_scan(idx(1), raw(1), true);
        let before = state.clone();

        let err = state.record_approve(idx(1)).unwrap_err();
        assert!(matches!(
            err,
            FolioError::InvalidTransition {
                operation: Operation::Approve,
                status: SpreadStatus::Scanned,
                ..
            }
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn adjustments_demote_approved() {
        let mut state = processed_session();
        state.record_approve(idx(1)).expect("approve");

        let spread = state.record_rotate_180(idx(1)).expect("rotate");
        assert_eq!(spread.status, SpreadStatus::Processed);
        assert_eq!(spread.rotation_applied, 180);

        let spread = state.record_rotate_180(idx(1)).expect("rotate back");
        assert_eq!(spread.rotation_applied, 0);

        state.record_approve(idx(1)).expect("approve");
        let spread = state.record_crop(idx(1)).expect("crop");
        assert_eq!(spread.status, SpreadStatus::Processed);
        assert!(spread.borders_cropped);
    }

    #[test]
    fn process_clears_adjustments() {
        let mut state = processed_session();
        state.record_rotate_180(idx(1)).expect("rotate");
        state.record_deskew(idx(1), -2.0).expect("deskew");

        let spread = state.record_process(idx(1), cleaned(1), Some(90)).expect("reprocess");
        assert_eq!(spread.rotation_applied, 0);
        assert!(!spread.skew_corrected);
        assert_eq!(spread.osd_rotation, Some(90));
        assert_eq!(spread.cleaned_path, Some(cleaned(1)));
    }

    #[test]
    fn explicit_scan_of_new_index_moves_counter_forward_only() {
        let mut state = SessionState::new();
        state.record_scan(idx(5), raw(5), false);
        assert_eq!(state.next_index(), idx(6));

        state.record_scan(idx(2), raw(2), false);
        assert_eq!(state.next_index(), idx(6));

        // Explicit scan over an existing spread leaves the counter alone.
        state.set_next_index(1).expect("set");
        state.record_scan(idx(5), raw(5), false);
        assert_eq!(state.next_index(), idx(1));
    }

    #[test]
    fn spreads_keep_scan_order() {
        let mut state = SessionState::new();
        state.record_scan(idx(3), raw(3), false);
        state.record_scan(idx(1), raw(1), false);
        let order: Vec<u32> = state.spreads().iter().map(|s| s.index.get()).collect();
        assert_eq!(order, vec![3, 1]);
    }

    #[test]
    fn set_next_index_rejects_zero() {
        let mut state = SessionState::new();
        assert!(matches!(state.set_next_index(0), Err(FolioError::InvalidArgument(_))));
        assert_eq!(state.next_index(), SpreadIndex::FIRST);
        assert_eq!(state.set_next_index(40).expect("set"), idx(40));
    }

    #[test]
    fn auto_scan_target_refuses_the_last_index() {
        let mut state = SessionState::new();
        state.set_next_index(u32::MAX - 1).expect("set");
        let target = state.auto_scan_target().expect("target");
        state.record_scan(target, raw(u32::MAX - 1), true);
        assert_eq!(state.next_index(), idx(u32::MAX));

        assert!(matches!(
            state.auto_scan_target(),
            Err(FolioError::InvalidArgument(_))
        ));

        // An explicit scan at the last index is still accepted.
        state.record_scan(idx(u32::MAX), raw(u32::MAX), false);
        assert_eq!(state.next_index(), idx(u32::MAX));
        assert_eq!(state.spreads().len(), 2);
    }

    #[test]
    fn check_reports_missing_and_forbidden() {
        let state = processed_session();
        assert_eq!(state.check(idx(1), Operation::Approve).expect("ok"), SpreadStatus::Approved);
        assert!(matches!(state.check(idx(9), Operation::Process), Err(FolioError::NotFound(_))));
        assert_eq!(state.check(idx(9), Operation::Scan).expect("ok"), SpreadStatus::Scanned);
    }

    #[test]
    fn validate_catches_inconsistent_cleaned_path() {
        let mut state = processed_session();
        assert!(state.validate().is_ok());
        if let Some(spread) = state.spread_mut(idx(1)) {
            spread.cleaned_path = None;
        }
        assert!(matches!(state.validate(), Err(FolioError::Config(_))));
    }

    #[test]
    fn rebuild_from_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SpreadStore::new(dir.path(), 3);
        store.save_raw(idx(1), b"a").expect("save");
        store.save_raw(idx(2), b"b").expect("save");
        store.save_cleaned(idx(1), b"c").expect("save");

        let state = SessionState::from_store(&store).expect("rebuild");
        assert_eq!(state.next_index(), idx(3));
        assert_eq!(state.spread(idx(1)).map(|s| s.status), Some(SpreadStatus::Processed));
        assert_eq!(state.spread(idx(2)).map(|s| s.status), Some(SpreadStatus::Scanned));
        assert!(state.validate().is_ok());
    }
}
