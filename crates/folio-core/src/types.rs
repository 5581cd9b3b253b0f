// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio scan session.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FolioError;

/// Unique identifier for a digitization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a spread within the document, starting at 1.
///
/// Construction goes through [`SpreadIndex::new`] (or serde, which uses the
/// same check), so a value of this type is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SpreadIndex(u32);

impl SpreadIndex {
    pub const FIRST: SpreadIndex = SpreadIndex(1);

    pub fn new(value: u32) -> Result<Self, FolioError> {
        if value == 0 {
            return Err(FolioError::InvalidArgument(
                "spread index must be >= 1".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The index after this one, or `None` at `u32::MAX`.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// File name shared by the raw and cleaned artifacts, e.g. `image_007.png`
    /// for `digits = 3`. Indices wider than `digits` are written in full.
    pub fn file_name(self, digits: usize) -> String {
        format!("image_{:0width$}.png", self.0, width = digits)
    }

    /// Inverse of [`file_name`](Self::file_name). Returns `None` for names
    /// outside the `image_<n>.png` scheme.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix("image_")?.strip_suffix(".png")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u32>().ok().and_then(|n| Self::new(n).ok())
    }
}

impl TryFrom<u32> for SpreadIndex {
    type Error = FolioError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SpreadIndex> for u32 {
    fn from(index: SpreadIndex) -> Self {
        index.0
    }
}

impl std::fmt::Display for SpreadIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review status of a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadStatus {
    /// Raw image acquired, not yet cleaned.
    Scanned,
    /// Cleaned image present and awaiting operator approval.
    Processed,
    /// Operator accepted the cleaned image.
    Approved,
}

impl SpreadStatus {
    /// Whether a cleaned image is expected for this status.
    pub fn has_cleaned_image(self) -> bool {
        matches!(self, Self::Processed | Self::Approved)
    }
}

impl std::fmt::Display for SpreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scanned => "scanned",
            Self::Processed => "processed",
            Self::Approved => "approved",
        };
        f.write_str(name)
    }
}

/// Operator actions on a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Scan,
    Rescan,
    Process,
    Rotate180,
    Deskew,
    CropBorders,
    Approve,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::Rescan => "rescan",
            Self::Process => "process",
            Self::Rotate180 => "rotate",
            Self::Deskew => "deskew",
            Self::CropBorders => "crop borders of",
            Self::Approve => "approve",
        };
        f.write_str(name)
    }
}

/// One scanned page or sheet tracked by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub index: SpreadIndex,
    /// Most recently acquired, unprocessed image.
    pub raw_path: PathBuf,
    /// Processed image; `Some` exactly when the status is processed or approved.
    pub cleaned_path: Option<PathBuf>,
    pub status: SpreadStatus,
    /// Manual rotation applied since the last process, 0 or 180.
    pub rotation_applied: u16,
    /// Whether deskew has run since the last process/rescan.
    pub skew_corrected: bool,
    /// Angle (degrees) applied by the last deskew.
    pub skew_angle: Option<f32>,
    /// Coarse rotation applied by orientation detection during process.
    pub osd_rotation: Option<u16>,
    /// Whether borders were cropped since the last process/rescan.
    pub borders_cropped: bool,
    pub scanned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Spread {
    /// A freshly acquired spread.
    pub fn scanned(index: SpreadIndex, raw_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            index,
            raw_path,
            cleaned_path: None,
            status: SpreadStatus::Scanned,
            rotation_applied: 0,
            skew_corrected: false,
            skew_angle: None,
            osd_rotation: None,
            borders_cropped: false,
            scanned_at: now,
            updated_at: now,
        }
    }

    /// Drop everything derived from the previous cleaned image.
    pub fn clear_adjustments(&mut self) {
        self.rotation_applied = 0;
        self.skew_corrected = false;
        self.skew_angle = None;
        self.borders_cropped = false;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
