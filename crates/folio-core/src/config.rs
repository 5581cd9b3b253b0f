// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Persistent application settings.
///
/// Every section has defaults, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the on-disk layout (`scans/`, `cleaned/`, `session.json`).
    pub work_dir: PathBuf,
    /// Zero-padding width of spread file names.
    pub index_digits: usize,
    pub scanner: ScannerConfig,
    pub osd: OsdConfig,
    pub processing: ProcessingConfig,
    pub deskew: DeskewConfig,
    pub crop: CropConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("work"),
            index_digits: 3,
            scanner: ScannerConfig::default(),
            osd: OsdConfig::default(),
            processing: ProcessingConfig::default(),
            deskew: DeskewConfig::default(),
            crop: CropConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(FolioError::Io(err)),
        };
        let config: Self = serde_json::from_str(&data).map_err(|err| {
            FolioError::Config(format!("{}: {}", path.display(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write settings as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_digits == 0 || self.index_digits > 9 {
            return Err(FolioError::Config(format!(
                "index_digits must be between 1 and 9, got {}",
                self.index_digits
            )));
        }
        if self.deskew.angle_step <= 0.0 || self.deskew.angle_range < 0.0 {
            return Err(FolioError::Config(
                "deskew angle_step must be > 0 and angle_range >= 0".into(),
            ));
        }
        if self.scanner.timeout_secs == 0 {
            return Err(FolioError::Config("scanner timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// External scanner invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Program and arguments. The literal `{output}` is replaced with the
    /// path the scanner must write to, e.g.
    /// `["scanimage", "--format=png", "-o", "{output}"]`.
    /// Empty means no scanner is configured.
    pub command: Vec<String>,
    /// Upper bound on one acquisition, including the driver dialog.
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 300,
        }
    }
}

impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Orientation and script detection (coarse 90° steps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdConfig {
    pub enabled: bool,
    /// Tesseract executable name or path.
    pub tesseract_path: PathBuf,
    /// Results below this orientation confidence are treated as upright.
    pub min_confidence: f32,
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_path: PathBuf::from("tesseract"),
            min_confidence: 0.0,
        }
    }
}

/// Settings for the process step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Apply EXIF and OSD orientation correction.
    pub fix_orientation: bool,
    /// Convert cleaned images to grayscale unless a request says otherwise.
    pub to_grayscale: bool,
    /// Longest side of a cleaned image; larger images are downscaled.
    /// Zero disables the limit.
    pub max_size_px: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            fix_orientation: true,
            to_grayscale: true,
            max_size_px: 4096,
        }
    }
}

/// Fine skew estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Search ± this many degrees.
    pub angle_range: f32,
    pub angle_step: f32,
    /// Below this magnitude the image is left alone.
    pub min_angle: f32,
    /// Longest side of the copy used for the angle search.
    pub max_size_analyze: u32,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            angle_range: 4.0,
            angle_step: 0.5,
            min_angle: 0.2,
            max_size_analyze: 600,
        }
    }
}

/// Border trimming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Luma difference from the border colour that counts as content.
    pub tolerance: u8,
    /// Pixels kept around the detected content.
    pub margin: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            tolerance: 40,
            margin: 8,
        }
    }
}

/// HTTP control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}
