// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation and script detection (OSD) — coarse 90° page orientation.
//
// The detector is an external collaborator. Its absence is a degraded mode,
// not a failure: the process step simply skips the coarse correction.
//
// The bundled implementation pipes a PNG to the tesseract CLI:
//
// ```sh
// tesseract stdin stdout --psm 0
// ```
//
// and reads the `Rotate:` and `Orientation confidence:` lines of its report.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::DynamicImage;
use folio_core::config::OsdConfig;
use folio_core::error::FolioError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;

/// Counter-clockwise right-angle rotation that makes a page upright, as
/// reported on tesseract's `Rotate:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarterTurn {
    None,
    Ccw90,
    Ccw180,
    Ccw270,
}

impl QuarterTurn {
    /// Parse a right-angle value in degrees (any multiple of 90, negative allowed).
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::Ccw90),
            180 => Some(Self::Ccw180),
            270 => Some(Self::Ccw270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Ccw90 => 90,
            Self::Ccw180 => 180,
            Self::Ccw270 => 270,
        }
    }

    /// Apply this rotation losslessly.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::None => image,
            Self::Ccw90 => image.rotate270(),
            Self::Ccw180 => image.rotate180(),
            Self::Ccw270 => image.rotate90(),
        }
    }
}

/// External orientation detector.
///
/// Implementations return [`FolioError::OsdUnavailable`] when the engine is
/// missing or cannot judge the page.
pub trait OrientationDetector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Detect the counter-clockwise quarter turn that makes `image` upright.
    fn detect_orientation(&self, image: &DynamicImage) -> Result<QuarterTurn, FolioError>;
}

/// Ask `detector` (if any) for the page orientation and correct it.
///
/// Any detector failure leaves the image unchanged and yields `None`.
#[instrument(skip_all, fields(detector = detector.map(|d| d.name())))]
pub fn detect_and_correct(
    image: DynamicImage,
    detector: Option<&dyn OrientationDetector>,
) -> (DynamicImage, Option<QuarterTurn>) {
    let Some(detector) = detector else {
        debug!("No orientation detector configured");
        return (image, None);
    };

    match detector.detect_orientation(&image) {
        Ok(turn) => {
            if turn != QuarterTurn::None {
                info!(degrees = turn.degrees(), "Correcting page orientation");
            }
            (turn.apply(image), Some(turn))
        }
        Err(err) => {
            warn!(error = %err, "Orientation detection skipped");
            (image, None)
        }
    }
}

/// Orientation detector backed by the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractOsd {
    binary: PathBuf,
    min_confidence: f32,
}

impl TesseractOsd {
    pub fn new(binary: impl Into<PathBuf>, min_confidence: f32) -> Self {
        Self {
            binary: binary.into(),
            min_confidence,
        }
    }

    pub fn from_config(config: &OsdConfig) -> Self {
        Self::new(config.tesseract_path.clone(), config.min_confidence)
    }

    fn run(&self, png: &[u8]) -> Result<String, FolioError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "--psm", "0"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                FolioError::OsdUnavailable(format!(
                    "cannot run {}: {}",
                    self.binary.display(),
                    err
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).map_err(|err| {
                FolioError::OsdUnavailable(format!("failed to send image to tesseract: {}", err))
            })?;
        }

        let output = child.wait_with_output().map_err(|err| {
            FolioError::OsdUnavailable(format!("failed to wait for tesseract: {}", err))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FolioError::OsdUnavailable(format!(
                "tesseract exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OrientationDetector for TesseractOsd {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip_all, fields(binary = %self.binary.display()))]
    fn detect_orientation(&self, image: &DynamicImage) -> Result<QuarterTurn, FolioError> {
        let png = ImageProcessor::from_dynamic(image.clone()).to_png_bytes()?;
        let report = parse_osd_report(&self.run(&png)?)?;
        debug!(
            rotate = report.rotate,
            confidence = report.confidence,
            "Tesseract OSD report"
        );
        if report.confidence < self.min_confidence {
            debug!(min_confidence = self.min_confidence, "OSD confidence too low; keeping page as is");
            return Ok(QuarterTurn::None);
        }
        QuarterTurn::from_degrees(report.rotate).ok_or_else(|| {
            FolioError::OsdUnavailable(format!("unexpected rotation {}", report.rotate))
        })
    }
}

/// The fields of a tesseract `--psm 0` report that Folio uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsdReport {
    pub rotate: i32,
    pub confidence: f32,
}

/// Parse the text report printed by `tesseract ... --psm 0`.
pub fn parse_osd_report(text: &str) -> Result<OsdReport, FolioError> {
    let mut rotate = None;
    let mut confidence = 0.0f32;
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Rotate" => rotate = value.trim().parse::<i32>().ok(),
            "Orientation confidence" => confidence = value.trim().parse::<f32>().unwrap_or(0.0),
            _ => {}
        }
    }
    let rotate = rotate.ok_or_else(|| {
        FolioError::OsdUnavailable("tesseract report has no Rotate line".into())
    })?;
    Ok(OsdReport { rotate, confidence })
}
