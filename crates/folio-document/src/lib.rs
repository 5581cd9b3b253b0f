// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Image cleanup for scanned spreads.
//
// Provides the in-memory image processor (EXIF orientation, rotation,
// grayscale, downscale, crop), fine deskew, the orientation-detection (OSD)
// collaborator, and the process pipeline that turns a raw scan into the
// cleaned PNG handed to OCR.

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `folio_document::ImageProcessor` etc.
pub use self::image::processor::ImageProcessor;
pub use scan::deskew::Deskewer;
pub use scan::osd::{OrientationDetector, QuarterTurn, TesseractOsd};
pub use scan::pipeline::{ProcessOptions, ProcessedImage};
