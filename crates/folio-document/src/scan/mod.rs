// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan cleanup — fine deskew, border trimming, orientation detection (OSD)
// and the process pipeline that combines them.

pub mod borders;
pub mod deskew;
pub mod osd;
pub mod pipeline;

pub use deskew::Deskewer;
pub use osd::{OrientationDetector, QuarterTurn, TesseractOsd};
pub use pipeline::{ProcessOptions, ProcessedImage};
