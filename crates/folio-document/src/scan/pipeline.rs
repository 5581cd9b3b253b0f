// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process pipeline — raw scan bytes in, cleaned PNG out — plus the in-place
// adjustments an operator applies to a cleaned spread afterwards.

use folio_core::config::{CropConfig, DeskewConfig, ProcessingConfig};
use folio_core::error::FolioError;
use tracing::{debug, instrument};

use super::borders::crop_to_content;
use super::deskew::Deskewer;
use super::osd::{OrientationDetector, detect_and_correct};
use crate::image::processor::ImageProcessor;

/// Per-run switches for [`process_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Apply EXIF orientation and OSD coarse correction.
    pub fix_orientation: bool,
    pub to_grayscale: bool,
    /// Longest allowed side of the output; 0 disables downscaling.
    pub max_size_px: u32,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for ProcessOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            fix_orientation: config.fix_orientation,
            to_grayscale: config.to_grayscale,
            max_size_px: config.max_size_px,
        }
    }
}

impl ProcessOptions {
    /// Override the grayscale switch for a single request.
    pub fn with_grayscale(mut self, to_grayscale: Option<bool>) -> Self {
        if let Some(value) = to_grayscale {
            self.to_grayscale = value;
        }
        self
    }
}

/// Result of [`process_raw`].
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub png: Vec<u8>,
    /// Counter-clockwise degrees applied by orientation detection, when it ran.
    pub osd_rotation: Option<u16>,
}

/// Turn raw scanner output into the cleaned PNG.
///
/// Steps: decode, EXIF orientation, OSD coarse correction, colour
/// flattening, optional grayscale, downscale, PNG encode.
#[instrument(skip(raw, osd), fields(raw_len = raw.len()))]
pub fn process_raw(
    raw: &[u8],
    options: &ProcessOptions,
    osd: Option<&dyn OrientationDetector>,
) -> Result<ProcessedImage, FolioError> {
    let mut processor = ImageProcessor::from_bytes(raw)?;
    let mut osd_rotation = None;

    if options.fix_orientation {
        let (image, turn) = detect_and_correct(processor.normalize_orientation().into_dynamic(), osd);
        osd_rotation = turn.map(|t| t.degrees());
        processor = ImageProcessor::from_dynamic(image);
    }

    processor = processor.flatten_color();
    if options.to_grayscale {
        processor = processor.grayscale();
    }
    let processor = processor.fit_within(options.max_size_px);
    debug!(
        width = processor.width(),
        height = processor.height(),
        ?osd_rotation,
        "Spread cleaned"
    );

    Ok(ProcessedImage {
        png: processor.to_png_bytes()?,
        osd_rotation,
    })
}

/// Turn a cleaned PNG upside down.
#[instrument(skip_all)]
pub fn rotate_180_png(png: &[u8]) -> Result<Vec<u8>, FolioError> {
    ImageProcessor::from_bytes(png)?.rotate_180().to_png_bytes()
}

/// Deskew a cleaned PNG, returning the new bytes and the estimated angle.
///
/// When the angle is below `config.min_angle` the input bytes come back
/// unchanged.
#[instrument(skip(png), fields(png_len = png.len()))]
pub fn deskew_png(png: &[u8], config: DeskewConfig) -> Result<(Vec<u8>, f32), FolioError> {
    let image = ImageProcessor::from_bytes(png)?.into_dynamic();
    let (image, angle) = Deskewer::new(config).deskew(image);
    if angle.abs() < config.min_angle {
        return Ok((png.to_vec(), angle));
    }
    let bytes = ImageProcessor::from_dynamic(image).to_png_bytes()?;
    Ok((bytes, angle))
}

/// Crop a cleaned PNG to its content.
#[instrument(skip(png), fields(png_len = png.len()))]
pub fn crop_borders_png(png: &[u8], config: &CropConfig) -> Result<Vec<u8>, FolioError> {
    let image = ImageProcessor::from_bytes(png)?.into_dynamic();
    let cropped = crop_to_content(image, config)?;
    ImageProcessor::from_dynamic(cropped).to_png_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::osd::QuarterTurn;
    use image::{ColorType, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

    struct UpsideDown;

    impl OrientationDetector for UpsideDown {
        fn name(&self) -> &str {
            "upside-down"
        }

        fn detect_orientation(&self, _image: &DynamicImage) -> Result<QuarterTurn, FolioError> {
            Ok(QuarterTurn::Ccw180)
        }
    }

    fn rgba_png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 120, 40, 255]));
        ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(img))
            .to_png_bytes()
            .unwrap()
    }

    fn decode(png: &[u8]) -> DynamicImage {
        ImageProcessor::from_bytes(png).unwrap().into_dynamic()
    }

    #[test]
    fn process_produces_grayscale_png_by_default() {
        let out = process_raw(&rgba_png(40, 30), &ProcessOptions::default(), None).unwrap();
        let image = decode(&out.png);
        assert_eq!(image.color(), ColorType::L8);
        assert_eq!((image.width(), image.height()), (40, 30));
        assert_eq!(out.osd_rotation, None);
    }

    #[test]
    fn grayscale_override_keeps_colour() {
        let options = ProcessOptions::default().with_grayscale(Some(false));
        let out = process_raw(&rgba_png(10, 10), &options, None).unwrap();
        assert_eq!(decode(&out.png).color(), ColorType::Rgb8);
    }

    #[test]
    fn process_downscales_large_scans() {
        let options = ProcessOptions {
            max_size_px: 20,
            ..ProcessOptions::default()
        };
        let out = process_raw(&rgba_png(80, 40), &options, None).unwrap();
        let image = decode(&out.png);
        assert_eq!((image.width(), image.height()), (20, 10));
    }

    #[test]
    fn process_records_osd_rotation() {
        let out = process_raw(&rgba_png(12, 8), &ProcessOptions::default(), Some(&UpsideDown)).unwrap();
        assert_eq!(out.osd_rotation, Some(180));

        let disabled = ProcessOptions {
            fix_orientation: false,
            ..ProcessOptions::default()
        };
        let out = process_raw(&rgba_png(12, 8), &disabled, Some(&UpsideDown)).unwrap();
        assert_eq!(out.osd_rotation, None);
    }

    #[test]
    fn undecodable_raw_is_an_image_error() {
        let result = process_raw(b"\x00\x01garbage", &ProcessOptions::default(), None);
        assert!(matches!(result, Err(FolioError::ImageError(_))));
    }

    #[test]
    fn deskew_of_straight_page_returns_same_bytes() {
        let png = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            60,
            40,
            Luma([255u8]),
        )))
        .to_png_bytes()
        .unwrap();
        let (out, angle) = deskew_png(&png, DeskewConfig::default()).unwrap();
        assert_eq!(angle, 0.0);
        assert_eq!(out, png);
    }

    #[test]
    fn rotate_twice_restores_pixels() {
        let mut img = GrayImage::from_pixel(9, 5, Luma([255u8]));
        img.put_pixel(1, 1, Luma([0u8]));
        let png = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(img.clone()))
            .to_png_bytes()
            .unwrap();
        let once = rotate_180_png(&png).unwrap();
        assert_ne!(decode(&once).to_luma8(), img);
        let twice = rotate_180_png(&once).unwrap();
        assert_eq!(decode(&twice).to_luma8(), img);
    }

    #[test]
    fn crop_shrinks_bordered_image() {
        let mut img = GrayImage::from_pixel(50, 50, Luma([0u8]));
        for y in 10..40 {
            for x in 10..40 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        let png = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(img))
            .to_png_bytes()
            .unwrap();
        let config = CropConfig { tolerance: 40, margin: 0 };
        let out = decode(&crop_borders_png(&png, &config).unwrap());
        assert_eq!((out.width(), out.height()), (30, 30));
    }
}
