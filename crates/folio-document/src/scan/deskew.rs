// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fine deskew — estimate the small residual rotation left by imperfect page
// placement and rotate it away.
//
// The estimate uses a projection profile: ink pixels (darker than the Otsu
// threshold) are projected onto the vertical axis for every candidate angle,
// and the angle whose profile is most sharply peaked wins. Text lines that
// run horizontally pile their ink into few rows, which maximises the sum of
// squared row counts.

use image::{DynamicImage, GrayImage};
use folio_core::config::DeskewConfig;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// Fine skew estimator and corrector.
#[derive(Debug, Clone, Copy)]
pub struct Deskewer {
    config: DeskewConfig,
}

impl Default for Deskewer {
    fn default() -> Self {
        Self::new(DeskewConfig::default())
    }
}

impl Deskewer {
    pub fn new(config: DeskewConfig) -> Self {
        Self { config }
    }

    /// Estimate the clockwise rotation, in degrees, that straightens the
    /// text lines of `image`. Returns 0 for images without ink.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn estimate_angle(&self, image: &DynamicImage) -> f32 {
        let gray = analysis_copy(image, self.config.max_size_analyze);
        let threshold = otsu_threshold(&gray);
        let ink = ink_offsets(&gray, threshold);
        if ink.is_empty() {
            debug!("No ink found; assuming straight");
            return 0.0;
        }

        let (w, h) = gray.dimensions();
        let half = ((w as f32).hypot(h as f32) / 2.0).ceil() as usize + 2;
        let mut bins = vec![0u32; 2 * half + 1];

        let steps = (self.config.angle_range / self.config.angle_step).round() as i32;
        let mut best_angle = 0.0f32;
        let mut best_score = profile_score(&ink, 0.0, half, &mut bins);
        for i in -steps..=steps {
            if i == 0 {
                continue;
            }
            let angle = i as f32 * self.config.angle_step;
            let score = profile_score(&ink, angle, half, &mut bins);
            if score > best_score {
                best_score = score;
                best_angle = angle;
            }
        }

        debug!(
            ink_pixels = ink.len(),
            threshold,
            best_angle,
            "Skew estimated"
        );
        best_angle
    }

    /// Straighten `image`, returning the corrected image and the clockwise
    /// angle applied. Angles below `min_angle` leave the image untouched, so
    /// running this on an already straight page is a no-op.
    #[instrument(skip_all)]
    pub fn deskew(&self, image: DynamicImage) -> (DynamicImage, f32) {
        let angle = self.estimate_angle(&image);
        if angle.abs() < self.config.min_angle {
            debug!(angle, min_angle = self.config.min_angle, "Skew below threshold");
            return (image, angle);
        }
        info!(angle, "Correcting skew");
        let rotated = ImageProcessor::from_dynamic(image).rotate(angle).into_dynamic();
        (rotated, angle)
    }
}

/// Grayscale copy, downscaled so the longest side is at most `max_side`.
fn analysis_copy(image: &DynamicImage, max_side: u32) -> GrayImage {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if max_side == 0 || longest <= max_side {
        return gray;
    }
    let ratio = max_side as f32 / longest as f32;
    let nw = ((w as f32 * ratio) as u32).max(1);
    let nh = ((h as f32 * ratio) as u32).max(1);
    image::imageops::resize(&gray, nw, nh, image::imageops::FilterType::Triangle)
}

/// Coordinates of ink pixels relative to the image centre.
fn ink_offsets(gray: &GrayImage, threshold: u8) -> Vec<(f32, f32)> {
    let (cx, cy) = (gray.width() as f32 / 2.0, gray.height() as f32 / 2.0);
    gray.enumerate_pixels()
        .filter(|(_, _, pixel)| pixel.0[0] < threshold)
        .map(|(x, y, _)| (x as f32 - cx, y as f32 - cy))
        .collect()
}

/// Sum of squared row counts after rotating the ink clockwise by `degrees`.
fn profile_score(ink: &[(f32, f32)], degrees: f32, half: usize, bins: &mut [u32]) -> f64 {
    bins.fill(0);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let last = bins.len() - 1;
    for &(x, y) in ink {
        let row = x * sin + y * cos + half as f32;
        let bin = (row.round().max(0.0) as usize).min(last);
        bins[bin] += 1;
    }
    bins.iter().map(|&count| (count as f64) * (count as f64)).sum()
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of
/// the dark and light pixel groups. A uniform image yields 0, so no pixel
/// counts as ink.
pub(crate) fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 0;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            // Pixels strictly below the threshold are dark, so the class
            // boundary sits one level above `t`.
            best_threshold = (t + 1).min(255) as u8;
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// White page with five dark horizontal text-like bars.
    fn lined_page() -> DynamicImage {
        let mut img = GrayImage::from_pixel(240, 160, Luma([255u8]));
        for k in 0..5 {
            let top = 20 + k * 24;
            for y in top..top + 3 {
                for x in 20..220 {
                    img.put_pixel(x, y, Luma([0u8]));
                }
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn straight_page_is_left_alone() {
        let page = lined_page();
        let (out, angle) = Deskewer::default().deskew(page.clone());
        assert!(angle.abs() < 0.2, "expected ~0, got {angle}");
        assert_eq!(out.to_luma8(), page.to_luma8());
    }

    #[test]
    fn skewed_page_is_recovered() {
        let skewed = ImageProcessor::from_dynamic(lined_page()).rotate(3.0).into_dynamic();
        let deskewer = Deskewer::default();

        let angle = deskewer.estimate_angle(&skewed);
        assert!((angle + 3.0).abs() <= 0.5, "expected ~-3, got {angle}");

        let (straightened, applied) = deskewer.deskew(skewed);
        assert_eq!(applied, angle);
        let second = deskewer.estimate_angle(&straightened);
        assert!(second.abs() <= 0.5, "second pass should be ~0, got {second}");
    }

    #[test]
    fn blank_page_has_no_skew() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([200u8])));
        assert_eq!(Deskewer::default().estimate_angle(&blank), 0.0);
    }

    #[test]
    fn otsu_separates_two_levels() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([220u8]));
        for x in 0..10 {
            img.put_pixel(x, 0, Luma([20u8]));
        }
        let t = otsu_threshold(&img);
        assert!(t > 20 && t <= 220, "threshold {t} should split 20 from 220");
    }

    #[test]
    fn otsu_of_uniform_image_marks_nothing() {
        let img = GrayImage::from_pixel(4, 4, Luma([128u8]));
        let t = otsu_threshold(&img);
        assert!(img.pixels().all(|p| p.0[0] >= t));
    }
}
