// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Border trimming — crop a cleaned spread to its content, dropping the
// scanner-lid margin around the page.

use image::{DynamicImage, GrayImage};
use folio_core::config::CropConfig;
use folio_core::error::FolioError;
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

/// Crop `image` to the region that differs from its border colour, keeping
/// `config.margin` pixels around it.
///
/// Fails when every pixel matches the border colour, since there is nothing
/// to keep.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn crop_to_content(image: DynamicImage, config: &CropConfig) -> Result<DynamicImage, FolioError> {
    let gray = image.to_luma8();
    let background = border_median(&gray);
    let bounds = content_bounds(&gray, background, config.tolerance).ok_or_else(|| {
        FolioError::ImageError("no content found to crop to".into())
    })?;

    let left = bounds.left.saturating_sub(config.margin);
    let top = bounds.top.saturating_sub(config.margin);
    let right = bounds.right.saturating_add(config.margin).min(gray.width() - 1);
    let bottom = bounds.bottom.saturating_add(config.margin).min(gray.height() - 1);
    debug!(background, ?bounds, left, top, right, bottom, "Content bounds found");

    Ok(ImageProcessor::from_dynamic(image)
        .crop(left, top, right - left + 1, bottom - top + 1)
        .into_dynamic())
}

/// Median luma of the outermost ring of pixels.
fn border_median(gray: &GrayImage) -> u8 {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return 255;
    }
    let mut ring = Vec::with_capacity(2 * (w + h) as usize);
    for x in 0..w {
        ring.push(gray.get_pixel(x, 0).0[0]);
        ring.push(gray.get_pixel(x, h - 1).0[0]);
    }
    for y in 0..h {
        ring.push(gray.get_pixel(0, y).0[0]);
        ring.push(gray.get_pixel(w - 1, y).0[0]);
    }
    ring.sort_unstable();
    ring[ring.len() / 2]
}

/// Smallest rectangle containing every pixel whose luma differs from
/// `background` by more than `tolerance`.
pub fn content_bounds(gray: &GrayImage, background: u8, tolerance: u8) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0].abs_diff(background) <= tolerance {
            continue;
        }
        bounds = Some(match bounds {
            None => Bounds {
                left: x,
                top: y,
                right: x,
                bottom: y,
            },
            Some(b) => Bounds {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x),
                bottom: b.bottom.max(y),
            },
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn framed_page() -> DynamicImage {
        // Dark scanner lid around a white page.
        let mut img = GrayImage::from_pixel(100, 80, Luma([30u8]));
        for y in 10..70 {
            for x in 15..85 {
                img.put_pixel(x, y, Luma([250u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn crops_to_page_with_margin() {
        let config = CropConfig { tolerance: 40, margin: 2 };
        let out = crop_to_content(framed_page(), &config).unwrap();
        assert_eq!((out.width(), out.height()), (74, 64));
    }

    #[test]
    fn margin_is_clamped_to_image() {
        let config = CropConfig { tolerance: 40, margin: 500 };
        let out = crop_to_content(framed_page(), &config).unwrap();
        assert_eq!((out.width(), out.height()), (100, 80));
    }

    #[test]
    fn huge_margin_keeps_whole_image() {
        let config = CropConfig { tolerance: 40, margin: u32::MAX };
        let out = crop_to_content(framed_page(), &config).unwrap();
        assert_eq!((out.width(), out.height()), (100, 80));
    }

    #[test]
    fn blank_image_has_nothing_to_crop() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 20, Luma([255u8])));
        let result = crop_to_content(blank, &CropConfig::default());
        assert!(matches!(result, Err(FolioError::ImageError(_))));
    }

    #[test]
    fn bounds_cover_single_pixel() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255u8]));
        img.put_pixel(3, 7, Luma([0u8]));
        let b = content_bounds(&img, 255, 10).unwrap();
        assert_eq!((b.left, b.top, b.width(), b.height()), (3, 7, 1, 1));
    }
}
