// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// EXIF orientation — read tag 0x0112 from encoded bytes and apply the
// matching rotation/flip so pixel data matches the intended viewing
// orientation.

use std::io::Cursor;

use image::DynamicImage;
use tracing::debug;

/// EXIF orientation meaning "already upright".
pub const UPRIGHT: u32 = 1;

/// Read the EXIF orientation tag from encoded image bytes.
///
/// Returns [`UPRIGHT`] when the container carries no EXIF block, the tag is
/// missing, or the block cannot be parsed.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(reader) => reader,
        Err(err) => {
            debug!(error = %err, "no readable EXIF block");
            return UPRIGHT;
        }
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .filter(|value| (1..=8).contains(value))
        .unwrap_or(UPRIGHT)
}

/// Apply an EXIF orientation value (1-8) to a decoded image.
///
/// 1 = normal, 2 = mirrored, 3 = 180°, 4 = flipped vertically,
/// 5 = mirrored + 90° CW, 6 = 90° CW, 7 = mirrored + 270° CW, 8 = 270° CW.
/// Unknown values leave the image untouched.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn marked() -> DynamicImage {
        // 3x2 image with a single dark pixel in the top-left corner.
        let mut img = GrayImage::from_pixel(3, 2, Luma([255u8]));
        img.put_pixel(0, 0, Luma([0u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn bytes_without_exif_are_upright() {
        assert_eq!(read_exif_orientation(b"not an image"), UPRIGHT);
        assert_eq!(read_exif_orientation(&[]), UPRIGHT);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let out = apply_orientation(marked(), 6);
        assert_eq!((out.width(), out.height()), (2, 3));
        // 90° clockwise moves the top-left corner to the top-right.
        assert_eq!(out.to_luma8().get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn half_turn_moves_corner() {
        let out = apply_orientation(marked(), 3);
        assert_eq!((out.width(), out.height()), (3, 2));
        assert_eq!(out.to_luma8().get_pixel(2, 1).0[0], 0);
    }

    #[test]
    fn upright_and_unknown_are_noops() {
        for value in [UPRIGHT, 0, 9] {
            let out = apply_orientation(marked(), value);
            assert_eq!(out.to_luma8(), marked().to_luma8());
        }
    }
}
