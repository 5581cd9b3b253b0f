// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — EXIF orientation, rotation, crop, grayscale, colour
// flattening and downscaling. Operates on in-memory images using the `image`
// and `imageproc` crates.

use image::{ColorType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use folio_core::error::FolioError;
use tracing::{debug, info, instrument};

use super::orientation::{UPRIGHT, apply_orientation, read_exif_orientation};

/// Fill used for canvas areas uncovered by a non-right-angle rotation.
const PAPER_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Image processing pipeline operating on a single in-memory image.
///
/// All operations consume `self` and return a new `ImageProcessor`, enabling
/// method chaining:
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&raw)?
///     .normalize_orientation()
///     .flatten_color()
///     .grayscale()
///     .fit_within(4096)
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
    /// EXIF orientation of the source bytes, not yet applied.
    exif_orientation: u32,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (PNG, JPEG, TIFF, BMP, ...).
    ///
    /// The EXIF orientation is read here but only applied by
    /// [`normalize_orientation`](Self::normalize_orientation).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, FolioError> {
        let img = image::load_from_memory(data).map_err(|err| {
            FolioError::ImageError(format!("failed to decode image: {}", err))
        })?;
        let exif_orientation = read_exif_orientation(data);
        debug!(
            width = img.width(),
            height = img.height(),
            exif_orientation,
            "Image decoded from bytes"
        );
        Ok(Self {
            image: img,
            exif_orientation,
        })
    }

    /// Wrap an already-decoded `DynamicImage` (no EXIF information).
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image,
            exif_orientation: UPRIGHT,
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Apply the EXIF orientation so pixel data matches the intended viewing
    /// orientation. No-op when the source carried no orientation tag.
    #[instrument(skip(self), fields(exif_orientation = self.exif_orientation))]
    pub fn normalize_orientation(self) -> Self {
        if self.exif_orientation != UPRIGHT {
            info!(orientation = self.exif_orientation, "Applying EXIF orientation");
        }
        Self {
            image: apply_orientation(self.image, self.exif_orientation),
            exif_orientation: UPRIGHT,
        }
    }

    /// Rotate the image by an arbitrary angle in degrees (clockwise).
    ///
    /// Multiples of 90 are lossless. Other angles use bilinear interpolation,
    /// expand the canvas to contain the whole rotated page and fill the
    /// uncovered corners with white.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate(self, degrees: f32) -> Self {
        let normalised = degrees.rem_euclid(360.0);
        if (normalised - 90.0).abs() < 0.01 {
            let rotated = self.image.rotate90();
            return self.with_image(rotated);
        }
        if (normalised - 180.0).abs() < 0.01 {
            let rotated = self.image.rotate180();
            return self.with_image(rotated);
        }
        if (normalised - 270.0).abs() < 0.01 {
            let rotated = self.image.rotate270();
            return self.with_image(rotated);
        }
        if normalised.abs() < 0.01 || (normalised - 360.0).abs() < 0.01 {
            return self;
        }

        info!(degrees, "Rotating image");
        let was_gray = matches!(self.image.color(), ColorType::L8 | ColorType::L16);
        let rotated = match rotate_expanded(&self.image.to_rgba8(), degrees) {
            Some(rotated) => DynamicImage::ImageRgba8(rotated),
            None => return self,
        };
        let image = if was_gray {
            DynamicImage::ImageLuma8(rotated.to_luma8())
        } else {
            DynamicImage::ImageRgb8(rotated.to_rgb8())
        };
        debug!(width = image.width(), height = image.height(), "General rotation applied");
        self.with_image(image)
    }

    /// Turn the image upside down. Exact and self-inverse.
    #[instrument(skip(self))]
    pub fn rotate_180(self) -> Self {
        info!("Rotating image 180°");
        let rotated = self.image.rotate180();
        self.with_image(rotated)
    }

    /// Crop a rectangular region from the image.
    ///
    /// `x` and `y` are the top-left corner; `width` and `height` define the
    /// size of the crop rectangle. Values are clamped to image bounds.
    #[instrument(skip(self), fields(x, y, width, height))]
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let safe_x = x.min(img_w.saturating_sub(1));
        let safe_y = y.min(img_h.saturating_sub(1));
        let safe_w = width.min(img_w - safe_x);
        let safe_h = height.min(img_h - safe_y);

        info!(safe_x, safe_y, safe_w, safe_h, "Cropping image");

        let cropped = self.image.crop_imm(safe_x, safe_y, safe_w, safe_h);
        self.with_image(cropped)
    }

    /// Convert the image to grayscale (luma).
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        info!("Converting to grayscale");
        let gray = DynamicImage::ImageLuma8(self.image.to_luma8());
        self.with_image(gray)
    }

    /// Normalize the pixel format: 8-bit gray and RGB are kept, 16-bit gray
    /// becomes 8-bit gray, everything else (alpha, 16-bit colour, float)
    /// becomes 8-bit RGB.
    pub fn flatten_color(self) -> Self {
        let image = match self.image.color() {
            ColorType::L8 | ColorType::Rgb8 => return self,
            ColorType::L16 => DynamicImage::ImageLuma8(self.image.to_luma8()),
            other => {
                debug!(color = ?other, "Flattening to RGB8");
                DynamicImage::ImageRgb8(self.image.to_rgb8())
            }
        };
        self.with_image(image)
    }

    /// Downscale so neither side exceeds `max_side`, preserving aspect ratio
    /// (Lanczos3). Never upscales; `max_side == 0` disables the limit.
    #[instrument(skip(self), fields(max_side))]
    pub fn fit_within(self, max_side: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if max_side == 0 || (w <= max_side && h <= max_side) {
            return self;
        }
        info!(from_w = w, from_h = h, max_side, "Downscaling image");
        let resized = self
            .image
            .resize(max_side, max_side, image::imageops::FilterType::Lanczos3);
        debug!(new_w = resized.width(), new_h = resized.height(), "Resize complete");
        self.with_image(resized)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, FolioError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), FolioError> {
        self.image.save(path.as_ref()).map_err(|err| {
            FolioError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }

    fn with_image(self, image: DynamicImage) -> Self {
        Self {
            image,
            exif_orientation: self.exif_orientation,
        }
    }
}

/// Rotate clockwise by `degrees` about the centre onto a canvas large enough
/// to hold every source pixel, filling uncovered areas with white.
///
/// Returns `None` only for a degenerate transform.
pub(crate) fn rotate_expanded(image: &RgbaImage, degrees: f32) -> Option<RgbaImage> {
    let (w, h) = image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();

    let out_w = (w as f32 * cos.abs() + h as f32 * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w as f32 * sin.abs() + h as f32 * cos.abs()).ceil().max(1.0) as u32;

    // Map the source centre onto the output centre. With y pointing down,
    // this matrix turns the content clockwise for positive angles.
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (ncx, ncy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);
    let tx = ncx - (cos * cx - sin * cy);
    let ty = ncy - (sin * cx + cos * cy);
    let projection = Projection::from_matrix([cos, -sin, tx, sin, cos, ty, 0.0, 0.0, 1.0])?;

    let mut output = RgbaImage::from_pixel(out_w, out_h, PAPER_WHITE);
    warp_into(image, &projection, Interpolation::Bilinear, PAPER_WHITE, &mut output);
    Some(output)
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(
    image: &DynamicImage,
    format: ImageFormat,
) -> Result<Vec<u8>, FolioError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        FolioError::ImageError(format!("image encoding failed: {}", err))
    })?;
    Ok(buffer)
}
