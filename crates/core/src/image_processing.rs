//! Capture transform: from a logical capture rectangle to an encoded image.
//!
//! # Coordinate Mapping
//!
//! The drawing surface reports logical pixel positions (e.g., 1920x1080)
//! while the captured image may be at a different resolution (e.g.,
//! 3840x2160). The rectangle is scaled into captured-pixel space, using the
//! size of the drawing surface the gesture was made on, for the crop, and the
//! crop is then resized back to the requested logical size so
//! consumers always receive the size the user drew.

use crate::capture::DisplayCapture;
use crate::error::{AppError, Result};
use crate::geometry::CaptureRect;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Encoded capture of one region, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureImage {
    /// Base64 PNG without a data-URI prefix.
    data: String,
    rect: CaptureRect,
}

impl CaptureImage {
    pub fn new(data: String, rect: CaptureRect) -> Self {
        Self { data, rect }
    }

    pub fn base64(&self) -> &str {
        &self.data
    }

    pub fn rect(&self) -> CaptureRect {
        self.rect
    }

    /// Decodes the PNG bytes back out of the base64 payload.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| AppError::transform(format!("Invalid base64 payload: {}", e)))
    }
}

pub struct CaptureTransform;

impl CaptureTransform {
    /// Crops `rect` out of `frame`, resizes it to the requested size and
    /// encodes it.
    ///
    /// `surface` is the size of the drawing surface in the points `rect` is
    /// expressed in; `(0.0, 0.0)` when unknown.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`AppError::CaptureTransform`].
    pub fn capture_image(
        frame: &DisplayCapture,
        rect: CaptureRect,
        surface: (f64, f64),
    ) -> Result<CaptureImage> {
        let region = Self::transform(frame, rect, surface)?;
        let data = Self::encode_to_base64_png(&region)?;
        Ok(CaptureImage::new(data, rect))
    }

    /// Steps 1-4: scale, crop, resize. Returns an image of exactly
    /// `rect.width` x `rect.height` pixels.
    pub fn transform(
        frame: &DisplayCapture,
        rect: CaptureRect,
        surface: (f64, f64),
    ) -> Result<DynamicImage> {
        if rect.is_empty() {
            return Err(AppError::transform("capture rectangle has zero area"));
        }

        let cropped = Self::crop_scaled(frame, rect, surface)?;
        if cropped.width() == rect.width && cropped.height() == rect.height {
            return Ok(cropped);
        }
        Ok(cropped.resize_exact(rect.width, rect.height, FilterType::Triangle))
    }

    /// Maps `rect` into captured-pixel space and crops it, clamped to the
    /// captured image bounds.
    fn crop_scaled(
        frame: &DisplayCapture,
        rect: CaptureRect,
        surface: (f64, f64),
    ) -> Result<DynamicImage> {
        let (scale_x, scale_y) = frame.scale_for_surface(surface)?;
        let image = frame.image();

        let x = scaled(rect.x, scale_x);
        let y = scaled(rect.y, scale_y);
        let mut width = scaled(rect.width, scale_x);
        let mut height = scaled(rect.height, scale_y);

        // A circle drawn near the right or bottom edge overhangs the screen
        if x.saturating_add(width) > image.width() {
            width = image.width().saturating_sub(x);
        }
        if y.saturating_add(height) > image.height() {
            height = image.height().saturating_sub(y);
        }

        if width == 0 || height == 0 {
            return Err(AppError::transform(format!(
                "region {}x{} at ({}, {}) lies outside the {}x{} capture",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                image.width(),
                image.height()
            )));
        }

        log::debug!(
            "Cropping {}x{} at ({}, {}) with scale {:.2}x{:.2}",
            width,
            height,
            x,
            y,
            scale_x,
            scale_y
        );
        Ok(image.crop_imm(x, y, width, height))
    }

    /// Encodes a DynamicImage to a Base64 PNG string.
    pub fn encode_to_base64_png(image: &DynamicImage) -> Result<String> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| AppError::transform(format!("Failed to encode image: {}", e)))?;

        Ok(BASE64.encode(buffer))
    }
}

fn scaled(value: u32, scale: f64) -> u32 {
    (value as f64 * scale).round().max(0.0) as u32
}
