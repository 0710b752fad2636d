//! Screen capture functionality.
//!
//! Only the first display source is ever used for a capture; additional
//! monitors are listed for diagnostics but never composited.
//!
//! # Example
//!
//! ```ignore
//! use snapcircle_core::capture::{CaptureSource, ScreenCapturer};
//!
//! let capturer = ScreenCapturer::new()?;
//! let frame = capturer.capture_first()?;
//! println!("{}x{} logical", frame.logical_width(), frame.logical_height());
//! ```

use crate::error::{AppError, Result};
use image::DynamicImage;
use screenshots::Screen;

/// A full-resolution capture of one display together with the display's
/// logical size.
///
/// On scaled (HiDPI) displays the captured image is larger than the logical
/// size the drawing surface reports coordinates in.
#[derive(Clone)]
pub struct DisplayCapture {
    image: DynamicImage,
    logical_width: u32,
    logical_height: u32,
}

impl DisplayCapture {
    pub fn new(image: DynamicImage, logical_width: u32, logical_height: u32) -> Self {
        Self {
            image,
            logical_width,
            logical_height,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn logical_width(&self) -> u32 {
        self.logical_width
    }

    pub fn logical_height(&self) -> u32 {
        self.logical_height
    }

    /// Ratio of captured pixels to logical pixels along each axis.
    pub fn scale(&self) -> Result<(f64, f64)> {
        if self.logical_width == 0 || self.logical_height == 0 {
            return Err(AppError::transform("display reports a zero logical size"));
        }
        Ok((
            self.image.width() as f64 / self.logical_width as f64,
            self.image.height() as f64 / self.logical_height as f64,
        ))
    }

    /// Ratio of captured pixels to points on the drawing surface that
    /// covered this display.
    ///
    /// Gesture coordinates are in surface points, which do not always match
    /// the display's reported size (X11 with DPI scaling reports physical
    /// pixels). Falls back to [`DisplayCapture::scale`] while the surface
    /// size is unknown.
    pub fn scale_for_surface(&self, surface: (f64, f64)) -> Result<(f64, f64)> {
        let (width, height) = surface;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return self.scale();
        }
        Ok((
            self.image.width() as f64 / width,
            self.image.height() as f64 / height,
        ))
    }
}

/// Anything that can produce a capture of the active display.
pub trait CaptureSource {
    /// Captures the first available display.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CaptureUnavailable`] when there is no source.
    fn capture_first(&self) -> Result<DisplayCapture>;
}

/// Screen capturer backed by the `screenshots` crate.
pub struct ScreenCapturer {
    screens: Vec<Screen>,
}

impl ScreenCapturer {
    /// Detects available screens.
    ///
    /// An empty screen list is not an error here; it surfaces as
    /// [`AppError::CaptureUnavailable`] when a capture is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CaptureUnavailable`] if screen enumeration fails
    /// (e.g., no display server available).
    pub fn new() -> Result<Self> {
        let screens = Screen::all()
            .map_err(|e| AppError::unavailable(format!("Failed to enumerate screens: {}", e)))?;
        log::debug!("Detected {} screen(s)", screens.len());
        Ok(Self { screens })
    }

    /// Lists available screens with their dimensions and metadata.
    pub fn list_screen(&self) -> Vec<String> {
        self.screens
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Monitor {}: {}x{} (scale: {}){}",
                    i,
                    s.display_info.width,
                    s.display_info.height,
                    s.display_info.scale_factor,
                    if i == 0 { " [capture source]" } else { "" }
                )
            })
            .collect()
    }

    /// Returns the number of available screens.
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }
}

impl CaptureSource for ScreenCapturer {
    fn capture_first(&self) -> Result<DisplayCapture> {
        let screen = self
            .screens
            .first()
            .ok_or_else(|| AppError::unavailable("no display sources detected"))?;

        if self.screens.len() > 1 {
            log::info!(
                "{} displays detected; capturing only the first one",
                self.screens.len()
            );
        }

        let captured = screen
            .capture()
            .map_err(|e| AppError::unavailable(format!("Failed to capture screen: {}", e)))?;

        // Convert screenshots::Image to image::DynamicImage
        let width = captured.width();
        let height = captured.height();
        let rgba_data = captured.into_raw();

        let img_buffer = image::ImageBuffer::from_raw(width, height, rgba_data)
            .ok_or_else(|| AppError::unavailable("Failed to create image buffer"))?;

        log::debug!(
            "Captured {}x{} pixels for a {}x{} logical display",
            width,
            height,
            screen.display_info.width,
            screen.display_info.height
        );

        Ok(DisplayCapture::new(
            DynamicImage::ImageRgba8(img_buffer),
            screen.display_info.width,
            screen.display_info.height,
        ))
    }
}
