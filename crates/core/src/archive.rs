//! Local copies of captured regions.

use crate::error::Result;
use crate::image_processing::CaptureImage;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;

/// Writes each capture once as `capture_<millis>.png`.
#[derive(Debug, Clone)]
pub struct ImageArchive {
    dir: PathBuf,
}

impl ImageArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persists the PNG and returns where it went.
    pub fn persist(&self, image: &CaptureImage) -> Result<PathBuf> {
        let bytes = image.png_bytes()?;
        fs::create_dir_all(&self.dir)?;

        let stamp = Utc::now().timestamp_millis();
        let mut path = self.dir.join(format!("capture_{stamp}.png"));
        let mut suffix = 1;
        while path.exists() {
            path = self.dir.join(format!("capture_{stamp}_{suffix}.png"));
            suffix += 1;
        }

        fs::write(&path, bytes)?;
        Ok(path)
    }
}
