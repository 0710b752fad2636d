//! SnapCircle Core Library
//!
//! This library provides the core functionality for the SnapCircle capture
//! tool: circle a region of the screen, send it to an analysis service, and
//! present the result in one of four views.
//!
//! # Overview
//!
//! The library handles:
//!
//! - **Selection**: Circle gestures and the overlay via [`ui`] and [`geometry`]
//! - **Screen Capture**: Frozen display frames via [`capture`]
//! - **Image Processing**: Cropping and base64 PNG encoding via [`image_processing`]
//! - **Analysis**: The relay client and request orchestration via [`relay`] and [`orchestrator`]
//! - **Presentation**: The four result views via [`presentation`]
//! - **History**: Persisted captures via [`history`] and [`archive`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`SnapCircle`] facade:
//!
//! ```ignore
//! use snapcircle_core::SnapCircle;
//!
//! let app = SnapCircle::new()?;
//! if let Some(result) = app.run_interactive()? {
//!     println!("{:?}", result.description);
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`analysis`]: Analysis request and result types
//! - [`archive`]: Captured image persistence
//! - [`capture`]: Screen capture functionality
//! - [`config`]: Configuration loading and management
//! - [`error`]: Error types and result aliases
//! - [`geometry`]: Circle and capture rectangle math
//! - [`history`]: Capture history store
//! - [`image_processing`]: Capture transform and encoding
//! - [`orchestrator`]: Submits captures and records history
//! - [`pipeline`]: Background capture-and-analysis work
//! - [`presentation`]: Result rendering per view mode
//! - [`relay`]: HTTP client for the analysis relay
//! - [`ui`]: User interface components

pub mod analysis;
pub mod archive;
pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod image_processing;
pub mod orchestrator;
pub mod pipeline;
pub mod presentation;
pub mod relay;
pub mod ui;

// Re-export primary types for convenience
pub use analysis::AnalysisResult;
pub use capture::{CaptureSource, DisplayCapture, ScreenCapturer};
pub use config::Config;
pub use error::{AppError, ErrorKind, Result};
pub use geometry::{CaptureRect, Circle, Point};
pub use history::{HistoryRecord, HistoryStore, SqliteHistoryStore};
pub use presentation::ViewMode;
pub use relay::RelayClient;

/// Main entry point for the SnapCircle application.
///
/// This struct provides a facade over the various subsystems,
/// handling initialization and orchestration. Screens are only enumerated
/// by the methods that need them, so history and relay checks work on a
/// machine without a display.
pub struct SnapCircle {
    config: Config,
}

impl SnapCircle {
    /// Creates a new instance with configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new() -> Result<Self> {
        Ok(Self::with_config(Config::load()?))
    }

    /// Creates an instance with custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    fn capturer(&self) -> Result<ScreenCapturer> {
        ScreenCapturer::new()
    }

    /// Lists available monitors with their dimensions.
    pub fn list_monitors(&self) -> Result<Vec<String>> {
        Ok(self.capturer()?.list_screen())
    }

    /// Returns the number of available monitors.
    pub fn monitor_count(&self) -> Result<usize> {
        Ok(self.capturer()?.screen_count())
    }

    /// Captures the first display without UI.
    pub fn capture(&self) -> Result<DisplayCapture> {
        self.capturer()?.capture_first()
    }

    /// Freezes the first display and launches the capture overlay.
    ///
    /// Blocks until the overlay closes and any request in flight finishes.
    ///
    /// # Returns
    /// The last result shown, or `None` if the user cancelled.
    pub fn run_interactive(&self) -> Result<Option<AnalysisResult>> {
        let frame = self.capture()?;
        ui::run_capture_ui(frame, self.config.clone())
    }

    /// The most recent `limit` history records, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        SqliteHistoryStore::open(self.config.history_path())?.recent(limit)
    }

    /// Checks that the relay answers its health endpoint.
    pub async fn check_relay(&self) -> Result<()> {
        RelayClient::new(&self.config)?.health().await
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
