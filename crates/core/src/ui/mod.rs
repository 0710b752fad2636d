//! User interface components for snapcircle.
//!
//! This module provides the full-screen overlay where the user circles a
//! region, and the result panel that presents the analysis.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: State machine types and event definitions
//! - [`selection`]: Circle gesture handling
//! - [`session`]: One capture session from gesture to result
//! - [`rendering`]: Drawing utilities for the overlay and panel placement
//! - [`overlay`]: Main application logic
//!
//! # Usage
//!
//! ```ignore
//! use snapcircle_core::{ui, Config, ScreenCapturer};
//! use snapcircle_core::capture::CaptureSource;
//!
//! let config = Config::load()?;
//! let frame = ScreenCapturer::new()?.capture_first()?;
//!
//! if let Some(result) = ui::run_capture_ui(frame, config)? {
//!     println!("{:?}", result.description);
//! }
//! ```

mod overlay;
pub mod rendering;
pub mod selection;
pub mod session;
pub mod state;

// Public API exports
pub use overlay::CaptureOverlay;
pub use selection::{InputEvent, SelectionEvent, SelectionMachine};
pub use session::ActiveSession;
pub use state::{HostSignal, SessionEvent, UiState};

use crate::analysis::AnalysisResult;
use crate::capture::DisplayCapture;
use crate::config::Config;
use crate::error::Result;

/// Launches the capture overlay over a frozen frame.
///
/// # Returns
/// - `Ok(Some(result))` - The user closed the panel after a result was shown
/// - `Ok(None)` - The user cancelled, or every attempt failed
/// - `Err(e)` - An error occurred launching or running the UI
pub fn run_capture_ui(frame: DisplayCapture, config: Config) -> Result<Option<AnalysisResult>> {
    overlay::run(frame, config)
}
