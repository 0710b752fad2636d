//! UI state types and event definitions.

use crate::analysis::AnalysisResult;
use crate::error::{AppError, ErrorKind};
use crate::geometry::CaptureRect;
use crate::presentation::ViewMode;

/// Lifecycle requests coming from the host application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostSignal {
    /// Show a fresh surface ready for a gesture.
    StartSelection,
    /// Abandon the gesture and tear the surface down.
    CancelSelection,
    /// A region was chosen and handed to the capture transform.
    SelectionFinalized(CaptureRect),
}

/// Outcome of the background capture-and-analysis work.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The result is ready for display under `mode`.
    CaptureReady {
        result: AnalysisResult,
        mode: ViewMode,
    },
    /// Capture or analysis failed.
    CaptureFailed { kind: ErrorKind, message: String },
}

impl SessionEvent {
    pub fn ready(result: AnalysisResult) -> Self {
        Self::CaptureReady {
            result,
            mode: ViewMode::default(),
        }
    }

    pub fn failed(error: &AppError) -> Self {
        Self::CaptureFailed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Current state of the overlay.
///
/// `Selecting` -> `Analyzing` -> `Showing` | `Failed`, and `Closed` from
/// anywhere once the surface is torn down.
#[derive(Clone, Debug, PartialEq)]
pub enum UiState {
    /// Waiting for the user to draw a circle.
    Selecting,
    /// The region is being captured and analyzed.
    Analyzing { region: CaptureRect },
    /// A result is on screen.
    Showing {
        region: CaptureRect,
        result: AnalysisResult,
        mode: ViewMode,
    },
    /// Capture or analysis failed.
    Failed {
        region: CaptureRect,
        kind: ErrorKind,
        message: String,
    },
    /// The surface has been torn down.
    Closed,
}

impl UiState {
    pub fn region(&self) -> Option<CaptureRect> {
        match self {
            UiState::Analyzing { region }
            | UiState::Showing { region, .. }
            | UiState::Failed { region, .. } => Some(*region),
            UiState::Selecting | UiState::Closed => None,
        }
    }
}
