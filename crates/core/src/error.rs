//! Error types for the snapcircle-core library.
//!
//! Every failure the capture pipeline can hit has its own variant, so callers
//! can tell "the service is not running" apart from "the service errored" or
//! "the request took too long".

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur within the snapcircle-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The drawn circle is not larger than the minimum radius.
    ///
    /// Absorbed by the selection machine; never shown to the user.
    #[error("Gesture too small: radius {radius:.1} must exceed {threshold:.1}")]
    GestureTooSmall { radius: f64, threshold: f64 },

    /// No display source could be captured.
    #[error("No screen capture source available: {0}")]
    CaptureUnavailable(String),

    /// Cropping, resizing or encoding the captured region failed.
    #[error("Capture transform failed: {0}")]
    CaptureTransform(String),

    /// The analysis relay could not be reached.
    #[error("Analysis service unavailable: {hint}")]
    ServiceUnavailable {
        /// What the user can do about it.
        hint: String,
    },

    /// The analysis relay did not answer within the bounded wait.
    #[error("Analysis timed out after {}s", .0.as_secs())]
    AnalysisTimeout(Duration),

    /// The analysis relay answered with an error or garbage.
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// Appending to the history store failed. Logged, never surfaced.
    #[error("History write failed: {0}")]
    HistoryWrite(String),

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client setup or request construction failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The history database could not be opened or queried.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Stable, payload-free classification of an [`AppError`].
///
/// Carried by the "capture failed" session event so the UI can pick wording
/// without matching on error internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    GestureTooSmall,
    CaptureUnavailable,
    CaptureTransform,
    ServiceUnavailable,
    AnalysisTimeout,
    AnalysisFailed,
    HistoryWrite,
    Ui,
    Io,
    Json,
    Http,
    Database,
}

impl ErrorKind {
    /// Short title suitable for an error banner.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::Config => "Configuration problem",
            ErrorKind::GestureTooSmall => "Selection too small",
            ErrorKind::CaptureUnavailable => "Screen capture unavailable",
            ErrorKind::CaptureTransform => "Could not capture region",
            ErrorKind::ServiceUnavailable => "Analysis service not running",
            ErrorKind::AnalysisTimeout => "Analysis timed out",
            ErrorKind::AnalysisFailed => "Analysis failed",
            ErrorKind::HistoryWrite => "History not saved",
            ErrorKind::Ui => "Display problem",
            ErrorKind::Io => "File system problem",
            ErrorKind::Json => "Malformed data",
            ErrorKind::Http => "Network problem",
            ErrorKind::Database => "History unavailable",
        }
    }
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a capture-unavailable error with the given reason.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable(msg.into())
    }

    /// Creates a capture transform error with the given cause.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::CaptureTransform(msg.into())
    }

    /// Creates an analysis failure with the given message.
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::GestureTooSmall { .. } => ErrorKind::GestureTooSmall,
            AppError::CaptureUnavailable(_) => ErrorKind::CaptureUnavailable,
            AppError::CaptureTransform(_) => ErrorKind::CaptureTransform,
            AppError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            AppError::AnalysisTimeout(_) => ErrorKind::AnalysisTimeout,
            AppError::AnalysisFailed(_) => ErrorKind::AnalysisFailed,
            AppError::HistoryWrite(_) => ErrorKind::HistoryWrite,
            AppError::Ui(_) => ErrorKind::Ui,
            AppError::Io(_) => ErrorKind::Io,
            AppError::Json(_) => ErrorKind::Json,
            AppError::Http(_) => ErrorKind::Http,
            AppError::Database(_) => ErrorKind::Database,
        }
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_seconds() {
        let err = AppError::AnalysisTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Analysis timed out after 30s");
        assert_eq!(err.kind(), ErrorKind::AnalysisTimeout);
    }

    #[test]
    fn service_unavailable_carries_hint() {
        let err = AppError::ServiceUnavailable {
            hint: "start the relay".to_string(),
        };
        assert!(err.to_string().contains("start the relay"));
        assert_eq!(err.kind().title(), "Analysis service not running");
    }

    #[test]
    fn http_and_database_errors_convert_with_their_own_kind() {
        let request = reqwest::Client::new().get("not a url").build().unwrap_err();
        let err: AppError = request.into();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert!(err.to_string().starts_with("HTTP error:"));

        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), ErrorKind::Database);
    }
}
