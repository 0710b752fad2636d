//! Capture transform + analysis, run off the UI thread.

use crate::capture::DisplayCapture;
use crate::config::Config;
use crate::error::AppError;
use crate::geometry::CaptureRect;
use crate::history::HistoryStore;
use crate::image_processing::CaptureTransform;
use crate::orchestrator::{DefaultOrchestrator, Orchestrator};
use crate::relay::AnalysisBackend;
use crate::ui::SessionEvent;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Crops `rect` out of `frame` and submits it. `surface` is the size of the
/// drawing surface the gesture was made on.
///
/// Never fails: every error becomes a [`SessionEvent::CaptureFailed`].
pub async fn analyze_selection<B, S>(
    frame: &DisplayCapture,
    rect: CaptureRect,
    surface: (f64, f64),
    orchestrator: &Orchestrator<B, S>,
) -> SessionEvent
where
    B: AnalysisBackend,
    S: HistoryStore + 'static,
{
    let image = match CaptureTransform::capture_image(frame, rect, surface) {
        Ok(image) => image,
        Err(e) => return SessionEvent::failed(&e),
    };

    match orchestrator.submit(image).await {
        Ok(result) => SessionEvent::ready(result),
        Err(e) => SessionEvent::failed(&e),
    }
}

/// Runs [`analyze_selection`] on a background thread with its own runtime
/// and sends the outcome to `tx`. `notify` is called after sending so the
/// UI can wake up.
///
/// The thread keeps going when the receiver is gone: a submitted request
/// runs to completion or timeout and its history record is written before
/// the thread exits. Join the handle to wait for that.
pub fn spawn_analysis<F>(
    frame: Arc<DisplayCapture>,
    rect: CaptureRect,
    surface: (f64, f64),
    config: Config,
    tx: Sender<SessionEvent>,
    notify: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    thread::spawn(move || {
        let deliver = |event: SessionEvent| {
            // The receiver is gone when the surface was closed mid-flight
            if tx.send(event).is_err() {
                log::debug!("Analysis finished after the overlay closed");
            }
            notify();
        };

        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => return deliver(SessionEvent::failed(&AppError::Io(e))),
        };
        let orchestrator = match DefaultOrchestrator::from_config(&config) {
            Ok(orchestrator) => orchestrator,
            Err(e) => return deliver(SessionEvent::failed(&e)),
        };

        rt.block_on(async {
            deliver(analyze_selection(&frame, rect, surface, &orchestrator).await);
            orchestrator.flush().await;
        });
    })
}
