//! One capture session, from the first gesture to the closed result.
//!
//! The session owns the selection machine and the overlay state; the host
//! keeps exactly one of these alive per open surface.

use super::selection::{InputEvent, SelectionEvent, SelectionMachine};
use super::state::{HostSignal, SessionEvent, UiState};
use crate::presentation::{self, Fragment, ViewMode};

pub struct ActiveSession {
    selection: SelectionMachine,
    state: UiState,
}

impl ActiveSession {
    pub fn new(min_radius: f64) -> Self {
        Self {
            selection: SelectionMachine::new(min_radius),
            state: UiState::Selecting,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn selection(&self) -> &SelectionMachine {
        &self.selection
    }

    pub fn is_closed(&self) -> bool {
        self.state == UiState::Closed
    }

    /// Feeds surface input to the selection machine.
    ///
    /// Gestures are only accepted while selecting; a cancel closes the
    /// session from any state.
    pub fn handle_input(&mut self, input: InputEvent) -> SelectionEvent {
        let selecting = self.state == UiState::Selecting;
        if !selecting && !matches!(input, InputEvent::Cancel | InputEvent::Resize { .. }) {
            return SelectionEvent::None;
        }

        let event = self.selection.handle(input);
        match event {
            SelectionEvent::Completed(rect) => {
                self.handle_signal(HostSignal::SelectionFinalized(rect))
            }
            SelectionEvent::Cancelled => self.handle_signal(HostSignal::CancelSelection),
            _ => {}
        }
        event
    }

    pub fn handle_signal(&mut self, signal: HostSignal) {
        match signal {
            HostSignal::StartSelection => {
                self.selection.reset();
                self.state = UiState::Selecting;
            }
            HostSignal::CancelSelection => {
                self.selection.reset();
                self.state = UiState::Closed;
            }
            HostSignal::SelectionFinalized(region) => {
                if self.state == UiState::Selecting {
                    self.state = UiState::Analyzing { region };
                }
            }
        }
    }

    /// Applies the outcome of the background work. Ignored unless a request
    /// is in flight.
    pub fn apply(&mut self, event: SessionEvent) {
        let UiState::Analyzing { region } = self.state else {
            log::debug!("Dropping session event outside of analysis: {:?}", event);
            return;
        };
        self.state = match event {
            SessionEvent::CaptureReady { result, mode } => UiState::Showing {
                region,
                result,
                mode,
            },
            SessionEvent::CaptureFailed { kind, message } => {
                log::error!("{}: {}", kind.title(), message);
                UiState::Failed {
                    region,
                    kind,
                    message,
                }
            }
        };
    }

    /// Switches the view mode of the displayed result.
    pub fn set_mode(&mut self, new_mode: ViewMode) {
        if let UiState::Showing { mode, .. } = &mut self.state {
            *mode = new_mode;
        }
    }

    /// The displayed result rendered under the current mode.
    pub fn fragment(&self) -> Option<Fragment> {
        match &self.state {
            UiState::Showing { result, mode, .. } => Some(presentation::render(result, *mode)),
            _ => None,
        }
    }

    pub fn close(&mut self) {
        self.state = UiState::Closed;
    }
}
