//! Circle selection state machine.
//!
//! Pointer and touch input drive the same machine:
//!
//! ```text
//! Idle --down--> Drawing --up (radius > min)--> Finalized
//!                   |----up (radius <= min)--> Idle
//! any --cancel--> Idle
//! ```
//!
//! Positions are always taken from the event itself; the surface size is
//! tracked for display only and never feeds into gesture coordinates.

use crate::geometry::{CaptureRect, Circle, Point};

/// Input delivered by the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    TouchStart { id: u64, pos: Point },
    TouchMove { id: u64, pos: Point },
    /// `pos` is `None` when the platform reports no final position.
    TouchEnd { id: u64, pos: Option<Point> },
    /// The platform aborted the touch sequence.
    TouchCancel { id: u64 },
    /// Escape or an equivalent explicit cancel.
    Cancel,
    Resize { width: f64, height: f64 },
}

/// What a single input did to the selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// A gesture began; instructions should be hidden.
    Started,
    /// The circle changed and should be redrawn.
    Drawing(Circle),
    /// The gesture produced a capture region.
    Completed(CaptureRect),
    /// The gesture was too small and was thrown away.
    Discarded,
    /// The user cancelled; the surface should be torn down.
    Cancelled,
    /// Nothing happened.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SelectionState {
    Idle,
    Drawing,
    Finalized(CaptureRect),
}

#[derive(Debug, Clone, Copy, Default)]
struct PointerGesture {
    start: Point,
    current: Point,
    active: bool,
}

pub struct SelectionMachine {
    state: SelectionState,
    gesture: PointerGesture,
    circle: Option<Circle>,
    /// Touch being tracked; additional fingers are ignored.
    touch_id: Option<u64>,
    surface: (f64, f64),
    min_radius: f64,
}

impl SelectionMachine {
    pub fn new(min_radius: f64) -> Self {
        Self {
            state: SelectionState::Idle,
            gesture: PointerGesture::default(),
            circle: None,
            touch_id: None,
            surface: (0.0, 0.0),
            min_radius,
        }
    }

    pub fn handle(&mut self, input: InputEvent) -> SelectionEvent {
        match input {
            InputEvent::Cancel => self.cancel(),
            InputEvent::Resize { width, height } => {
                self.surface = (width, height);
                SelectionEvent::None
            }
            _ if matches!(self.state, SelectionState::Finalized(_)) => SelectionEvent::None,

            InputEvent::PointerDown(pos) => self.begin(pos),
            InputEvent::PointerMove(pos) => self.update(pos),
            InputEvent::PointerUp(pos) => self.finish(Some(pos)),

            InputEvent::TouchStart { id, pos } => {
                if self.gesture.active {
                    return SelectionEvent::None;
                }
                self.touch_id = Some(id);
                self.begin(pos)
            }
            InputEvent::TouchMove { id, pos } if self.touch_id == Some(id) => self.update(pos),
            InputEvent::TouchEnd { id, pos } if self.touch_id == Some(id) => {
                self.touch_id = None;
                self.finish(pos)
            }
            InputEvent::TouchCancel { id } if self.touch_id == Some(id) => {
                self.touch_id = None;
                self.discard()
            }
            InputEvent::TouchMove { .. }
            | InputEvent::TouchEnd { .. }
            | InputEvent::TouchCancel { .. } => SelectionEvent::None,
        }
    }

    /// Back to a fresh `Idle`, as on a new "start selection" request.
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
        self.gesture = PointerGesture::default();
        self.circle = None;
        self.touch_id = None;
    }

    /// Circle to draw, if any.
    pub fn circle(&self) -> Option<Circle> {
        self.circle
    }

    pub fn is_drawing(&self) -> bool {
        self.state == SelectionState::Drawing
    }

    /// The emitted region once the gesture has been finalized.
    pub fn finalized(&self) -> Option<CaptureRect> {
        match self.state {
            SelectionState::Finalized(rect) => Some(rect),
            _ => None,
        }
    }

    /// Instructions are visible whenever no gesture is in progress.
    pub fn show_instructions(&self) -> bool {
        self.state == SelectionState::Idle
    }

    pub fn surface_size(&self) -> (f64, f64) {
        self.surface
    }

    fn begin(&mut self, pos: Point) -> SelectionEvent {
        if self.gesture.active {
            return SelectionEvent::None;
        }
        self.gesture = PointerGesture {
            start: pos,
            current: pos,
            active: true,
        };
        self.circle = None;
        self.state = SelectionState::Drawing;
        SelectionEvent::Started
    }

    fn update(&mut self, pos: Point) -> SelectionEvent {
        if !self.gesture.active {
            return SelectionEvent::None;
        }
        self.gesture.current = pos;
        let circle = Circle::from_points(self.gesture.start, pos);
        self.circle = Some(circle);
        SelectionEvent::Drawing(circle)
    }

    fn finish(&mut self, pos: Option<Point>) -> SelectionEvent {
        if !self.gesture.active {
            return SelectionEvent::None;
        }
        if let Some(pos) = pos {
            self.gesture.current = pos;
        }
        self.gesture.active = false;

        let circle = Circle::from_points(self.gesture.start, self.gesture.current);
        match circle.capture_rect(self.min_radius) {
            Ok(rect) => {
                self.circle = Some(circle);
                self.state = SelectionState::Finalized(rect);
                log::debug!("Selection finalized: {:?}", rect);
                SelectionEvent::Completed(rect)
            }
            Err(e) => {
                log::trace!("{}", e);
                self.discard()
            }
        }
    }

    fn discard(&mut self) -> SelectionEvent {
        self.reset();
        SelectionEvent::Discarded
    }

    fn cancel(&mut self) -> SelectionEvent {
        self.reset();
        SelectionEvent::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn machine() -> SelectionMachine {
        SelectionMachine::new(10.0)
    }

    #[test]
    fn drag_produces_capture_rect() {
        let mut sel = machine();
        assert!(sel.show_instructions());

        assert_eq!(sel.handle(InputEvent::PointerDown(p(100.0, 100.0))), SelectionEvent::Started);
        assert!(!sel.show_instructions());

        let moved = sel.handle(InputEvent::PointerMove(p(120.0, 120.0)));
        assert!(matches!(moved, SelectionEvent::Drawing(c) if c.center == p(110.0, 110.0)));

        let done = sel.handle(InputEvent::PointerUp(p(140.0, 140.0)));
        let expected = CaptureRect {
            x: 92,
            y: 92,
            width: 57,
            height: 57,
        };
        assert_eq!(done, SelectionEvent::Completed(expected));
        assert_eq!(sel.finalized(), Some(expected));
    }

    #[test]
    fn release_position_wins_over_last_move() {
        let mut sel = machine();
        sel.handle(InputEvent::PointerDown(p(0.0, 0.0)));
        sel.handle(InputEvent::PointerMove(p(5.0, 0.0)));
        let done = sel.handle(InputEvent::PointerUp(p(100.0, 0.0)));
        assert!(matches!(done, SelectionEvent::Completed(r) if r.width == 100));
    }

    #[test]
    fn small_gesture_returns_to_idle_without_capture() {
        let mut sel = machine();
        sel.handle(InputEvent::PointerDown(p(50.0, 50.0)));
        sel.handle(InputEvent::PointerMove(p(60.0, 60.0)));
        // radius = sqrt(200) / 2 ~ 7.07
        assert_eq!(sel.handle(InputEvent::PointerUp(p(60.0, 60.0))), SelectionEvent::Discarded);
        assert!(sel.show_instructions());
        assert_eq!(sel.circle(), None);
        assert_eq!(sel.finalized(), None);

        // radius exactly at the threshold is still too small
        sel.handle(InputEvent::PointerDown(p(0.0, 0.0)));
        assert_eq!(sel.handle(InputEvent::PointerUp(p(20.0, 0.0))), SelectionEvent::Discarded);

        // and the machine accepts a new gesture afterwards
        assert_eq!(sel.handle(InputEvent::PointerDown(p(0.0, 0.0))), SelectionEvent::Started);
    }

    #[test]
    fn escape_cancels_in_progress_gesture() {
        let mut sel = machine();
        sel.handle(InputEvent::PointerDown(p(0.0, 0.0)));
        sel.handle(InputEvent::PointerMove(p(80.0, 80.0)));
        assert_eq!(sel.handle(InputEvent::Cancel), SelectionEvent::Cancelled);
        assert_eq!(sel.handle(InputEvent::PointerUp(p(80.0, 80.0))), SelectionEvent::None);
        assert_eq!(sel.finalized(), None);
    }

    #[test]
    fn moves_without_a_press_are_ignored() {
        let mut sel = machine();
        assert_eq!(sel.handle(InputEvent::PointerMove(p(10.0, 10.0))), SelectionEvent::None);
        assert_eq!(sel.handle(InputEvent::PointerUp(p(90.0, 90.0))), SelectionEvent::None);
        assert_eq!(sel.circle(), None);
    }

    #[test]
    fn only_first_touch_is_tracked() {
        let mut sel = machine();
        assert_eq!(
            sel.handle(InputEvent::TouchStart { id: 1, pos: p(10.0, 10.0) }),
            SelectionEvent::Started
        );
        assert_eq!(
            sel.handle(InputEvent::TouchStart { id: 2, pos: p(500.0, 500.0) }),
            SelectionEvent::None
        );
        assert_eq!(
            sel.handle(InputEvent::TouchMove { id: 2, pos: p(900.0, 900.0) }),
            SelectionEvent::None
        );
        sel.handle(InputEvent::TouchMove { id: 1, pos: p(70.0, 10.0) });

        // touch end without a position uses the last tracked point
        let done = sel.handle(InputEvent::TouchEnd { id: 1, pos: None });
        assert!(matches!(done, SelectionEvent::Completed(r) if r.width == 60 && r.x == 10));
    }

    #[test]
    fn touch_cancel_discards_gesture() {
        let mut sel = machine();
        sel.handle(InputEvent::TouchStart { id: 7, pos: p(10.0, 10.0) });
        sel.handle(InputEvent::TouchMove { id: 7, pos: p(90.0, 90.0) });
        assert_eq!(sel.handle(InputEvent::TouchCancel { id: 7 }), SelectionEvent::Discarded);
        assert!(sel.show_instructions());
    }

    #[test]
    fn resize_does_not_disturb_gesture() {
        let mut sel = machine();
        sel.handle(InputEvent::PointerDown(p(100.0, 100.0)));
        sel.handle(InputEvent::Resize {
            width: 1280.0,
            height: 720.0,
        });
        assert!(sel.is_drawing());
        assert_eq!(sel.surface_size(), (1280.0, 720.0));

        let done = sel.handle(InputEvent::PointerUp(p(140.0, 140.0)));
        assert!(matches!(done, SelectionEvent::Completed(r) if r.x == 92));
    }

    #[test]
    fn finalized_machine_ignores_input_until_reset() {
        let mut sel = machine();
        sel.handle(InputEvent::PointerDown(p(0.0, 0.0)));
        sel.handle(InputEvent::PointerUp(p(100.0, 0.0)));
        assert_eq!(sel.handle(InputEvent::PointerDown(p(5.0, 5.0))), SelectionEvent::None);

        sel.reset();
        assert!(sel.show_instructions());
        assert_eq!(sel.handle(InputEvent::PointerDown(p(5.0, 5.0))), SelectionEvent::Started);
    }
}
