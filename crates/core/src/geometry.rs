//! Gesture geometry.
//!
//! A drag from one point to another describes a circle whose diameter is the
//! segment between them. The region that gets captured is the axis-aligned
//! square enclosing that circle, in logical display coordinates.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// A position on the drawing surface, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    /// The circle whose diameter runs from `a` to `b`.
    ///
    /// Symmetric: swapping the two points yields the same circle.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            center: a.midpoint(b),
            radius: a.distance(b) / 2.0,
        }
    }

    /// The enclosing axis-aligned square, clamped to a non-negative origin.
    pub fn bounding_box(&self) -> CaptureRect {
        let side = round_to_u32(2.0 * self.radius);
        CaptureRect {
            x: round_to_u32(self.center.x - self.radius),
            y: round_to_u32(self.center.y - self.radius),
            width: side,
            height: side,
        }
    }

    /// The capture rectangle for this circle, if it is large enough.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::GestureTooSmall`] when `radius <= min_radius`.
    pub fn capture_rect(&self, min_radius: f64) -> Result<CaptureRect> {
        if self.radius > min_radius {
            Ok(self.bounding_box())
        } else {
            Err(AppError::GestureTooSmall {
                radius: self.radius,
                threshold: min_radius,
            })
        }
    }
}

/// Region to capture, in logical display pixels. Always square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn round_to_u32(value: f64) -> u32 {
    // Saturating float-to-int cast: negatives and NaN land on 0
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_is_midpoint_and_half_distance() {
        let a = Point::new(10.0, 20.0);
        let b = Point::new(40.0, 60.0);
        let circle = Circle::from_points(a, b);
        assert_eq!(circle.center, Point::new(25.0, 40.0));
        assert_eq!(circle.radius, 25.0);
    }

    #[test]
    fn circle_ignores_point_order() {
        let pairs = [
            (Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            (Point::new(512.5, 10.25), Point::new(-7.0, 300.0)),
            (Point::new(1919.0, 1079.0), Point::new(0.5, 0.5)),
        ];
        for (a, b) in pairs {
            assert_eq!(Circle::from_points(a, b), Circle::from_points(b, a));
        }
    }

    #[test]
    fn diagonal_drag_produces_expected_rect() {
        let circle = Circle::from_points(Point::new(100.0, 100.0), Point::new(140.0, 140.0));
        assert!((circle.radius - 28.284).abs() < 0.001);

        let rect = circle.capture_rect(10.0).unwrap();
        assert_eq!(
            rect,
            CaptureRect {
                x: 92,
                y: 92,
                width: 57,
                height: 57
            }
        );
    }

    #[test]
    fn bounding_box_is_square_and_clamped_at_origin() {
        let circle = Circle::from_points(Point::new(-30.0, 5.0), Point::new(30.0, 5.0));
        let rect = circle.bounding_box();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.width, rect.height);
        assert_eq!(rect.width, 60);
    }

    #[test]
    fn small_circles_are_rejected() {
        let at_threshold = Circle {
            center: Point::new(50.0, 50.0),
            radius: 10.0,
        };
        assert!(matches!(
            at_threshold.capture_rect(10.0),
            Err(AppError::GestureTooSmall { .. })
        ));

        let just_over = Circle {
            radius: 10.01,
            ..at_threshold
        };
        assert!(just_over.capture_rect(10.0).is_ok());
    }
}
