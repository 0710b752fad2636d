//! UI rendering helpers for the capture overlay.
//!
//! The overlay is described by an [`OverlayScene`] computed purely from the
//! current circle, then painted in one pass. Painting the same scene twice
//! gives the same frame; nothing accumulates between frames.

use crate::geometry::{CaptureRect, Circle};
use eframe::egui;

/// Dimming over the frozen screen.
pub const BACKDROP: egui::Color32 = egui::Color32::from_black_alpha(77);
const CIRCLE_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(15, 35, 16, 51);
const CIRCLE_STROKE: egui::Color32 = egui::Color32::from_rgb(0x4C, 0xAF, 0x50);
const GUIDE_STROKE: egui::Color32 = egui::Color32::from_rgb(0x21, 0x96, 0xF3);
const GUIDE_DASH: f32 = 5.0;

pub const INSTRUCTIONS: &str = "Draw a circle around anything to analyze it · Esc to cancel";

#[derive(Debug, Clone, PartialEq)]
pub struct CircleShape {
    pub center: egui::Pos2,
    pub radius: f32,
    pub fill: egui::Color32,
    pub stroke: egui::Stroke,
    /// Dashed bounding-box guide around the circle.
    pub guide: egui::Rect,
    pub guide_stroke: egui::Stroke,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayScene {
    pub backdrop: egui::Color32,
    pub circle: Option<CircleShape>,
    pub instructions: bool,
}

/// Scene for the current selection state.
pub fn overlay_scene(circle: Option<Circle>, instructions: bool) -> OverlayScene {
    OverlayScene {
        backdrop: BACKDROP,
        circle: circle.map(|c| {
            let center = egui::pos2(c.center.x as f32, c.center.y as f32);
            let radius = c.radius as f32;
            CircleShape {
                center,
                radius,
                fill: CIRCLE_FILL,
                stroke: egui::Stroke::new(3.0, CIRCLE_STROKE),
                guide: egui::Rect::from_center_size(center, egui::vec2(radius * 2.0, radius * 2.0)),
                guide_stroke: egui::Stroke::new(2.0, GUIDE_STROKE),
            }
        }),
        instructions,
    }
}

/// Paints `scene` over `screen_rect`.
pub fn paint_scene(painter: &egui::Painter, screen_rect: egui::Rect, scene: &OverlayScene) {
    painter.rect_filled(screen_rect, 0.0, scene.backdrop);

    if let Some(shape) = &scene.circle {
        painter.circle(shape.center, shape.radius, shape.fill, shape.stroke);

        let guide = shape.guide;
        let corners = [
            guide.left_top(),
            guide.right_top(),
            guide.right_bottom(),
            guide.left_bottom(),
            guide.left_top(),
        ];
        painter.extend(egui::Shape::dashed_line(
            &corners,
            shape.guide_stroke,
            GUIDE_DASH,
            GUIDE_DASH,
        ));
    }

    if scene.instructions {
        painter.text(
            screen_rect.center(),
            egui::Align2::CENTER_CENTER,
            INSTRUCTIONS,
            egui::FontId::proportional(24.0),
            egui::Color32::WHITE,
        );
    }
}

/// The capture rectangle as an egui rect in logical points.
pub fn to_egui_rect(rect: CaptureRect) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(rect.x as f32, rect.y as f32),
        egui::vec2(rect.width as f32, rect.height as f32),
    )
}

/// Calculates the optimal position for a popup window relative to a selection.
///
/// Tries to position the window below the selection, but moves it above
/// if there isn't enough space below.
///
/// # Returns
/// A tuple of (x position, y position, pivot alignment)
pub fn calculate_popup_position(
    selection_rect: egui::Rect,
    screen_rect: egui::Rect,
    window_width: f32,
    spacing: f32,
    min_space_needed: f32,
) -> (f32, f32, egui::Align2) {
    // Center horizontally relative to selection, clamped to screen
    let max_x = (screen_rect.width() - window_width - 10.0).max(10.0);
    let window_x = (selection_rect.center().x - (window_width / 2.0)).clamp(10.0, max_x);

    // Default: position below selection
    let mut window_y = selection_rect.max.y + spacing;
    let mut pivot = egui::Align2::LEFT_TOP;

    // Check if there's enough space below
    let space_below = screen_rect.max.y - window_y;
    if space_below < min_space_needed && selection_rect.min.y > space_below {
        // Not enough space below, but more space above - position above
        pivot = egui::Align2::LEFT_BOTTOM;
        window_y = selection_rect.min.y - spacing;
    }

    (window_x, window_y, pivot)
}
