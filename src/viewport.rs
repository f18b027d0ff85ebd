//! Viewport transform engine
//!
//! Owns the pan/zoom state of the multi-year canvas and converts pointer
//! and wheel input into transform updates. Pure synchronous math: there is
//! no error channel, and out-of-range scale requests are clamped rather
//! than rejected.
//!
//! The transform maps content space to screen space as
//! `screen = content * scale + translate` (per axis, relative to the
//! container origin); `screen_to_content` is the inverse.

use crate::config::{
    BUTTON_ZOOM_IN_FACTOR, BUTTON_ZOOM_OUT_FACTOR, DRAG_THRESHOLD_PX, SCALE_DEFAULT, SCALE_MAX,
    SCALE_MIN, WHEEL_LINE_HEIGHT, WHEEL_ZOOM_IN_FACTOR, WHEEL_ZOOM_OUT_FACTOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding rectangle of the viewport container, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// How a device reports wheel deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDeltaMode {
    Pixel,
    Line,
    Page,
}

#[derive(Debug, Clone, Copy)]
pub struct WheelEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    pub mode: WheelDeltaMode,
    /// Ctrl/Cmd held: the wheel zooms instead of panning.
    pub zoom_modifier: bool,
    /// Pointer position in client coordinates.
    pub position: Point,
}

#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub pointer_id: i64,
    /// Position in client coordinates.
    pub position: Point,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    pointer_id: i64,
    start: Point,
    start_translate: (f64, f64),
    dragged: bool,
}

/// Pan/zoom state of the calendar canvas.
#[derive(Debug, Clone)]
pub struct Viewport {
    scale: f64,
    translate_x: f64,
    translate_y: f64,
    drag: Option<DragState>,
    /// Set on pointer-up when the gesture crossed the drag threshold, so a
    /// click handler that runs right after release can still suppress the
    /// click. Cleared by `consume_drag_flag`.
    drag_flag: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: SCALE_DEFAULT,
            translate_x: 0.0,
            translate_y: 0.0,
            drag: None,
            drag_flag: false,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> (f64, f64) {
        (self.translate_x, self.translate_y)
    }

    pub fn is_panning(&self) -> bool {
        self.drag.is_some()
    }

    /// Normalize a raw wheel delta to pixels for one axis.
    fn normalize_delta(delta: f64, mode: WheelDeltaMode, page_size: f64) -> f64 {
        match mode {
            WheelDeltaMode::Pixel => delta,
            WheelDeltaMode::Line => delta * WHEEL_LINE_HEIGHT,
            WheelDeltaMode::Page => delta * page_size,
        }
    }

    /// Wheel input: plain wheel pans, modifier-wheel zooms anchored at the
    /// pointer position.
    pub fn handle_wheel(&mut self, event: &WheelEvent, rect: &Rect) {
        if event.zoom_modifier {
            if event.delta_y == 0.0 {
                return;
            }
            let factor = if event.delta_y < 0.0 {
                WHEEL_ZOOM_IN_FACTOR
            } else {
                WHEEL_ZOOM_OUT_FACTOR
            };
            let anchor = Point::new(event.position.x - rect.left, event.position.y - rect.top);
            self.zoom_at(anchor, factor);
        } else {
            self.translate_x -= Self::normalize_delta(event.delta_x, event.mode, rect.width);
            self.translate_y -= Self::normalize_delta(event.delta_y, event.mode, rect.height);
        }
    }

    /// Apply a multiplicative zoom anchored at a point (relative to the
    /// container origin): the content under the anchor stays under it.
    fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(SCALE_MIN, SCALE_MAX);
        let ratio = new_scale / self.scale;

        self.translate_x = anchor.x - (anchor.x - self.translate_x) * ratio;
        self.translate_y = anchor.y - (anchor.y - self.translate_y) * ratio;
        self.scale = new_scale;
    }

    /// Zoom-in button: fixed +20% step, no anchor.
    pub fn zoom_in(&mut self) {
        self.scale = (self.scale * BUTTON_ZOOM_IN_FACTOR).clamp(SCALE_MIN, SCALE_MAX);
    }

    /// Zoom-out button: fixed -20% step, no anchor.
    pub fn zoom_out(&mut self) {
        self.scale = (self.scale * BUTTON_ZOOM_OUT_FACTOR).clamp(SCALE_MIN, SCALE_MAX);
    }

    /// Restore the default transform.
    pub fn reset(&mut self) {
        self.scale = SCALE_DEFAULT;
        self.translate_x = 0.0;
        self.translate_y = 0.0;
    }

    /// Begin a pan gesture. Only one pointer is tracked at a time; while a
    /// gesture is active, additional pointers are ignored.
    pub fn pointer_down(&mut self, event: &PointerEvent) {
        if self.drag.is_some() {
            return;
        }
        self.drag_flag = false;
        self.drag = Some(DragState {
            pointer_id: event.pointer_id,
            start: event.position,
            start_translate: (self.translate_x, self.translate_y),
            dragged: false,
        });
    }

    /// Update the pan by the raw pixel delta from the gesture start. The
    /// gesture counts as a drag once movement exceeds the threshold in
    /// either axis.
    pub fn pointer_move(&mut self, event: &PointerEvent) {
        let Some(drag) = &mut self.drag else {
            return;
        };
        if drag.pointer_id != event.pointer_id {
            return;
        }

        let dx = event.position.x - drag.start.x;
        let dy = event.position.y - drag.start.y;

        if dx.abs() > DRAG_THRESHOLD_PX || dy.abs() > DRAG_THRESHOLD_PX {
            drag.dragged = true;
        }

        self.translate_x = drag.start_translate.0 + dx;
        self.translate_y = drag.start_translate.1 + dy;
    }

    /// End the gesture. Returns whether it was a real drag; the same fact
    /// stays readable through `consume_drag_flag` for the click handler
    /// that fires immediately after release.
    pub fn pointer_up(&mut self, pointer_id: i64) -> bool {
        let Some(drag) = &self.drag else {
            return false;
        };
        if drag.pointer_id != pointer_id {
            return false;
        }

        let dragged = drag.dragged;
        self.drag_flag = dragged;
        self.drag = None;
        dragged
    }

    /// Read and clear the post-release drag flag.
    pub fn consume_drag_flag(&mut self) -> bool {
        std::mem::take(&mut self.drag_flag)
    }

    /// Map a client-space point into content space.
    pub fn screen_to_content(&self, client: Point, rect: &Rect) -> Point {
        Point::new(
            (client.x - rect.left - self.translate_x) / self.scale,
            (client.y - rect.top - self.translate_y) / self.scale,
        )
    }
}
