//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the library.

// ===== Viewport Scale Limits =====

/// Minimum viewport scale. Below this the year grid becomes unreadable.
pub const SCALE_MIN: f64 = 0.3;

/// Maximum viewport scale. Above this a single day cell fills the screen.
pub const SCALE_MAX: f64 = 3.0;

/// Default viewport scale shown on first load and after reset.
pub const SCALE_DEFAULT: f64 = 0.6;

// ===== Zoom Factors =====

/// Multiplicative zoom factor for one upward wheel notch.
pub const WHEEL_ZOOM_IN_FACTOR: f64 = 1.1;

/// Multiplicative zoom factor for one downward wheel notch.
pub const WHEEL_ZOOM_OUT_FACTOR: f64 = 0.9;

/// Multiplicative step applied by the zoom-in button (+20%).
pub const BUTTON_ZOOM_IN_FACTOR: f64 = 1.2;

/// Multiplicative step applied by the zoom-out button (-20%).
pub const BUTTON_ZOOM_OUT_FACTOR: f64 = 0.8;

// ===== Input Normalization =====

/// Pixels per wheel "line" when a device reports line-mode deltas.
pub const WHEEL_LINE_HEIGHT: f64 = 16.0;

/// Cumulative pointer movement (in either axis, in pixels) before a
/// press-drag-release gesture counts as a drag rather than a click.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

// ===== Notes =====

/// Sentinel owner id for unauthenticated/demo contexts.
pub const GUEST_OWNER_ID: &str = "guest";
