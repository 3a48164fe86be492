//! Grid and heading quantization.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use crate::coords::{FloorPoint, normalize_degrees};

/// Round both floor axes to the nearest multiple of `pitch`.
///
/// A non-positive or non-finite pitch disables snapping.
#[must_use]
pub fn snap_position(point: FloorPoint, pitch: f64) -> FloorPoint {
    if !is_usable_pitch(pitch) {
        return point;
    }
    FloorPoint { x: snap_scalar(point.x, pitch), y: snap_scalar(point.y, pitch) }
}

/// Round a heading to the nearest multiple of `pitch` degrees, wrapped into `[0, 360)`.
#[must_use]
pub fn snap_heading(deg: f64, pitch: f64) -> f64 {
    if !is_usable_pitch(pitch) {
        return normalize_degrees(deg);
    }
    normalize_degrees(snap_scalar(deg, pitch))
}

fn snap_scalar(value: f64, pitch: f64) -> f64 {
    (value / pitch).round() * pitch
}

fn is_usable_pitch(pitch: f64) -> bool {
    pitch.is_finite() && pitch > 0.0
}
