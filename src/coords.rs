//! Conversions between the planner's floor frame and the render world frame.
//!
//! The floor frame is what operators and forms see: `x` runs left-right, `y`
//! runs forward-back and `z` is height above the floor. The render engine is
//! Y-up, so height moves to the world `y` axis and floor `y` becomes world
//! depth (`z`). Nothing here rounds; quantization belongs to [`crate::snap`].

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;

use serde::{Deserialize, Serialize};

use crate::consts::FULL_TURN_DEG;
use crate::entity::Placement;

/// A point on the floor plane (height not included).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorPoint {
    pub x: f64,
    pub y: f64,
}

impl FloorPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in the render engine's Y-up world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl WorldPoint {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Map a floor placement into world coordinates.
#[must_use]
pub fn to_world(placement: &Placement) -> WorldPoint {
    WorldPoint { x: placement.x, y: placement.z, z: placement.y }
}

/// Map a world-space intersection back onto the floor plane.
///
/// World height is dropped: a ground-plane hit carries no information about
/// the entity's elevation, so callers keep the entity's existing `z`.
#[must_use]
pub fn to_floor(world: WorldPoint) -> FloorPoint {
    FloorPoint { x: world.x, y: world.z }
}

/// Heading in degrees to a rotation about the world's vertical axis, in radians.
#[must_use]
pub fn heading_to_world_angle(heading_deg: f64) -> f64 {
    heading_deg.to_radians()
}

/// Wrap any angle into `[0, 360)`. Non-finite input maps to `0`.
#[must_use]
pub fn normalize_degrees(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let wrapped = deg.rem_euclid(FULL_TURN_DEG);
    // rem_euclid rounds tiny negatives up to exactly 360.
    if wrapped >= FULL_TURN_DEG {
        return 0.0;
    }
    // Fold -0.0 into +0.0.
    wrapped + 0.0
}
