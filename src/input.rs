//! Input model: pointer events, hit targets, and cursor hints.
//!
//! The renderer raycasts each press and reports what it hit as a
//! [`HitTarget`] together with a [`PointerEvent`] carrying the world-space
//! intersection point. Moves and releases arrive without a target: once a
//! gesture has captured the pointer, they are routed to the drag controller
//! no matter what is under the cursor.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::WorldPoint;
use crate::entity::EntityId;

/// Pointer identifier as reported by the host (mouse, pen, or one touch contact).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerId(pub i32);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pointer event with its world-space intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: PointerId,
    pub world: WorldPoint,
}

impl PointerEvent {
    #[must_use]
    pub fn new(pointer_id: PointerId, world: WorldPoint) -> Self {
        Self { pointer_id, world }
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum HitTarget {
    /// Empty floor.
    Ground,
    /// The always-present capture plane. Presses on it start nothing.
    DragSurface,
    /// The body of a selectable entity.
    Entity(EntityId),
    /// The rotation affordance drawn around a selected entity.
    RotationHandle(EntityId),
}

/// Cursor hint for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Crosshair,
    Alias,
}

impl Cursor {
    /// CSS `cursor` keyword.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Crosshair => "crosshair",
            Self::Alias => "alias",
        }
    }
}
