//! Pointer drag controller: turns captured pointer moves into store mutations.
//!
//! The controller is always present in the host's hit-test order. It holds
//! at most one gesture and the pointer id that owns it; every move or
//! release for any other pointer, or with no gesture active, falls straight
//! through as [`DragOutcome::Ignored`].
//!
//! Dragging is grab-relative: at press time the controller records
//! `entity.xy - pointer.xy` and re-applies that offset on every move, so
//! the entity does not jump its origin to the cursor.

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use tracing::{debug, trace, warn};

use crate::config::InteractionConfig;
use crate::coords::{FloorPoint, to_floor};
use crate::entity::EntityId;
use crate::input::{PointerEvent, PointerId};
use crate::snap::{snap_heading, snap_position};
use crate::store::{EntityStore, TransformPatch};

/// The gesture currently owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Translating `id`; `grab_offset` is entity position minus pointer position at press time.
    Dragging { id: EntityId, grab_offset: FloorPoint },
    /// Turning `id` to face the pointer.
    Rotating { id: EntityId },
}

impl Gesture {
    /// The entity this gesture is acting on.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Idle => None,
            Self::Dragging { id, .. } | Self::Rotating { id } => Some(*id),
        }
    }
}

/// Result of routing a pointer move to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// No gesture, or the event belongs to another pointer.
    Ignored,
    /// The store was updated for this entity.
    Moved(EntityId),
    /// The gesture's entity has vanished; the gesture was dropped and its capture released.
    Aborted { pointer_id: PointerId },
}

#[derive(Debug, Clone, Default)]
pub struct PointerDragController {
    gesture: Gesture,
    capture: Option<PointerId>,
    surface_elevation: f64,
}

impl PointerDragController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// The pointer currently captured by the active gesture.
    #[must_use]
    pub fn captured_pointer(&self) -> Option<PointerId> {
        self.capture
    }

    /// Height of the capture plane, kept in step with the selected entity.
    #[must_use]
    pub fn surface_elevation(&self) -> f64 {
        self.surface_elevation
    }

    // --- Gesture start ---

    /// Start translating `id`, capturing `event.pointer_id`.
    ///
    /// Returns `false` if a gesture is already active or the entity is missing.
    pub fn begin_drag(&mut self, store: &EntityStore, id: EntityId, event: &PointerEvent) -> bool {
        if self.is_active() {
            return false;
        }
        let Some(entity) = store.get(id) else {
            return false;
        };
        let entity_xy = entity.placement().floor_point();
        let pointer_xy = to_floor(event.world);
        let grab_offset = FloorPoint::new(entity_xy.x - pointer_xy.x, entity_xy.y - pointer_xy.y);
        self.gesture = Gesture::Dragging { id, grab_offset };
        self.capture = Some(event.pointer_id);
        debug!(
            %id,
            pointer = %event.pointer_id,
            dx = grab_offset.x,
            dy = grab_offset.y,
            "drag started"
        );
        true
    }

    /// Start rotating `id`, capturing `event.pointer_id`.
    ///
    /// Returns `false` if a gesture is already active or the entity is missing.
    pub fn begin_rotate(
        &mut self,
        store: &EntityStore,
        id: EntityId,
        event: &PointerEvent,
    ) -> bool {
        if self.is_active() || store.get(id).is_none() {
            return false;
        }
        self.gesture = Gesture::Rotating { id };
        self.capture = Some(event.pointer_id);
        debug!(%id, pointer = %event.pointer_id, "rotate started");
        true
    }

    // --- Routed events ---

    /// Apply a captured pointer move to the store.
    pub fn on_move(
        &mut self,
        store: &mut EntityStore,
        config: &InteractionConfig,
        event: &PointerEvent,
    ) -> DragOutcome {
        if self.capture != Some(event.pointer_id) {
            return DragOutcome::Ignored;
        }
        let Some(id) = self.gesture.entity() else {
            return DragOutcome::Ignored;
        };
        let Some(current) = store.get(id).map(|e| *e.placement()) else {
            warn!(%id, pointer = %event.pointer_id, "gesture entity vanished, aborting");
            self.reset();
            return DragOutcome::Aborted { pointer_id: event.pointer_id };
        };

        let patch = match self.gesture {
            Gesture::Idle => return DragOutcome::Ignored,
            Gesture::Dragging { grab_offset, .. } => {
                let pointer_xy = to_floor(event.world);
                let mut candidate =
                    FloorPoint::new(pointer_xy.x + grab_offset.x, pointer_xy.y + grab_offset.y);
                if config.snap_to_grid {
                    candidate = snap_position(candidate, config.grid_pitch);
                }
                TransformPatch::floor_position(candidate.x, candidate.y)
            }
            Gesture::Rotating { .. } => {
                let dx = event.world.x - current.x;
                let dz = event.world.z - current.y;
                let angle_deg = dx.atan2(dz).to_degrees();
                TransformPatch::heading(snap_heading(angle_deg, config.heading_pitch_deg))
            }
        };

        store.update_transform(id, &patch);
        trace!(%id, ?patch, "gesture move applied");
        DragOutcome::Moved(id)
    }

    /// Release the capture held by `pointer_id` and drop the gesture.
    ///
    /// Used for both pointer-up and forced capture loss. Returns `false` if
    /// `pointer_id` does not own the capture.
    pub fn release(&mut self, pointer_id: PointerId) -> bool {
        if self.capture != Some(pointer_id) {
            return false;
        }
        debug!(pointer = %pointer_id, entity = ?self.gesture.entity(), "gesture released");
        self.reset();
        true
    }

    /// Track the selected entity's height. Returns the new elevation when it changed.
    pub fn sync_surface_elevation(&mut self, store: &EntityStore) -> Option<f64> {
        let target = store.selected_entity().map_or(0.0, |e| e.placement().z);
        if (target - self.surface_elevation).abs() < f64::EPSILON {
            return None;
        }
        self.surface_elevation = target;
        trace!(elevation = target, "drag surface elevation synced");
        Some(target)
    }

    fn reset(&mut self) {
        self.gesture = Gesture::Idle;
        self.capture = None;
    }
}
