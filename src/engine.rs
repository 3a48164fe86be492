//! Engine façade: the single entry point the host drives.
//!
//! `EngineCore` owns the entity store, the mode machine, the drag controller
//! and the interaction settings. Pointer and frame handlers run to completion
//! synchronously and return the side effects the host must apply (pointer
//! capture, cursor, capture-plane height) as a `Vec<Action>`. Entity data
//! changes are also broadcast on the store's subscription channel.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use tracing::{debug, warn};

use crate::config::InteractionConfig;
use crate::coords::{FloorPoint, to_floor};
use crate::drag::{DragOutcome, PointerDragController};
use crate::entity::{Entity, EntityId};
use crate::input::{Cursor, HitTarget, PointerEvent, PointerId};
use crate::mode::{Mode, ModeMachine};
use crate::selection::Selection;
use crate::snap::snap_position;
use crate::store::EntityStore;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Route all further events for this pointer to the drag surface.
    CapturePointer(PointerId),
    /// Stop routing this pointer to the drag surface.
    ReleasePointer(PointerId),
    ModeChanged(Mode),
    SelectionChanged(Selection),
    /// An entity's placement changed as part of a gesture.
    EntityMoved(EntityId),
    /// The ground click consumed by a placement pick, in floor coordinates.
    PlacementPicked(FloorPoint),
    /// New height for the drag capture plane.
    DragSurfaceElevation(f64),
    SetCursor(Cursor),
    RenderNeeded,
}

/// Core engine state. Holds no host handles, so it is testable on its own.
pub struct EngineCore {
    store: EntityStore,
    modes: ModeMachine,
    drag: PointerDragController,
    config: InteractionConfig,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(InteractionConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: InteractionConfig) -> Self {
        Self {
            store: EntityStore::with_config(&config),
            modes: ModeMachine::new(),
            drag: PointerDragController::new(),
            config,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.store.selection()
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.store.get(id)
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Direct store access for form-driven edits. Cascade and selection rules still apply.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    #[must_use]
    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    #[must_use]
    pub fn drag_surface_elevation(&self) -> f64 {
        self.drag.surface_elevation()
    }

    // --- Commands ---

    /// Arm a placement pick: the next ground click is reported instead of clearing selection.
    pub fn begin_placement_pick(&mut self) -> Vec<Action> {
        if !self.modes.begin_place() {
            return vec![];
        }
        vec![Action::ModeChanged(Mode::Place), Action::SetCursor(Cursor::Crosshair)]
    }

    pub fn cancel_placement_pick(&mut self) -> Vec<Action> {
        if !self.modes.cancel_place() {
            return vec![];
        }
        vec![Action::ModeChanged(Mode::Idle), Action::SetCursor(Cursor::Default)]
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, target: HitTarget, event: &PointerEvent) -> Vec<Action> {
        match (self.modes.mode(), target) {
            (_, HitTarget::DragSurface) => vec![],
            (Mode::Place, HitTarget::Ground) => self.pick_placement(event),
            (Mode::Idle, HitTarget::Ground) => self.click_empty_area(),
            (Mode::Idle, HitTarget::Entity(id)) => self.start_drag(id, event),
            (Mode::Idle, HitTarget::RotationHandle(id)) => self.start_rotate(id, event),
            (mode, target) => {
                debug!(?mode, ?target, "press ignored outside idle");
                vec![]
            }
        }
    }

    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> Vec<Action> {
        if !self.modes.mode().is_gesture() {
            return vec![];
        }
        match self.drag.on_move(&mut self.store, &self.config, event) {
            DragOutcome::Ignored => vec![],
            DragOutcome::Moved(id) => vec![Action::EntityMoved(id), Action::RenderNeeded],
            DragOutcome::Aborted { pointer_id } => {
                warn!(pointer = %pointer_id, "gesture aborted");
                self.modes.end_gesture();
                Self::gesture_ended(pointer_id)
            }
        }
    }

    pub fn on_pointer_up(&mut self, event: &PointerEvent) -> Vec<Action> {
        self.finish_gesture(event.pointer_id)
    }

    /// Forced release (focus loss, pointer cancel). Ends the gesture exactly like pointer-up.
    pub fn on_lost_pointer_capture(&mut self, pointer_id: PointerId) -> Vec<Action> {
        self.finish_gesture(pointer_id)
    }

    /// Per-frame tick: keep the drag capture plane at the selected entity's height.
    pub fn on_frame(&mut self) -> Vec<Action> {
        match self.drag.sync_surface_elevation(&self.store) {
            Some(height) => vec![Action::DragSurfaceElevation(height)],
            None => vec![],
        }
    }

    // --- Internal ---

    fn pick_placement(&mut self, event: &PointerEvent) -> Vec<Action> {
        let mut point = to_floor(event.world);
        if self.config.snap_to_grid {
            point = snap_position(point, self.config.grid_pitch);
        }
        self.modes.finish_place();
        debug!(x = point.x, y = point.y, "placement picked");
        vec![
            Action::PlacementPicked(point),
            Action::ModeChanged(Mode::Idle),
            Action::SetCursor(Cursor::Default),
        ]
    }

    fn click_empty_area(&mut self) -> Vec<Action> {
        if !self.store.clear_selection() {
            return vec![];
        }
        vec![Action::SelectionChanged(Selection::None), Action::RenderNeeded]
    }

    fn start_drag(&mut self, id: EntityId, event: &PointerEvent) -> Vec<Action> {
        let Some(kind) = self.store.get(id).map(Entity::kind) else {
            return vec![];
        };
        let before = self.store.selection();
        self.store.set_selection(kind, id);
        if !self.drag.begin_drag(&self.store, id, event) {
            return vec![];
        }
        self.modes.begin_drag();

        let mut actions = Vec::new();
        let after = self.store.selection();
        if after != before {
            actions.push(Action::SelectionChanged(after));
        }
        actions.push(Action::ModeChanged(Mode::Drag));
        actions.push(Action::CapturePointer(event.pointer_id));
        actions.push(Action::SetCursor(Cursor::Grab));
        if let Some(height) = self.drag.sync_surface_elevation(&self.store) {
            actions.push(Action::DragSurfaceElevation(height));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn start_rotate(&mut self, id: EntityId, event: &PointerEvent) -> Vec<Action> {
        if !self.store.selection().contains(id) {
            return vec![];
        }
        if !self.drag.begin_rotate(&self.store, id, event) {
            return vec![];
        }
        self.modes.begin_rotate(true);
        vec![
            Action::ModeChanged(Mode::Rotate),
            Action::CapturePointer(event.pointer_id),
            Action::SetCursor(Cursor::Alias),
        ]
    }

    fn finish_gesture(&mut self, pointer_id: PointerId) -> Vec<Action> {
        if !self.drag.release(pointer_id) {
            return vec![];
        }
        self.modes.end_gesture();
        let mut actions = Self::gesture_ended(pointer_id);
        actions.push(Action::RenderNeeded);
        actions
    }

    fn gesture_ended(pointer_id: PointerId) -> Vec<Action> {
        vec![
            Action::ReleasePointer(pointer_id),
            Action::ModeChanged(Mode::Idle),
            Action::SetCursor(Cursor::Default),
        ]
    }
}
