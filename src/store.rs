//! Entity store: the authoritative collection of placed entities.
//!
//! `EntityStore` owns every entity, the current selection, and the list of
//! subscribers. Gesture handlers read it synchronously through [`EntityStore::get`]
//! and mutate it in place; render consumers hold an [`tokio::sync::mpsc`]
//! receiver from [`EntityStore::subscribe`] and are told about each mutation
//! as it happens. Both paths observe the same state; nothing is cached.
//!
//! Every transform mutation re-derives attached children before returning
//! (see [`crate::attach`]), so a reader never sees a child out of step with
//! its parent.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::InteractionConfig;
use crate::coords::normalize_degrees;
use crate::entity::{Attachment, Entity, EntityDraft, EntityId, EntityKind};
use crate::selection::Selection;

/// Notification sent to subscribers after each mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A deploy batch was inserted.
    Added(Vec<EntityId>),
    /// An entity's placement, attachment, dimensions or style changed.
    Changed(EntityId),
    /// An entity was removed.
    Removed(EntityId),
    /// The selection changed.
    SelectionChanged(Selection),
}

/// Sparse transform update. Only present fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
}

impl TransformPatch {
    /// Move on the floor plane, leaving height and heading alone.
    #[must_use]
    pub fn floor_position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    /// Change heading only.
    #[must_use]
    pub fn heading(heading_deg: f64) -> Self {
        Self { heading_deg: Some(heading_deg), ..Default::default() }
    }
}

/// In-memory store of placed entities.
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
    selection: Selection,
    next_id: u64,
    pub(crate) carrier_thickness: f64,
    duplicate_offset: f64,
    subscribers: Vec<mpsc::UnboundedSender<StoreEvent>>,
}

impl EntityStore {
    /// Create an empty store with default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&InteractionConfig::default())
    }

    /// Create an empty store using the attachment and duplication settings of `config`.
    #[must_use]
    pub fn with_config(config: &InteractionConfig) -> Self {
        Self {
            entities: BTreeMap::new(),
            selection: Selection::None,
            next_id: 1,
            carrier_thickness: config.carrier_thickness,
            duplicate_offset: config.duplicate_offset,
            subscribers: Vec::new(),
        }
    }

    // --- Subscription ---

    /// Register a new subscriber. Dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn notify(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // --- Queries ---

    /// Look up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Ids of entities whose parent is `parent`, in id order.
    #[must_use]
    pub fn children_of(&self, parent: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.attachment().parent() == Some(parent))
            .map(Entity::id)
            .collect()
    }

    /// Number of entities currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the store contains no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The current selection.
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The selected entity, if any.
    #[must_use]
    pub fn selected_entity(&self) -> Option<&Entity> {
        self.selection.id().and_then(|id| self.get(id))
    }

    // --- Insertion ---

    /// Insert a deploy batch, assigning sequential ids in draft order.
    pub fn add_entities(&mut self, drafts: Vec<EntityDraft>) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = self.allocate_id();
            self.entities.insert(id, draft.into_entity(id));
            ids.push(id);
        }
        if !ids.is_empty() {
            debug!(count = ids.len(), first = %ids[0], "entities added");
            self.notify(StoreEvent::Added(ids.clone()));
        }
        ids
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Copy an entity under a fresh id, shifted by the duplicate offset on both floor axes.
    ///
    /// The copy is unbound and its children are not copied. Returns `None` if
    /// `id` does not exist.
    pub fn duplicate(&mut self, id: EntityId) -> Option<EntityId> {
        let mut copy = self.get(id)?.clone();
        let new_id = self.allocate_id();
        match &mut copy {
            Entity::MobileUnit(u) => u.id = new_id,
            Entity::PlacedObject(o) => o.id = new_id,
        }
        copy.set_attachment(Attachment::Unbound);
        let placement = copy.placement_mut();
        placement.x += self.duplicate_offset;
        placement.y += self.duplicate_offset;
        self.entities.insert(new_id, copy);
        debug!(source = %id, copy = %new_id, "entity duplicated");
        self.notify(StoreEvent::Added(vec![new_id]));
        Some(new_id)
    }

    // --- Removal ---

    /// Remove an entity. Its children are detached in place first.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        if !self.entities.contains_key(&id) {
            return None;
        }
        for child in self.children_of(id) {
            self.unbind(child);
        }
        let removed = self.entities.remove(&id);
        debug!(%id, "entity removed");
        self.notify(StoreEvent::Removed(id));
        if self.selection.contains(id) {
            self.set_selection_state(Selection::None);
        }
        removed
    }

    /// Remove several entities. Returns how many existed.
    pub fn remove_entities(&mut self, ids: &[EntityId]) -> usize {
        ids.iter().filter(|id| self.remove_entity(**id).is_some()).count()
    }

    /// Remove every entity and clear the selection.
    pub fn clear(&mut self) {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        self.remove_entities(&ids);
        self.clear_selection();
    }

    // --- Mutation ---

    /// Apply a transform patch and re-derive every attached descendant.
    ///
    /// The heading is normalized on write. A bound entity keeps its binding:
    /// its offset is rebased so the requested pose becomes the new derived
    /// pose (see [`EntityStore::rebase_attachment`]); a heading-only patch
    /// leaves its floor position and travel fraction alone. Returns `false`
    /// if the entity doesn't exist.
    pub fn update_transform(&mut self, id: EntityId, patch: &TransformPatch) -> bool {
        let Some(entity) = self.entities.get(&id) else {
            return false;
        };
        let mut requested = *entity.placement();
        if let Some(x) = patch.x {
            requested.x = x;
        }
        if let Some(y) = patch.y {
            requested.y = y;
        }
        if let Some(z) = patch.z {
            requested.z = z;
        }
        if let Some(h) = patch.heading_deg {
            requested.heading_deg = h;
        }
        requested.heading_deg = normalize_degrees(requested.heading_deg);

        if entity.attachment().is_bound() {
            let moves_floor = patch.x.is_some() || patch.y.is_some();
            self.rebase_attachment(id, requested, moves_floor);
        } else if let Some(entity) = self.entities.get_mut(&id) {
            *entity.placement_mut() = requested;
        }
        trace!(
            %id,
            x = requested.x,
            y = requested.y,
            heading = requested.heading_deg,
            "transform updated"
        );
        self.notify(StoreEvent::Changed(id));
        self.apply_cascade(id);
        true
    }

    /// Merge named dimensions into a placed object.
    ///
    /// Changing a travel carrier's `length` re-derives its children so they
    /// keep their normalized travel position. Returns `false` for unknown ids
    /// and mobile units.
    pub fn update_dimensions(&mut self, id: EntityId, dimensions: &BTreeMap<String, f64>) -> bool {
        let Some(Entity::PlacedObject(obj)) = self.entities.get_mut(&id) else {
            return false;
        };
        for (key, value) in dimensions {
            obj.dimensions.insert(key.clone(), *value);
        }
        let is_carrier = obj.shape_kind.is_travel_carrier();
        self.notify(StoreEvent::Changed(id));
        if is_carrier {
            self.refresh_carrier_children(id);
        }
        self.apply_cascade(id);
        true
    }

    /// Merge style keys into a placed object. `null` values delete keys.
    ///
    /// Returns `false` for unknown ids, mobile units, and non-object patches.
    pub fn update_style(&mut self, id: EntityId, patch: &serde_json::Value) -> bool {
        let Some(incoming) = patch.as_object() else {
            return false;
        };
        let Some(Entity::PlacedObject(obj)) = self.entities.get_mut(&id) else {
            return false;
        };
        if !obj.style.is_object() {
            obj.style = serde_json::json!({});
        }
        if let Some(existing) = obj.style.as_object_mut() {
            for (k, v) in incoming {
                if v.is_null() {
                    existing.remove(k);
                } else {
                    existing.insert(k.clone(), v.clone());
                }
            }
        }
        self.notify(StoreEvent::Changed(id));
        true
    }

    // --- Selection ---

    /// Select an entity of the given kind, replacing any selection of either kind.
    ///
    /// No-op (returns `false`) if the id is unknown or belongs to the other kind.
    pub fn set_selection(&mut self, kind: EntityKind, id: EntityId) -> bool {
        match self.get(id) {
            Some(entity) if entity.kind() == kind => {
                self.set_selection_state(Selection::of(kind, id));
                true
            }
            _ => false,
        }
    }

    /// Clear the selection. Returns `true` if something was selected.
    pub fn clear_selection(&mut self) -> bool {
        if self.selection.is_none() {
            return false;
        }
        self.set_selection_state(Selection::None);
        true
    }

    fn set_selection_state(&mut self, selection: Selection) {
        if self.selection == selection {
            return;
        }
        self.selection = selection;
        debug!(?selection, "selection changed");
        self.notify(StoreEvent::SelectionChanged(selection));
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
