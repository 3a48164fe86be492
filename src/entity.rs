//! Entity model: placements, the two entity kinds, and attachment state.
//!
//! This module defines what the store holds. A [`MobileUnit`] is a placed
//! robot; a [`PlacedObject`] is equipment, material or a primitive shape.
//! Both carry a floor-frame [`Placement`] and an [`Attachment`] that says
//! whether (and how) the entity rides on a parent. Attachment is a closed
//! variant resolved once at bind time, so the cascade never has to inspect
//! the parent's shape to decide what to do.

#[cfg(test)]
#[path = "entity_test.rs"]
mod entity_test;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CARRIER_LENGTH, LENGTH_KEY};
use crate::coords::{FloorPoint, normalize_degrees};

/// Unique, sequential identifier shared by both entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which collection an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    MobileUnit,
    PlacedObject,
}

/// Where an entity is mounted. Drives elevation defaults and visual flip in the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountClass {
    #[default]
    Floor,
    Platform,
    Ceiling,
}

/// Position and heading in the floor frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    /// Left-right floor axis.
    pub x: f64,
    /// Forward-back floor axis.
    pub y: f64,
    /// Height above the floor.
    pub z: f64,
    /// Rotation about the vertical axis, always in `[0, 360)` once stored.
    pub heading_deg: f64,
}

impl Placement {
    /// Build a placement with the heading wrapped into `[0, 360)`.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64, heading_deg: f64) -> Self {
        Self { x, y, z, heading_deg: normalize_degrees(heading_deg) }
    }

    /// The floor-plane projection of this placement.
    #[must_use]
    pub fn floor_point(&self) -> FloorPoint {
        FloorPoint { x: self.x, y: self.y }
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.heading_deg = normalize_degrees(self.heading_deg);
        self
    }
}

/// A child's pose expressed in its parent's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParentOffset {
    pub dx: f64,
    pub dy: f64,
    pub d_heading_deg: f64,
}

/// How an entity is attached to a parent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// Free-standing; placement is authoritative.
    #[default]
    Unbound,
    /// Rigidly fixed to an ordinary parent at a constant offset.
    BoundToPoint { parent: EntityId, offset: ParentOffset },
    /// Riding a travel carrier; `offset.dx` follows `fraction` along the carrier length.
    BoundToTravelCarrier { parent: EntityId, offset: ParentOffset, fraction: f64 },
}

impl Attachment {
    /// The parent id, if bound.
    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        match self {
            Self::Unbound => None,
            Self::BoundToPoint { parent, .. } | Self::BoundToTravelCarrier { parent, .. } => {
                Some(*parent)
            }
        }
    }

    /// The offset from the parent, if bound.
    #[must_use]
    pub fn offset(&self) -> Option<ParentOffset> {
        match self {
            Self::Unbound => None,
            Self::BoundToPoint { offset, .. } | Self::BoundToTravelCarrier { offset, .. } => {
                Some(*offset)
            }
        }
    }

    /// Normalized travel position, only for carrier-bound children.
    #[must_use]
    pub fn travel_fraction(&self) -> Option<f64> {
        match self {
            Self::BoundToTravelCarrier { fraction, .. } => Some(*fraction),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }
}

/// Shape family of a placed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Box,
    Cylinder,
    Table,
    Conveyor,
    Pallet,
    Fence,
    Material,
    /// Linear motion rail; children slide along its `length`.
    LinearTrack,
}

impl ShapeKind {
    /// Whether children bound to this shape travel along an axis.
    #[must_use]
    pub fn is_travel_carrier(self) -> bool {
        matches!(self, Self::LinearTrack)
    }
}

/// A placed robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileUnit {
    pub id: EntityId,
    /// Reference to the robot model this unit instantiates.
    pub kind_ref: String,
    pub placement: Placement,
    pub mount_class: MountClass,
    pub attachment: Attachment,
}

impl MobileUnit {
    #[must_use]
    pub fn parent_id(&self) -> Option<EntityId> {
        self.attachment.parent()
    }

    #[must_use]
    pub fn parent_offset(&self) -> Option<ParentOffset> {
        self.attachment.offset()
    }

    #[must_use]
    pub fn travel_fraction(&self) -> Option<f64> {
        self.attachment.travel_fraction()
    }
}

/// A placed piece of equipment, material or primitive shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: EntityId,
    pub shape_kind: ShapeKind,
    /// Named extents (`length`, `width`, `height`, `radius`, ...).
    pub dimensions: BTreeMap<String, f64>,
    /// Open-ended visual properties (color, opacity, label, ...).
    pub style: serde_json::Value,
    pub placement: Placement,
    pub mount_class: MountClass,
    pub attachment: Attachment,
}

impl PlacedObject {
    /// Travel extent of a carrier. Falls back to a default when `length` is missing or unusable.
    #[must_use]
    pub fn travel_length(&self) -> f64 {
        match self.dimensions.get(LENGTH_KEY) {
            Some(len) if len.is_finite() && *len > 0.0 => *len,
            _ => DEFAULT_CARRIER_LENGTH,
        }
    }
}

/// Either kind of entity, as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    MobileUnit(MobileUnit),
    PlacedObject(PlacedObject),
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::MobileUnit(u) => u.id,
            Self::PlacedObject(o) => o.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::MobileUnit(_) => EntityKind::MobileUnit,
            Self::PlacedObject(_) => EntityKind::PlacedObject,
        }
    }

    #[must_use]
    pub fn placement(&self) -> &Placement {
        match self {
            Self::MobileUnit(u) => &u.placement,
            Self::PlacedObject(o) => &o.placement,
        }
    }

    pub(crate) fn placement_mut(&mut self) -> &mut Placement {
        match self {
            Self::MobileUnit(u) => &mut u.placement,
            Self::PlacedObject(o) => &mut o.placement,
        }
    }

    #[must_use]
    pub fn attachment(&self) -> &Attachment {
        match self {
            Self::MobileUnit(u) => &u.attachment,
            Self::PlacedObject(o) => &o.attachment,
        }
    }

    pub(crate) fn set_attachment(&mut self, attachment: Attachment) {
        match self {
            Self::MobileUnit(u) => u.attachment = attachment,
            Self::PlacedObject(o) => o.attachment = attachment,
        }
    }

    #[must_use]
    pub fn mount_class(&self) -> MountClass {
        match self {
            Self::MobileUnit(u) => u.mount_class,
            Self::PlacedObject(o) => o.mount_class,
        }
    }

    pub(crate) fn set_mount_class(&mut self, mount_class: MountClass) {
        match self {
            Self::MobileUnit(u) => u.mount_class = mount_class,
            Self::PlacedObject(o) => o.mount_class = mount_class,
        }
    }

    /// The placed object, if this entity is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&PlacedObject> {
        match self {
            Self::PlacedObject(o) => Some(o),
            Self::MobileUnit(_) => None,
        }
    }

    /// The mobile unit, if this entity is one.
    #[must_use]
    pub fn as_unit(&self) -> Option<&MobileUnit> {
        match self {
            Self::MobileUnit(u) => Some(u),
            Self::PlacedObject(_) => None,
        }
    }

    /// Travel extent if this entity is a travel carrier.
    #[must_use]
    pub fn carrier_length(&self) -> Option<f64> {
        self.as_object()
            .filter(|o| o.shape_kind.is_travel_carrier())
            .map(PlacedObject::travel_length)
    }
}

/// An entity as submitted by a deploy batch, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDraft {
    MobileUnit {
        kind_ref: String,
        placement: Placement,
        #[serde(default)]
        mount_class: MountClass,
    },
    PlacedObject {
        shape_kind: ShapeKind,
        #[serde(default)]
        dimensions: BTreeMap<String, f64>,
        #[serde(default)]
        style: serde_json::Value,
        placement: Placement,
        #[serde(default)]
        mount_class: MountClass,
    },
}

impl EntityDraft {
    pub(crate) fn into_entity(self, id: EntityId) -> Entity {
        match self {
            Self::MobileUnit { kind_ref, placement, mount_class } => Entity::MobileUnit(MobileUnit {
                id,
                kind_ref,
                placement: placement.normalized(),
                mount_class,
                attachment: Attachment::Unbound,
            }),
            Self::PlacedObject { shape_kind, dimensions, style, placement, mount_class } => {
                Entity::PlacedObject(PlacedObject {
                    id,
                    shape_kind,
                    dimensions,
                    style,
                    placement: placement.normalized(),
                    mount_class,
                    attachment: Attachment::Unbound,
                })
            }
        }
    }
}
