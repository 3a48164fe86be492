//! Selection state shared by the store and the interaction engine.
//!
//! At most one entity is selected, and it is either a mobile unit or a placed
//! object. Encoding that as one enum makes the mutual exclusion between the
//! two kinds structural: selecting one kind replaces any selection of the
//! other.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    None,
    MobileUnit(EntityId),
    PlacedObject(EntityId),
}

impl Selection {
    /// Build a selection of the given kind.
    #[must_use]
    pub fn of(kind: EntityKind, id: EntityId) -> Self {
        match kind {
            EntityKind::MobileUnit => Self::MobileUnit(id),
            EntityKind::PlacedObject => Self::PlacedObject(id),
        }
    }

    /// The selected id regardless of kind.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::None => None,
            Self::MobileUnit(id) | Self::PlacedObject(id) => Some(*id),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::None => None,
            Self::MobileUnit(_) => Some(EntityKind::MobileUnit),
            Self::PlacedObject(_) => Some(EntityKind::PlacedObject),
        }
    }

    #[must_use]
    pub fn mobile_unit(&self) -> Option<EntityId> {
        match self {
            Self::MobileUnit(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn placed_object(&self) -> Option<EntityId> {
        match self {
            Self::PlacedObject(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.id() == Some(id)
    }
}
