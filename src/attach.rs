//! Parent/child attachment and the transform cascade.
//!
//! A bound child's placement is always derived: `parent ⊕ offset`. The
//! offset is captured at bind time in the parent's local frame, and every
//! mutation that moves a parent calls [`EntityStore::apply_cascade`] before
//! returning, which walks the attachment tree and re-derives each descendant.
//!
//! Children of a travel carrier additionally carry a normalized travel
//! position. Their `dx` is `(fraction - 0.5) * length`, and their height sits
//! on the carrier's mounting surface.

#[cfg(test)]
#[path = "attach_test.rs"]
mod attach_test;

use std::collections::BTreeSet;

use tracing::{debug, trace, warn};

use crate::consts::{CARRIER_MIDPOINT, CASCADE_DECIMALS};
use crate::coords::normalize_degrees;
use crate::entity::{Attachment, EntityId, MountClass, ParentOffset, Placement};
use crate::store::{EntityStore, StoreEvent};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttachError {
    #[error("entity not found: {0}")]
    NotFound(EntityId),
    #[error("entity {0} cannot be bound to itself")]
    SelfBind(EntityId),
    #[error("binding {child} to {parent} would create a cycle")]
    Cycle { child: EntityId, parent: EntityId },
}

// =============================================================================
// PURE MATH
// =============================================================================

/// Express `child` in the local frame of `parent`.
#[must_use]
pub fn offset_in_parent_frame(child: &Placement, parent: &Placement) -> ParentOffset {
    let theta = parent.heading_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    let vx = child.x - parent.x;
    let vy = child.y - parent.y;
    ParentOffset {
        dx: vx * cos + vy * sin,
        dy: -vx * sin + vy * cos,
        d_heading_deg: normalize_degrees(child.heading_deg - parent.heading_deg),
    }
}

/// Compose a parent placement with a local offset. `z` is passed through untouched.
#[must_use]
pub fn compose(parent: &Placement, offset: &ParentOffset, z: f64) -> Placement {
    let theta = parent.heading_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    Placement {
        x: round_cascade(parent.x + offset.dx * cos - offset.dy * sin),
        y: round_cascade(parent.y + offset.dx * sin + offset.dy * cos),
        z,
        heading_deg: normalize_degrees(round_cascade(parent.heading_deg + offset.d_heading_deg)),
    }
}

/// Carrier-axis offset for a normalized travel position.
#[must_use]
pub fn travel_dx(fraction: f64, length: f64) -> f64 {
    (fraction - CARRIER_MIDPOINT) * length
}

/// Clamp a travel position into `[0, 1]`; NaN falls back to the midpoint.
#[must_use]
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return CARRIER_MIDPOINT;
    }
    fraction.clamp(0.0, 1.0)
}

fn round_cascade(value: f64) -> f64 {
    let scale = 10f64.powi(CASCADE_DECIMALS);
    let rounded = (value * scale).round() / scale;
    // Fold -0.0 into +0.0.
    rounded + 0.0
}

/// The placement a bound child should have given its parent's current placement.
fn derive_placement(
    parent: &Placement,
    attachment: &Attachment,
    child_z: f64,
    carrier_thickness: f64,
) -> Option<Placement> {
    match attachment {
        Attachment::Unbound => None,
        Attachment::BoundToPoint { offset, .. } => Some(compose(parent, offset, child_z)),
        Attachment::BoundToTravelCarrier { offset, .. } => {
            Some(compose(parent, offset, parent.z + carrier_thickness))
        }
    }
}

// =============================================================================
// STORE OPERATIONS
// =============================================================================

impl EntityStore {
    /// Attach `child` to `parent`, replacing any existing binding.
    ///
    /// Ordinary parents capture the child's current pose as the offset and
    /// leave the child exactly where it is. Travel carriers snap the child
    /// to their midpoint, onto the mounting surface, and mark it
    /// `Platform`-mounted.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::NotFound`] for unknown ids,
    /// [`AttachError::SelfBind`] when `child == parent`, and
    /// [`AttachError::Cycle`] when `parent` already rides on `child`. The
    /// store is untouched on error.
    pub fn bind(&mut self, child: EntityId, parent: EntityId) -> Result<(), AttachError> {
        if child == parent {
            warn!(%child, "rejected self-bind");
            return Err(AttachError::SelfBind(child));
        }
        let child_placement = *self.get(child).ok_or(AttachError::NotFound(child))?.placement();
        let parent_entity = self.get(parent).ok_or(AttachError::NotFound(parent))?;
        let parent_placement = *parent_entity.placement();
        let carrier_length = parent_entity.carrier_length();

        if self.is_ancestor(child, parent) {
            warn!(%child, %parent, "rejected cyclic bind");
            return Err(AttachError::Cycle { child, parent });
        }

        let attachment = if carrier_length.is_some() {
            Attachment::BoundToTravelCarrier {
                parent,
                offset: ParentOffset::default(),
                fraction: CARRIER_MIDPOINT,
            }
        } else {
            Attachment::BoundToPoint {
                parent,
                offset: offset_in_parent_frame(&child_placement, &parent_placement),
            }
        };

        let thickness = self.carrier_thickness;
        if let Some(entity) = self.get_mut(child) {
            entity.set_attachment(attachment);
            // Point binds keep the pose as is; it is re-derived on the next cascade.
            if carrier_length.is_some() {
                entity.set_mount_class(MountClass::Platform);
                let derived =
                    derive_placement(&parent_placement, &attachment, child_placement.z, thickness);
                if let Some(placement) = derived {
                    *entity.placement_mut() = placement;
                }
            }
        }
        debug!(%child, %parent, carrier = carrier_length.is_some(), "entity bound");
        self.notify(StoreEvent::Changed(child));
        self.apply_cascade(child);
        Ok(())
    }

    /// Detach `child` from its parent, leaving its placement exactly where it is.
    ///
    /// Returns `false` if the entity is unknown or already unbound.
    pub fn unbind(&mut self, child: EntityId) -> bool {
        let Some(entity) = self.get_mut(child) else {
            return false;
        };
        if !entity.attachment().is_bound() {
            return false;
        }
        entity.set_attachment(Attachment::Unbound);
        debug!(%child, "entity unbound");
        self.notify(StoreEvent::Changed(child));
        true
    }

    /// Move a carrier-bound child along its carrier. Out-of-range fractions are clamped.
    ///
    /// Returns `false` if the child is unknown or not riding a travel carrier.
    pub fn set_travel_fraction(&mut self, child: EntityId, fraction: f64) -> bool {
        let attachment = self.get(child).map(|e| *e.attachment());
        let Some(Attachment::BoundToTravelCarrier { parent, offset, .. }) = attachment else {
            return false;
        };
        let Some(length) = self.get(parent).and_then(|p| p.carrier_length()) else {
            return false;
        };
        let fraction = clamp_fraction(fraction);
        let offset = ParentOffset { dx: travel_dx(fraction, length), ..offset };
        if let Some(entity) = self.get_mut(child) {
            entity.set_attachment(Attachment::BoundToTravelCarrier { parent, offset, fraction });
        }
        self.rederive(child);
        trace!(%child, fraction, "travel fraction set");
        self.notify(StoreEvent::Changed(child));
        self.apply_cascade(child);
        true
    }

    /// Re-derive every descendant of `parent` from its current placement.
    ///
    /// Returns how many descendants were re-placed.
    pub fn apply_cascade(&mut self, parent: EntityId) -> usize {
        let mut visited = BTreeSet::from([parent]);
        let mut stack = vec![parent];
        let mut moved = 0;
        while let Some(current) = stack.pop() {
            for child in self.children_of(current) {
                if !visited.insert(child) {
                    continue;
                }
                if self.rederive(child) {
                    moved += 1;
                    self.notify(StoreEvent::Changed(child));
                }
                stack.push(child);
            }
        }
        if moved > 0 {
            trace!(%parent, moved, "cascade applied");
        }
        moved
    }

    /// Recompute a bound entity's placement from its parent.
    ///
    /// Returns `false` if unbound or orphaned.
    fn rederive(&mut self, child: EntityId) -> bool {
        let Some(entity) = self.get(child) else {
            return false;
        };
        let attachment = *entity.attachment();
        let child_z = entity.placement().z;
        let parent = attachment.parent().and_then(|p| self.get(p));
        let Some(parent_placement) = parent.map(|p| *p.placement()) else {
            return false;
        };
        let thickness = self.carrier_thickness;
        let derived = derive_placement(&parent_placement, &attachment, child_z, thickness);
        let Some(placement) = derived else {
            return false;
        };
        if let Some(entity) = self.get_mut(child) {
            *entity.placement_mut() = placement;
        }
        true
    }

    /// Rebase a bound entity's offset so that `requested` becomes its placement.
    ///
    /// When `moves_floor` is set, point-bound children take the requested
    /// pose as their new offset, and carrier-bound children are projected
    /// onto the carrier axis: the along-axis component becomes a clamped
    /// travel fraction, the cross-axis offset is kept, and height stays on
    /// the mounting surface. Otherwise only the heading offset changes and
    /// the child keeps its floor position and travel fraction.
    pub(crate) fn rebase_attachment(
        &mut self,
        child: EntityId,
        requested: Placement,
        moves_floor: bool,
    ) {
        let Some(attachment) = self.get(child).map(|e| *e.attachment()) else {
            return;
        };
        let Some(parent_entity) = attachment.parent().and_then(|p| self.get(p)) else {
            return;
        };
        let parent_placement = *parent_entity.placement();
        let carrier_length = parent_entity.carrier_length();
        let local = offset_in_parent_frame(&requested, &parent_placement);
        let turned =
            |offset: ParentOffset| ParentOffset { d_heading_deg: local.d_heading_deg, ..offset };

        let rebased = match (attachment, carrier_length) {
            (Attachment::BoundToPoint { parent, offset }, _) => {
                let offset = if moves_floor { local } else { turned(offset) };
                Attachment::BoundToPoint { parent, offset }
            }
            (Attachment::BoundToTravelCarrier { parent, offset, fraction }, Some(length)) => {
                if moves_floor {
                    let fraction = clamp_fraction(local.dx / length + CARRIER_MIDPOINT);
                    let offset = ParentOffset {
                        dx: travel_dx(fraction, length),
                        dy: offset.dy,
                        d_heading_deg: local.d_heading_deg,
                    };
                    Attachment::BoundToTravelCarrier { parent, offset, fraction }
                } else {
                    Attachment::BoundToTravelCarrier { parent, offset: turned(offset), fraction }
                }
            }
            (other, _) => other,
        };

        let thickness = self.carrier_thickness;
        let placement = if moves_floor {
            derive_placement(&parent_placement, &rebased, requested.z, thickness)
        } else {
            let z = match rebased {
                Attachment::BoundToTravelCarrier { .. } => parent_placement.z + thickness,
                _ => requested.z,
            };
            Some(Placement { z, ..requested })
        };
        if let Some(entity) = self.get_mut(child) {
            entity.set_attachment(rebased);
            if let Some(placement) = placement {
                *entity.placement_mut() = placement;
            }
        }
    }

    /// Re-derive `dx` of every carrier-bound child of `carrier`.
    ///
    /// Each child keeps its travel fraction; only the carrier's length is reread.
    pub(crate) fn refresh_carrier_children(&mut self, carrier: EntityId) {
        let Some(length) = self.get(carrier).and_then(|c| c.carrier_length()) else {
            return;
        };
        for child in self.children_of(carrier) {
            if let Some(entity) = self.get_mut(child) {
                let attachment = *entity.attachment();
                if let Attachment::BoundToTravelCarrier { parent, offset, fraction } = attachment {
                    let offset = ParentOffset { dx: travel_dx(fraction, length), ..offset };
                    let resized = Attachment::BoundToTravelCarrier { parent, offset, fraction };
                    entity.set_attachment(resized);
                }
            }
        }
    }

    /// Whether `ancestor` appears on the parent chain of `node` (or is `node` itself).
    fn is_ancestor(&self, ancestor: EntityId, node: EntityId) -> bool {
        let mut seen = BTreeSet::new();
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                return false;
            }
            let Some(parent) = self.get(current).and_then(|e| e.attachment().parent()) else {
                return false;
            };
            current = parent;
        }
    }
}
