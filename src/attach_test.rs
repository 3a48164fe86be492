#![allow(clippy::float_cmp)]

use std::collections::BTreeMap;

use serde_json::json;

use super::*;
use crate::entity::{EntityDraft, ShapeKind};
use crate::store::TransformPatch;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// =============================================================
// Helpers
// =============================================================

fn unit(x: f64, y: f64, z: f64, heading_deg: f64) -> EntityDraft {
    EntityDraft::MobileUnit {
        kind_ref: "scara-4".into(),
        placement: Placement { x, y, z, heading_deg },
        mount_class: MountClass::Floor,
    }
}

fn table(x: f64, y: f64, heading_deg: f64) -> EntityDraft {
    EntityDraft::PlacedObject {
        shape_kind: ShapeKind::Table,
        dimensions: BTreeMap::new(),
        style: json!({}),
        placement: Placement { x, y, z: 0.0, heading_deg },
        mount_class: MountClass::Floor,
    }
}

fn track(x: f64, y: f64, z: f64, length: f64) -> EntityDraft {
    EntityDraft::PlacedObject {
        shape_kind: ShapeKind::LinearTrack,
        dimensions: BTreeMap::from([("length".to_string(), length)]),
        style: json!({}),
        placement: Placement { x, y, z, heading_deg: 0.0 },
        mount_class: MountClass::Floor,
    }
}

fn placement_of(store: &EntityStore, id: EntityId) -> Placement {
    *store.get(id).unwrap().placement()
}

// =============================================================
// Pure math
// =============================================================

#[test]
fn compose_rotates_offset_by_parent_heading() {
    let parent = Placement::new(10.0, 5.0, 0.0, 90.0);
    let offset = ParentOffset { dx: 2.0, dy: 0.0, d_heading_deg: 0.0 };
    let p = compose(&parent, &offset, 0.0);
    assert_eq!((p.x, p.y, p.heading_deg), (10.0, 7.0, 90.0));
}

#[test]
fn compose_wraps_heading() {
    let parent = Placement::new(0.0, 0.0, 0.0, 300.0);
    let offset = ParentOffset { dx: 0.0, dy: 0.0, d_heading_deg: 90.0 };
    assert_eq!(compose(&parent, &offset, 0.0).heading_deg, 30.0);
}

#[test]
fn compose_passes_height_through() {
    let parent = Placement::new(0.0, 0.0, 3.0, 0.0);
    assert_eq!(compose(&parent, &ParentOffset::default(), 1.25).z, 1.25);
}

#[test]
fn offset_in_parent_frame_inverts_compose() {
    let parent = Placement::new(3.0, -2.0, 0.0, 135.0);
    let child = Placement::new(4.5, 1.0, 0.0, 200.0);
    let offset = offset_in_parent_frame(&child, &parent);
    let back = compose(&parent, &offset, 0.0);
    assert!(approx_eq(back.x, child.x));
    assert!(approx_eq(back.y, child.y));
    assert!(approx_eq(back.heading_deg, child.heading_deg));
    assert!(approx_eq(offset.d_heading_deg, 65.0));
}

#[test]
fn travel_dx_is_centered_on_midpoint() {
    assert_eq!(travel_dx(0.5, 5.0), 0.0);
    assert_eq!(travel_dx(0.0, 5.0), -2.5);
    assert_eq!(travel_dx(1.0, 5.0), 2.5);
}

#[test]
fn clamp_fraction_bounds_and_nan() {
    assert_eq!(clamp_fraction(-0.3), 0.0);
    assert_eq!(clamp_fraction(1.7), 1.0);
    assert_eq!(clamp_fraction(0.42), 0.42);
    assert_eq!(clamp_fraction(f64::NAN), 0.5);
}

// =============================================================
// bind to an ordinary parent
// =============================================================

#[test]
fn bind_point_captures_offset_and_keeps_pose() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(10.0, 5.0, 0.0), unit(12.0, 5.0, 0.8, 30.0)]);
    let (parent, child) = (ids[0], ids[1]);

    store.bind(child, parent).unwrap();

    let u = store.get(child).unwrap().as_unit().unwrap();
    assert_eq!(u.parent_id(), Some(parent));
    assert_eq!(u.parent_offset(), Some(ParentOffset { dx: 2.0, dy: 0.0, d_heading_deg: 30.0 }));
    assert!(u.travel_fraction().is_none());
    assert_eq!((u.placement.x, u.placement.y, u.placement.z), (12.0, 5.0, 0.8));
    assert_eq!(u.mount_class, MountClass::Floor);
}

#[test]
fn bind_point_keeps_unrounded_pose() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![
        table(0.0, 0.0, 37.0),
        unit(1.234_567_89, 2.345_678_9, 0.0, 12.5),
    ]);
    let (parent, child) = (ids[0], ids[1]);
    let before = placement_of(&store, child);

    store.bind(child, parent).unwrap();

    assert_eq!(placement_of(&store, child), before);

    store.update_transform(parent, &TransformPatch::floor_position(1.0, 0.0));
    let p = placement_of(&store, child);
    assert!((p.x - 2.234_567_89).abs() < 1e-6);
    assert!((p.y - 2.345_678_9).abs() < 1e-6);
}

#[test]
fn cascade_rotates_child_with_parent() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(10.0, 5.0, 0.0), unit(12.0, 5.0, 0.0, 0.0)]);
    let (parent, child) = (ids[0], ids[1]);
    store.bind(child, parent).unwrap();

    store.update_transform(parent, &TransformPatch::heading(90.0));

    let p = placement_of(&store, child);
    assert_eq!((p.x, p.y, p.heading_deg), (10.0, 7.0, 90.0));
}

#[test]
fn cascade_never_drifts_over_many_rotations() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(0.0, 0.0, 0.0), unit(3.0, 1.0, 0.0, 0.0)]);
    let (parent, child) = (ids[0], ids[1]);
    store.bind(child, parent).unwrap();

    for step in 1..=240 {
        store.update_transform(parent, &TransformPatch::heading(f64::from(step) * 15.0));
    }
    // 240 * 15 = 3600 = ten full turns.
    let p = placement_of(&store, child);
    assert_eq!((p.x, p.y, p.heading_deg), (3.0, 1.0, 0.0));
}

#[test]
fn cascade_is_transitive() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![
        table(0.0, 0.0, 0.0),
        table(1.0, 0.0, 0.0),
        unit(2.0, 0.0, 0.0, 0.0),
    ]);
    let (base, middle, leaf) = (ids[0], ids[1], ids[2]);
    store.bind(middle, base).unwrap();
    store.bind(leaf, middle).unwrap();

    store.update_transform(base, &TransformPatch::floor_position(0.0, 10.0));

    assert_eq!(placement_of(&store, middle).floor_point().y, 10.0);
    let p = placement_of(&store, leaf);
    assert_eq!((p.x, p.y), (2.0, 10.0));
}

#[test]
fn rebinding_to_ordinary_parent_keeps_height() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![
        track(0.0, 0.0, 1.0, 4.0),
        table(5.0, 0.0, 0.0),
        unit(0.0, 0.0, 0.0, 0.0),
    ]);
    let (rail, bench, robot) = (ids[0], ids[1], ids[2]);
    store.bind(robot, rail).unwrap();
    let mounted_z = placement_of(&store, robot).z;

    store.bind(robot, bench).unwrap();

    let u = store.get(robot).unwrap().as_unit().unwrap();
    assert_eq!(u.parent_id(), Some(bench));
    assert_eq!(u.placement.z, mounted_z);
    assert_eq!(u.mount_class, MountClass::Platform);
    assert!(u.travel_fraction().is_none());
}

// =============================================================
// bind to a travel carrier
// =============================================================

#[test]
fn bind_to_carrier_snaps_to_midpoint_on_mounting_surface() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(3.0, 4.0, 0.0, 45.0)]);
    let (rail, robot) = (ids[0], ids[1]);

    store.bind(robot, rail).unwrap();

    let u = store.get(robot).unwrap().as_unit().unwrap();
    assert_eq!((u.placement.x, u.placement.y), (0.0, 0.0));
    assert_eq!(u.placement.heading_deg, 0.0);
    assert!(approx_eq(u.placement.z, 0.2));
    assert_eq!(u.travel_fraction(), Some(0.5));
    assert_eq!(u.parent_offset(), Some(ParentOffset::default()));
    assert_eq!(u.mount_class, MountClass::Platform);
}

#[test]
fn travel_fraction_endpoints() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    let (rail, robot) = (ids[0], ids[1]);
    store.bind(robot, rail).unwrap();

    assert!(store.set_travel_fraction(robot, 0.0));
    let p = placement_of(&store, robot);
    assert_eq!((p.x, p.y), (-2.5, 0.0));

    assert!(store.set_travel_fraction(robot, 1.0));
    let p = placement_of(&store, robot);
    assert_eq!((p.x, p.y), (2.5, 0.0));
}

#[test]
fn travel_fraction_is_clamped() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    store.bind(ids[1], ids[0]).unwrap();

    store.set_travel_fraction(ids[1], 3.0);
    let u = store.get(ids[1]).unwrap().as_unit().unwrap();
    assert_eq!(u.travel_fraction(), Some(1.0));
    assert_eq!(u.placement.x, 2.5);

    store.set_travel_fraction(ids[1], -1.0);
    assert_eq!(placement_of(&store, ids[1]).x, -2.5);
}

#[test]
fn travel_fraction_follows_rotated_carrier() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(1.0, 1.0, 0.0, 4.0), unit(0.0, 0.0, 0.0, 0.0)]);
    let (rail, robot) = (ids[0], ids[1]);
    store.bind(robot, rail).unwrap();
    store.update_transform(rail, &TransformPatch::heading(90.0));

    store.set_travel_fraction(robot, 1.0);

    let p = placement_of(&store, robot);
    assert_eq!((p.x, p.y, p.heading_deg), (1.0, 3.0, 90.0));
}

#[test]
fn carrier_height_change_lifts_child() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    store.bind(ids[1], ids[0]).unwrap();

    store.update_transform(ids[0], &TransformPatch { z: Some(2.0), ..Default::default() });

    assert!(approx_eq(placement_of(&store, ids[1]).z, 2.2));
}

#[test]
fn set_travel_fraction_on_point_bound_child_is_noop() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(0.0, 0.0, 0.0), unit(1.0, 0.0, 0.0, 0.0)]);
    store.bind(ids[1], ids[0]).unwrap();
    assert!(!store.set_travel_fraction(ids[1], 0.0));
    assert_eq!(placement_of(&store, ids[1]).x, 1.0);
}

#[test]
fn set_travel_fraction_on_unknown_is_noop() {
    let mut store = EntityStore::new();
    assert!(!store.set_travel_fraction(EntityId(4), 0.5));
}

#[test]
fn carrier_thickness_comes_from_config() {
    let config = crate::config::InteractionConfig { carrier_thickness: 0.5, ..Default::default() };
    let mut store = EntityStore::with_config(&config);
    let ids = store.add_entities(vec![track(0.0, 0.0, 1.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    store.bind(ids[1], ids[0]).unwrap();
    assert!(approx_eq(placement_of(&store, ids[1]).z, 1.5));
}

// =============================================================
// Moving a bound child directly
// =============================================================

#[test]
fn moving_point_bound_child_rebases_offset() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(0.0, 0.0, 0.0), unit(1.0, 0.0, 0.0, 0.0)]);
    let (parent, child) = (ids[0], ids[1]);
    store.bind(child, parent).unwrap();

    store.update_transform(child, &TransformPatch::floor_position(0.0, 2.0));
    assert_eq!(placement_of(&store, child).floor_point().y, 2.0);

    store.update_transform(parent, &TransformPatch::floor_position(5.0, 0.0));
    let p = placement_of(&store, child);
    assert_eq!((p.x, p.y), (5.0, 2.0));
}

#[test]
fn turning_point_bound_child_keeps_offset_position() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(0.0, 0.0, 0.0), unit(1.234_567_8, 0.5, 0.0, 0.0)]);
    let (parent, child) = (ids[0], ids[1]);
    store.bind(child, parent).unwrap();
    let offset = store.get(child).unwrap().attachment().offset().unwrap();

    store.update_transform(child, &TransformPatch::heading(90.0));

    let after = store.get(child).unwrap().attachment().offset().unwrap();
    assert_eq!((after.dx, after.dy), (offset.dx, offset.dy));
    assert_eq!(after.d_heading_deg, 90.0);
    let p = placement_of(&store, child);
    assert_eq!((p.x, p.y, p.heading_deg), (1.234_567_8, 0.5, 90.0));
}

#[test]
fn turning_carrier_child_keeps_travel_fraction() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    let (rail, robot) = (ids[0], ids[1]);
    store.update_transform(rail, &TransformPatch::heading(30.0));
    store.bind(robot, rail).unwrap();
    store.set_travel_fraction(robot, 0.123_456_7);
    let before = placement_of(&store, robot);
    let dx = store.get(robot).unwrap().attachment().offset().unwrap().dx;

    for heading in [45.0, 90.0, 200.0, 10.0] {
        store.update_transform(robot, &TransformPatch::heading(heading));
    }

    let u = store.get(robot).unwrap().as_unit().unwrap();
    assert_eq!(u.travel_fraction(), Some(0.123_456_7));
    assert_eq!(u.parent_offset().unwrap().dx, dx);
    assert_eq!(u.parent_offset().unwrap().d_heading_deg, 340.0);
    assert_eq!((u.placement.x, u.placement.y, u.placement.z), (before.x, before.y, before.z));
    assert_eq!(u.placement.heading_deg, 10.0);

    store.update_transform(rail, &TransformPatch::floor_position(1.0, 1.0));
    let u = store.get(robot).unwrap().as_unit().unwrap();
    assert_eq!(u.travel_fraction(), Some(0.123_456_7));
    assert_eq!(u.placement.heading_deg, 10.0);
}

#[test]
fn moving_carrier_child_projects_onto_axis() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    let (rail, robot) = (ids[0], ids[1]);
    store.bind(robot, rail).unwrap();

    store.update_transform(robot, &TransformPatch::floor_position(1.25, 3.0));

    let u = store.get(robot).unwrap().as_unit().unwrap();
    assert_eq!(u.travel_fraction(), Some(0.75));
    assert_eq!((u.placement.x, u.placement.y), (1.25, 0.0));
}

#[test]
fn moving_carrier_child_past_end_clamps() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    store.bind(ids[1], ids[0]).unwrap();

    store.update_transform(ids[1], &TransformPatch::floor_position(-40.0, 0.0));

    let u = store.get(ids[1]).unwrap().as_unit().unwrap();
    assert_eq!(u.travel_fraction(), Some(0.0));
    assert_eq!(u.placement.x, -2.5);
}

// =============================================================
// bind rejection
// =============================================================

#[test]
fn self_bind_is_rejected() {
    let mut store = EntityStore::new();
    let id = store.add_entities(vec![table(0.0, 0.0, 0.0)])[0];
    assert_eq!(store.bind(id, id), Err(AttachError::SelfBind(id)));
    assert!(!store.get(id).unwrap().attachment().is_bound());
}

#[test]
fn direct_cycle_is_rejected_and_store_unchanged() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![table(0.0, 0.0, 0.0), table(1.0, 0.0, 0.0)]);
    let (a, b) = (ids[0], ids[1]);
    store.bind(b, a).unwrap();
    let before_a = store.get(a).unwrap().clone();

    assert_eq!(store.bind(a, b), Err(AttachError::Cycle { child: a, parent: b }));
    assert_eq!(store.get(a).unwrap(), &before_a);
}

#[test]
fn transitive_cycle_is_rejected() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![
        table(0.0, 0.0, 0.0),
        table(1.0, 0.0, 0.0),
        table(2.0, 0.0, 0.0),
    ]);
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    store.bind(b, a).unwrap();
    store.bind(c, b).unwrap();

    assert_eq!(store.bind(a, c), Err(AttachError::Cycle { child: a, parent: c }));
    assert!(!store.get(a).unwrap().attachment().is_bound());
}

#[test]
fn bind_missing_ids_is_rejected() {
    let mut store = EntityStore::new();
    let id = store.add_entities(vec![unit(0.0, 0.0, 0.0, 0.0)])[0];
    assert_eq!(store.bind(id, EntityId(99)), Err(AttachError::NotFound(EntityId(99))));
    assert_eq!(store.bind(EntityId(98), id), Err(AttachError::NotFound(EntityId(98))));
}

#[test]
fn attach_error_messages() {
    assert_eq!(
        AttachError::SelfBind(EntityId(3)).to_string(),
        "entity 3 cannot be bound to itself"
    );
    assert_eq!(
        AttachError::Cycle { child: EntityId(1), parent: EntityId(2) }.to_string(),
        "binding 1 to 2 would create a cycle"
    );
}

// =============================================================
// unbind
// =============================================================

#[test]
fn unbind_leaves_placement_where_it_was() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![track(0.0, 0.0, 0.0, 5.0), unit(0.0, 0.0, 0.0, 0.0)]);
    let (rail, robot) = (ids[0], ids[1]);
    store.bind(robot, rail).unwrap();
    store.set_travel_fraction(robot, 0.0);
    let before = placement_of(&store, robot);

    assert!(store.unbind(robot));

    let u = store.get(robot).unwrap().as_unit().unwrap();
    assert!(u.parent_id().is_none());
    assert!(u.parent_offset().is_none());
    assert!(u.travel_fraction().is_none());
    assert_eq!(u.placement, before);

    store.update_transform(rail, &TransformPatch::floor_position(9.0, 9.0));
    assert_eq!(placement_of(&store, robot), before);
}

#[test]
fn unbind_unbound_or_missing_is_noop() {
    let mut store = EntityStore::new();
    let id = store.add_entities(vec![unit(0.0, 0.0, 0.0, 0.0)])[0];
    assert!(!store.unbind(id));
    assert!(!store.unbind(EntityId(77)));
}

#[test]
fn apply_cascade_reports_descendant_count() {
    let mut store = EntityStore::new();
    let ids = store.add_entities(vec![
        table(0.0, 0.0, 0.0),
        unit(1.0, 0.0, 0.0, 0.0),
        unit(2.0, 0.0, 0.0, 0.0),
    ]);
    store.bind(ids[1], ids[0]).unwrap();
    store.bind(ids[2], ids[1]).unwrap();
    assert_eq!(store.apply_cascade(ids[0]), 2);
    assert_eq!(store.apply_cascade(ids[2]), 0);
}
