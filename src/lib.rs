//! Spatial interaction core for a 3D-rendered floor planner.
//!
//! The crate owns everything between a raycast hit and an entity transform:
//! the floor/world coordinate mapping, grid snapping, the interaction mode
//! machine, pointer drag and rotate gestures, and the parent/child
//! attachment cascade that lets one entity ride on another. Rendering, asset
//! loading and forms live in the host; the host feeds pointer events and
//! frame ticks into [`engine::EngineCore`] and applies the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Host-facing façade [`engine::EngineCore`] |
//! | [`store`] | Entity store, selection, and change notifications |
//! | [`attach`] | Bind/unbind, travel carriers, and the transform cascade |
//! | [`entity`] | Entity, placement and attachment types |
//! | [`selection`] | Cross-kind exclusive selection |
//! | [`mode`] | Idle/place/drag/rotate state machine |
//! | [`drag`] | Pointer-captured drag and rotate gestures |
//! | [`input`] | Pointer events, hit targets, cursor hints |
//! | [`coords`] | Floor ↔ world frame mapping and angle normalization |
//! | [`snap`] | Grid and heading quantization |
//! | [`config`] | Interaction settings from the environment |
//! | [`consts`] | Shared numeric constants |

pub mod attach;
pub mod config;
pub mod consts;
pub mod coords;
pub mod drag;
pub mod engine;
pub mod entity;
pub mod input;
pub mod mode;
pub mod selection;
pub mod snap;
pub mod store;
