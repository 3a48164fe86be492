//! Shared numeric constants for the floor-plan core.

// ── Snapping ────────────────────────────────────────────────────

/// Default grid pitch for position snapping, in floor units.
pub const DEFAULT_GRID_PITCH: f64 = 0.5;

/// Default angular pitch for heading snapping, in degrees.
pub const DEFAULT_HEADING_PITCH_DEG: f64 = 15.0;

// ── Attachment ──────────────────────────────────────────────────

/// Height of a travel carrier's mounting surface above its own base.
pub const DEFAULT_CARRIER_THICKNESS: f64 = 0.2;

/// Travel extent used when a carrier has no `length` dimension.
pub const DEFAULT_CARRIER_LENGTH: f64 = 1.0;

/// Normalized travel position a child takes when first bound to a carrier.
pub const CARRIER_MIDPOINT: f64 = 0.5;

/// Decimal places kept after each cascade step.
pub const CASCADE_DECIMALS: i32 = 6;

/// Dimension key that holds a carrier's travel extent.
pub const LENGTH_KEY: &str = "length";

// ── Store ───────────────────────────────────────────────────────

/// Default floor offset applied to both axes of a duplicated entity.
pub const DEFAULT_DUPLICATE_OFFSET: f64 = 0.5;

// ── Angles ──────────────────────────────────────────────────────

/// One full turn in degrees.
pub const FULL_TURN_DEG: f64 = 360.0;
