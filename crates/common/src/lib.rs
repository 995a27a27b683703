//! Shared types for the carriage workspace.
//!
//! # Invariants
//! - Entity references are generational handles, never owning pointers.
//! - Y is the vertical axis; yaw rotates about +Y, ground plane is XZ.

mod math;
mod types;

pub use math::{normalize_orientation, rotate_yaw};
pub use types::{
    CreatureEntry, EntityHandle, MAX_VEHICLE_SEATS, Pose, SeatIndex, SeatTemplateId, SpellId,
    VehicleId,
};
