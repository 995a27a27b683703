//! Vehicle seats: boarding, unboarding, control transfer, dismount
//! trajectories, accessories and forced ejects.
//!
//! # Invariants
//! - A seat holds at most one occupant; a passenger rides at most one seat.
//! - Free-seat count equals the number of usable empty seats, and the base's
//!   boardable flag is set exactly when that count is non-zero.
//! - Seat occupants and charm links are handles, re-resolved on every use.
//! - Every seat mutation happens under the map's exclusive lock.

pub mod config;
pub mod control;
pub mod controller;
pub mod dismount;
pub mod eject;
pub mod error;
pub mod inspect;
pub mod map;
pub mod seats;
pub mod transform;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, VehicleConfig};
pub use controller::{AccessoryOutcome, VehicleController, VehicleKit};
pub use dismount::{DismountInput, DismountPlan, plan_dismount};
pub use eject::EjectTask;
pub use error::SeatError;
pub use inspect::{SeatInfo, VehicleInspector, VehicleSummary};
pub use map::{SharedVehicleMap, VehicleMap};
pub use seats::{Occupancy, ScanDirection, Seat, SeatTable};
pub use transform::{
    PendingDestination, apply_local_offset, compute_local_boarding_offset,
    compute_seat_world_offset,
};
