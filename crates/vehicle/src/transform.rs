use carriage_common::{Pose, normalize_orientation, rotate_yaw};
use serde::{Deserialize, Serialize};

/// Below this, a launch speed or elevation counts as unset.
const UNSET: f32 = 0.001;

/// Override for the next dismount, written by effect code.
///
/// Consumed and cleared by the next unboarding from the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PendingDestination {
    pub pose: Pose,
    /// Launch speed; zero falls back to the seat exit speed.
    pub speed: f32,
    /// Launch elevation in radians above the horizon.
    pub elevation: f32,
}

impl PendingDestination {
    pub fn new(pose: Pose, speed: f32, elevation: f32) -> Self {
        Self {
            pose,
            speed,
            elevation,
        }
    }

    /// A destination with every component near zero carries no information.
    pub fn is_unset(&self) -> bool {
        self.pose.approx_eq(&Pose::default(), UNSET)
            && self.speed.abs() < UNSET
            && self.elevation.abs() < UNSET
    }
}

/// Offset of `passenger` in the frame of `vehicle`, frozen against the
/// vehicle's current yaw.
pub fn compute_local_boarding_offset(vehicle: &Pose, passenger: &Pose) -> Pose {
    let delta = passenger.position - vehicle.position;
    Pose::new(
        rotate_yaw(delta, -vehicle.yaw),
        normalize_orientation(passenger.yaw - vehicle.yaw),
    )
}

/// World pose of a point held at `local` in the frame of `vehicle`.
///
/// Inverse of [`compute_local_boarding_offset`].
pub fn apply_local_offset(vehicle: &Pose, local: &Pose) -> Pose {
    Pose::new(
        vehicle.position + rotate_yaw(local.position, vehicle.yaw),
        normalize_orientation(vehicle.yaw + local.yaw),
    )
}

/// Seat attachment offset shifted by a pending destination, still relative
/// to the vehicle.
pub fn compute_seat_world_offset(seat_offset: &Pose, pending: Option<&PendingDestination>) -> Pose {
    match pending {
        Some(dest) => Pose::new(
            seat_offset.position + dest.pose.position,
            normalize_orientation(seat_offset.yaw + dest.pose.yaw),
        ),
        None => *seat_offset,
    }
}
