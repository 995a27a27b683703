use crate::config::VehicleConfig;
use crate::transform::PendingDestination;
use carriage_common::Pose;
use carriage_data::SeatTemplate;
use carriage_kernel::MotionCommand;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, PI};

/// Everything the planner reads about the vehicle being left.
#[derive(Debug, Clone, Copy)]
pub struct DismountInput<'a> {
    /// Pose of the base, or of the outer vehicle if the base is itself seated.
    pub base_pose: Pose,
    pub base_radius: f32,
    pub seat: Option<&'a SeatTemplate>,
    pub pending: Option<PendingDestination>,
    /// Walkable ground height under the base.
    pub ground_height: f32,
}

/// Computed exit path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DismountPlan {
    /// Parabolic launch to a trusted destination.
    Ballistic {
        destination: Vec3,
        yaw: f32,
        horizontal_speed: f32,
        apex: f32,
    },
    /// Flat glide to a nearby landing point.
    Glide { destination: Vec3, speed: f32 },
}

impl DismountPlan {
    pub fn destination(&self) -> Vec3 {
        match self {
            DismountPlan::Ballistic { destination, .. } | DismountPlan::Glide { destination, .. } => {
                *destination
            }
        }
    }

    pub fn speed(&self) -> f32 {
        match self {
            DismountPlan::Ballistic {
                horizontal_speed, ..
            } => *horizontal_speed,
            DismountPlan::Glide { speed, .. } => *speed,
        }
    }

    /// Motion order for a passenger currently facing `facing`.
    pub fn to_motion(&self, facing: f32) -> MotionCommand {
        match *self {
            DismountPlan::Ballistic {
                destination,
                yaw,
                horizontal_speed,
                apex,
            } => MotionCommand::Glide {
                destination,
                yaw,
                speed: horizontal_speed,
                apex,
                eject: true,
            },
            DismountPlan::Glide { destination, speed } => MotionCommand::Glide {
                destination,
                yaw: facing,
                speed,
                apex: 0.0,
                eject: false,
            },
        }
    }
}

/// `value` if set (positive), else `fallback`.
fn or_default(value: f32, fallback: f32) -> f32 {
    if value > f32::EPSILON { value } else { fallback }
}

/// Peak height of a launch with `vertical_speed`, decelerating under
/// `seat_gravity` to its half time and falling under `world_gravity`.
pub fn ballistic_apex(vertical_speed: f32, seat_gravity: f32, world_gravity: f32) -> f32 {
    if vertical_speed <= 0.0 || seat_gravity <= 0.0 {
        return 0.0;
    }
    let t = vertical_speed / seat_gravity;
    (vertical_speed * t - 0.5 * world_gravity * t * t).max(0.0)
}

/// Point `distance` from `origin` at `angle` relative to its facing.
pub fn close_point(origin: &Pose, distance: f32, angle: f32) -> Vec3 {
    let heading = origin.yaw + angle;
    origin.position + Vec3::new(heading.cos(), 0.0, heading.sin()) * distance
}

/// Plan a dismount. A pending destination wins over the seat's exit data,
/// which wins over configured defaults. Consumes randomness only for
/// seat-driven landings.
pub fn plan_dismount(input: &DismountInput<'_>, config: &VehicleConfig, rng: &mut impl Rng) -> DismountPlan {
    let base = input.base_pose;

    if let Some(dest) = input.pending {
        let seat_speed = input.seat.map_or(0.0, |s| s.exit_speed);
        let seat_gravity = input.seat.map_or(0.0, |s| s.exit_gravity);
        let speed = or_default(dest.speed, or_default(seat_speed, config.base_charge_speed));
        let (sin, cos) = dest.elevation.sin_cos();
        let vertical = speed * sin;
        let apex = ballistic_apex(vertical, or_default(seat_gravity, config.gravity), config.gravity);
        return DismountPlan::Ballistic {
            destination: dest.pose.position,
            yaw: dest.pose.yaw,
            horizontal_speed: speed * cos,
            apex,
        };
    }

    let lift = config.landing_lift;
    match input.seat {
        Some(seat) => {
            let distance = input.base_radius
                + rng.gen_range(config.dismount_distance_min..config.dismount_distance_max);
            let angle = rng.gen_range(FRAC_PI_2..(PI + FRAC_PI_2));
            let mut point = close_point(&base, distance, angle);
            point.y = input.ground_height.max(base.position.y) + lift;
            DismountPlan::Glide {
                destination: point,
                speed: or_default(seat.exit_speed, config.base_charge_speed),
            }
        }
        None => {
            let mut point = close_point(
                &base,
                input.base_radius + config.fallback_dismount_distance,
                PI,
            );
            point.y = input.ground_height.max(base.position.y) + lift;
            DismountPlan::Glide {
                destination: point,
                speed: config.base_charge_speed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carriage_data::SeatFlags;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::f32::consts::FRAC_PI_4;

    fn input(seat: Option<&SeatTemplate>, pending: Option<PendingDestination>) -> DismountInput<'_> {
        DismountInput {
            base_pose: Pose::from_xyz(10.0, 5.0, -3.0, 0.0),
            base_radius: 1.5,
            seat,
            pending,
            ground_height: 0.0,
        }
    }

    #[test]
    fn unset_exit_speed_falls_back_to_charge_speed() {
        let seat = SeatTemplate::new(1, SeatFlags::USABLE);
        let config = VehicleConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..32 {
            let plan = plan_dismount(&input(Some(&seat), None), &config, &mut rng);
            assert!(matches!(plan, DismountPlan::Glide { .. }));
            assert_eq!(plan.speed(), config.base_charge_speed);
            assert!(plan.destination().y >= 5.0);
        }
    }

    #[test]
    fn seat_landing_lies_behind_within_band() {
        let mut seat = SeatTemplate::new(1, SeatFlags::USABLE);
        seat.exit_speed = 14.0;
        let config = VehicleConfig::default();
        let mut rng = SmallRng::seed_from_u64(99);
        let inp = input(Some(&seat), None);
        for _ in 0..64 {
            let plan = plan_dismount(&inp, &config, &mut rng);
            assert_eq!(plan.speed(), 14.0);
            let d = plan.destination();
            let flat = Vec3::new(d.x - 10.0, 0.0, d.z + 3.0);
            let dist = flat.length();
            assert!((3.5 - 1e-3..=4.5 + 1e-3).contains(&dist), "distance {dist}");
            // Facing +X: the landing is never ahead of the base.
            assert!(flat.x <= 1e-3, "ahead: {flat:?}");
            assert!((d.y - 5.1).abs() < 1e-4);
        }
    }

    #[test]
    fn seat_landing_never_below_ground() {
        let seat = SeatTemplate::new(1, SeatFlags::USABLE);
        let config = VehicleConfig::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut inp = input(Some(&seat), None);
        inp.ground_height = 9.0;
        for _ in 0..16 {
            let d = plan_dismount(&inp, &config, &mut rng).destination();
            assert!((d.y - 9.1).abs() < 1e-4, "landed at {}", d.y);
        }
    }

    #[test]
    fn pending_destination_is_ballistic() {
        let config = VehicleConfig::default();
        let target = Pose::from_xyz(40.0, 2.0, 0.0, 1.0);
        let pending = PendingDestination::new(target, 30.0, FRAC_PI_4);
        let mut rng = SmallRng::seed_from_u64(0);
        let plan = plan_dismount(&input(None, Some(pending)), &config, &mut rng);
        let DismountPlan::Ballistic {
            destination,
            yaw,
            horizontal_speed,
            apex,
        } = plan
        else {
            panic!("expected ballistic, got {plan:?}");
        };
        assert_eq!(destination, target.position);
        assert_eq!(yaw, 1.0);
        let component = 30.0 * FRAC_PI_4.cos();
        assert!((horizontal_speed - component).abs() < 1e-3);
        // Equal gravities: h = v²/(2g).
        let expected = component * component / (2.0 * config.gravity);
        assert!((apex - expected).abs() < 1e-3, "{apex} vs {expected}");
    }

    #[test]
    fn pending_without_speed_uses_seat_speed_and_gravity() {
        let config = VehicleConfig::default();
        let mut seat = SeatTemplate::new(1, SeatFlags::USABLE);
        seat.exit_speed = 20.0;
        seat.exit_gravity = 40.0;
        let pending = PendingDestination::new(Pose::from_xyz(0.0, 0.0, 30.0, 0.0), 0.0, FRAC_PI_2);
        let mut rng = SmallRng::seed_from_u64(0);
        let plan = plan_dismount(&input(Some(&seat), Some(pending)), &config, &mut rng);
        let DismountPlan::Ballistic {
            horizontal_speed,
            apex,
            ..
        } = plan
        else {
            panic!("expected ballistic");
        };
        assert!(horizontal_speed.abs() < 1e-3);
        let t = 20.0 / 40.0;
        let expected = 20.0 * t - 0.5 * config.gravity * t * t;
        assert!((apex - expected).abs() < 1e-3);
    }

    #[test]
    fn apex_never_negative() {
        assert_eq!(ballistic_apex(10.0, 1.0, 100.0), 0.0);
        assert_eq!(ballistic_apex(-5.0, 10.0, 10.0), 0.0);
        assert_eq!(ballistic_apex(5.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn fallback_goes_straight_back_onto_ground() {
        let config = VehicleConfig::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut inp = input(None, None);
        inp.ground_height = 8.0;
        let plan = plan_dismount(&inp, &config, &mut rng);
        assert_eq!(plan.speed(), config.base_charge_speed);
        let d = plan.destination();
        assert!((d.x - (10.0 - 3.5)).abs() < 1e-4);
        assert!((d.z + 3.0).abs() < 1e-4);
        assert!((d.y - 8.1).abs() < 1e-4);
    }

    #[test]
    fn glide_motion_keeps_facing() {
        let plan = DismountPlan::Glide {
            destination: Vec3::ONE,
            speed: 5.0,
        };
        let MotionCommand::Glide { yaw, apex, eject, .. } = plan.to_motion(0.7) else {
            panic!("expected glide");
        };
        assert_eq!(yaw, 0.7);
        assert_eq!(apex, 0.0);
        assert!(!eject);
    }

    #[test]
    fn same_seed_same_landing() {
        let seat = SeatTemplate::new(1, SeatFlags::USABLE);
        let config = VehicleConfig::default();
        let a = plan_dismount(&input(Some(&seat), None), &config, &mut SmallRng::seed_from_u64(5));
        let b = plan_dismount(&input(Some(&seat), None), &config, &mut SmallRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
