use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Wrap an angle into `(-π, π]`.
pub fn normalize_orientation(o: f32) -> f32 {
    if !o.is_finite() {
        return 0.0;
    }
    let mut a = o.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}

/// Rotate `v` about the vertical axis by `yaw` radians. Height is untouched.
///
/// `yaw = 0` faces +X; positive yaw turns +X toward +Z.
pub fn rotate_yaw(v: Vec3, yaw: f32) -> Vec3 {
    let (s, c) = yaw.sin_cos();
    Vec3::new(v.x * c - v.z * s, v.y, v.x * s + v.z * c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn normalize_keeps_range() {
        for raw in [-10.0_f32, -PI, -1.0, 0.0, 1.0, PI, 4.0, 10.0, 100.0] {
            let n = normalize_orientation(raw);
            assert!(n > -PI - 1e-5 && n <= PI + 1e-5, "{raw} -> {n}");
            assert!((n.sin() - raw.sin()).abs() < 1e-3);
            assert!((n.cos() - raw.cos()).abs() < 1e-3);
        }
    }

    #[test]
    fn normalize_minus_pi_maps_to_pi() {
        assert!((normalize_orientation(-PI) - PI).abs() < 1e-5);
    }

    #[test]
    fn normalize_non_finite_is_zero() {
        assert_eq!(normalize_orientation(f32::NAN), 0.0);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = rotate_yaw(Vec3::new(1.0, 5.0, 0.0), FRAC_PI_2);
        assert!(v.abs_diff_eq(Vec3::new(0.0, 5.0, 1.0), 1e-5));
    }

    #[test]
    fn rotate_inverse() {
        let v = Vec3::new(3.0, -1.0, 2.0);
        let back = rotate_yaw(rotate_yaw(v, 1.2), -1.2);
        assert!(back.abs_diff_eq(v, 1e-5));
    }
}
