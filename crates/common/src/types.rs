use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on seats per vehicle template.
pub const MAX_VEHICLE_SEATS: u8 = 8;

/// Seat position within a vehicle, always `< MAX_VEHICLE_SEATS`.
pub type SeatIndex = u8;

/// Identifier for an entity in the world.
///
/// Combines an arena slot with a generation count. When an entity leaves the
/// world its slot may be reused, but the generation is bumped, so stale
/// handles held by seat tables or charm links stop resolving instead of
/// aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle {
    pub index: u32,
    pub generation: u32,
}

impl EntityHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot as a `Vec` index.
    #[inline]
    pub fn slot(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// Generate a typed id wrapper around a static-data key.
macro_rules! template_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                Self(v)
            }
        }
    };
}

template_id! {
    /// Creature template entry (what kind of entity was spawned).
    pub struct CreatureEntry(u32);
}

template_id! {
    /// Vehicle template id, referenced by creature templates.
    pub struct VehicleId(u32);
}

template_id! {
    /// Seat definition id, referenced by vehicle templates.
    pub struct SeatTemplateId(u32);
}

template_id! {
    /// Spell id for action bars and scripted effects.
    pub struct SpellId(u32);
}

/// Position plus facing. Only yaw is tracked; pitch and roll are not part of
/// seat attachment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub yaw: f32,
}

impl Pose {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    pub fn from_xyz(x: f32, y: f32, z: f32, yaw: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            yaw,
        }
    }

    /// Whether every component is within `eps` of `other`.
    pub fn approx_eq(&self, other: &Pose, eps: f32) -> bool {
        self.position.abs_diff_eq(other.position, eps) && (self.yaw - other.yaw).abs() <= eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_with_different_generation_differ() {
        let a = EntityHandle::new(3, 0);
        let b = EntityHandle::new(3, 1);
        assert_ne!(a, b);
        assert_eq!(a.slot(), b.slot());
    }

    #[test]
    fn handle_display() {
        assert_eq!(EntityHandle::new(7, 2).to_string(), "Entity(7v2)");
    }

    #[test]
    fn template_id_display_and_from() {
        let entry: CreatureEntry = 33651.into();
        assert_eq!(entry.to_string(), "CreatureEntry(33651)");
    }

    #[test]
    fn pose_default_is_origin() {
        let p = Pose::default();
        assert_eq!(p.position, Vec3::ZERO);
        assert_eq!(p.yaw, 0.0);
    }

    #[test]
    fn pose_approx_eq() {
        let a = Pose::from_xyz(1.0, 2.0, 3.0, 0.5);
        let b = Pose::from_xyz(1.0 + 1e-6, 2.0, 3.0, 0.5);
        assert!(a.approx_eq(&b, 1e-4));
        assert!(!a.approx_eq(&Pose::default(), 1e-4));
    }
}
