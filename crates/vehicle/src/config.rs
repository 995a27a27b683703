use carriage_common::{CreatureEntry, SpellId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Vehicle entries whose seats never make passengers unattackable.
const PROTECTION_EXEMPT: [u32; 5] = [
    33651, // VX-001
    33432, // Leviathan MX
    33118, // Ignis
    30234, // Nexus Lord's Hover Disk
    30248, // Scion's of Eternity Hover Disk
];

/// Errors from loading vehicle configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Boarding and dismount tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Speed used whenever a seat leaves enter/exit speed unset.
    pub base_charge_speed: f32,
    /// World gravity for ballistic apex computation.
    pub gravity: f32,
    /// Cast on a passenger dismounting from an airborne vehicle.
    pub parachute_spell: SpellId,
    /// Corpse despawn delay of summoned accessories.
    pub accessory_despawn_ms: u64,
    /// Distance band behind the vehicle for seat-driven dismounts.
    pub dismount_distance_min: f32,
    pub dismount_distance_max: f32,
    /// Distance for dismounts without seat data.
    pub fallback_dismount_distance: f32,
    /// Lift added to computed landing points.
    pub landing_lift: f32,
    pub protection_exempt: BTreeSet<CreatureEntry>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            base_charge_speed: 27.0,
            gravity: 19.291_105,
            parachute_spell: SpellId(45472),
            accessory_despawn_ms: 30_000,
            dismount_distance_min: 2.0,
            dismount_distance_max: 3.0,
            fallback_dismount_distance: 2.0,
            landing_lift: 0.1,
            protection_exempt: PROTECTION_EXEMPT.into_iter().map(CreatureEntry).collect(),
        }
    }
}

impl VehicleConfig {
    /// Parse YAML; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("base_charge_speed", self.base_charge_speed),
            ("gravity", self.gravity),
            ("dismount_distance_min", self.dismount_distance_min),
            ("dismount_distance_max", self.dismount_distance_max),
            ("fallback_dismount_distance", self.fallback_dismount_distance),
            ("landing_lift", self.landing_lift),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} must be finite, got {value}")));
        }
        if self.base_charge_speed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "base_charge_speed must be positive, got {}",
                self.base_charge_speed
            )));
        }
        if self.gravity <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "gravity must be positive, got {}",
                self.gravity
            )));
        }
        if self.dismount_distance_min < 0.0
            || self.dismount_distance_min >= self.dismount_distance_max
        {
            return Err(ConfigError::Invalid(format!(
                "dismount distance band [{}, {}) is empty",
                self.dismount_distance_min, self.dismount_distance_max
            )));
        }
        if self.fallback_dismount_distance < 0.0 || self.landing_lift < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fallback distance {} and landing lift {} must not be negative",
                self.fallback_dismount_distance, self.landing_lift
            )));
        }
        Ok(())
    }

    /// Whether seats of this vehicle entry skip the unattackable flag.
    pub fn is_protection_exempt(&self, vehicle_entry: CreatureEntry) -> bool {
        self.protection_exempt.contains(&vehicle_entry)
    }
}
