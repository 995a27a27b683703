use crate::template::{AccessoryTemplate, CreatureTemplate, SeatTemplate, VehicleTemplate};
use carriage_common::{CreatureEntry, MAX_VEHICLE_SEATS, SeatTemplateId, VehicleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Read-only lookup of static templates.
///
/// Injected into vehicle code instead of being reached through globals, so
/// tests can supply their own tables.
pub trait TemplateStore: Send + Sync {
    fn creature(&self, entry: CreatureEntry) -> Option<&CreatureTemplate>;
    fn vehicle(&self, id: VehicleId) -> Option<&VehicleTemplate>;
    fn seat(&self, id: SeatTemplateId) -> Option<&SeatTemplate>;
    /// Accessories declared for a vehicle creature, in declaration order.
    fn accessories(&self, vehicle_entry: CreatureEntry) -> &[AccessoryTemplate];
}

/// Errors from loading or building a template store.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} template {id}")]
    Duplicate { kind: &'static str, id: u32 },
    #[error("vehicle {vehicle} declares {count} seats, limit is {}", MAX_VEHICLE_SEATS)]
    TooManySeats { vehicle: VehicleId, count: usize },
    #[error("accessory {passenger} of {vehicle} targets seat {seat}, limit is {}", MAX_VEHICLE_SEATS)]
    AccessorySeatOutOfRange {
        vehicle: CreatureEntry,
        passenger: CreatureEntry,
        seat: u8,
    },
}

/// On-disk layout of a template file: flat lists per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateFile {
    #[serde(default)]
    pub creatures: Vec<CreatureTemplate>,
    #[serde(default)]
    pub vehicles: Vec<VehicleTemplate>,
    #[serde(default)]
    pub seats: Vec<SeatTemplate>,
    #[serde(default)]
    pub accessories: Vec<AccessoryTemplate>,
}

/// In-memory template tables.
///
/// BTreeMap keeps iteration deterministic; accessories keep file order per
/// vehicle entry.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    creatures: BTreeMap<CreatureEntry, CreatureTemplate>,
    vehicles: BTreeMap<VehicleId, VehicleTemplate>,
    seats: BTreeMap<SeatTemplateId, SeatTemplate>,
    accessories: BTreeMap<CreatureEntry, Vec<AccessoryTemplate>>,
}

impl StaticTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build tables from a parsed file, rejecting duplicates and
    /// out-of-range seat layouts.
    pub fn from_file(file: TemplateFile) -> Result<Self, TemplateError> {
        let mut store = Self::new();
        for c in file.creatures {
            let id = c.entry.0;
            if store.creatures.insert(c.entry, c).is_some() {
                return Err(TemplateError::Duplicate { kind: "creature", id });
            }
        }
        for v in file.vehicles {
            if v.seats.len() > MAX_VEHICLE_SEATS as usize {
                return Err(TemplateError::TooManySeats {
                    vehicle: v.id,
                    count: v.seats.len(),
                });
            }
            let id = v.id.0;
            if store.vehicles.insert(v.id, v).is_some() {
                return Err(TemplateError::Duplicate { kind: "vehicle", id });
            }
        }
        for s in file.seats {
            let id = s.id.0;
            if store.seats.insert(s.id, s).is_some() {
                return Err(TemplateError::Duplicate { kind: "seat", id });
            }
        }
        for a in file.accessories {
            if a.seat >= MAX_VEHICLE_SEATS {
                return Err(TemplateError::AccessorySeatOutOfRange {
                    vehicle: a.vehicle_entry,
                    passenger: a.passenger_entry,
                    seat: a.seat,
                });
            }
            store.accessories.entry(a.vehicle_entry).or_default().push(a);
        }
        tracing::debug!(
            creatures = store.creatures.len(),
            vehicles = store.vehicles.len(),
            seats = store.seats.len(),
            "templates loaded"
        );
        Ok(store)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        Self::from_file(serde_json::from_str(json)?)
    }

    /// Load a JSON template file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    /// Flatten back into the on-disk layout.
    pub fn to_file(&self) -> TemplateFile {
        TemplateFile {
            creatures: self.creatures.values().cloned().collect(),
            vehicles: self.vehicles.values().cloned().collect(),
            seats: self.seats.values().cloned().collect(),
            accessories: self.accessories.values().flatten().cloned().collect(),
        }
    }

    pub fn insert_creature(&mut self, creature: CreatureTemplate) {
        self.creatures.insert(creature.entry, creature);
    }

    pub fn insert_vehicle(&mut self, vehicle: VehicleTemplate) {
        self.vehicles.insert(vehicle.id, vehicle);
    }

    pub fn insert_seat(&mut self, seat: SeatTemplate) {
        self.seats.insert(seat.id, seat);
    }

    pub fn push_accessory(&mut self, accessory: AccessoryTemplate) {
        self.accessories
            .entry(accessory.vehicle_entry)
            .or_default()
            .push(accessory);
    }

    /// References that do not resolve. Not fatal: unresolved seats are
    /// skipped when a seat table is built.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut out = Vec::new();
        for c in self.creatures.values() {
            if let Some(v) = c.vehicle.filter(|v| !self.vehicles.contains_key(v)) {
                out.push(format!("{} references missing {}", c.entry, v));
            }
        }
        for v in self.vehicles.values() {
            for (index, seat) in v.seat_slots() {
                if !self.seats.contains_key(&seat) {
                    out.push(format!("{} seat {} references missing {}", v.id, index, seat));
                }
            }
        }
        for a in self.accessories.values().flatten() {
            if !self.creatures.contains_key(&a.passenger_entry) {
                out.push(format!(
                    "accessory of {} references missing {}",
                    a.vehicle_entry, a.passenger_entry
                ));
            }
        }
        out
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }
}

impl TemplateStore for StaticTemplates {
    fn creature(&self, entry: CreatureEntry) -> Option<&CreatureTemplate> {
        self.creatures.get(&entry)
    }

    fn vehicle(&self, id: VehicleId) -> Option<&VehicleTemplate> {
        self.vehicles.get(&id)
    }

    fn seat(&self, id: SeatTemplateId) -> Option<&SeatTemplate> {
        self.seats.get(&id)
    }

    fn accessories(&self, vehicle_entry: CreatureEntry) -> &[AccessoryTemplate] {
        self.accessories
            .get(&vehicle_entry)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::SeatFlags;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "creatures": [
            {"entry": 100, "name": "Siege Engine", "vehicle": 1},
            {"entry": 200, "name": "Turret"}
        ],
        "vehicles": [
            {"id": 1, "seats": [10, null, 11]}
        ],
        "seats": [
            {"id": 10, "flags": "USABLE | CAN_CONTROL", "exit_speed": 12.0},
            {"id": 11, "flags": "USABLE"}
        ],
        "accessories": [
            {"vehicle_entry": 100, "seat": 2, "passenger_entry": 200},
            {"vehicle_entry": 100, "seat": 1, "passenger_entry": 200}
        ]
    }"#;

    #[test]
    fn parse_sample() {
        let store = StaticTemplates::from_json_str(SAMPLE).unwrap();
        assert_eq!(store.creature_count(), 2);
        assert_eq!(store.vehicle_count(), 1);
        let seat = store.seat(SeatTemplateId(10)).unwrap();
        assert!(seat.flags.contains(SeatFlags::CAN_CONTROL));
        assert_eq!(seat.exit_speed, 12.0);
    }

    #[test]
    fn accessories_keep_declaration_order() {
        let store = StaticTemplates::from_json_str(SAMPLE).unwrap();
        let acc = store.accessories(CreatureEntry(100));
        assert_eq!(acc.len(), 2);
        assert_eq!(acc[0].seat, 2);
        assert_eq!(acc[1].seat, 1);
        assert!(store.accessories(CreatureEntry(999)).is_empty());
    }

    #[test]
    fn duplicate_creature_rejected() {
        let json = r#"{"creatures": [
            {"entry": 1, "name": "a"},
            {"entry": 1, "name": "b"}
        ]}"#;
        let err = StaticTemplates::from_json_str(json).unwrap_err();
        assert!(matches!(err, TemplateError::Duplicate { kind: "creature", id: 1 }));
    }

    #[test]
    fn too_many_seats_rejected() {
        let json = r#"{"vehicles": [{"id": 1, "seats": [1,2,3,4,5,6,7,8,9]}]}"#;
        assert!(matches!(
            StaticTemplates::from_json_str(json),
            Err(TemplateError::TooManySeats { count: 9, .. })
        ));
    }

    #[test]
    fn accessory_seat_out_of_range_rejected() {
        let json = r#"{"accessories": [{"vehicle_entry": 1, "seat": 8, "passenger_entry": 2}]}"#;
        assert!(matches!(
            StaticTemplates::from_json_str(json),
            Err(TemplateError::AccessorySeatOutOfRange { seat: 8, .. })
        ));
    }

    #[test]
    fn dangling_seat_reported() {
        let json = r#"{"vehicles": [{"id": 1, "seats": [42]}]}"#;
        let store = StaticTemplates::from_json_str(json).unwrap();
        let dangling = store.dangling_references();
        assert_eq!(dangling.len(), 1);
        assert!(dangling[0].contains("SeatTemplateId(42)"));
    }

    #[test]
    fn load_from_disk_and_flatten() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let store = StaticTemplates::load(file.path()).unwrap();
        let flat = store.to_file();
        assert_eq!(flat.creatures.len(), 2);
        assert_eq!(flat.accessories.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            StaticTemplates::load("/nonexistent/templates.json"),
            Err(TemplateError::Io(_))
        ));
    }
}
