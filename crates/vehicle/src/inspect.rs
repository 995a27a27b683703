use crate::map::VehicleMap;
use carriage_common::{CreatureEntry, EntityHandle, SeatIndex};
use carriage_data::SeatFlags;

/// Read-only seat queries for tooling and debugging.
pub struct VehicleInspector;

impl VehicleInspector {
    /// Seat-by-seat picture of one vehicle.
    pub fn summary(map: &VehicleMap, vehicle: EntityHandle) -> Option<VehicleSummary> {
        let kit = map.vehicle(vehicle)?;
        let seats = kit
            .seats()
            .iter()
            .map(|seat| SeatInfo {
                index: seat.index(),
                flags: seat.template().flags,
                occupant: map.passenger_at(vehicle, seat.index()),
                controlled: seat.is_controlled(),
                dismount_allowed: seat.dismount_allowed(),
            })
            .collect();
        Some(VehicleSummary {
            vehicle,
            entry: kit.entry(),
            free_seats: kit.seats().free_count(),
            initialized: kit.is_initialized(),
            has_destination: kit.pending().is_some(),
            seats,
        })
    }

    /// Summaries of every vehicle on the map, in handle order.
    pub fn all(map: &VehicleMap) -> Vec<VehicleSummary> {
        map.vehicles()
            .filter_map(|kit| Self::summary(map, kit.base()))
            .collect()
    }
}

/// One seat as seen by the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatInfo {
    pub index: SeatIndex,
    pub flags: SeatFlags,
    pub occupant: Option<EntityHandle>,
    pub controlled: bool,
    pub dismount_allowed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSummary {
    pub vehicle: EntityHandle,
    pub entry: CreatureEntry,
    pub free_seats: usize,
    pub initialized: bool,
    pub has_destination: bool,
    pub seats: Vec<SeatInfo>,
}

impl VehicleSummary {
    pub fn occupied(&self) -> usize {
        self.seats.iter().filter(|s| s.occupant.is_some()).count()
    }
}

impl std::fmt::Display for VehicleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Vehicle {} entry={} seats={} occupied={} free={}",
            self.vehicle,
            self.entry,
            self.seats.len(),
            self.occupied(),
            self.free_seats,
        )?;
        for seat in &self.seats {
            write!(f, "\n  [{}] ", seat.index)?;
            match seat.occupant {
                Some(h) if seat.controlled => write!(f, "{h} (driving)")?,
                Some(h) => write!(f, "{h}")?,
                None => write!(f, "empty")?,
            }
            if !seat.dismount_allowed {
                write!(f, " locked")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ENGINE, TOWER};
    use carriage_common::Pose;

    #[test]
    fn summary_of_unknown_vehicle_is_none() {
        let mut map = testing::map();
        let a = map.spawn_player(Pose::default());
        assert!(VehicleInspector::summary(&map, a).is_none());
        assert!(VehicleInspector::all(&map).is_empty());
    }

    #[test]
    fn summary_reports_occupants_and_control() {
        let mut map = testing::map();
        let v = map.spawn_creature(CreatureEntry(ENGINE), Pose::default()).unwrap();
        let a = map.spawn_player(Pose::default());
        map.add_passenger(v, a, Some(0)).unwrap();

        let summary = VehicleInspector::summary(&map, v).unwrap();
        assert_eq!(summary.entry, CreatureEntry(ENGINE));
        assert_eq!(summary.free_seats, 1);
        assert_eq!(summary.occupied(), 1);
        assert!(summary.initialized);
        assert_eq!(summary.seats[0].occupant, Some(a));
        assert!(summary.seats[0].controlled);
        assert!(summary.seats[0].flags.contains(SeatFlags::CAN_CONTROL));
        assert_eq!(summary.seats[1].occupant, None);

        let text = summary.to_string();
        assert!(text.contains("occupied=1"));
        assert!(text.contains("(driving)"));
        assert!(text.contains("[1] empty"));
    }

    #[test]
    fn locked_seats_are_marked() {
        let mut map = testing::map();
        let tower = map.spawn_creature(CreatureEntry(TOWER), Pose::default()).unwrap();
        let gunner = map.passenger_at(tower, 1).unwrap();
        assert!(map.disable_dismount(tower, gunner));
        let summary = VehicleInspector::summary(&map, tower).unwrap();
        assert!(!summary.seats[1].dismount_allowed);
        assert!(summary.to_string().contains("locked"));
        assert_eq!(VehicleInspector::all(&map).len(), 1);
    }
}
