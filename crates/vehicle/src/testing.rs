use crate::config::VehicleConfig;
use crate::map::VehicleMap;
use carriage_common::{CreatureEntry, Pose, SeatTemplateId, SpellId, VehicleId};
use carriage_data::{
    AccessoryTemplate, CreatureTemplate, SeatFlags, SeatTemplate, StaticTemplates, TemplateStore,
    VehicleFlags, VehicleTemplate,
};
use carriage_kernel::{Unit, World};
use std::sync::Arc;

pub const ENGINE: u32 = 100;
pub const STEADY_ENGINE: u32 = 101;
pub const CATAPULT: u32 = 102;
pub const TOWER: u32 = 103;
pub const GUNNER: u32 = 104;
pub const TURRET: u32 = 105;
pub const CARRIER: u32 = 106;
pub const CHARIOT: u32 = 107;
pub const BROKEN_RIG: u32 = 108;
pub const CREWED_CATAPULT: u32 = 109;
pub const FOOTMAN: u32 = 200;
pub const HOVER_DISK: u32 = 30234;

fn seat(id: u32, flags: SeatFlags) -> SeatTemplate {
    SeatTemplate::new(id, flags)
}

fn vehicle(id: u32, flags: VehicleFlags, seats: &[u32]) -> VehicleTemplate {
    VehicleTemplate {
        id: VehicleId(id),
        flags,
        seats: seats.iter().map(|s| Some(SeatTemplateId(*s))).collect(),
    }
}

/// Templates covering every seat shape the tests need.
///
/// Vehicle 1 is the two-seat `{0: usable+controllable, 1: usable}` layout.
pub fn store() -> StaticTemplates {
    let mut s = StaticTemplates::new();

    s.insert_seat(seat(1, SeatFlags::USABLE | SeatFlags::CAN_CONTROL));
    s.insert_seat(seat(2, SeatFlags::USABLE));
    let mut sling = seat(3, SeatFlags::USABLE | SeatFlags::HIDE_PASSENGER | SeatFlags::EJECTABLE_FORCED);
    sling.exit_speed = 20.0;
    sling.exit_gravity = 10.0;
    sling.exit_max_duration = 2.0;
    s.insert_seat(sling);
    s.insert_seat(seat(4, SeatFlags::USABLE | SeatFlags::CAN_ATTACK | SeatFlags::FREE_ACTION));
    s.insert_seat(seat(5, SeatFlags::UNCONTROLLED));

    s.insert_vehicle(vehicle(1, VehicleFlags::NO_STRAFE | VehicleFlags::FULL_SPEED_PITCHING, &[1, 2]));
    s.insert_vehicle(vehicle(2, VehicleFlags::empty(), &[3]));
    s.insert_vehicle(vehicle(3, VehicleFlags::empty(), &[1, 5]));
    s.insert_vehicle(vehicle(4, VehicleFlags::ACCESSORY, &[1]));
    s.insert_vehicle(vehicle(5, VehicleFlags::empty(), &[5]));
    s.insert_vehicle(vehicle(6, VehicleFlags::empty(), &[1, 2, 4]));

    let mut engine = CreatureTemplate::new(ENGINE, "Siege Engine").with_vehicle(1);
    engine.spells = vec![SpellId(500), SpellId(501)];
    engine.bounding_radius = 2.0;
    s.insert_creature(engine);
    let mut steady = CreatureTemplate::new(STEADY_ENGINE, "Steady Engine").with_vehicle(1);
    steady.keep_ai = true;
    s.insert_creature(steady);
    s.insert_creature(CreatureTemplate::new(CATAPULT, "Catapult").with_vehicle(2));
    s.insert_creature(CreatureTemplate::new(TOWER, "Siege Tower").with_vehicle(3));
    s.insert_creature(CreatureTemplate::new(GUNNER, "Tower Gunner"));
    s.insert_creature(CreatureTemplate::new(TURRET, "Turret").with_vehicle(4));
    s.insert_creature(CreatureTemplate::new(CARRIER, "Turret Carrier").with_vehicle(5));
    s.insert_creature(CreatureTemplate::new(CHARIOT, "Chariot").with_vehicle(6));
    s.insert_creature(CreatureTemplate::new(BROKEN_RIG, "Broken Rig").with_vehicle(1));
    s.insert_creature(CreatureTemplate::new(CREWED_CATAPULT, "Crewed Catapult").with_vehicle(2));
    s.insert_creature(CreatureTemplate::new(FOOTMAN, "Footman"));
    s.insert_creature(CreatureTemplate::new(HOVER_DISK, "Hover Disk").with_vehicle(1));

    s.push_accessory(AccessoryTemplate {
        vehicle_entry: CreatureEntry(TOWER),
        seat: 1,
        passenger_entry: CreatureEntry(GUNNER),
        offset: Pose::from_xyz(0.0, 2.0, 0.0, 0.0),
    });
    s.push_accessory(AccessoryTemplate {
        vehicle_entry: CreatureEntry(CARRIER),
        seat: 0,
        passenger_entry: CreatureEntry(TURRET),
        offset: Pose::from_xyz(1.0, 0.0, 0.0, 0.0),
    });
    // Crew sits on the forced-eject seat without any offset.
    s.push_accessory(AccessoryTemplate {
        vehicle_entry: CreatureEntry(CREWED_CATAPULT),
        seat: 0,
        passenger_entry: CreatureEntry(FOOTMAN),
        offset: Pose::default(),
    });
    // Unknown companion entry, then a seat vehicle 1 does not have.
    s.push_accessory(AccessoryTemplate {
        vehicle_entry: CreatureEntry(BROKEN_RIG),
        seat: 0,
        passenger_entry: CreatureEntry(9999),
        offset: Pose::default(),
    });
    s.push_accessory(AccessoryTemplate {
        vehicle_entry: CreatureEntry(BROKEN_RIG),
        seat: 5,
        passenger_entry: CreatureEntry(GUNNER),
        offset: Pose::default(),
    });
    s
}

/// A bare creature unit carrying its template's radius.
pub fn unit_of(store: &StaticTemplates, entry: u32) -> Unit {
    let mut unit = Unit::creature(CreatureEntry(entry), Pose::default());
    if let Some(t) = store.creature(CreatureEntry(entry)) {
        unit.bounding_radius = t.bounding_radius;
    }
    unit
}

/// Empty map over the fixture store with default config and seed 7.
pub fn map() -> VehicleMap {
    VehicleMap::new(World::with_seed(7), Arc::new(store()), VehicleConfig::default())
}
