use crate::store::StaticTemplates;
use crate::template::{
    AccessoryTemplate, CreatureTemplate, SeatFlags, SeatTemplate, VehicleFlags, VehicleTemplate,
};
use carriage_common::{CreatureEntry, Pose, SeatTemplateId, SpellId, VehicleId};

/// Small built-in template set: a siege tank with a driver, a gunner and a
/// turret accessory slot, a catapult with a forced-eject seat, a hover disk
/// that is exempt from passenger protection, and a plain footman.
pub fn demo_templates() -> StaticTemplates {
    let mut t = StaticTemplates::new();

    let mut tank = CreatureTemplate::new(28000, "Siege Tank").with_vehicle(1);
    tank.spells = vec![SpellId(62345), SpellId(62522)];
    tank.bounding_radius = 1.5;
    t.insert_creature(tank);
    t.insert_creature(CreatureTemplate::new(28001, "Tank Turret").with_vehicle(4));
    t.insert_creature(CreatureTemplate::new(28100, "Catapult").with_vehicle(2));
    t.insert_creature(CreatureTemplate::new(30234, "Hover Disk").with_vehicle(3));
    t.insert_creature(CreatureTemplate::new(30000, "Footman"));

    let mut driver = SeatTemplate::new(10, SeatFlags::USABLE | SeatFlags::CAN_CONTROL);
    driver.attachment = Pose::from_xyz(0.5, 1.2, 0.0, 0.0);
    let mut gunner = SeatTemplate::new(11, SeatFlags::USABLE | SeatFlags::CAN_ATTACK | SeatFlags::FREE_ACTION);
    gunner.attachment = Pose::from_xyz(-1.0, 1.5, 0.0, std::f32::consts::PI);
    gunner.exit_speed = 14.0;
    let mut turret = SeatTemplate::new(12, SeatFlags::UNCONTROLLED | SeatFlags::HIDE_PASSENGER);
    turret.attachment = Pose::from_xyz(0.0, 2.0, 0.0, 0.0);
    t.insert_seat(driver);
    t.insert_seat(gunner);
    t.insert_seat(turret);

    let mut sling = SeatTemplate::new(
        20,
        SeatFlags::USABLE | SeatFlags::HIDE_PASSENGER | SeatFlags::EJECTABLE_FORCED,
    );
    sling.exit_speed = 20.0;
    sling.exit_gravity = 10.0;
    sling.exit_max_duration = 2.0;
    t.insert_seat(sling);

    t.insert_seat(SeatTemplate::new(30, SeatFlags::USABLE | SeatFlags::CAN_CONTROL));
    t.insert_seat(SeatTemplate::new(40, SeatFlags::USABLE | SeatFlags::CAN_ATTACK));

    t.insert_vehicle(VehicleTemplate {
        id: VehicleId(1),
        flags: VehicleFlags::NO_STRAFE | VehicleFlags::FULL_SPEED_TURNING,
        seats: vec![
            Some(SeatTemplateId(10)),
            Some(SeatTemplateId(11)),
            Some(SeatTemplateId(12)),
        ],
    });
    t.insert_vehicle(VehicleTemplate {
        id: VehicleId(2),
        flags: VehicleFlags::empty(),
        seats: vec![Some(SeatTemplateId(20))],
    });
    t.insert_vehicle(VehicleTemplate {
        id: VehicleId(3),
        flags: VehicleFlags::ALLOW_PITCHING,
        seats: vec![Some(SeatTemplateId(30))],
    });
    t.insert_vehicle(VehicleTemplate {
        id: VehicleId(4),
        flags: VehicleFlags::ACCESSORY,
        seats: vec![Some(SeatTemplateId(40))],
    });

    t.push_accessory(AccessoryTemplate {
        vehicle_entry: CreatureEntry(28000),
        seat: 2,
        passenger_entry: CreatureEntry(28001),
        offset: Pose::from_xyz(0.0, 2.0, 0.0, 0.0),
    });
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TemplateStore;

    #[test]
    fn demo_has_no_dangling_references() {
        let t = demo_templates();
        assert!(t.dangling_references().is_empty(), "{:?}", t.dangling_references());
    }

    #[test]
    fn demo_tank_has_one_accessory() {
        let t = demo_templates();
        assert_eq!(t.accessories(CreatureEntry(28000)).len(), 1);
    }
}
