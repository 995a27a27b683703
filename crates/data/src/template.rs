use bitflags::bitflags;
use carriage_common::{CreatureEntry, MAX_VEHICLE_SEATS, Pose, SeatIndex, SeatTemplateId, SpellId, VehicleId};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capability flags of a single seat.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SeatFlags: u32 {
        /// Seat can be boarded by normal seat selection.
        const USABLE           = 1 << 0;
        /// Occupant takes control of the vehicle.
        const CAN_CONTROL      = 1 << 1;
        /// Seat is explicitly uncontrolled (boardable even when not usable).
        const UNCONTROLLED     = 1 << 2;
        const HIDE_PASSENGER   = 1 << 3;
        const UNATTACKABLE     = 1 << 4;
        /// Occupant keeps its own movement and actions.
        const FREE_ACTION      = 1 << 5;
        const CAN_ATTACK       = 1 << 6;
        /// Occupant is ejected after `exit_max_duration` when a destination is pending.
        const EJECTABLE_FORCED = 1 << 7;
    }
}

bitflags! {
    /// Vehicle-wide template flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct VehicleFlags: u32 {
        const NO_STRAFE           = 1 << 0;
        const NO_JUMPING          = 1 << 1;
        const FULL_SPEED_TURNING  = 1 << 2;
        const ALLOW_PITCHING      = 1 << 3;
        const FULL_SPEED_PITCHING = 1 << 4;
        /// Vehicle is itself towed/attached to another vehicle.
        const ACCESSORY           = 1 << 5;
    }
}

/// Static definition of one seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatTemplate {
    pub id: SeatTemplateId,
    #[serde(default)]
    pub flags: SeatFlags,
    /// Attachment point relative to the vehicle origin.
    #[serde(default)]
    pub attachment: Pose,
    #[serde(default)]
    pub enter_speed: f32,
    #[serde(default)]
    pub exit_speed: f32,
    #[serde(default)]
    pub exit_gravity: f32,
    /// Seconds before a forced eject fires.
    #[serde(default)]
    pub exit_max_duration: f32,
    /// Action bar granted to a controlling player. Empty falls back to the
    /// vehicle creature's own spells.
    #[serde(default)]
    pub spells: Vec<SpellId>,
}

impl SeatTemplate {
    pub fn new(id: u32, flags: SeatFlags) -> Self {
        Self {
            id: SeatTemplateId(id),
            flags,
            attachment: Pose::default(),
            enter_speed: 0.0,
            exit_speed: 0.0,
            exit_gravity: 0.0,
            exit_max_duration: 0.0,
            spells: Vec::new(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.flags.contains(SeatFlags::USABLE)
    }

    pub fn can_control(&self) -> bool {
        self.flags.contains(SeatFlags::CAN_CONTROL)
    }

    pub fn has_free_action(&self) -> bool {
        self.flags.contains(SeatFlags::FREE_ACTION)
    }

    pub fn is_forced_ejectable(&self) -> bool {
        self.flags.contains(SeatFlags::EJECTABLE_FORCED)
    }

    /// Boardable by automatic selection: usable, or explicitly uncontrolled.
    pub fn is_selectable(&self) -> bool {
        self.flags
            .intersects(SeatFlags::USABLE | SeatFlags::UNCONTROLLED)
    }

    /// Hidden, unattackable or controlling seats shield their occupant,
    /// unless the seat leaves the occupant free to act.
    pub fn protects_passenger(&self) -> bool {
        self.flags.intersects(
            SeatFlags::UNATTACKABLE | SeatFlags::HIDE_PASSENGER | SeatFlags::CAN_CONTROL,
        ) && !self.has_free_action()
    }
}

/// Static definition of a vehicle: flags plus up to `MAX_VEHICLE_SEATS` seat
/// slots, indexed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTemplate {
    pub id: VehicleId,
    #[serde(default)]
    pub flags: VehicleFlags,
    /// Seat definition per seat index; `None` leaves the slot unused.
    pub seats: Vec<Option<SeatTemplateId>>,
}

impl VehicleTemplate {
    /// Seat slots that name a definition, with their index.
    pub fn seat_slots(&self) -> impl Iterator<Item = (SeatIndex, SeatTemplateId)> + '_ {
        self.seats
            .iter()
            .take(MAX_VEHICLE_SEATS as usize)
            .enumerate()
            .filter_map(|(i, id)| id.map(|id| (i as SeatIndex, id)))
    }
}

/// Static definition of a creature kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureTemplate {
    pub entry: CreatureEntry,
    pub name: String,
    /// Present when this creature carries the vehicle capability.
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
    /// Keep the running behavior controller across control changes.
    #[serde(default)]
    pub keep_ai: bool,
    #[serde(default)]
    pub spells: Vec<SpellId>,
    #[serde(default = "default_bounding_radius")]
    pub bounding_radius: f32,
}

fn default_bounding_radius() -> f32 {
    0.5
}

impl CreatureTemplate {
    pub fn new(entry: u32, name: impl Into<String>) -> Self {
        Self {
            entry: CreatureEntry(entry),
            name: name.into(),
            vehicle: None,
            keep_ai: false,
            spells: Vec::new(),
            bounding_radius: default_bounding_radius(),
        }
    }

    pub fn with_vehicle(mut self, id: u32) -> Self {
        self.vehicle = Some(VehicleId(id));
        self
    }
}

/// A companion that a vehicle summons and seats for itself on initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryTemplate {
    /// Creature entry of the vehicle that owns this accessory.
    pub vehicle_entry: CreatureEntry,
    pub seat: SeatIndex,
    pub passenger_entry: CreatureEntry,
    /// Summon offset relative to the vehicle, reused as the seating offset.
    #[serde(default)]
    pub offset: Pose,
}
