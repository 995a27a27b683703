use crate::behavior::BehaviorController;
use bitflags::bitflags;
use carriage_common::{CreatureEntry, EntityHandle, Pose, SeatIndex, SpellId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

bitflags! {
    /// Replicated unit field flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitFlags: u32 {
        const NON_ATTACKABLE    = 1 << 0;
        const PLAYER_CONTROLLED = 1 << 1;
        const DISABLE_MOVE      = 1 << 2;
    }
}

bitflags! {
    /// Interaction flags other clients see.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NpcFlags: u32 {
        /// Creature vehicle with a free seat.
        const SPELLCLICK     = 1 << 0;
        /// Player vehicle with a free seat.
        const PLAYER_VEHICLE = 1 << 1;
    }
}

bitflags! {
    /// Server-side unit state, never replicated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitState: u32 {
        /// Seated without free action; own movement suppressed.
        const ON_VEHICLE = 1 << 0;
        /// Movement driven by a charmer.
        const CONTROLLED = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MovementFlags: u32 {
        const ON_TRANSPORT = 1 << 0;
        const ROOT         = 1 << 1;
        const WALKING      = 1 << 2;
        const FLYING       = 1 << 3;
        const CAN_FLY      = 1 << 4;
    }
}

bitflags! {
    /// Secondary movement flags, set from vehicle template flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MovementFlags2: u32 {
        const NO_STRAFE           = 1 << 0;
        const NO_JUMPING          = 1 << 1;
        const FULL_SPEED_TURNING  = 1 << 2;
        const ALLOW_PITCHING      = 1 << 3;
        const FULL_SPEED_PITCHING = 1 << 4;
    }
}

/// Aura effects the vehicle code reads or strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuraKind {
    Fly,
    FlightSpeed,
    Shapeshift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    Player,
    Creature,
}

/// Bookkeeping of a passenger riding a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportLink {
    pub vehicle: EntityHandle,
    pub seat: SeatIndex,
    /// Offset relative to the vehicle, frozen at boarding time.
    pub offset: Pose,
    pub boarded_at_ms: u64,
}

/// Which entity a player's client currently steers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientControl {
    pub target: EntityHandle,
    /// `false` means the client watches but cannot move the target.
    pub allowed: bool,
}

/// Action set of a charmed unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharmInfo {
    pub spells: Vec<SpellId>,
}

/// Everything the kernel tracks about one entity.
#[derive(Debug)]
pub struct Unit {
    pub entry: CreatureEntry,
    pub kind: UnitKind,
    pub pose: Pose,
    pub phase_mask: u32,
    pub bounding_radius: f32,
    pub flags: UnitFlags,
    pub npc_flags: NpcFlags,
    pub state: UnitState,
    pub movement: MovementFlags,
    pub movement2: MovementFlags2,
    pub auras: BTreeSet<AuraKind>,
    /// Who controls this unit.
    pub charmer: Option<EntityHandle>,
    /// Whom this unit controls.
    pub charm: Option<EntityHandle>,
    pub creator: Option<EntityHandle>,
    /// Entity whose movement this player's client drives.
    pub mover: Option<EntityHandle>,
    pub view_point: Option<EntityHandle>,
    pub client_control: Option<ClientControl>,
    pub charm_info: Option<CharmInfo>,
    pub action_bar: Vec<SpellId>,
    pub threat_list: Vec<EntityHandle>,
    pub hostile_refs: Vec<EntityHandle>,
    pub in_combat: bool,
    pub moving: bool,
    pub transport: Option<TransportLink>,
    /// Despawn delay after death, for temporary summons.
    pub corpse_despawn_ms: Option<u64>,
    pub behavior: Option<Box<dyn BehaviorController>>,
}

impl Unit {
    fn with_kind(kind: UnitKind, entry: CreatureEntry, pose: Pose) -> Self {
        Self {
            entry,
            kind,
            pose,
            phase_mask: 1,
            bounding_radius: 0.5,
            flags: UnitFlags::empty(),
            npc_flags: NpcFlags::empty(),
            state: UnitState::empty(),
            movement: MovementFlags::empty(),
            movement2: MovementFlags2::empty(),
            auras: BTreeSet::new(),
            charmer: None,
            charm: None,
            creator: None,
            mover: None,
            view_point: None,
            client_control: None,
            charm_info: None,
            action_bar: Vec::new(),
            threat_list: Vec::new(),
            hostile_refs: Vec::new(),
            in_combat: false,
            moving: false,
            transport: None,
            corpse_despawn_ms: None,
            behavior: None,
        }
    }

    pub fn creature(entry: CreatureEntry, pose: Pose) -> Self {
        Self::with_kind(UnitKind::Creature, entry, pose)
    }

    pub fn player(pose: Pose) -> Self {
        Self::with_kind(UnitKind::Player, CreatureEntry(0), pose)
    }

    pub fn with_behavior(mut self, behavior: Box<dyn BehaviorController>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn is_player(&self) -> bool {
        self.kind == UnitKind::Player
    }

    /// Flight granted by an aura, independent of any vehicle.
    pub fn has_flight_aura(&self) -> bool {
        self.auras.contains(&AuraKind::Fly) || self.auras.contains(&AuraKind::FlightSpeed)
    }

    pub fn is_walking(&self) -> bool {
        self.movement.contains(MovementFlags::WALKING)
    }

    pub fn set_walk(&mut self, walk: bool) {
        self.movement.set(MovementFlags::WALKING, walk);
    }

    pub fn set_root(&mut self, root: bool) {
        self.movement.set(MovementFlags::ROOT, root);
    }

    pub fn is_rooted(&self) -> bool {
        self.movement.contains(MovementFlags::ROOT)
    }

    /// Halt pathing and drop out of combat.
    pub fn stop_moving_and_combat(&mut self) {
        self.moving = false;
        self.in_combat = false;
    }

    /// Forget everything this unit was fighting, in both directions.
    pub fn clear_threat(&mut self) {
        self.threat_list.clear();
        self.hostile_refs.clear();
    }

    /// Remove shapeshift forms. Returns whether any was active.
    pub fn remove_shapeshift(&mut self) -> bool {
        self.auras.remove(&AuraKind::Shapeshift)
    }

    /// Reinitialize the behavior controller, if the unit has one.
    pub fn reinitialize_behavior(&mut self) {
        if let Some(b) = self.behavior.as_mut() {
            b.reinitialize();
        }
    }
}
