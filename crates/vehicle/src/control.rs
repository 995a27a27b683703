use carriage_common::{EntityHandle, SpellId};
use carriage_data::{SeatTemplate, TemplateStore, VehicleFlags};
use carriage_kernel::{
    BroadcastMessage, CharmInfo, ClientControl, MovementFlags, UnitFlags, UnitState, World,
};
use tracing::debug;

/// Whether the vehicle's template asks to keep its behavior running across
/// control changes. Units without a template (players) never do.
fn keeps_behavior(world: &World, templates: &dyn TemplateStore, vehicle: EntityHandle) -> bool {
    world
        .unit(vehicle)
        .and_then(|v| templates.creature(v.entry))
        .is_some_and(|t| t.keep_ai)
}

fn action_set(seat: &SeatTemplate, world: &World, templates: &dyn TemplateStore, vehicle: EntityHandle) -> Vec<SpellId> {
    if !seat.spells.is_empty() {
        return seat.spells.clone();
    }
    world
        .unit(vehicle)
        .and_then(|v| templates.creature(v.entry))
        .map(|t| t.spells.clone())
        .unwrap_or_default()
}

/// Hand control of `vehicle` to `passenger`.
///
/// Returns `false` without touching anything if either handle is stale.
pub fn on_grant(
    world: &mut World,
    templates: &dyn TemplateStore,
    vehicle: EntityHandle,
    vehicle_flags: VehicleFlags,
    passenger: EntityHandle,
    seat: &SeatTemplate,
) -> bool {
    let keep_ai = keeps_behavior(world, templates, vehicle);
    let spells = action_set(seat, world, templates, vehicle);
    let Some((v, p)) = world.pair_mut(vehicle, passenger) else {
        return false;
    };

    if !vehicle_flags.contains(VehicleFlags::ACCESSORY) {
        v.stop_moving_and_combat();
    }
    v.clear_threat();
    v.charmer = Some(passenger);
    v.state.insert(UnitState::CONTROLLED);
    p.charm = Some(vehicle);
    let announce_flight = v.has_flight_aura();

    if p.is_player() {
        v.flags.insert(UnitFlags::PLAYER_CONTROLLED);
        v.charm_info = Some(CharmInfo {
            spells: spells.clone(),
        });
        p.mover = Some(vehicle);
        p.client_control = Some(ClientControl {
            target: vehicle,
            allowed: true,
        });
        p.action_bar = spells;
    }

    if !keep_ai {
        v.reinitialize_behavior();
    }

    if v.flags.contains(UnitFlags::DISABLE_MOVE) {
        v.set_root(true);
    } else if v.is_walking() != p.is_walking() {
        v.set_walk(p.is_walking());
    }

    if announce_flight {
        world.broadcast(vehicle, vehicle, BroadcastMessage::SetCanFly);
    }
    debug!(%vehicle, %passenger, "control granted");
    true
}

/// Take control of `vehicle` back from `passenger`.
///
/// Returns `false` without touching anything if either handle is stale.
pub fn on_revoke(
    world: &mut World,
    templates: &dyn TemplateStore,
    vehicle: EntityHandle,
    passenger: EntityHandle,
) -> bool {
    let keep_ai = keeps_behavior(world, templates, vehicle);
    let Some((v, p)) = world.pair_mut(vehicle, passenger) else {
        return false;
    };

    if p.charm == Some(vehicle) {
        p.charm = None;
    }
    if v.charmer == Some(passenger) {
        v.charmer = None;
    }
    v.state.remove(UnitState::CONTROLLED);
    v.flags.remove(UnitFlags::PLAYER_CONTROLLED);
    v.charm_info = None;

    if p.is_player() {
        p.mover = None;
        p.client_control = None;
        p.action_bar.clear();
    }

    if !keep_ai {
        v.reinitialize_behavior();
    }

    revoke_flight(world, vehicle, passenger);
    debug!(%vehicle, %passenger, "control revoked");
    true
}

/// If the vehicle can fly but the passenger cannot on its own, tell
/// observers the passenger lost flight and clear its flight flags.
pub fn revoke_flight(world: &mut World, vehicle: EntityHandle, passenger: EntityHandle) -> bool {
    let vehicle_flies = world.unit(vehicle).is_some_and(|v| v.has_flight_aura());
    let Some(p) = world.unit_mut(passenger) else {
        return false;
    };
    if !vehicle_flies || p.has_flight_aura() {
        return false;
    }
    p.movement
        .remove(MovementFlags::FLYING | MovementFlags::CAN_FLY);
    world.broadcast(passenger, passenger, BroadcastMessage::UnsetCanFly);
    true
}
