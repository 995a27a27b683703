use crate::config::VehicleConfig;
use crate::control;
use crate::dismount::{DismountInput, plan_dismount};
use crate::eject::EjectTask;
use crate::error::SeatError;
use crate::seats::{ScanDirection, Seat, SeatTable};
use crate::transform::{
    PendingDestination, apply_local_offset, compute_local_boarding_offset,
    compute_seat_world_offset,
};
use carriage_common::{CreatureEntry, EntityHandle, SeatIndex, VehicleId};
use carriage_data::{AccessoryTemplate, SeatFlags, SeatTemplate, TemplateStore, VehicleFlags};
use carriage_kernel::{
    ClientControl, MotionCommand, MovementFlags, MovementFlags2, TaskQueue, TransportLink, Unit,
    UnitFlags, UnitState, World,
};
use tracing::{debug, error, trace};

/// Longest transport chain walked when checking for cycles.
const MAX_NESTING: usize = 16;

/// Vehicle capability attached to a base entity.
#[derive(Debug, Clone)]
pub struct VehicleKit {
    base: EntityHandle,
    entry: CreatureEntry,
    vehicle_id: VehicleId,
    flags: VehicleFlags,
    seats: SeatTable,
    pending: Option<PendingDestination>,
    initialized: bool,
}

fn movement_flags(flags: VehicleFlags) -> MovementFlags2 {
    let mut out = MovementFlags2::empty();
    out.set(MovementFlags2::NO_STRAFE, flags.contains(VehicleFlags::NO_STRAFE));
    out.set(MovementFlags2::NO_JUMPING, flags.contains(VehicleFlags::NO_JUMPING));
    out.set(
        MovementFlags2::FULL_SPEED_TURNING,
        flags.contains(VehicleFlags::FULL_SPEED_TURNING),
    );
    if flags.contains(VehicleFlags::FULL_SPEED_PITCHING) {
        out.insert(MovementFlags2::ALLOW_PITCHING | MovementFlags2::FULL_SPEED_PITCHING);
    } else if flags.contains(VehicleFlags::ALLOW_PITCHING) {
        out.insert(MovementFlags2::ALLOW_PITCHING);
    }
    out
}

impl VehicleKit {
    /// Build the seat table for `base` from vehicle template `vehicle_id`
    /// and copy the template's movement flags onto the base.
    pub fn attach(
        world: &mut World,
        templates: &dyn TemplateStore,
        base: EntityHandle,
        vehicle_id: VehicleId,
    ) -> Result<Self, SeatError> {
        let template = templates
            .vehicle(vehicle_id)
            .ok_or(SeatError::NotAVehicle(base))?;
        let unit = world.unit_mut(base).ok_or(SeatError::UnknownEntity(base))?;
        let mut seats = SeatTable::initialize(template, templates);
        unit.movement2.insert(movement_flags(template.flags));
        seats.recompute_free_count(Some(unit));
        debug!(%base, %vehicle_id, seats = seats.len(), "vehicle attached");
        Ok(Self {
            base,
            entry: unit.entry,
            vehicle_id,
            flags: template.flags,
            seats,
            pending: None,
            initialized: false,
        })
    }

    pub fn base(&self) -> EntityHandle {
        self.base
    }

    pub fn entry(&self) -> CreatureEntry {
        self.entry
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn flags(&self) -> VehicleFlags {
        self.flags
    }

    pub fn seats(&self) -> &SeatTable {
        &self.seats
    }

    pub fn pending(&self) -> Option<&PendingDestination> {
        self.pending.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Set the destination for the next dismount. An all-zero destination
    /// clears it.
    pub fn set_destination(&mut self, destination: PendingDestination) {
        self.pending = (!destination.is_unset()).then_some(destination);
    }
}

/// Result of installing one accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryOutcome {
    Installed(EntityHandle),
    /// A companion of the same entry already held the seat.
    AlreadyPresent(EntityHandle),
}

impl AccessoryOutcome {
    pub fn accessory(self) -> EntityHandle {
        match self {
            AccessoryOutcome::Installed(h) | AccessoryOutcome::AlreadyPresent(h) => h,
        }
    }
}

/// Mutating view of one vehicle and the world around it, valid for a
/// single call under the map's exclusive lock.
pub struct VehicleController<'a> {
    world: &'a mut World,
    kit: &'a mut VehicleKit,
    templates: &'a dyn TemplateStore,
    config: &'a VehicleConfig,
    ejects: &'a mut TaskQueue<EjectTask>,
}

impl<'a> VehicleController<'a> {
    pub fn new(
        world: &'a mut World,
        kit: &'a mut VehicleKit,
        templates: &'a dyn TemplateStore,
        config: &'a VehicleConfig,
        ejects: &'a mut TaskQueue<EjectTask>,
    ) -> Self {
        Self {
            world,
            kit,
            templates,
            config,
            ejects,
        }
    }

    pub fn vehicle(&self) -> EntityHandle {
        self.kit.base
    }

    pub fn kit(&self) -> &VehicleKit {
        self.kit
    }

    pub(crate) fn seats(&self) -> &SeatTable {
        &self.kit.seats
    }

    /// Occupant of `seat`, if it still resolves.
    pub fn passenger_at(&self, seat: SeatIndex) -> Option<EntityHandle> {
        self.kit
            .seats
            .get(seat)
            .and_then(Seat::passenger)
            .filter(|h| self.world.contains(*h))
    }

    pub fn seat_of(&self, passenger: EntityHandle) -> Option<SeatIndex> {
        self.kit.seats.seat_of(passenger).map(Seat::index)
    }

    pub fn recompute_free_count(&mut self) -> usize {
        let base = self.world.unit_mut(self.kit.base);
        self.kit.seats.recompute_free_count(base)
    }

    fn purge_stale(&mut self) {
        let world = &*self.world;
        let purged = self.kit.seats.purge_stale(|h| world.contains(h));
        if !purged.is_empty() {
            debug!(vehicle = %self.kit.base, ?purged, "vacated seats of departed passengers");
            self.recompute_free_count();
        }
    }

    fn check_boardable(&self, passenger: EntityHandle) -> Result<(), SeatError> {
        let vehicle = self.kit.base;
        if passenger == vehicle {
            return Err(SeatError::TransportCycle { passenger, vehicle });
        }
        let rider = self
            .world
            .unit(passenger)
            .ok_or(SeatError::UnknownEntity(passenger))?;
        let base = self
            .world
            .unit(vehicle)
            .ok_or(SeatError::UnknownEntity(vehicle))?;
        if let Some(link) = rider.transport {
            return Err(SeatError::AlreadySeated {
                passenger,
                vehicle: link.vehicle,
            });
        }
        if self.kit.seats.seat_of(passenger).is_some() {
            return Err(SeatError::AlreadySeated { passenger, vehicle });
        }
        let mut outer = base.transport.map(|l| l.vehicle);
        for _ in 0..MAX_NESTING {
            let Some(h) = outer else { break };
            if h == passenger {
                return Err(SeatError::TransportCycle { passenger, vehicle });
            }
            outer = self.world.unit(h).and_then(|u| u.transport).map(|l| l.vehicle);
        }
        Ok(())
    }

    /// Seat `passenger`, in `seat` if given, else in the lowest free seat.
    pub fn add_passenger(
        &mut self,
        passenger: EntityHandle,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SeatError> {
        self.purge_stale();
        self.check_boardable(passenger)?;
        let vehicle = self.kit.base;
        let index = match seat {
            None => self
                .kit
                .seats
                .find_empty_seat(None, ScanDirection::Forward, SeatFlags::empty())
                .ok_or(SeatError::SeatUnavailable { vehicle })?,
            Some(index) => {
                let s = self
                    .kit
                    .seats
                    .get(index)
                    .ok_or(SeatError::InvalidSeat { vehicle, seat: index })?;
                if let Some(occupant) = s.passenger() {
                    return Err(SeatError::SeatOccupied {
                        vehicle,
                        seat: index,
                        occupant,
                    });
                }
                index
            }
        };
        self.board(passenger, index)
    }

    /// All checks have passed; nothing below fails.
    fn board(&mut self, passenger: EntityHandle, index: SeatIndex) -> Result<SeatIndex, SeatError> {
        let vehicle = self.kit.base;
        let template = self
            .kit
            .seats
            .get(index)
            .map(|s| s.template().clone())
            .ok_or(SeatError::InvalidSeat { vehicle, seat: index })?;
        let now = self.world.now_ms();
        let protect = template.protects_passenger()
            && !self.config.is_protection_exempt(self.kit.entry)
            && self
                .world
                .unit(passenger)
                .is_some_and(|p| !p.flags.contains(UnitFlags::NON_ATTACKABLE));

        let generation = self
            .kit
            .seats
            .occupy(index, passenger, protect)
            .ok_or(SeatError::InvalidSeat { vehicle, seat: index })?;

        if let Some((v, p)) = self.world.pair_mut(vehicle, passenger) {
            v.phase_mask = p.phase_mask;
            let offset = compute_local_boarding_offset(&v.pose, &p.pose);
            p.transport = Some(TransportLink {
                vehicle,
                seat: index,
                offset,
                boarded_at_ms: now,
            });
            p.movement.insert(MovementFlags::ON_TRANSPORT);
            if !template.has_free_action() {
                p.state.insert(UnitState::ON_VEHICLE);
            }
            if p.is_player() {
                p.view_point = Some(vehicle);
                p.set_root(true);
                if !template.can_control()
                    && template
                        .flags
                        .intersects(SeatFlags::FREE_ACTION | SeatFlags::CAN_ATTACK)
                {
                    p.client_control = Some(ClientControl {
                        target: vehicle,
                        allowed: false,
                    });
                }
            }
            if template.protects_passenger() {
                if protect {
                    p.flags.insert(UnitFlags::NON_ATTACKABLE);
                }
                p.remove_shapeshift();
            }
        }

        if template.can_control()
            && control::on_grant(
                self.world,
                self.templates,
                vehicle,
                self.kit.flags,
                passenger,
                &template,
            )
        {
            self.kit.seats.mark_controlled(index);
        }

        let offset = compute_seat_world_offset(&template.attachment, self.kit.pending.as_ref());
        let speed = if template.enter_speed > 0.0 {
            template.enter_speed
        } else {
            self.config.base_charge_speed
        };
        self.world
            .command_motion(passenger, MotionCommand::Board { offset, speed });

        self.notify(passenger, index, true);
        self.recompute_free_count();

        if self.kit.pending.is_some() && template.is_forced_ejectable() {
            let task = EjectTask {
                vehicle,
                seat: index,
                generation,
            };
            let due = task.schedule(self.ejects, now, template.exit_max_duration);
            debug!(%vehicle, %passenger, seat = index, due, "forced eject scheduled");
        }

        debug!(%vehicle, %passenger, seat = index, "passenger boarded");
        Ok(index)
    }

    fn notify(&mut self, passenger: EntityHandle, seat: SeatIndex, boarded: bool) {
        let vehicle = self.kit.base;
        if let Some(b) = self.world.unit_mut(vehicle).and_then(|v| v.behavior.as_mut()) {
            b.passenger_boarded(passenger, seat, boarded);
        }
        if let Some(b) = self
            .world
            .unit_mut(passenger)
            .filter(|p| !p.is_player())
            .and_then(|p| p.behavior.as_mut())
        {
            b.entered_vehicle(vehicle, seat, boarded);
        }
    }

    /// Unseat `passenger`, optionally sending it on a dismount trajectory.
    /// `NotSeated` means nothing changed.
    pub fn remove_passenger(
        &mut self,
        passenger: EntityHandle,
        dismount: bool,
    ) -> Result<SeatIndex, SeatError> {
        let vehicle = self.kit.base;
        let not_seated = SeatError::NotSeated { vehicle, passenger };
        let index = self.seat_of(passenger).ok_or_else(|| not_seated.clone())?;
        let vacated = self.kit.seats.vacate(index).ok_or(not_seated)?;

        if let Some(p) = self.world.unit_mut(passenger) {
            p.state.remove(UnitState::ON_VEHICLE);
            p.transport = None;
            p.movement.remove(MovementFlags::ON_TRANSPORT);
            if vacated.protection_applied {
                p.flags.remove(UnitFlags::NON_ATTACKABLE);
            }
        }

        if vacated.controlled {
            control::on_revoke(self.world, self.templates, vehicle, passenger);
        }
        self.restore_movement(passenger, vacated.controlled);
        self.notify(passenger, index, false);
        self.recompute_free_count();

        if dismount && vacated.dismount_allowed {
            self.dismount(passenger, Some(&vacated.template));
            let airborne = self
                .world
                .unit(vehicle)
                .is_some_and(|v| v.movement.contains(MovementFlags::FLYING));
            if airborne {
                self.world
                    .cast_spell(vehicle, passenger, self.config.parachute_spell);
            }
        }

        debug!(%vehicle, %passenger, seat = index, dismount, "passenger left");
        Ok(index)
    }

    /// Give a player back its own body. Creatures have nothing to restore.
    fn restore_movement(&mut self, passenger: EntityHandle, controlled: bool) {
        let Some(p) = self.world.unit_mut(passenger) else {
            return;
        };
        if !p.is_player() {
            return;
        }
        p.view_point = None;
        p.set_root(false);
        p.mover = None;
        p.client_control = None;
        if !controlled {
            control::revoke_flight(self.world, self.kit.base, passenger);
        }
    }

    /// Send a departed passenger away from the vehicle. The pending
    /// destination is spent whether or not a trajectory is issued.
    pub fn dismount(&mut self, passenger: EntityHandle, seat: Option<&SeatTemplate>) {
        let pending = self.kit.pending.take();
        let vehicle = self.kit.base;
        let (Some(p), Some(v)) = (self.world.unit(passenger), self.world.unit(vehicle)) else {
            trace!(%vehicle, %passenger, "dismount skipped, entity gone");
            return;
        };
        let facing = p.pose.yaw;
        let outer = v
            .transport
            .and_then(|l| self.world.unit(l.vehicle))
            .unwrap_or(v);
        let input = DismountInput {
            base_pose: outer.pose,
            base_radius: outer.bounding_radius,
            seat,
            pending,
            ground_height: self.world.ground_height_at(outer.pose.position),
        };
        let plan = plan_dismount(&input, self.config, self.world.rng());
        self.world.command_motion(passenger, plan.to_motion(facing));
        debug!(%vehicle, %passenger, ?plan, "dismount trajectory");
    }

    /// Keep `passenger` on board through teleport-style transfers.
    pub fn disable_dismount(&mut self, passenger: EntityHandle) -> bool {
        match self.seat_of(passenger) {
            Some(index) => self.kit.seats.set_dismount_allowed(index, false),
            None => false,
        }
    }

    /// Remove every occupant with dismount. Returns the non-player
    /// occupants, which the caller despawns.
    pub fn reset(&mut self) -> Vec<EntityHandle> {
        self.purge_stale();
        let occupants: Vec<EntityHandle> = self.kit.seats.iter().filter_map(Seat::passenger).collect();
        let mut leftovers = Vec::new();
        for passenger in occupants {
            if self.remove_passenger(passenger, true).is_ok()
                && self.world.unit(passenger).is_some_and(|u| !u.is_player())
            {
                leftovers.push(passenger);
            }
        }
        self.kit.initialized = false;
        self.recompute_free_count();
        debug!(vehicle = %self.kit.base, removed = leftovers.len(), "vehicle reset");
        leftovers
    }

    /// Install every accessory defined for `entry`. Best effort: a failed
    /// accessory does not undo the ones before it.
    pub fn install_all_accessories(
        &mut self,
        entry: CreatureEntry,
    ) -> Vec<Result<AccessoryOutcome, SeatError>> {
        let templates = self.templates;
        templates
            .accessories(entry)
            .iter()
            .map(|acc| self.install_accessory(acc))
            .collect()
    }

    fn install_accessory(&mut self, acc: &AccessoryTemplate) -> Result<AccessoryOutcome, SeatError> {
        let vehicle = self.kit.base;
        if let Some(current) = self.passenger_at(acc.seat) {
            if self
                .world
                .unit(current)
                .is_some_and(|u| u.entry == acc.passenger_entry)
            {
                trace!(%vehicle, accessory = %current, seat = acc.seat, "accessory already installed");
                return Ok(AccessoryOutcome::AlreadyPresent(current));
            }
            if let Err(reason) = self.remove_passenger(current, false) {
                trace!(%vehicle, occupant = %current, %reason, "displaced occupant already gone");
            }
        }

        let summon_failed = SeatError::AccessorySummonFailed {
            vehicle,
            entry: acc.passenger_entry,
            seat: acc.seat,
        };
        let (Some(template), Some(base)) = (
            self.templates.creature(acc.passenger_entry),
            self.world.unit(vehicle),
        ) else {
            error!(%vehicle, entry = %acc.passenger_entry, seat = acc.seat, "cannot summon accessory");
            return Err(summon_failed);
        };
        let mut unit = Unit::creature(acc.passenger_entry, apply_local_offset(&base.pose, &acc.offset));
        unit.phase_mask = base.phase_mask;
        unit.bounding_radius = template.bounding_radius;
        unit.flags.insert(UnitFlags::DISABLE_MOVE);
        unit.creator = None;
        unit.corpse_despawn_ms = Some(self.config.accessory_despawn_ms);
        let accessory = self.world.spawn(unit);

        let offset = Some(PendingDestination::new(acc.offset, 0.0, 0.0)).filter(|d| !d.is_unset());
        let saved = std::mem::replace(&mut self.kit.pending, offset);
        let seated = self.add_passenger(accessory, Some(acc.seat));
        self.kit.pending = saved;

        match seated {
            Ok(seat) => {
                debug!(%vehicle, %accessory, seat, entry = %acc.passenger_entry, "accessory installed");
                Ok(AccessoryOutcome::Installed(accessory))
            }
            Err(reason) => {
                error!(%vehicle, %accessory, seat = acc.seat, %reason, "cannot seat accessory, despawning");
                self.world.despawn(accessory);
                Err(SeatError::AccessorySeatFailed {
                    vehicle,
                    accessory,
                    seat: acc.seat,
                    reason: Box::new(reason),
                })
            }
        }
    }

    /// Install accessories for `entry` (or the base's own entry) and mark
    /// the vehicle initialized.
    pub fn initialize(
        &mut self,
        entry: Option<CreatureEntry>,
    ) -> Vec<Result<AccessoryOutcome, SeatError>> {
        let entry = entry.unwrap_or(self.kit.entry);
        let outcomes = self.install_all_accessories(entry);
        self.recompute_free_count();
        self.kit.initialized = true;
        outcomes
    }

    /// Fire a forced eject if its seat still holds the same occupancy.
    pub fn fire_eject(&mut self, task: EjectTask) -> Option<EntityHandle> {
        let seat = self.kit.seats.get(task.seat)?;
        if seat.generation() != task.generation {
            trace!(vehicle = %task.vehicle, seat = task.seat, "stale forced eject ignored");
            return None;
        }
        let passenger = seat.passenger()?;
        self.remove_passenger(passenger, true).ok()?;
        debug!(vehicle = %task.vehicle, %passenger, seat = task.seat, "forced eject");
        Some(passenger)
    }
}
