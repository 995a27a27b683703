use crate::config::VehicleConfig;
use crate::controller::{AccessoryOutcome, VehicleController, VehicleKit};
use crate::eject::EjectTask;
use crate::error::SeatError;
use crate::seats::{ScanDirection, Seat};
use crate::transform::{PendingDestination, apply_local_offset};
use carriage_common::{CreatureEntry, EntityHandle, Pose, SeatIndex, VehicleId};
use carriage_data::{SeatFlags, TemplateStore};
use carriage_kernel::{MovementFlags2, NpcFlags, TaskQueue, Unit, World};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info_span, trace, warn};

/// Deepest chain of accessories that are themselves vehicles.
const MAX_ACCESSORY_DEPTH: usize = 8;

type Outcomes = Vec<Result<AccessoryOutcome, SeatError>>;

/// Vehicles of one map and the world they live in.
///
/// Every mutating method runs one complete transition; wrap the map in a
/// [`SharedVehicleMap`] to share it between threads.
pub struct VehicleMap {
    world: World,
    vehicles: BTreeMap<EntityHandle, VehicleKit>,
    templates: Arc<dyn TemplateStore>,
    config: VehicleConfig,
    ejects: TaskQueue<EjectTask>,
}

impl fmt::Debug for VehicleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VehicleMap")
            .field("entities", &self.world.entity_count())
            .field("vehicles", &self.vehicles.len())
            .field("pending_ejects", &self.ejects.len())
            .finish_non_exhaustive()
    }
}

impl VehicleMap {
    pub fn new(world: World, templates: Arc<dyn TemplateStore>, config: VehicleConfig) -> Self {
        Self {
            world,
            vehicles: BTreeMap::new(),
            templates,
            config,
            ejects: TaskQueue::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access. Despawning through it skips seat cleanup; use
    /// [`VehicleMap::despawn`] instead.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn templates(&self) -> &dyn TemplateStore {
        self.templates.as_ref()
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn vehicle(&self, base: EntityHandle) -> Option<&VehicleKit> {
        self.vehicles.get(&base)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleKit> {
        self.vehicles.values()
    }

    pub fn pending_ejects(&self) -> usize {
        self.ejects.len()
    }

    /// Mutating view of one vehicle.
    pub fn controller(&mut self, vehicle: EntityHandle) -> Result<VehicleController<'_>, SeatError> {
        let kit = self
            .vehicles
            .get_mut(&vehicle)
            .ok_or(SeatError::NotAVehicle(vehicle))?;
        Ok(VehicleController::new(
            &mut self.world,
            kit,
            self.templates.as_ref(),
            &self.config,
            &mut self.ejects,
        ))
    }

    pub fn spawn_unit(&mut self, unit: Unit) -> EntityHandle {
        self.world.spawn(unit)
    }

    pub fn spawn_player(&mut self, pose: Pose) -> EntityHandle {
        self.world.spawn(Unit::player(pose))
    }

    /// Spawn a creature. Vehicle-capable templates get their seats and
    /// accessories right away.
    pub fn spawn_creature(&mut self, entry: CreatureEntry, pose: Pose) -> Result<EntityHandle, SeatError> {
        let mut unit = Unit::creature(entry, pose);
        let vehicle_id = self.templates.creature(entry).and_then(|t| {
            unit.bounding_radius = t.bounding_radius;
            t.vehicle
        });
        let handle = self.world.spawn(unit);
        if let Some(id) = vehicle_id {
            if let Err(e) = self.attach_vehicle(handle, Some(id)) {
                self.world.despawn(handle);
                return Err(e);
            }
            self.initialize(handle, None)?;
        }
        Ok(handle)
    }

    /// Give `base` the vehicle capability. Without an explicit id the base's
    /// creature template decides. An existing kit is detached first.
    pub fn attach_vehicle(&mut self, base: EntityHandle, vehicle_id: Option<VehicleId>) -> Result<(), SeatError> {
        let id = match vehicle_id {
            Some(id) => id,
            None => {
                let unit = self.world.unit(base).ok_or(SeatError::UnknownEntity(base))?;
                self.templates
                    .creature(unit.entry)
                    .and_then(|t| t.vehicle)
                    .ok_or(SeatError::NotAVehicle(base))?
            }
        };
        if self.vehicles.contains_key(&base) {
            self.detach_vehicle(base);
        }
        let kit = VehicleKit::attach(&mut self.world, self.templates.as_ref(), base, id)?;
        self.vehicles.insert(base, kit);
        Ok(())
    }

    /// Reset and drop the vehicle capability of `base`.
    pub fn detach_vehicle(&mut self, base: EntityHandle) -> bool {
        let Ok(leftovers) = self.controller(base).map(|mut c| c.reset()) else {
            return false;
        };
        self.vehicles.remove(&base);
        self.ejects.retain(|t| t.vehicle != base);
        if let Some(unit) = self.world.unit_mut(base) {
            unit.npc_flags
                .remove(NpcFlags::SPELLCLICK | NpcFlags::PLAYER_VEHICLE);
            unit.movement2 = MovementFlags2::empty();
        }
        for h in leftovers {
            self.despawn(h);
        }
        debug!(%base, "vehicle detached");
        true
    }

    /// Install accessories for `entry` (default: the base's own) and mark the
    /// vehicle initialized.
    pub fn initialize(&mut self, vehicle: EntityHandle, entry: Option<CreatureEntry>) -> Result<Outcomes, SeatError> {
        self.initialize_nested(vehicle, entry, 0)
    }

    fn initialize_nested(
        &mut self,
        vehicle: EntityHandle,
        entry: Option<CreatureEntry>,
        depth: usize,
    ) -> Result<Outcomes, SeatError> {
        let outcomes = self.controller(vehicle)?.initialize(entry);
        self.equip_accessory_vehicles(&outcomes, depth);
        Ok(outcomes)
    }

    pub fn install_all_accessories(&mut self, vehicle: EntityHandle, entry: CreatureEntry) -> Result<Outcomes, SeatError> {
        let outcomes = self.controller(vehicle)?.install_all_accessories(entry);
        self.equip_accessory_vehicles(&outcomes, 0);
        Ok(outcomes)
    }

    /// Freshly installed accessories whose template is a vehicle get their
    /// own seats and accessories.
    fn equip_accessory_vehicles(&mut self, outcomes: &[Result<AccessoryOutcome, SeatError>], depth: usize) {
        for outcome in outcomes {
            let Ok(AccessoryOutcome::Installed(accessory)) = outcome else {
                continue;
            };
            let vehicle_id = self
                .world
                .unit(*accessory)
                .and_then(|u| self.templates.creature(u.entry))
                .and_then(|t| t.vehicle);
            let Some(id) = vehicle_id else { continue };
            if depth >= MAX_ACCESSORY_DEPTH {
                warn!(%accessory, depth, "accessory nesting too deep, not equipping");
                continue;
            }
            let equipped = self
                .attach_vehicle(*accessory, Some(id))
                .and_then(|()| self.initialize_nested(*accessory, None, depth + 1));
            if let Err(e) = equipped {
                error!(%accessory, error = %e, "cannot equip accessory vehicle");
            }
        }
    }

    pub fn add_passenger(
        &mut self,
        vehicle: EntityHandle,
        passenger: EntityHandle,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SeatError> {
        self.controller(vehicle)?.add_passenger(passenger, seat)
    }

    /// `NotSeated` is a no-op.
    pub fn remove_passenger(
        &mut self,
        vehicle: EntityHandle,
        passenger: EntityHandle,
        dismount: bool,
    ) -> Result<SeatIndex, SeatError> {
        self.controller(vehicle)?.remove_passenger(passenger, dismount)
    }

    /// Vehicle currently carrying `passenger`.
    pub fn vehicle_of(&self, passenger: EntityHandle) -> Option<EntityHandle> {
        self.world
            .unit(passenger)
            .and_then(|u| u.transport)
            .map(|l| l.vehicle)
            .or_else(|| {
                self.vehicles
                    .values()
                    .find(|k| k.seats().seat_of(passenger).is_some())
                    .map(VehicleKit::base)
            })
    }

    /// Unseat `passenger` from whatever carries it. `None` if unseated.
    pub fn exit_vehicle(&mut self, passenger: EntityHandle, dismount: bool) -> Option<(EntityHandle, SeatIndex)> {
        let vehicle = self.vehicle_of(passenger)?;
        self.remove_passenger(vehicle, passenger, dismount)
            .ok()
            .map(|seat| (vehicle, seat))
    }

    /// With no seat: whether any seat can be selected. With a seat: whether
    /// it exists and holds no live occupant.
    pub fn has_empty_seat(&self, vehicle: EntityHandle, seat: Option<SeatIndex>) -> bool {
        let Some(kit) = self.vehicles.get(&vehicle) else {
            return false;
        };
        let vacant = |s: &Seat| s.passenger().is_none_or(|h| !self.world.contains(h));
        match seat {
            Some(index) => kit.seats().get(index).is_some_and(vacant),
            None => kit
                .seats()
                .iter()
                .any(|s| s.template().is_selectable() && vacant(s)),
        }
    }

    pub fn find_empty_seat(
        &self,
        vehicle: EntityHandle,
        start: Option<SeatIndex>,
        direction: ScanDirection,
        required: SeatFlags,
    ) -> Option<SeatIndex> {
        self.vehicles
            .get(&vehicle)?
            .seats()
            .find_empty_seat(start, direction, required)
    }

    /// Occupant of `seat`. Departed occupants read as empty.
    pub fn passenger_at(&self, vehicle: EntityHandle, seat: SeatIndex) -> Option<EntityHandle> {
        self.vehicles
            .get(&vehicle)?
            .seats()
            .get(seat)?
            .passenger()
            .filter(|h| self.world.contains(*h))
    }

    pub fn seat_of(&self, vehicle: EntityHandle, passenger: EntityHandle) -> Option<SeatIndex> {
        self.vehicles
            .get(&vehicle)?
            .seats()
            .seat_of(passenger)
            .map(Seat::index)
    }

    pub fn disable_dismount(&mut self, vehicle: EntityHandle, passenger: EntityHandle) -> bool {
        self.controller(vehicle)
            .is_ok_and(|mut c| c.disable_dismount(passenger))
    }

    /// Empty every seat. Creature occupants are despawned afterwards.
    pub fn reset(&mut self, vehicle: EntityHandle) -> Result<(), SeatError> {
        let leftovers = self.controller(vehicle)?.reset();
        for h in leftovers {
            self.despawn(h);
        }
        Ok(())
    }

    /// Set or clear (all-zero destination) the next dismount target.
    pub fn set_destination(&mut self, vehicle: EntityHandle, destination: PendingDestination) -> bool {
        match self.vehicles.get_mut(&vehicle) {
            Some(kit) => {
                kit.set_destination(destination);
                true
            }
            None => false,
        }
    }

    /// Move an entity. Passengers follow at their frozen offsets, through
    /// any depth of nesting.
    pub fn relocate(&mut self, entity: EntityHandle, pose: Pose) -> bool {
        if !self.world.set_pose(entity, pose) {
            return false;
        }
        let mut stack = vec![entity];
        while let Some(vehicle) = stack.pop() {
            let (Some(kit), Some(base)) = (self.vehicles.get(&vehicle), self.world.unit(vehicle)) else {
                continue;
            };
            let riders: Vec<(EntityHandle, Pose)> = kit
                .seats()
                .iter()
                .filter_map(Seat::passenger)
                .filter_map(|p| {
                    let link = self.world.unit(p)?.transport?;
                    (link.vehicle == vehicle).then(|| (p, apply_local_offset(&base.pose, &link.offset)))
                })
                .collect();
            for (rider, at) in riders {
                self.world.set_pose(rider, at);
                stack.push(rider);
            }
        }
        true
    }

    /// Advance time and fire due forced ejects. Returns how many fired.
    pub fn update(&mut self, dt_ms: u64) -> usize {
        let _span = info_span!("vehicle_update", dt_ms).entered();
        self.world.step(dt_ms);
        let due = self.ejects.drain_due(self.world.now_ms());
        let mut fired = 0;
        for task in due {
            match self.controller(task.vehicle) {
                Ok(mut c) => {
                    if c.fire_eject(task).is_some() {
                        fired += 1;
                    }
                }
                Err(_) => trace!(vehicle = %task.vehicle, "eject for departed vehicle dropped"),
            }
        }
        fired
    }

    /// Remove an entity from the map: unseat it, empty its own seats,
    /// despawn creature occupants, then free its slot.
    pub fn despawn(&mut self, entity: EntityHandle) -> bool {
        if !self.world.contains(entity) {
            return false;
        }
        self.exit_vehicle(entity, false);
        if self.vehicles.contains_key(&entity) {
            self.detach_vehicle(entity);
        }
        self.world.despawn(entity).is_some()
    }
}

/// A [`VehicleMap`] behind a reader-writer lock.
///
/// Every mutation holds the write guard for exactly one call; queries take
/// the read guard.
#[derive(Debug, Clone)]
pub struct SharedVehicleMap {
    inner: Arc<RwLock<VehicleMap>>,
}

impl SharedVehicleMap {
    pub fn new(map: VehicleMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, VehicleMap> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, VehicleMap> {
        self.inner.write()
    }

    pub fn add_passenger(
        &self,
        vehicle: EntityHandle,
        passenger: EntityHandle,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SeatError> {
        self.inner.write().add_passenger(vehicle, passenger, seat)
    }

    pub fn remove_passenger(
        &self,
        vehicle: EntityHandle,
        passenger: EntityHandle,
        dismount: bool,
    ) -> Result<SeatIndex, SeatError> {
        self.inner.write().remove_passenger(vehicle, passenger, dismount)
    }

    pub fn exit_vehicle(&self, passenger: EntityHandle, dismount: bool) -> Option<(EntityHandle, SeatIndex)> {
        self.inner.write().exit_vehicle(passenger, dismount)
    }

    pub fn disable_dismount(&self, vehicle: EntityHandle, passenger: EntityHandle) -> bool {
        self.inner.write().disable_dismount(vehicle, passenger)
    }

    pub fn reset(&self, vehicle: EntityHandle) -> Result<(), SeatError> {
        self.inner.write().reset(vehicle)
    }

    pub fn initialize(&self, vehicle: EntityHandle, entry: Option<CreatureEntry>) -> Result<Outcomes, SeatError> {
        self.inner.write().initialize(vehicle, entry)
    }

    pub fn update(&self, dt_ms: u64) -> usize {
        self.inner.write().update(dt_ms)
    }

    pub fn has_empty_seat(&self, vehicle: EntityHandle, seat: Option<SeatIndex>) -> bool {
        self.inner.read().has_empty_seat(vehicle, seat)
    }

    pub fn find_empty_seat(
        &self,
        vehicle: EntityHandle,
        start: Option<SeatIndex>,
        direction: ScanDirection,
        required: SeatFlags,
    ) -> Option<SeatIndex> {
        self.inner
            .read()
            .find_empty_seat(vehicle, start, direction, required)
    }

    pub fn passenger_at(&self, vehicle: EntityHandle, seat: SeatIndex) -> Option<EntityHandle> {
        self.inner.read().passenger_at(vehicle, seat)
    }

    pub fn seat_of(&self, vehicle: EntityHandle, passenger: EntityHandle) -> Option<SeatIndex> {
        self.inner.read().seat_of(vehicle, passenger)
    }
}
