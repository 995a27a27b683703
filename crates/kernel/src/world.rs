use crate::unit::Unit;
use carriage_common::{CreatureEntry, EntityHandle, Pose, SpellId};
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Movement order handed to the motion system. Fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionCommand {
    /// Move onto a seat attachment point, relative to the vehicle.
    Board { offset: Pose, speed: f32 },
    /// Timed glide to an absolute point. `apex` is the peak height above the
    /// straight line; zero is a flat glide. `eject` marks a ballistic launch.
    Glide {
        destination: Vec3,
        yaw: f32,
        speed: f32,
        apex: f32,
        eject: bool,
    },
}

/// Capability-change notification sent to observers of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastMessage {
    SetCanFly,
    UnsetCanFly,
}

/// An event record produced by every externally visible mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    Spawned {
        id: EntityHandle,
        entry: CreatureEntry,
        pose: Pose,
    },
    Despawned {
        id: EntityHandle,
    },
    Relocated {
        id: EntityHandle,
        pose: Pose,
    },
    Motion {
        id: EntityHandle,
        command: MotionCommand,
    },
    /// Sent from `source`'s position to everyone observing it, about `subject`.
    Broadcast {
        source: EntityHandle,
        subject: EntityHandle,
        message: BroadcastMessage,
    },
    SpellCast {
        caster: EntityHandle,
        target: EntityHandle,
        spell: SpellId,
    },
    Stepped {
        tick: u64,
        now_ms: u64,
    },
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    unit: Option<Unit>,
}

/// Authoritative unit state for one map.
///
/// Units live in a generational arena: despawning frees the slot and bumps
/// its generation, so any handle still held elsewhere resolves to `None`.
#[derive(Debug)]
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    tick: u64,
    now_ms: u64,
    seed: u64,
    rng: SmallRng,
    ground_height: f32,
    /// Append-only event log of all observable mutations.
    event_log: Vec<WorldEvent>,
}

impl Default for World {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl World {
    /// Create an empty world at time 0 with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with a specific seed for reproducible randomness.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            tick: 0,
            now_ms: 0,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            ground_height: 0.0,
            event_log: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Milliseconds of simulated time since creation.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of live units.
    pub fn entity_count(&self) -> usize {
        self.live
    }

    /// World-seeded RNG.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Walkable ground height at `pos`. The map is flat.
    pub fn ground_height_at(&self, _pos: Vec3) -> f32 {
        self.ground_height
    }

    pub fn set_ground_height(&mut self, height: f32) {
        self.ground_height = height;
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Add a unit to the world. Returns its handle.
    pub fn spawn(&mut self, unit: Unit) -> EntityHandle {
        let entry = unit.entry;
        let pose = unit.pose;
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.unit = Some(unit);
                EntityHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    unit: Some(unit),
                });
                EntityHandle::new(index, 0)
            }
        };
        self.live += 1;
        self.event_log.push(WorldEvent::Spawned { id, entry, pose });
        id
    }

    /// Remove a unit. Returns it if the handle was live.
    pub fn despawn(&mut self, id: EntityHandle) -> Option<Unit> {
        let slot = self.slots.get_mut(id.slot())?;
        if slot.generation != id.generation {
            tracing::trace!(%id, "stale handle, nothing to despawn");
            return None;
        }
        let unit = slot.unit.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        self.event_log.push(WorldEvent::Despawned { id });
        Some(unit)
    }

    pub fn contains(&self, id: EntityHandle) -> bool {
        self.unit(id).is_some()
    }

    /// Resolve a handle. Stale or unknown handles yield `None`.
    pub fn unit(&self, id: EntityHandle) -> Option<&Unit> {
        self.slots
            .get(id.slot())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.unit.as_ref())
    }

    pub fn unit_mut(&mut self, id: EntityHandle) -> Option<&mut Unit> {
        self.slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.unit.as_mut())
    }

    /// Borrow two distinct units mutably at once.
    pub fn pair_mut(&mut self, a: EntityHandle, b: EntityHandle) -> Option<(&mut Unit, &mut Unit)> {
        if a.index == b.index || a.slot().max(b.slot()) >= self.slots.len() {
            return None;
        }
        let (lo, hi, swapped) = if a.index < b.index {
            (a, b, false)
        } else {
            (b, a, true)
        };
        let (head, tail) = self.slots.split_at_mut(hi.slot());
        let lo_slot = head.get_mut(lo.slot())?;
        let hi_slot = tail.first_mut()?;
        if lo_slot.generation != lo.generation || hi_slot.generation != hi.generation {
            return None;
        }
        let lo_unit = lo_slot.unit.as_mut()?;
        let hi_unit = hi_slot.unit.as_mut()?;
        if swapped {
            Some((hi_unit, lo_unit))
        } else {
            Some((lo_unit, hi_unit))
        }
    }

    /// Handles of every live unit, in slot order.
    pub fn handles(&self) -> Vec<EntityHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.unit.is_some())
            .map(|(i, s)| EntityHandle::new(i as u32, s.generation))
            .collect()
    }

    /// Move a unit and log the change.
    pub fn set_pose(&mut self, id: EntityHandle, pose: Pose) -> bool {
        let Some(unit) = self.unit_mut(id) else {
            return false;
        };
        unit.pose = pose;
        self.event_log.push(WorldEvent::Relocated { id, pose });
        true
    }

    /// Hand a movement order to the motion system.
    pub fn command_motion(&mut self, id: EntityHandle, command: MotionCommand) {
        if let Some(unit) = self.unit_mut(id) {
            unit.moving = true;
            self.event_log.push(WorldEvent::Motion { id, command });
        }
    }

    pub fn broadcast(&mut self, source: EntityHandle, subject: EntityHandle, message: BroadcastMessage) {
        self.event_log.push(WorldEvent::Broadcast {
            source,
            subject,
            message,
        });
    }

    pub fn cast_spell(&mut self, caster: EntityHandle, target: EntityHandle, spell: SpellId) {
        self.event_log.push(WorldEvent::SpellCast {
            caster,
            target,
            spell,
        });
    }

    /// Advance simulated time by `dt_ms`.
    pub fn step(&mut self, dt_ms: u64) {
        self.tick += 1;
        self.now_ms += dt_ms;
        self.event_log.push(WorldEvent::Stepped {
            tick: self.tick,
            now_ms: self.now_ms,
        });
    }
}
