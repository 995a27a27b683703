//! World kernel: authoritative unit state, entity lookup, fire-and-forget
//! collaborator channels (motion, broadcast, spell casts) and deferred tasks.
//!
//! # Invariants
//! - Handles are generational; a despawned handle never resolves again.
//! - All state mutations that other systems observe produce a `WorldEvent`.
//! - Randomness comes from the world seed, so runs are reproducible.

pub mod behavior;
pub mod schedule;
pub mod unit;
pub mod world;

pub use behavior::{BehaviorController, BehaviorEvent, BehaviorLog, BehaviorRecorder};
pub use schedule::TaskQueue;
pub use unit::{
    AuraKind, CharmInfo, ClientControl, MovementFlags, MovementFlags2, NpcFlags, TransportLink,
    Unit, UnitFlags, UnitKind, UnitState,
};
pub use world::{BroadcastMessage, MotionCommand, World, WorldEvent};
