use carriage_common::{EntityHandle, SeatIndex};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// One-way notifications into a unit's behavior logic.
///
/// Units without a controller simply skip notification.
pub trait BehaviorController: Send + Sync + fmt::Debug {
    /// Sent to a vehicle when a passenger boards (`true`) or leaves (`false`).
    fn passenger_boarded(&mut self, _passenger: EntityHandle, _seat: SeatIndex, _boarded: bool) {}

    /// Sent to a non-player passenger when it enters (`true`) or exits (`false`).
    fn entered_vehicle(&mut self, _vehicle: EntityHandle, _seat: SeatIndex, _entered: bool) {}

    /// Restart behavior from scratch after a control change.
    fn reinitialize(&mut self) {}
}

/// A notification as seen by [`BehaviorRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorEvent {
    PassengerBoarded {
        passenger: EntityHandle,
        seat: SeatIndex,
        boarded: bool,
    },
    EnteredVehicle {
        vehicle: EntityHandle,
        seat: SeatIndex,
        entered: bool,
    },
    Reinitialized,
}

/// Shared view of everything a recorder has received.
pub type BehaviorLog = Arc<Mutex<Vec<BehaviorEvent>>>;

/// Controller that appends every notification to a shared log.
#[derive(Debug, Default)]
pub struct BehaviorRecorder {
    log: BehaviorLog,
}

impl BehaviorRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the log; stays valid after the recorder is boxed into a unit.
    pub fn log(&self) -> BehaviorLog {
        Arc::clone(&self.log)
    }
}

impl BehaviorController for BehaviorRecorder {
    fn passenger_boarded(&mut self, passenger: EntityHandle, seat: SeatIndex, boarded: bool) {
        self.log.lock().push(BehaviorEvent::PassengerBoarded {
            passenger,
            seat,
            boarded,
        });
    }

    fn entered_vehicle(&mut self, vehicle: EntityHandle, seat: SeatIndex, entered: bool) {
        self.log.lock().push(BehaviorEvent::EnteredVehicle {
            vehicle,
            seat,
            entered,
        });
    }

    fn reinitialize(&mut self) {
        self.log.lock().push(BehaviorEvent::Reinitialized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_log_outlives_box() {
        let rec = BehaviorRecorder::new();
        let log = rec.log();
        let mut boxed: Box<dyn BehaviorController> = Box::new(rec);
        boxed.passenger_boarded(EntityHandle::new(1, 0), 2, true);
        boxed.reinitialize();
        let events = log.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], BehaviorEvent::Reinitialized);
    }
}
