use carriage_common::{EntityHandle, SeatIndex};
use carriage_kernel::TaskQueue;

/// A scheduled removal of whoever sits in `(vehicle, seat)`.
///
/// `generation` is the seat's occupancy generation at scheduling time. Any
/// boarding or unboarding in between bumps it and turns the task into a
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EjectTask {
    pub vehicle: EntityHandle,
    pub seat: SeatIndex,
    pub generation: u32,
}

impl EjectTask {
    /// Queue this task `delay_secs` after `now_ms`. Returns the due time.
    pub fn schedule(self, queue: &mut TaskQueue<EjectTask>, now_ms: u64, delay_secs: f32) -> u64 {
        let delay_ms = (delay_secs.max(0.0) * 1000.0).round() as u64;
        let due = now_ms.saturating_add(delay_ms);
        queue.push(due, self);
        due
    }
}
