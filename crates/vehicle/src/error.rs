use carriage_common::{CreatureEntry, EntityHandle, SeatIndex};

/// Errors from seat operations.
///
/// `NotSeated` is informational: the operation changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatError {
    #[error("no free seat on {vehicle}")]
    SeatUnavailable { vehicle: EntityHandle },
    #[error("seat {seat} does not exist on {vehicle}")]
    InvalidSeat { vehicle: EntityHandle, seat: SeatIndex },
    #[error("seat {seat} of {vehicle} is taken by {occupant}")]
    SeatOccupied {
        vehicle: EntityHandle,
        seat: SeatIndex,
        occupant: EntityHandle,
    },
    #[error("{passenger} is not seated on {vehicle}")]
    NotSeated {
        vehicle: EntityHandle,
        passenger: EntityHandle,
    },
    #[error("cannot summon {entry} for seat {seat} of {vehicle}")]
    AccessorySummonFailed {
        vehicle: EntityHandle,
        entry: CreatureEntry,
        seat: SeatIndex,
    },
    #[error("cannot seat accessory {accessory} in seat {seat} of {vehicle}: {reason}")]
    AccessorySeatFailed {
        vehicle: EntityHandle,
        accessory: EntityHandle,
        seat: SeatIndex,
        reason: Box<SeatError>,
    },
    #[error("{0} is not in the world")]
    UnknownEntity(EntityHandle),
    #[error("{0} has no vehicle capability")]
    NotAVehicle(EntityHandle),
    #[error("{passenger} already rides {vehicle}")]
    AlreadySeated {
        passenger: EntityHandle,
        vehicle: EntityHandle,
    },
    #[error("{passenger} cannot board {vehicle}: it would carry itself")]
    TransportCycle {
        passenger: EntityHandle,
        vehicle: EntityHandle,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_reason_is_displayed() {
        let vehicle = EntityHandle::new(1, 0);
        let err = SeatError::AccessorySeatFailed {
            vehicle,
            accessory: EntityHandle::new(2, 0),
            seat: 3,
            reason: Box::new(SeatError::InvalidSeat { vehicle, seat: 3 }),
        };
        let text = err.to_string();
        assert!(text.contains("seat 3 does not exist"), "{text}");
    }
}
