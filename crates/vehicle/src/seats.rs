use carriage_common::{EntityHandle, MAX_VEHICLE_SEATS, SeatIndex};
use carriage_data::{SeatFlags, SeatTemplate, TemplateStore, VehicleTemplate};
use carriage_kernel::{NpcFlags, Unit};
use std::collections::BTreeMap;
use tracing::trace;

/// Occupancy state of one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occupancy {
    #[default]
    Empty,
    Occupied(EntityHandle),
    /// Occupant steers the vehicle. Only reachable on control-capable seats.
    Controlled(EntityHandle),
}

impl Occupancy {
    pub fn passenger(self) -> Option<EntityHandle> {
        match self {
            Occupancy::Empty => None,
            Occupancy::Occupied(h) | Occupancy::Controlled(h) => Some(h),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Occupancy::Empty)
    }
}

/// One seat of a vehicle.
#[derive(Debug, Clone)]
pub struct Seat {
    index: SeatIndex,
    template: SeatTemplate,
    occupancy: Occupancy,
    dismount_allowed: bool,
    /// Whether boarding set the occupant unattackable.
    protection_applied: bool,
    /// Bumped on every occupancy change.
    generation: u32,
}

impl Seat {
    fn new(index: SeatIndex, template: SeatTemplate) -> Self {
        Self {
            index,
            template,
            occupancy: Occupancy::Empty,
            dismount_allowed: true,
            protection_applied: false,
            generation: 0,
        }
    }

    pub fn index(&self) -> SeatIndex {
        self.index
    }

    pub fn template(&self) -> &SeatTemplate {
        &self.template
    }

    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    pub fn passenger(&self) -> Option<EntityHandle> {
        self.occupancy.passenger()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    pub fn is_controlled(&self) -> bool {
        matches!(self.occupancy, Occupancy::Controlled(_))
    }

    pub fn dismount_allowed(&self) -> bool {
        self.dismount_allowed
    }

    pub fn protection_applied(&self) -> bool {
        self.protection_applied
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Search order for [`SeatTable::find_empty_seat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    #[default]
    Forward,
    Backward,
}

/// What a seat held just before it was vacated.
#[derive(Debug, Clone)]
pub(crate) struct Vacated {
    pub passenger: EntityHandle,
    pub controlled: bool,
    pub protection_applied: bool,
    pub dismount_allowed: bool,
    pub template: SeatTemplate,
}

/// Ordered seat index to seat mapping of one vehicle.
#[derive(Debug, Clone, Default)]
pub struct SeatTable {
    seats: BTreeMap<SeatIndex, Seat>,
    free_count: usize,
}

impl SeatTable {
    /// Build from a vehicle template. Seat ids the store cannot resolve are
    /// skipped.
    pub fn initialize(vehicle: &VehicleTemplate, store: &dyn TemplateStore) -> Self {
        let seats = vehicle.seat_slots().filter_map(|(index, id)| match store.seat(id) {
            Some(template) => Some((index, template.clone())),
            None => {
                trace!(vehicle = %vehicle.id, seat = index, %id, "unresolved seat id skipped");
                None
            }
        });
        Self::from_templates(seats)
    }

    /// Build from explicit `(index, definition)` pairs. Indices at or beyond
    /// the seat bound are dropped.
    pub fn from_templates(seats: impl IntoIterator<Item = (SeatIndex, SeatTemplate)>) -> Self {
        let seats: BTreeMap<_, _> = seats
            .into_iter()
            .filter(|(index, _)| *index < MAX_VEHICLE_SEATS)
            .map(|(index, template)| (index, Seat::new(index, template)))
            .collect();
        let mut table = Self {
            seats,
            free_count: 0,
        };
        table.free_count = table.count_free();
        table
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Usable empty seats, as of the last recount.
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn get(&self, index: SeatIndex) -> Option<&Seat> {
        self.seats.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    /// First empty, selectable seat matching `required`, scanning from
    /// `start` inclusive in `direction`, or the whole table without a start.
    pub fn find_empty_seat(
        &self,
        start: Option<SeatIndex>,
        direction: ScanDirection,
        required: SeatFlags,
    ) -> Option<SeatIndex> {
        if start.is_some_and(|s| s >= MAX_VEHICLE_SEATS) {
            return None;
        }
        let candidate = |seat: &&Seat| {
            seat.is_empty()
                && seat.template.is_selectable()
                && seat.template.flags.contains(required)
        };
        let found = match (direction, start) {
            (ScanDirection::Forward, Some(s)) => self.seats.range(s..).map(|(_, v)| v).find(candidate),
            (ScanDirection::Forward, None) => self.seats.values().find(candidate),
            (ScanDirection::Backward, Some(s)) => {
                self.seats.range(..=s).rev().map(|(_, v)| v).find(candidate)
            }
            (ScanDirection::Backward, None) => self.seats.values().rev().find(candidate),
        };
        trace!(?start, ?direction, ?required, found = ?found.map(Seat::index), "seat scan");
        found.map(Seat::index)
    }

    /// With no seat: whether any seat can be selected. With a seat: whether
    /// it exists and is empty.
    pub fn has_empty_seat(&self, seat: Option<SeatIndex>) -> bool {
        match seat {
            None => self
                .find_empty_seat(None, ScanDirection::Forward, SeatFlags::empty())
                .is_some(),
            Some(index) => self.seats.get(&index).is_some_and(Seat::is_empty),
        }
    }

    pub fn seat_of(&self, passenger: EntityHandle) -> Option<&Seat> {
        self.seats
            .values()
            .find(|seat| seat.passenger() == Some(passenger))
    }

    fn count_free(&self) -> usize {
        self.seats
            .values()
            .filter(|seat| seat.is_empty() && seat.template.is_usable())
            .count()
    }

    /// Recount usable empty seats and show or hide the base's boardable
    /// flag accordingly.
    pub fn recompute_free_count(&mut self, base: Option<&mut Unit>) -> usize {
        self.free_count = self.count_free();
        if let Some(base) = base {
            let flag = if base.is_player() {
                NpcFlags::PLAYER_VEHICLE
            } else {
                NpcFlags::SPELLCLICK
            };
            base.npc_flags.set(flag, self.free_count > 0);
        }
        self.free_count
    }

    /// `Empty -> Occupied`. Returns the new generation, or `None` if the seat
    /// is missing or taken.
    pub(crate) fn occupy(
        &mut self,
        index: SeatIndex,
        passenger: EntityHandle,
        protection_applied: bool,
    ) -> Option<u32> {
        let seat = self.seats.get_mut(&index).filter(|s| s.is_empty())?;
        seat.occupancy = Occupancy::Occupied(passenger);
        seat.dismount_allowed = true;
        seat.protection_applied = protection_applied;
        seat.bump();
        Some(seat.generation)
    }

    /// `Occupied -> Controlled`, only on control-capable seats.
    pub(crate) fn mark_controlled(&mut self, index: SeatIndex) -> bool {
        match self.seats.get_mut(&index) {
            Some(seat) if seat.template.can_control() => match seat.occupancy {
                Occupancy::Occupied(h) => {
                    seat.occupancy = Occupancy::Controlled(h);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Any occupied state `-> Empty`.
    pub(crate) fn vacate(&mut self, index: SeatIndex) -> Option<Vacated> {
        let seat = self.seats.get_mut(&index)?;
        let passenger = seat.passenger()?;
        let vacated = Vacated {
            passenger,
            controlled: seat.is_controlled(),
            protection_applied: seat.protection_applied,
            dismount_allowed: seat.dismount_allowed,
            template: seat.template.clone(),
        };
        seat.occupancy = Occupancy::Empty;
        seat.protection_applied = false;
        seat.dismount_allowed = true;
        seat.bump();
        Some(vacated)
    }

    pub(crate) fn set_dismount_allowed(&mut self, index: SeatIndex, allowed: bool) -> bool {
        match self.seats.get_mut(&index) {
            Some(seat) if !seat.is_empty() => {
                seat.dismount_allowed = allowed;
                true
            }
            _ => false,
        }
    }

    /// Empty every seat whose occupant no longer resolves.
    pub(crate) fn purge_stale(&mut self, is_live: impl Fn(EntityHandle) -> bool) -> Vec<SeatIndex> {
        let mut purged = Vec::new();
        for seat in self.seats.values_mut() {
            if seat.passenger().is_some_and(|h| !is_live(h)) {
                seat.occupancy = Occupancy::Empty;
                seat.protection_applied = false;
                seat.dismount_allowed = true;
                seat.bump();
                purged.push(seat.index);
            }
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carriage_common::{CreatureEntry, Pose};

    fn h(i: u32) -> EntityHandle {
        EntityHandle::new(i, 0)
    }

    fn table() -> SeatTable {
        SeatTable::from_templates([
            (0, SeatTemplate::new(10, SeatFlags::USABLE | SeatFlags::CAN_CONTROL)),
            (1, SeatTemplate::new(11, SeatFlags::USABLE | SeatFlags::CAN_ATTACK)),
            (3, SeatTemplate::new(13, SeatFlags::UNCONTROLLED)),
            (5, SeatTemplate::new(15, SeatFlags::empty())),
        ])
    }

    #[test]
    fn initial_free_count_counts_usable_only() {
        let t = table();
        assert_eq!(t.len(), 4);
        assert_eq!(t.free_count(), 2);
    }

    #[test]
    fn initialize_skips_unresolved_seats() {
        let store = carriage_data::demo_templates();
        let vehicle = carriage_data::VehicleTemplate {
            id: carriage_common::VehicleId(77),
            flags: Default::default(),
            seats: vec![
                Some(carriage_common::SeatTemplateId(10)),
                Some(carriage_common::SeatTemplateId(9999)),
                Some(carriage_common::SeatTemplateId(11)),
            ],
        };
        let t = SeatTable::initialize(&vehicle, &store);
        assert_eq!(t.len(), 2);
        assert!(t.get(1).is_none());
        assert!(t.get(2).is_some());
    }

    #[test]
    fn indices_beyond_bound_are_dropped() {
        let t = SeatTable::from_templates([(MAX_VEHICLE_SEATS, SeatTemplate::new(1, SeatFlags::USABLE))]);
        assert!(t.is_empty());
    }

    #[test]
    fn forward_scan_prefers_lowest_index() {
        let t = table();
        assert_eq!(t.find_empty_seat(None, ScanDirection::Forward, SeatFlags::empty()), Some(0));
        assert_eq!(t.find_empty_seat(Some(1), ScanDirection::Forward, SeatFlags::empty()), Some(1));
        assert_eq!(t.find_empty_seat(Some(2), ScanDirection::Forward, SeatFlags::empty()), Some(3));
        assert_eq!(t.find_empty_seat(Some(4), ScanDirection::Forward, SeatFlags::empty()), None);
    }

    #[test]
    fn backward_scan_includes_start() {
        let t = table();
        assert_eq!(t.find_empty_seat(None, ScanDirection::Backward, SeatFlags::empty()), Some(3));
        assert_eq!(t.find_empty_seat(Some(1), ScanDirection::Backward, SeatFlags::empty()), Some(1));
        assert_eq!(t.find_empty_seat(Some(2), ScanDirection::Backward, SeatFlags::empty()), Some(1));
    }

    #[test]
    fn scan_honors_required_flag() {
        let t = table();
        let found = t.find_empty_seat(None, ScanDirection::Forward, SeatFlags::CAN_ATTACK);
        assert_eq!(found, Some(1));
        assert_eq!(t.find_empty_seat(None, ScanDirection::Forward, SeatFlags::HIDE_PASSENGER), None);
    }

    #[test]
    fn start_beyond_bound_finds_nothing() {
        let t = table();
        assert_eq!(
            t.find_empty_seat(Some(MAX_VEHICLE_SEATS), ScanDirection::Backward, SeatFlags::empty()),
            None
        );
    }

    #[test]
    fn occupy_vacate_cycle_bumps_generation() {
        let mut t = table();
        let g1 = t.occupy(0, h(1), true).unwrap();
        assert!(t.occupy(0, h(2), false).is_none());
        assert!(t.mark_controlled(0));
        assert!(t.get(0).unwrap().is_controlled());

        let vacated = t.vacate(0).unwrap();
        assert_eq!(vacated.passenger, h(1));
        assert!(vacated.controlled && vacated.protection_applied);
        let seat = t.get(0).unwrap();
        assert!(seat.is_empty());
        assert!(seat.generation() > g1);
        assert!(t.vacate(0).is_none());
    }

    #[test]
    fn non_control_seat_cannot_be_controlled() {
        let mut t = table();
        t.occupy(1, h(1), false).unwrap();
        assert!(!t.mark_controlled(1));
        assert_eq!(t.get(1).unwrap().occupancy(), Occupancy::Occupied(h(1)));
    }

    #[test]
    fn recount_toggles_boardable_flag() {
        let mut t = table();
        let mut base = Unit::creature(CreatureEntry(1), Pose::default());
        assert_eq!(t.recompute_free_count(Some(&mut base)), 2);
        assert!(base.npc_flags.contains(NpcFlags::SPELLCLICK));

        t.occupy(0, h(1), false);
        t.occupy(1, h(2), false);
        assert_eq!(t.recompute_free_count(Some(&mut base)), 0);
        assert!(base.npc_flags.is_empty());
    }

    #[test]
    fn player_base_uses_player_vehicle_flag() {
        let mut t = table();
        let mut base = Unit::player(Pose::default());
        t.recompute_free_count(Some(&mut base));
        assert!(base.npc_flags.contains(NpcFlags::PLAYER_VEHICLE));
        assert!(!base.npc_flags.contains(NpcFlags::SPELLCLICK));
    }

    #[test]
    fn has_empty_seat_with_and_without_index() {
        let mut t = table();
        assert!(t.has_empty_seat(None));
        assert!(t.has_empty_seat(Some(5)));
        assert!(!t.has_empty_seat(Some(2)));
        t.occupy(5, h(9), false);
        assert!(!t.has_empty_seat(Some(5)));
    }

    #[test]
    fn seat_of_finds_passenger() {
        let mut t = table();
        t.occupy(3, h(4), false);
        assert_eq!(t.seat_of(h(4)).map(Seat::index), Some(3));
        assert!(t.seat_of(h(5)).is_none());
    }

    #[test]
    fn dismount_flag_resets_on_boarding() {
        let mut t = table();
        t.occupy(0, h(1), false);
        assert!(t.set_dismount_allowed(0, false));
        assert!(!t.get(0).unwrap().dismount_allowed());
        t.vacate(0);
        assert!(!t.set_dismount_allowed(0, false));
        t.occupy(0, h(2), false);
        assert!(t.get(0).unwrap().dismount_allowed());
    }

    #[test]
    fn purge_empties_dead_occupants() {
        let mut t = table();
        t.occupy(0, h(1), false);
        t.occupy(1, h(2), false);
        let purged = t.purge_stale(|e| e == h(2));
        assert_eq!(purged, vec![0]);
        assert!(t.get(0).unwrap().is_empty());
        assert_eq!(t.get(1).unwrap().passenger(), Some(h(2)));
    }
}
