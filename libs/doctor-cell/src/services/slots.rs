// libs/doctor-cell/src/services/slots.rs
use std::collections::BTreeSet;

use crate::models::{AvailabilityEntry, DayOfWeek, DaySlots, TimeOfDay, WeeklyAvailability};

/// Appointment granularity. Slots start on multiples of this many minutes past midnight.
pub const SLOT_MINUTES: u16 = 30;

/// Lazily walks one availability range in `SLOT_MINUTES` steps.
///
/// The first slot is `start` rounded up to the grid; every yielded slot is
/// strictly before `end`.
#[derive(Debug, Clone)]
pub struct SlotIter {
    cursor: u16,
    end: u16,
}

impl SlotIter {
    pub fn new(entry: &AvailabilityEntry) -> Self {
        let start = entry.start.minutes();
        let cursor = start.div_ceil(SLOT_MINUTES) * SLOT_MINUTES;
        Self {
            cursor,
            end: entry.end.minutes(),
        }
    }
}

impl Iterator for SlotIter {
    type Item = TimeOfDay;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let slot = TimeOfDay::from_minutes(self.cursor)?;
        self.cursor += SLOT_MINUTES;
        Some(slot)
    }
}

/// Slots for every entry, entry by entry in schedule order.
pub fn generate_slots(
    availability: &WeeklyAvailability,
) -> impl Iterator<Item = (DayOfWeek, TimeOfDay)> + '_ {
    availability
        .entries
        .iter()
        .flat_map(|entry| SlotIter::new(entry).map(move |slot| (entry.day, slot)))
}

/// Sorted, de-duplicated slots offered on `day`. Overlapping entries collapse.
pub fn slots_on(availability: &WeeklyAvailability, day: DayOfWeek) -> Vec<TimeOfDay> {
    availability
        .entries_for(day)
        .flat_map(SlotIter::new)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Slots grouped per day, Sunday first; days with no slots are left out.
pub fn weekly_slots(availability: &WeeklyAvailability) -> Vec<DaySlots> {
    DayOfWeek::ALL
        .into_iter()
        .map(|day| DaySlots {
            day,
            slots: slots_on(availability, day),
        })
        .filter(|day_slots| !day_slots.slots.is_empty())
        .collect()
}
