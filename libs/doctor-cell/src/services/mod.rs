pub mod doctor;
pub mod schedule;
pub mod slots;

pub use doctor::DoctorService;
pub use schedule::{ParsedSchedule, RejectedEntry, ScheduleParseError};
pub use slots::{generate_slots, slots_on, weekly_slots, SlotIter, SLOT_MINUTES};
