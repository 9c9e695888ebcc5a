pub mod booking;
pub mod capacity;
pub mod store;
pub mod supabase_store;
pub mod validation;

pub use booking::{parse_candidate, AppointmentBookingService};
pub use capacity::CapacityService;
pub use store::{BookingStore, InMemoryBookingStore, StoreError};
pub use supabase_store::SupabaseBookingStore;
pub use validation::SlotValidator;
