pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod slots;

pub use booking::BookingService;
pub use conflict::ConflictService;
pub use lifecycle::ReservationLifecycleService;
pub use slots::SlotGeneratorService;
