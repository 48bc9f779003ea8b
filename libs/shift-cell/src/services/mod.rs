pub mod shifts;

pub use shifts::ShiftService;
