pub mod error;
pub mod interval;
pub mod timefmt;

pub use error::AppError;
