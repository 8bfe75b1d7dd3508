//! Infrastructure layer: concrete port implementations.

pub mod clock;
pub mod gateway;
pub mod persistence;

pub use clock::{FixedClock, SystemClock};
