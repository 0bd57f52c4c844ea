//! Pure domain services with no persistence dependencies.

pub mod assignment;
pub mod risk;
