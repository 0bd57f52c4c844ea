//! External service integrations.

pub mod email;

#[allow(unused_imports)] // Used in routes
pub use email::{EmailError, EmailService};
