//! Domain layer for the Gatherly backend.
//!
//! This crate contains:
//! - Domain models (Reservation, Ticket, Subscription, EventGroup, FriendInvitation)
//! - Business logic services (group assignment, risk assessment)
//! - Domain error types

pub mod models;
pub mod services;
