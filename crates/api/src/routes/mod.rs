//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod groups;
pub mod health;
pub mod invitations;
pub mod payments;
pub mod reservations;
pub mod subscriptions;
pub mod tickets;
