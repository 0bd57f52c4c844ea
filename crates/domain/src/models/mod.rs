//! Domain models for Gatherly.

pub mod group;
pub mod invitation;
pub mod reservation;
pub mod schedule;
pub mod subscription;
pub mod ticket;
pub mod user;

pub use group::{EventGroup, GroupMembership};
pub use invitation::FriendInvitation;
pub use reservation::Reservation;
pub use subscription::Subscription;
pub use ticket::Ticket;
pub use user::User;
