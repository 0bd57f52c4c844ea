//! Repository implementations for database operations.

pub mod admin;
pub mod group;
pub mod invitation;
pub mod reservation;
pub mod subscription;
pub mod ticket;
pub mod user;

pub use admin::AdminRepository;
pub use group::{GroupRepository, NewGroup};
pub use invitation::InvitationRepository;
pub use reservation::ReservationRepository;
pub use subscription::SubscriptionRepository;
pub use ticket::TicketRepository;
pub use user::UserRepository;
