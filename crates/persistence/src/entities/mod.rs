//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod group;
pub mod invitation;
pub mod reservation;
pub mod subscription;
pub mod ticket;
pub mod user;

pub use group::{EventGroupEntity, GroupMemberRow, GroupMembershipEntity};
pub use invitation::{FriendInvitationEntity, InvitationPreviewRow, InvitationStatusDb};
pub use reservation::{
    settlement_columns, PricePlanDb, ReservationEntity, ReservationStatusDb, SettlementKindDb,
};
pub use subscription::{SubscriptionEntity, SubscriptionPlanDb, SubscriptionStatusDb};
pub use ticket::{TicketEntity, TicketSourceDb, TicketStatusDb};
pub use user::UserEntity;
