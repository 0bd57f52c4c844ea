//! Event group entities (database row mappings).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use domain::models::group::{EventGroup, GroupMemberInfo, GroupMembership};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the event_groups table.
#[derive(Debug, Clone, FromRow)]
pub struct EventGroupEntity {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub activity_name: String,
    pub meeting_point_name: Option<String>,
    pub meeting_point_address: Option<String>,
    pub meeting_time: NaiveTime,
    pub location_reveal_time: Option<DateTime<Utc>>,
    pub max_participants: i32,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventGroupEntity> for EventGroup {
    fn from(entity: EventGroupEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            event_date: entity.event_date,
            activity_name: entity.activity_name,
            meeting_point_name: entity.meeting_point_name,
            meeting_point_address: entity.meeting_point_address,
            meeting_time: entity.meeting_time,
            location_reveal_time: entity.location_reveal_time,
            max_participants: entity.max_participants,
            is_confirmed: entity.is_confirmed,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the group_memberships table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMembershipEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub reservation_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMembershipEntity> for GroupMembership {
    fn from(entity: GroupMembershipEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            reservation_id: entity.reservation_id,
            joined_at: entity.joined_at,
        }
    }
}

/// Membership row joined with reservation owner info for listing.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberRow {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMemberRow> for GroupMemberInfo {
    fn from(row: GroupMemberRow) -> Self {
        Self {
            reservation_id: row.reservation_id,
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            joined_at: row.joined_at,
        }
    }
}
