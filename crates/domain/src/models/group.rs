//! Event group models: dinner tables assembled from confirmed reservations.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Default table capacity.
pub const DEFAULT_GROUP_CAPACITY: usize = 6;

/// A group of participants assigned to one table at one occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventGroup {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub activity_name: String,
    pub meeting_point_name: Option<String>,
    pub meeting_point_address: Option<String>,
    pub meeting_time: NaiveTime,
    /// Meeting point stays hidden until this instant.
    pub location_reveal_time: Option<DateTime<Utc>>,
    pub max_participants: i32,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventGroup {
    /// Whether the meeting point may be shown at `now`.
    ///
    /// With no reveal time configured the location stays hidden.
    pub fn can_reveal_location(&self, now: DateTime<Utc>) -> bool {
        match self.location_reveal_time {
            Some(reveal_at) => now >= reveal_at,
            None => false,
        }
    }
}

/// Default meeting time when the admin does not send one.
pub fn default_meeting_time() -> NaiveTime {
    NaiveTime::from_hms_opt(20, 0, 0).expect("20:00:00 is a valid time of day")
}

/// Links one reservation to one group. A reservation belongs to at most one
/// group, enforced by a unique constraint on reservation_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub reservation_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

/// Admin request to create one group from an explicit reservation set.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "at least one reservation is required"))]
    pub reservation_ids: Vec<Uuid>,

    pub meeting_point_name: Option<String>,
    pub meeting_point_address: Option<String>,

    /// Meeting time (default 20:00).
    pub meeting_time: Option<NaiveTime>,

    pub location_reveal_time: Option<DateTime<Utc>>,
}

/// Admin request to batch all unassigned confirmed reservations of one
/// occurrence into capacity-sized groups.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct BatchGroupsRequest {
    pub event_date: NaiveDate,

    #[validate(length(min = 1, max = 200, message = "activity_name must be 1-200 characters"))]
    pub activity_name: String,

    /// Table capacity (default 6).
    #[validate(range(min = 2, max = 12, message = "capacity must be 2-12"))]
    pub capacity: Option<i32>,
}

/// One member row in a group response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMemberInfo {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub joined_at: DateTime<Utc>,
}

/// Group representation returned by the API.
///
/// The meeting point fields are present only once the reveal gate is open.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub activity_name: String,
    pub meeting_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_point_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_point_address: Option<String>,
    pub location_revealed: bool,
    pub location_reveal_time: Option<DateTime<Utc>>,
    pub max_participants: i32,
    pub participants_count: i64,
    pub is_confirmed: bool,
    pub members: Vec<GroupMemberInfo>,
}

impl GroupResponse {
    /// Builds the response, redacting the meeting point before reveal time.
    pub fn from_group(
        group: EventGroup,
        participants_count: i64,
        members: Vec<GroupMemberInfo>,
        now: DateTime<Utc>,
    ) -> Self {
        let revealed = group.can_reveal_location(now);
        Self {
            id: group.id,
            name: group.name,
            event_date: group.event_date,
            activity_name: group.activity_name,
            meeting_time: group.meeting_time,
            meeting_point_name: revealed.then_some(group.meeting_point_name).flatten(),
            meeting_point_address: revealed.then_some(group.meeting_point_address).flatten(),
            location_revealed: revealed,
            location_reveal_time: group.location_reveal_time,
            max_participants: group.max_participants,
            participants_count,
            is_confirmed: group.is_confirmed,
            members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_group(reveal: Option<DateTime<Utc>>) -> EventGroup {
        let now = Utc::now();
        EventGroup {
            id: Uuid::new_v4(),
            name: "Table 1".to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            activity_name: "Dinner".to_string(),
            meeting_point_name: Some("Le Bistro".to_string()),
            meeting_point_address: Some("12 rue de la Paix".to_string()),
            meeting_time: default_meeting_time(),
            location_reveal_time: reveal,
            max_participants: 6,
            is_confirmed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reveal_gate_respects_time() {
        let now = Utc::now();
        let group = sample_group(Some(now + Duration::hours(2)));
        assert!(!group.can_reveal_location(now));
        assert!(group.can_reveal_location(now + Duration::hours(2)));
        assert!(group.can_reveal_location(now + Duration::hours(3)));
    }

    #[test]
    fn test_no_reveal_time_stays_hidden() {
        let group = sample_group(None);
        assert!(!group.can_reveal_location(Utc::now()));
    }

    #[test]
    fn test_response_redacts_location_before_reveal() {
        let now = Utc::now();
        let group = sample_group(Some(now + Duration::hours(1)));
        let response = GroupResponse::from_group(group.clone(), 4, vec![], now);
        assert!(!response.location_revealed);
        assert!(response.meeting_point_name.is_none());
        assert!(response.meeting_point_address.is_none());
        // Reveal time itself is not secret.
        assert_eq!(response.location_reveal_time, group.location_reveal_time);
    }

    #[test]
    fn test_response_shows_location_after_reveal() {
        let now = Utc::now();
        let group = sample_group(Some(now - Duration::minutes(5)));
        let response = GroupResponse::from_group(group, 4, vec![], now);
        assert!(response.location_revealed);
        assert_eq!(response.meeting_point_name.as_deref(), Some("Le Bistro"));
    }
}
