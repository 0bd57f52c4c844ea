//! Admin endpoint handlers.
//!
//! These sit behind the static admin token middleware and expose the
//! operator surface: platform stats, user risk overview, the reservation
//! ledger and group management. Admin group responses are never redacted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::group::{
    default_meeting_time, BatchGroupsRequest, CreateGroupRequest, EventGroup, GroupMemberInfo,
};
use domain::models::reservation::{Reservation, ReservationResponse, ReservationStatus};
use domain::models::user::{User, UserResponse};
use domain::services::assignment::{plan_groups, AssignmentError};
use domain::services::risk::{assess, AccountActivity, RiskLevel};
use persistence::entities::ReservationStatusDb;
use persistence::repositories::{
    AdminRepository, GroupRepository, NewGroup, ReservationRepository,
};
use shared::pagination::{Paged, PageInfo, PaginationParams};

/// Platform-wide counters for the admin overview.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PlatformStatsResponse {
    pub total_users: i64,
    pub total_reservations: i64,
    pub pending_reservations: i64,
    pub confirmed_reservations: i64,
    pub cancelled_reservations: i64,
    pub active_tickets: i64,
    pub active_subscriptions: i64,
    pub pending_invitations: i64,
}

/// One user row in the admin listing, with their risk level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub risk_level: RiskLevel,
}

/// A user's aggregated activity with the derived risk level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserActivityResponse {
    pub user: UserResponse,
    pub total_reservations: i64,
    pub cancelled_reservations: i64,
    pub active_tickets: i64,
    pub ticket_settled_reservations: i64,
    pub has_active_subscription: bool,
    pub risk_level: RiskLevel,
}

impl UserActivityResponse {
    fn new(user: UserResponse, activity: AccountActivity) -> Self {
        Self {
            user,
            total_reservations: activity.total_reservations,
            cancelled_reservations: activity.cancelled_reservations,
            active_tickets: activity.active_tickets,
            ticket_settled_reservations: activity.ticket_settled_reservations,
            has_active_subscription: activity.has_active_subscription,
            risk_level: assess(&activity),
        }
    }
}

/// Reservation status filter accepted on the query string.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatusFilter {
    Draft,
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl From<ReservationStatusFilter> for ReservationStatusDb {
    fn from(filter: ReservationStatusFilter) -> Self {
        match filter {
            ReservationStatusFilter::Draft => ReservationStatusDb::Draft,
            ReservationStatusFilter::Pending => ReservationStatusDb::Pending,
            ReservationStatusFilter::Confirmed => ReservationStatusDb::Confirmed,
            ReservationStatusFilter::Cancelled => ReservationStatusDb::Cancelled,
            ReservationStatusFilter::Completed => ReservationStatusDb::Completed,
        }
    }
}

/// Query parameters for the admin reservation ledger.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListReservationsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ReservationStatusFilter>,
}

impl ListReservationsQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Query parameters for listing groups by event date.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListGroupsQuery {
    pub event_date: NaiveDate,
}

/// Admin request to set a group's meeting point.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SetGroupLocationRequest {
    #[validate(length(min = 1, max = 200, message = "meeting_point_name must be 1-200 characters"))]
    pub meeting_point_name: String,

    pub meeting_point_address: Option<String>,

    pub location_reveal_time: Option<chrono::DateTime<Utc>>,
}

/// Group representation for the admin surface, meeting point included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminGroupResponse {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub activity_name: String,
    pub meeting_point_name: Option<String>,
    pub meeting_point_address: Option<String>,
    pub meeting_time: chrono::NaiveTime,
    pub location_reveal_time: Option<chrono::DateTime<Utc>>,
    pub max_participants: i32,
    pub participants_count: i64,
    pub is_confirmed: bool,
    pub members: Vec<GroupMemberInfo>,
}

impl AdminGroupResponse {
    fn new(group: EventGroup, members: Vec<GroupMemberInfo>) -> Self {
        Self {
            id: group.id,
            name: group.name,
            event_date: group.event_date,
            activity_name: group.activity_name,
            meeting_point_name: group.meeting_point_name,
            meeting_point_address: group.meeting_point_address,
            meeting_time: group.meeting_time,
            location_reveal_time: group.location_reveal_time,
            max_participants: group.max_participants,
            participants_count: members.len() as i64,
            is_confirmed: group.is_confirmed,
            members,
        }
    }
}

/// Platform-wide counters.
///
/// GET /api/admin/stats
pub async fn platform_stats(
    State(state): State<AppState>,
) -> Result<Json<PlatformStatsResponse>, ApiError> {
    let repo = AdminRepository::new(state.pool.clone());
    let stats = repo.platform_stats(Utc::now()).await?;

    Ok(Json(PlatformStatsResponse {
        total_users: stats.total_users,
        total_reservations: stats.total_reservations,
        pending_reservations: stats.pending_reservations,
        confirmed_reservations: stats.confirmed_reservations,
        cancelled_reservations: stats.cancelled_reservations,
        active_tickets: stats.active_tickets,
        active_subscriptions: stats.active_subscriptions,
        pending_invitations: stats.pending_invitations,
    }))
}

/// List user accounts with their risk level, newest first.
///
/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paged<AdminUserResponse>>, ApiError> {
    let now = Utc::now();
    let params = params.normalized();
    let repo = AdminRepository::new(state.pool.clone());

    let entities = repo.list_users(params.limit(), params.offset()).await?;
    let total = repo.count_users().await?;

    let mut data = Vec::with_capacity(entities.len());
    for entity in entities {
        let user = User::from(entity);
        let activity = repo.account_activity(user.id, now).await?;
        data.push(AdminUserResponse {
            user: user.into(),
            risk_level: assess(&activity),
        });
    }

    Ok(Json(Paged {
        data,
        pagination: PageInfo::new(params, total),
    }))
}

/// One user's aggregated activity and risk level.
///
/// GET /api/admin/users/:id/activity
pub async fn user_activity(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserActivityResponse>, ApiError> {
    let users = persistence::repositories::UserRepository::new(state.pool.clone());
    let entity = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let repo = AdminRepository::new(state.pool.clone());
    let activity = repo.account_activity(user_id, Utc::now()).await?;

    Ok(Json(UserActivityResponse::new(
        User::from(entity).into(),
        activity,
    )))
}

/// Reservation ledger across all users, optionally filtered by status.
///
/// GET /api/admin/reservations?status=confirmed
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<Paged<ReservationResponse>>, ApiError> {
    let params = query.pagination();
    let status = query.status.map(ReservationStatusDb::from);
    let repo = ReservationRepository::new(state.pool.clone());

    let entities = repo.list_all(status, params.limit(), params.offset()).await?;
    let total = repo.count_all(status).await?;

    let data = entities
        .into_iter()
        .map(|e| ReservationResponse::from(Reservation::from(e)))
        .collect();

    Ok(Json(Paged {
        data,
        pagination: PageInfo::new(params, total),
    }))
}

/// Create one group from an explicit set of confirmed reservations.
///
/// POST /api/admin/groups
///
/// All reservations must be confirmed and belong to the same occurrence;
/// the event date and activity are taken from them.
pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<AdminGroupResponse>), ApiError> {
    request.validate()?;

    let reservations = ReservationRepository::new(state.pool.clone());
    let mut occurrence: Option<(NaiveDate, String)> = None;

    for id in &request.reservation_ids {
        let entity = reservations
            .find_by_id(*id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Reservation {} not found", id)))?;
        let reservation = Reservation::from(entity);

        if reservation.status != ReservationStatus::Confirmed {
            return Err(ApiError::validation(format!(
                "Reservation {} is not confirmed",
                id
            )));
        }

        let key = (reservation.event_date, reservation.activity_name);
        match &occurrence {
            None => occurrence = Some(key),
            Some(expected) if *expected != key => {
                return Err(ApiError::validation(
                    "All reservations must share the same event date and activity",
                ));
            }
            Some(_) => {}
        }
    }

    let (event_date, activity_name) =
        occurrence.ok_or_else(|| ApiError::validation("No reservations given"))?;

    let groups = GroupRepository::new(state.pool.clone());
    let entity = groups
        .create_group_with_members(
            NewGroup {
                name: &request.name,
                event_date,
                activity_name: &activity_name,
                meeting_point_name: request.meeting_point_name.as_deref(),
                meeting_point_address: request.meeting_point_address.as_deref(),
                meeting_time: request.meeting_time.unwrap_or_else(default_meeting_time),
                location_reveal_time: request.location_reveal_time,
                max_participants: request.reservation_ids.len() as i32,
                is_confirmed: false,
            },
            &request.reservation_ids,
        )
        .await?;

    info!(group_id = %entity.id, %event_date, "Group created");

    let members = member_infos(&groups, entity.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(AdminGroupResponse::new(EventGroup::from(entity), members)),
    ))
}

/// Batch all unassigned confirmed reservations of one occurrence into
/// capacity-sized groups.
///
/// POST /api/admin/groups/batch
pub async fn batch_groups(
    State(state): State<AppState>,
    Json(request): Json<BatchGroupsRequest>,
) -> Result<(StatusCode, Json<Vec<AdminGroupResponse>>), ApiError> {
    request.validate()?;

    let reservations = ReservationRepository::new(state.pool.clone());
    let candidates = reservations
        .list_unassigned_confirmed(request.event_date, &request.activity_name)
        .await?;
    let candidate_ids: Vec<Uuid> = candidates.iter().map(|r| r.id).collect();

    let plan = plan_groups(&request.activity_name, &candidate_ids, request.capacity).map_err(
        |e| match e {
            AssignmentError::NoCandidates => {
                ApiError::NotFound("No unassigned confirmed reservations for this occurrence".to_string())
            }
            AssignmentError::CapacityTooSmall(_) => ApiError::validation(e.to_string()),
            AssignmentError::DuplicateReservation(_) => ApiError::Conflict(e.to_string()),
        },
    )?;

    let groups = GroupRepository::new(state.pool.clone());
    let created = groups
        .create_groups_batch(
            request.event_date,
            &request.activity_name,
            default_meeting_time(),
            &plan,
        )
        .await?;

    info!(
        event_date = %request.event_date,
        activity = %request.activity_name,
        groups = created.len(),
        "Batch group assignment completed"
    );

    let mut responses = Vec::with_capacity(created.len());
    for entity in created {
        let members = member_infos(&groups, entity.id).await?;
        responses.push(AdminGroupResponse::new(EventGroup::from(entity), members));
    }

    Ok((StatusCode::CREATED, Json(responses)))
}

/// List the groups of one event date.
///
/// GET /api/admin/groups?event_date=2024-06-13
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<ListGroupsQuery>,
) -> Result<Json<Vec<AdminGroupResponse>>, ApiError> {
    let groups = GroupRepository::new(state.pool.clone());
    let entities = groups.list_for_event(query.event_date).await?;

    let mut responses = Vec::with_capacity(entities.len());
    for entity in entities {
        let members = member_infos(&groups, entity.id).await?;
        responses.push(AdminGroupResponse::new(EventGroup::from(entity), members));
    }

    Ok(Json(responses))
}

/// Set a group's meeting point and reveal time.
///
/// PUT /api/admin/groups/:id/location
pub async fn set_group_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetGroupLocationRequest>,
) -> Result<Json<AdminGroupResponse>, ApiError> {
    request.validate()?;

    let groups = GroupRepository::new(state.pool.clone());
    let entity = groups
        .set_location(
            id,
            &request.meeting_point_name,
            request.meeting_point_address.as_deref(),
            request.location_reveal_time,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    info!(group_id = %entity.id, "Group location updated");

    let members = member_infos(&groups, entity.id).await?;
    Ok(Json(AdminGroupResponse::new(EventGroup::from(entity), members)))
}

/// Mark a group as confirmed.
///
/// POST /api/admin/groups/:id/confirm
pub async fn confirm_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminGroupResponse>, ApiError> {
    let groups = GroupRepository::new(state.pool.clone());
    let entity = groups
        .confirm_group(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    info!(group_id = %entity.id, "Group confirmed");

    let members = member_infos(&groups, entity.id).await?;
    Ok(Json(AdminGroupResponse::new(EventGroup::from(entity), members)))
}

async fn member_infos(
    repo: &GroupRepository,
    group_id: Uuid,
) -> Result<Vec<GroupMemberInfo>, ApiError> {
    Ok(repo
        .list_members(group_id)
        .await?
        .into_iter()
        .map(GroupMemberInfo::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_deserialization() {
        let filter: ReservationStatusFilter = serde_json::from_str(r#""confirmed""#).unwrap();
        assert!(matches!(filter, ReservationStatusFilter::Confirmed));
        assert!(serde_json::from_str::<ReservationStatusFilter>(r#""unknown""#).is_err());
    }

    #[test]
    fn test_set_location_request_validation() {
        let ok = SetGroupLocationRequest {
            meeting_point_name: "Le Bistro".to_string(),
            meeting_point_address: Some("12 rue de la Paix".to_string()),
            location_reveal_time: None,
        };
        assert!(ok.validate().is_ok());

        let blank = SetGroupLocationRequest {
            meeting_point_name: String::new(),
            ..ok
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_batch_request_capacity_bounds() {
        let ok = BatchGroupsRequest {
            event_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            activity_name: "Dinner".to_string(),
            capacity: Some(8),
        };
        assert!(ok.validate().is_ok());

        let too_big = BatchGroupsRequest {
            capacity: Some(13),
            ..ok
        };
        assert!(too_big.validate().is_err());
    }
}
