//! Event group endpoint handlers for participants.
//!
//! Meeting point details are redacted until the reveal time passes, so
//! these handlers return the shared redacting response type.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use domain::models::group::{EventGroup, GroupMemberInfo, GroupResponse};
use persistence::repositories::GroupRepository;

/// List the groups the caller belongs to, newest event first.
///
/// GET /api/groups/mine
pub async fn list_my_groups(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let now = Utc::now();
    let repo = GroupRepository::new(state.pool.clone());
    let entities = repo.list_for_user(auth.user_id).await?;

    let mut groups = Vec::with_capacity(entities.len());
    for entity in entities {
        let members: Vec<GroupMemberInfo> = repo
            .list_members(entity.id)
            .await?
            .into_iter()
            .map(GroupMemberInfo::from)
            .collect();
        let participants_count = members.len() as i64;
        groups.push(GroupResponse::from_group(
            EventGroup::from(entity),
            participants_count,
            members,
            now,
        ));
    }

    Ok(Json(groups))
}

/// Fetch a group the caller is a member of.
///
/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupResponse>, ApiError> {
    let now = Utc::now();
    let repo = GroupRepository::new(state.pool.clone());

    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let members: Vec<GroupMemberInfo> = repo
        .list_members(entity.id)
        .await?
        .into_iter()
        .map(GroupMemberInfo::from)
        .collect();

    // Non-members get the same response as a missing group.
    if !members.iter().any(|m| m.user_id == auth.user_id) {
        return Err(ApiError::NotFound("Group not found".to_string()));
    }

    let participants_count = members.len() as i64;
    Ok(Json(GroupResponse::from_group(
        EventGroup::from(entity),
        participants_count,
        members,
        now,
    )))
}
