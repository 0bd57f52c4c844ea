//! Friend invitation endpoint handlers.
//!
//! Inviters create tokenized invitations against their paid reservations.
//! The token routes (preview and accept) are public so invitees without an
//! account can see what they were invited to and sign up in one step.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::{record_invitation_accepted, record_invitation_sent};
use domain::models::invitation::{
    generate_invitation_token, AcceptInvitationRequest, CreateInvitationRequest,
    FriendInvitation, InvitationPreview, InvitationResponse, InvitationStatus,
};
use domain::models::reservation::{Reservation, ReservationResponse, ReservationStatus};
use domain::models::schedule::{invitation_expiry, invitation_window_open};
use domain::models::user::{User, UserResponse};
use persistence::entities::InvitationStatusDb;
use persistence::repositories::{InvitationRepository, ReservationRepository, UserRepository};
use shared::jwt::TokenPair;
use shared::password::{hash_password, verify_password};

/// Response for accepting an invitation: the (possibly new) account, the
/// accepted invitation and a token pair so the invitee is logged in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AcceptInvitationResponse {
    pub user: UserResponse,
    pub invitation: InvitationResponse,
    pub tokens: TokenPair,
}

/// Invite a friend to the event of one of the caller's reservations.
///
/// POST /api/invitations
///
/// Idempotent per (inviter, reservation, email): resending while the
/// previous invitation is still live refreshes its message and returns
/// it; an expired one is replaced with a fresh token.
pub async fn create_invitation(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiError> {
    request.validate()?;

    let now = Utc::now();
    let reservations = ReservationRepository::new(state.pool.clone());
    let entity = reservations
        .find_by_id_for_user(request.reservation_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    let reservation = Reservation::from(entity);

    // Paid alone is not enough: cancelling keeps paid_at, so a cancelled
    // reservation would still pass an is_paid check.
    if reservation.status != ReservationStatus::Confirmed || !reservation.is_paid() {
        return Err(ApiError::InvalidState(
            "Only confirmed, paid reservations can carry invitations".to_string(),
        ));
    }

    // Invitations are for bringing in new people. Existing members book
    // their own spot.
    let users = UserRepository::new(state.pool.clone());
    if users.find_by_email(&request.invited_email).await?.is_some() {
        return Err(ApiError::Conflict(
            "This email already belongs to a registered account".to_string(),
        ));
    }

    // Creation closes with the cancellation window, at the Tuesday
    // deadline. Acceptance runs one second longer, until the
    // Wednesday-midnight expiry.
    if !invitation_window_open(reservation.event_date, now) {
        return Err(ApiError::DeadlinePassed(
            "The invitation window for this event has closed".to_string(),
        ));
    }
    let expires_at = invitation_expiry(reservation.event_date);

    let token = generate_invitation_token();
    let invitations = InvitationRepository::new(state.pool.clone());
    let result = invitations
        .create_invitation(
            auth.user_id,
            request.reservation_id,
            &request.invited_email,
            &token,
            request.message.as_deref(),
            expires_at,
            now,
        )
        .await?;

    if result.created {
        record_invitation_sent();
        info!(
            invitation_id = %result.invitation.id,
            reservation_id = %request.reservation_id,
            "Invitation created"
        );

        if let Err(e) = state
            .email
            .send_invitation_email(
                &request.invited_email,
                &reservation_user_first_name(&state, auth.user_id).await?,
                &reservation.activity_name,
                reservation.event_date,
                &result.invitation.token,
                request.message.as_deref(),
            )
            .await
        {
            // The invitation stands even when delivery fails. The inviter
            // can share the token link directly.
            warn!(invitation_id = %result.invitation.id, error = %e, "Invitation email failed");
        }
    }

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(InvitationResponse::from(FriendInvitation::from(
            result.invitation,
        ))),
    ))
}

/// List the invitations the caller sent for one reservation.
///
/// GET /api/reservations/:id/invitations
pub async fn list_reservation_invitations(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>, ApiError> {
    let reservations = ReservationRepository::new(state.pool.clone());
    if reservations
        .find_by_id_for_user(reservation_id, auth.user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Reservation not found".to_string()));
    }

    let invitations = InvitationRepository::new(state.pool.clone());
    let entities = invitations
        .list_for_reservation(auth.user_id, reservation_id)
        .await?;

    Ok(Json(
        entities
            .into_iter()
            .map(|e| InvitationResponse::from(FriendInvitation::from(e)))
            .collect(),
    ))
}

/// Preview an invitation by token, without authentication.
///
/// GET /api/invitations/:token
pub async fn preview_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationPreview>, ApiError> {
    let now = Utc::now();
    let repo = InvitationRepository::new(state.pool.clone());
    let row = repo
        .preview_by_token(&token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    let is_valid = row.status == InvitationStatusDb::Pending && now < row.expires_at;

    Ok(Json(InvitationPreview {
        inviter_first_name: row.inviter_first_name,
        activity_name: row.activity_name,
        event_date: row.event_date,
        message: row.message,
        expires_at: row.expires_at,
        is_valid,
    }))
}

/// Accept an invitation by token, creating the invitee's account when the
/// email is not yet registered.
///
/// POST /api/invitations/:token/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, ApiError> {
    request.validate()?;

    let now = Utc::now();
    let invitations = InvitationRepository::new(state.pool.clone());
    let entity = invitations
        .find_by_token(&token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;
    let invitation = FriendInvitation::from(entity);

    if !invitation.is_valid(now) {
        return match invitation.status {
            InvitationStatus::Pending => Err(ApiError::DeadlinePassed(
                "This invitation has expired".to_string(),
            )),
            _ => Err(ApiError::InvalidState(
                "This invitation has already been used".to_string(),
            )),
        };
    }

    if !request
        .email
        .eq_ignore_ascii_case(&invitation.invited_email)
    {
        return Err(ApiError::Mismatch(
            "This invitation was sent to a different email address".to_string(),
        ));
    }

    let users = UserRepository::new(state.pool.clone());
    let user = match users.find_by_email(&request.email).await? {
        Some(existing) => {
            let verified = verify_password(&request.password, &existing.password_hash)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            if !verified {
                return Err(ApiError::Unauthorized(
                    "Invalid email or password".to_string(),
                ));
            }
            User::from(existing)
        }
        None => {
            let password_hash =
                hash_password(&request.password).map_err(|e| ApiError::Internal(e.to_string()))?;
            let created = users
                .create_user(
                    &request.email,
                    &password_hash,
                    &request.first_name,
                    &request.last_name,
                    true,
                )
                .await?;
            User::from(created)
        }
    };

    let accepted = invitations
        .accept_invitation(&token, user.id, now)
        .await?
        .ok_or_else(|| {
            // Lost the race against another acceptance or the expiry sweep.
            ApiError::Conflict("This invitation is no longer available".to_string())
        })?;

    record_invitation_accepted();
    info!(invitation_id = %accepted.id, user_id = %user.id, "Invitation accepted");

    let jwt_config = crate::middleware::UserAuth::create_jwt_config(&state.config.jwt)
        .map_err(ApiError::Internal)?;
    let tokens = jwt_config
        .generate_token_pair(user.id)
        .map_err(|e| ApiError::Internal(format!("Failed to issue tokens: {}", e)))?;

    Ok(Json(AcceptInvitationResponse {
        user: user.into(),
        invitation: InvitationResponse::from(FriendInvitation::from(accepted)),
        tokens,
    }))
}

/// Turn the caller's accepted invitation into their own pending
/// reservation, cloned from the inviter's booking. Payment is still
/// required; the invitation only bypasses matching.
///
/// POST /api/invitations/materialize
pub async fn materialize_invitation(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let invitations = InvitationRepository::new(state.pool.clone());
    let entity = invitations
        .find_latest_for_invited_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No accepted invitation found".to_string()))?;
    let invitation = FriendInvitation::from(entity);

    if !invitation.can_be_used() {
        return Err(ApiError::InvalidState(
            "This invitation has already been used".to_string(),
        ));
    }

    let reservation = invitations
        .materialize_reservation(invitation.id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("This invitation is no longer available".to_string())
        })?;

    info!(
        invitation_id = %invitation.id,
        reservation_id = %reservation.id,
        user_id = %auth.user_id,
        "Invitation materialized into a reservation"
    );

    Ok((
        StatusCode::CREATED,
        Json(Reservation::from(reservation).into()),
    ))
}

async fn reservation_user_first_name(
    state: &AppState,
    user_id: Uuid,
) -> Result<String, ApiError> {
    let users = UserRepository::new(state.pool.clone());
    let entity = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;
    Ok(entity.first_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_invitation_request_validation() {
        let ok = CreateInvitationRequest {
            invited_email: "friend@example.com".to_string(),
            reservation_id: Uuid::new_v4(),
            message: Some("Join us!".to_string()),
        };
        assert!(ok.validate().is_ok());

        let bad_email = CreateInvitationRequest {
            invited_email: "nope".to_string(),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let long_message = CreateInvitationRequest {
            message: Some("x".repeat(501)),
            ..ok
        };
        assert!(long_message.validate().is_err());
    }
}
