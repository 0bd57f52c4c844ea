//! Friend invitation model: tokenized invites tied to a paid reservation.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    /// 24 random bytes, base64url without padding, is always 32 characters.
    pub static ref INVITATION_TOKEN_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_-]{32}$").unwrap();
}

/// Invitation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Used,
}

/// An invitation from a paying member to a friend, scoped to one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendInvitation {
    pub id: Uuid,
    pub inviter_id: Uuid,
    pub reservation_id: Uuid,
    pub invited_email: String,
    /// URL-safe single-use token sent to the invitee.
    pub token: String,
    pub status: InvitationStatus,
    pub message: Option<String>,
    /// Wednesday 00:00:00 preceding the event.
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl FriendInvitation {
    /// Whether the invitation can still be accepted at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && now < self.expires_at
    }

    /// Whether an accepted invitation still grants its one reservation.
    pub fn can_be_used(&self) -> bool {
        self.status == InvitationStatus::Accepted
    }
}

/// Generates a fresh invitation token: 24 random bytes as base64url.
pub fn generate_invitation_token() -> String {
    use base64::Engine;

    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Request to invite a friend to the event of one of the inviter's
/// reservations.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateInvitationRequest {
    #[validate(email(message = "invited_email must be a valid email address"))]
    pub invited_email: String,

    pub reservation_id: Uuid,

    #[validate(length(max = 500, message = "message must be at most 500 characters"))]
    pub message: Option<String>,
}

/// Request body for accepting an invitation by token.
///
/// Creates the invitee's account when the email is not yet registered.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct AcceptInvitationRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(custom(function = "shared::validation::validate_password_strength"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: String,
}

/// Invitation representation returned to the inviter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationResponse {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub invited_email: String,
    pub token: String,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<FriendInvitation> for InvitationResponse {
    fn from(inv: FriendInvitation) -> Self {
        Self {
            id: inv.id,
            reservation_id: inv.reservation_id,
            invited_email: inv.invited_email,
            token: inv.token,
            status: inv.status,
            message: inv.message,
            expires_at: inv.expires_at,
            accepted_at: inv.accepted_at,
            created_at: inv.created_at,
        }
    }
}

/// Public view of an invitation looked up by token, shown to the invitee
/// before they accept.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationPreview {
    pub inviter_first_name: String,
    pub activity_name: String,
    pub event_date: chrono::NaiveDate,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    fn sample(status: InvitationStatus, expires_at: DateTime<Utc>) -> FriendInvitation {
        FriendInvitation {
            id: Uuid::new_v4(),
            inviter_id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            invited_email: "friend@example.com".to_string(),
            token: generate_invitation_token(),
            status,
            message: None,
            expires_at,
            accepted_at: None,
            accepted_by_user_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_shape() {
        for _ in 0..20 {
            let token = generate_invitation_token();
            assert_eq!(token.len(), 32);
            assert!(INVITATION_TOKEN_REGEX.is_match(&token), "token {token}");
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<_> = (0..100).map(|_| generate_invitation_token()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_pending_before_expiry_is_valid() {
        let now = Utc::now();
        let inv = sample(InvitationStatus::Pending, now + Duration::hours(1));
        assert!(inv.is_valid(now));
    }

    #[test]
    fn test_expiry_boundary_is_invalid() {
        let now = Utc::now();
        let inv = sample(InvitationStatus::Pending, now);
        assert!(!inv.is_valid(now));
    }

    #[test]
    fn test_non_pending_statuses_are_invalid() {
        let now = Utc::now();
        let future = now + Duration::hours(1);
        assert!(!sample(InvitationStatus::Accepted, future).is_valid(now));
        assert!(!sample(InvitationStatus::Expired, future).is_valid(now));
        assert!(!sample(InvitationStatus::Used, future).is_valid(now));
    }

    #[test]
    fn test_only_accepted_can_be_used() {
        let future = Utc::now() + Duration::hours(1);
        assert!(sample(InvitationStatus::Accepted, future).can_be_used());
        assert!(!sample(InvitationStatus::Pending, future).can_be_used());
        assert!(!sample(InvitationStatus::Used, future).can_be_used());
    }

    #[test]
    fn test_accept_request_validation() {
        let ok = AcceptInvitationRequest {
            email: "friend@example.com".to_string(),
            password: "sup3rsecret".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
        };
        assert!(ok.validate().is_ok());

        let weak = AcceptInvitationRequest {
            password: "short".to_string(),
            ..ok.clone()
        };
        assert!(weak.validate().is_err());

        let bad_email = AcceptInvitationRequest {
            email: "not-an-email".to_string(),
            ..ok
        };
        assert!(bad_email.validate().is_err());
    }
}
