//! Subscription endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use domain::models::subscription::{
    CreateSubscriptionRequest, Subscription, SubscriptionResponse,
};
use persistence::entities::SubscriptionPlanDb;
use persistence::repositories::SubscriptionRepository;

/// The caller's active subscription together with slot availability.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CurrentSubscriptionResponse {
    pub subscription: SubscriptionResponse,
    /// Whether the slot can settle a new reservation right now.
    pub slot_available: bool,
}

/// Purchase a subscription.
///
/// POST /api/subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    request.validate()?;

    let now = Utc::now();
    let end_date = now + Duration::days(request.plan.duration_days());

    let repo = SubscriptionRepository::new(state.pool.clone());
    let entity = repo
        .create_subscription(auth.user_id, SubscriptionPlanDb::from(request.plan), now, end_date)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("An active subscription already exists".to_string())
        })?;

    info!(
        user_id = %auth.user_id,
        subscription_id = %entity.id,
        plan = ?request.plan,
        "Subscription created"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from_subscription(
            Subscription::from(entity),
            now,
        )),
    ))
}

/// Fetch the caller's active subscription with slot availability.
///
/// GET /api/subscriptions/current
pub async fn current_subscription(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<CurrentSubscriptionResponse>, ApiError> {
    let now = Utc::now();
    let repo = SubscriptionRepository::new(state.pool.clone());

    let with_slot = repo
        .find_active_for_user(auth.user_id, now)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active subscription".to_string()))?;

    let subscription = Subscription::from(with_slot.subscription);
    let slot_available =
        subscription.can_reserve(now, with_slot.current_reservation_status.map(Into::into));

    Ok(Json(CurrentSubscriptionResponse {
        subscription: SubscriptionResponse::from_subscription(subscription, now),
        slot_available,
    }))
}

/// List the caller's subscriptions, newest first.
///
/// GET /api/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<Vec<SubscriptionResponse>>, ApiError> {
    let now = Utc::now();
    let repo = SubscriptionRepository::new(state.pool.clone());
    let entities = repo.list_for_user(auth.user_id).await?;

    Ok(Json(
        entities
            .into_iter()
            .map(|e| SubscriptionResponse::from_subscription(Subscription::from(e), now))
            .collect(),
    ))
}

/// Cancel an active subscription.
///
/// POST /api/subscriptions/:id/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let now = Utc::now();
    let repo = SubscriptionRepository::new(state.pool.clone());

    let Some(entity) = repo.cancel_subscription(id, auth.user_id, now).await? else {
        return match repo.find_by_id_for_user(id, auth.user_id).await? {
            Some(_) => Err(ApiError::InvalidState(
                "Only active subscriptions can be cancelled".to_string(),
            )),
            None => Err(ApiError::NotFound("Subscription not found".to_string())),
        };
    };

    info!(subscription_id = %entity.id, "Subscription cancelled");

    Ok(Json(SubscriptionResponse::from_subscription(
        Subscription::from(entity),
        now,
    )))
}
