//! Reservation endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::{record_reservation_cancelled, record_reservation_created, record_ticket_issued};
use domain::models::reservation::{
    default_event_time, CreateReservationRequest, RefundAction, Reservation, ReservationResponse,
};
use domain::models::ticket::{Ticket, TicketResponse};
use persistence::repositories::reservation::{
    CancelOutcome, SubscriptionSettleOutcome, TicketSettleOutcome,
};
use persistence::repositories::ReservationRepository;
use shared::pagination::{Paged, PageInfo, PaginationParams};

/// Request body for updating a reservation's editable details.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateReservationRequest {
    #[validate(length(min = 1, max = 200, message = "venue_name must be 1-200 characters"))]
    pub venue_name: String,

    pub venue_address: Option<String>,

    pub event_time: Option<chrono::NaiveTime>,

    #[validate(range(min = 1, max = 12, message = "participants_count must be 1-12"))]
    pub participants_count: i32,
}

/// Request body for settling a reservation with a ticket credit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettleWithTicketRequest {
    pub ticket_id: Uuid,
}

/// Response for a cancellation, carrying the refund that was applied.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CancelReservationResponse {
    pub reservation: ReservationResponse,
    pub refund_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_ticket: Option<TicketResponse>,
}

fn refund_action_label(action: RefundAction) -> &'static str {
    match action {
        RefundAction::IssueTicket => "ticket_issued",
        RefundAction::ReleaseSubscription => "subscription_released",
        RefundAction::NoRefund => "none",
    }
}

fn price_plan_label(plan: domain::models::reservation::PricePlan) -> &'static str {
    use domain::models::reservation::PricePlan;
    match plan {
        PricePlan::Basic => "basic",
        PricePlan::Premium => "premium",
        PricePlan::Ticket => "ticket",
        PricePlan::Subscription => "subscription",
    }
}

/// Create a reservation draft.
///
/// POST /api/reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    request.validate()?;

    let now = Utc::now();
    if request.event_date < now.date_naive() {
        return Err(ApiError::validation("event_date must not be in the past"));
    }

    let draft = request.into_draft(auth.user_id, now);
    let plan = draft.price_plan;

    let repo = ReservationRepository::new(state.pool.clone());
    let entity = repo.create_reservation(&draft).await?;

    record_reservation_created(price_plan_label(plan));
    info!(
        user_id = %auth.user_id,
        reservation_id = %entity.id,
        event_date = %entity.event_date,
        "Reservation draft created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Reservation::from(entity).into()),
    ))
}

/// List the caller's reservations, paginated.
///
/// GET /api/reservations?page=1&per_page=20
pub async fn list_reservations(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paged<ReservationResponse>>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());

    let entities = repo
        .list_for_user(auth.user_id, params.limit(), params.offset())
        .await?;
    let total = repo.count_for_user(auth.user_id).await?;

    let data = entities
        .into_iter()
        .map(|e| Reservation::from(e).into())
        .collect();

    Ok(Json(Paged {
        data,
        pagination: PageInfo::new(params, total),
    }))
}

/// List the caller's upcoming reservations, soonest first.
///
/// GET /api/reservations/upcoming
pub async fn list_upcoming_reservations(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let entities = repo
        .list_upcoming_for_user(auth.user_id, Utc::now().date_naive())
        .await?;

    Ok(Json(
        entities
            .into_iter()
            .map(|e| Reservation::from(e).into())
            .collect(),
    ))
}

/// Fetch one of the caller's reservations.
///
/// GET /api/reservations/:id
pub async fn get_reservation(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id_for_user(id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    Ok(Json(Reservation::from(entity).into()))
}

/// Update the editable details of a reservation before its deadline.
///
/// PUT /api/reservations/:id
pub async fn update_reservation(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    request.validate()?;

    let now = Utc::now();
    let repo = ReservationRepository::new(state.pool.clone());

    let existing = repo
        .find_by_id_for_user(id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    let reservation = Reservation::from(existing);
    // Drafts can always be edited; submitted reservations only before the
    // cancellation deadline.
    let editable = reservation.status == domain::models::reservation::ReservationStatus::Draft
        || reservation.is_modifiable(now);
    if !editable {
        if now >= reservation.cancellation_deadline {
            return Err(ApiError::DeadlinePassed(
                "Reservations cannot be changed after the Tuesday deadline".to_string(),
            ));
        }
        return Err(ApiError::InvalidState(format!(
            "Reservation cannot be changed in its current state ({:?})",
            reservation.status
        )));
    }

    let event_time = request.event_time.unwrap_or_else(default_event_time);
    let entity = repo
        .update_details(
            id,
            auth.user_id,
            &request.venue_name,
            request.venue_address.as_deref(),
            event_time,
            request.participants_count,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    Ok(Json(Reservation::from(entity).into()))
}

/// Submit a draft for settlement.
///
/// POST /api/reservations/:id/submit
pub async fn submit_reservation(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());

    let Some(entity) = repo.submit_reservation(id, auth.user_id).await? else {
        // Distinguish a missing reservation from one in the wrong state.
        return match repo.find_by_id_for_user(id, auth.user_id).await? {
            Some(existing) => Err(ApiError::InvalidState(format!(
                "Only drafts can be submitted, reservation is {:?}",
                domain::models::reservation::ReservationStatus::from(existing.status)
            ))),
            None => Err(ApiError::NotFound("Reservation not found".to_string())),
        };
    };

    info!(reservation_id = %entity.id, "Reservation submitted");
    Ok(Json(Reservation::from(entity).into()))
}

/// Settle a pending reservation by consuming a ticket credit.
///
/// POST /api/reservations/:id/settle/ticket
pub async fn settle_with_ticket(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<SettleWithTicketRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo
        .settle_with_ticket(id, auth.user_id, request.ticket_id, Utc::now())
        .await?;

    match outcome {
        TicketSettleOutcome::Settled(entity) => {
            info!(
                reservation_id = %entity.id,
                ticket_id = %request.ticket_id,
                "Reservation settled with ticket credit"
            );
            Ok(Json(Reservation::from(entity).into()))
        }
        TicketSettleOutcome::ReservationNotFound => {
            Err(ApiError::NotFound("Reservation not found".to_string()))
        }
        TicketSettleOutcome::InvalidState(status) => Err(ApiError::InvalidState(format!(
            "Only pending reservations can be settled, reservation is {:?}",
            domain::models::reservation::ReservationStatus::from(status)
        ))),
        TicketSettleOutcome::TicketNotFound => {
            Err(ApiError::NotFound("Ticket not found".to_string()))
        }
        TicketSettleOutcome::TicketNotValid => Err(ApiError::InvalidState(
            "Ticket is used or expired".to_string(),
        )),
        TicketSettleOutcome::CurrencyMismatch => Err(ApiError::Mismatch(
            "Ticket currency does not match the reservation".to_string(),
        )),
    }
}

/// Settle a pending reservation through the caller's active subscription.
///
/// POST /api/reservations/:id/settle/subscription
pub async fn settle_with_subscription(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo
        .settle_with_subscription(id, auth.user_id, Utc::now())
        .await?;

    match outcome {
        SubscriptionSettleOutcome::Settled(entity) => {
            info!(reservation_id = %entity.id, "Reservation settled with subscription");
            Ok(Json(Reservation::from(entity).into()))
        }
        SubscriptionSettleOutcome::ReservationNotFound => {
            Err(ApiError::NotFound("Reservation not found".to_string()))
        }
        SubscriptionSettleOutcome::InvalidState(status) => Err(ApiError::InvalidState(format!(
            "Only pending reservations can be settled, reservation is {:?}",
            domain::models::reservation::ReservationStatus::from(status)
        ))),
        SubscriptionSettleOutcome::NoActiveSubscription => Err(ApiError::InvalidState(
            "No active subscription".to_string(),
        )),
        SubscriptionSettleOutcome::SlotOccupied(occupant) => Err(ApiError::Conflict(format!(
            "Subscription slot is held by reservation {}",
            occupant
        ))),
    }
}

/// Cancel a reservation before its deadline.
///
/// POST /api/reservations/:id/cancel
pub async fn cancel_reservation(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelReservationResponse>, ApiError> {
    let now = Utc::now();
    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo.cancel_reservation(id, auth.user_id, now).await?;

    match outcome {
        CancelOutcome::Cancelled {
            reservation,
            action,
            refund_ticket,
        } => {
            record_reservation_cancelled(refund_action_label(action));
            if refund_ticket.is_some() {
                record_ticket_issued("cancellation");
            }
            info!(
                reservation_id = %reservation.id,
                refund_action = refund_action_label(action),
                "Reservation cancelled"
            );

            Ok(Json(CancelReservationResponse {
                reservation: Reservation::from(reservation).into(),
                refund_action: refund_action_label(action).to_string(),
                refund_ticket: refund_ticket
                    .map(|t| TicketResponse::from_ticket(Ticket::from(t), now)),
            }))
        }
        CancelOutcome::NotFound => Err(ApiError::NotFound("Reservation not found".to_string())),
        CancelOutcome::DeadlinePassed => Err(ApiError::DeadlinePassed(
            "Reservations can only be cancelled until the Tuesday before the event".to_string(),
        )),
        CancelOutcome::InvalidState(status) => Err(ApiError::InvalidState(format!(
            "Reservation cannot be cancelled in its current state ({:?})",
            domain::models::reservation::ReservationStatus::from(status)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_validation() {
        let ok = UpdateReservationRequest {
            venue_name: "Le Bistro".to_string(),
            venue_address: None,
            event_time: None,
            participants_count: 4,
        };
        assert!(ok.validate().is_ok());

        let blank_venue = UpdateReservationRequest {
            venue_name: String::new(),
            ..ok.clone()
        };
        assert!(blank_venue.validate().is_err());

        let too_many = UpdateReservationRequest {
            participants_count: 13,
            ..ok
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_refund_action_labels() {
        assert_eq!(refund_action_label(RefundAction::IssueTicket), "ticket_issued");
        assert_eq!(
            refund_action_label(RefundAction::ReleaseSubscription),
            "subscription_released"
        );
        assert_eq!(refund_action_label(RefundAction::NoRefund), "none");
    }

    #[test]
    fn test_settle_request_deserialization() {
        let json = format!(r#"{{"ticket_id": "{}"}}"#, Uuid::nil());
        let request: SettleWithTicketRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.ticket_id, Uuid::nil());
    }
}
