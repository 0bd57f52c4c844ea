//! Payment provider webhook handler.
//!
//! The provider signs the raw request body with HMAC-SHA256 using the
//! shared webhook secret and sends the hex signature in the
//! `X-Webhook-Signature` header. Confirmation is idempotent: replaying a
//! delivery with the same payment reference is a no-op.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{record_payment_webhook, record_ticket_issued};
use domain::models::reservation::{Reservation, ReservationResponse};
use persistence::repositories::reservation::ConfirmOutcome;
use persistence::repositories::ReservationRepository;
use shared::crypto::verify_hmac_sha256_hex;

/// Signature header set by the payment provider.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Payment confirmation delivery from the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PaymentWebhookRequest {
    pub reservation_id: Uuid,
    pub payment_reference: String,
}

/// Response acknowledging a webhook delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PaymentWebhookResponse {
    pub status: String,
    pub reservation: ReservationResponse,
}

/// Handle a payment confirmation webhook.
///
/// POST /api/payments/webhook
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PaymentWebhookResponse>, ApiError> {
    verify_signature(&state, &headers, &body)?;

    let request: PaymentWebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation(format!("Invalid webhook payload: {}", e)))?;

    if request.payment_reference.is_empty() {
        return Err(ApiError::validation("payment_reference must not be empty"));
    }

    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo
        .confirm_with_payment(request.reservation_id, &request.payment_reference, Utc::now())
        .await?;

    match outcome {
        ConfirmOutcome::Confirmed {
            reservation,
            banked_ticket,
        } => {
            record_payment_webhook("confirmed");
            if banked_ticket.is_some() {
                // Ticket-plan purchases bank a reusable credit on confirmation.
                record_ticket_issued("purchase");
            }
            info!(
                reservation_id = %reservation.id,
                banked_ticket = banked_ticket.is_some(),
                "Payment confirmed"
            );
            Ok(Json(PaymentWebhookResponse {
                status: "confirmed".to_string(),
                reservation: Reservation::from(reservation).into(),
            }))
        }
        ConfirmOutcome::AlreadyConfirmed(reservation) => {
            record_payment_webhook("replayed");
            Ok(Json(PaymentWebhookResponse {
                status: "already_confirmed".to_string(),
                reservation: Reservation::from(reservation).into(),
            }))
        }
        ConfirmOutcome::ReferenceMismatch => {
            record_payment_webhook("reference_mismatch");
            Err(ApiError::Conflict(
                "Reservation is confirmed with a different payment reference".to_string(),
            ))
        }
        ConfirmOutcome::InvalidState(status) => {
            record_payment_webhook("invalid_state");
            Err(ApiError::InvalidState(format!(
                "Reservation cannot be confirmed in its current state ({:?})",
                domain::models::reservation::ReservationStatus::from(status)
            )))
        }
        ConfirmOutcome::NotFound => {
            record_payment_webhook("not_found");
            Err(ApiError::NotFound("Reservation not found".to_string()))
        }
    }
}

fn verify_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let payments = &state.config.payments;

    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match signature {
        Some(signature) if !payments.webhook_secret.is_empty() => {
            if verify_hmac_sha256_hex(&payments.webhook_secret, body, signature) {
                Ok(())
            } else {
                warn!("Webhook signature verification failed");
                Err(ApiError::Unauthorized(
                    "Invalid webhook signature".to_string(),
                ))
            }
        }
        _ if payments.allow_unsigned_webhooks => Ok(()),
        Some(_) => Err(ApiError::Unauthorized(
            "Webhook secret is not configured".to_string(),
        )),
        None => Err(ApiError::Unauthorized(
            "Missing webhook signature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::crypto::hmac_sha256_hex;

    #[test]
    fn test_webhook_request_deserialization() {
        let json = format!(
            r#"{{"reservation_id": "{}", "payment_reference": "pi_123"}}"#,
            Uuid::nil()
        );
        let request: PaymentWebhookRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.payment_reference, "pi_123");
    }

    #[test]
    fn test_signature_round_trip() {
        let secret = "whsec_test";
        let body = br#"{"reservation_id":"x"}"#;
        let signature = hmac_sha256_hex(secret, body);
        assert!(verify_hmac_sha256_hex(secret, body, &signature));
        assert!(!verify_hmac_sha256_hex(secret, b"tampered", &signature));
    }
}
