//! Reservation domain model and lifecycle rules.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::schedule;

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Draft,
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Pricing plan selected at reservation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricePlan {
    Basic,
    Premium,
    /// Plan that banks a reusable ticket at purchase time.
    Ticket,
    /// Placeholder plan recorded on subscription-settled reservations.
    Subscription,
}

/// How a confirmed reservation was settled.
///
/// Replaces prefix-encoded payment references (`ticket_<id>`,
/// `subscription_<id>`) with an explicit tagged representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementOrigin {
    /// Paid through the payment provider; carries the provider reference.
    DirectPayment { reference: String },
    /// Settled by consuming a ticket credit.
    TicketCredit { ticket_id: Uuid },
    /// Settled by an active subscription's reservation slot.
    SubscriptionCredit { subscription_id: Uuid },
}

/// What the cancellation flow owes the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundAction {
    /// Issue a replacement ticket credit.
    IssueTicket,
    /// Release the subscription's reservation slot; no ticket.
    ReleaseSubscription,
    /// Nothing owed (unpaid, or already settled by a ticket credit).
    NoRefund,
}

/// A table reservation for a scheduled social event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_name: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub venue_name: String,
    pub venue_address: Option<String>,
    pub price_plan: PricePlan,
    /// Price in minor units (cents).
    pub amount_cents: i64,
    pub currency: String,
    pub status: ReservationStatus,
    pub settlement: Option<SettlementOrigin>,
    pub paid_at: Option<DateTime<Utc>>,
    pub participants_count: i32,
    pub cancellation_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether payment has been recorded.
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Whether the reservation can still be cancelled or changed at `now`.
    pub fn is_modifiable(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) && now < self.cancellation_deadline
    }

    /// Whether the reservation refers to a future occurrence at `now`.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.event_date >= now.date_naive()
    }

    /// Refund owed if this reservation is cancelled in time.
    ///
    /// A replacement ticket is issued only for paid, ticket-plan
    /// reservations settled by direct payment. Ticket-settled reservations
    /// yield nothing (the credit was consumed), and subscription-settled
    /// ones release the slot instead.
    pub fn refund_action(&self) -> RefundAction {
        if !self.is_paid() {
            return RefundAction::NoRefund;
        }
        match &self.settlement {
            Some(SettlementOrigin::SubscriptionCredit { .. }) => RefundAction::ReleaseSubscription,
            Some(SettlementOrigin::TicketCredit { .. }) => RefundAction::NoRefund,
            Some(SettlementOrigin::DirectPayment { .. }) if self.price_plan == PricePlan::Ticket => {
                RefundAction::IssueTicket
            }
            _ => RefundAction::NoRefund,
        }
    }
}

/// Default event time when the client does not send one.
pub fn default_event_time() -> NaiveTime {
    NaiveTime::from_hms_opt(20, 0, 0).expect("20:00:00 is a valid time of day")
}

/// Request to create a reservation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, max = 200, message = "activity_name must be 1-200 characters"))]
    pub activity_name: String,

    pub event_date: NaiveDate,

    /// Event start time (default 20:00).
    pub event_time: Option<NaiveTime>,

    #[validate(length(min = 1, max = 200, message = "venue_name must be 1-200 characters"))]
    pub venue_name: String,

    pub venue_address: Option<String>,

    pub price_plan: PricePlan,

    #[validate(range(min = 0, message = "amount_cents must not be negative"))]
    pub amount_cents: i64,

    /// 3-letter currency code (default EUR).
    #[validate(custom(function = "shared::validation::validate_currency_code"))]
    #[serde(default = "default_currency")]
    pub currency: String,

    #[validate(range(min = 1, max = 12, message = "participants_count must be 1-12"))]
    #[serde(default = "default_participants")]
    pub participants_count: i32,
}

pub fn default_currency() -> String {
    "EUR".to_string()
}

fn default_participants() -> i32 {
    1
}

impl CreateReservationRequest {
    /// Builds the draft reservation this request describes.
    ///
    /// The draft carries the canonical cancellation deadline for its event
    /// date; persistence assigns the id and timestamps.
    pub fn into_draft(self, user_id: Uuid, now: DateTime<Utc>) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            user_id,
            cancellation_deadline: schedule::cancellation_deadline(self.event_date),
            event_time: self.event_time.unwrap_or_else(default_event_time),
            activity_name: self.activity_name,
            event_date: self.event_date,
            venue_name: self.venue_name,
            venue_address: self.venue_address,
            price_plan: self.price_plan,
            amount_cents: self.amount_cents,
            currency: self.currency,
            status: ReservationStatus::Draft,
            settlement: None,
            paid_at: None,
            participants_count: self.participants_count,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reservation representation returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReservationResponse {
    pub id: Uuid,
    pub activity_name: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub venue_name: String,
    pub venue_address: Option<String>,
    pub price_plan: PricePlan,
    pub amount_cents: i64,
    pub currency: String,
    pub status: ReservationStatus,
    pub settlement: Option<SettlementOrigin>,
    pub paid_at: Option<DateTime<Utc>>,
    pub participants_count: i32,
    pub cancellation_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            activity_name: r.activity_name,
            event_date: r.event_date,
            event_time: r.event_time,
            venue_name: r.venue_name,
            venue_address: r.venue_address,
            price_plan: r.price_plan,
            amount_cents: r.amount_cents,
            currency: r.currency,
            status: r.status,
            settlement: r.settlement,
            paid_at: r.paid_at,
            participants_count: r.participants_count,
            cancellation_deadline: r.cancellation_deadline,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(status: ReservationStatus) -> Reservation {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let event_date = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();
        Reservation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            activity_name: "Dinner".to_string(),
            event_date,
            event_time: default_event_time(),
            venue_name: "Paris".to_string(),
            venue_address: None,
            price_plan: PricePlan::Ticket,
            amount_cents: 2500,
            currency: "EUR".to_string(),
            status,
            settlement: None,
            paid_at: None,
            participants_count: 1,
            cancellation_deadline: schedule::cancellation_deadline(event_date),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_modifiable_before_deadline() {
        let r = sample(ReservationStatus::Confirmed);
        let before = r.cancellation_deadline - Duration::hours(1);
        let after = r.cancellation_deadline + Duration::seconds(1);
        assert!(r.is_modifiable(before));
        assert!(!r.is_modifiable(after));
        // At the deadline exactly, modification is closed.
        assert!(!r.is_modifiable(r.cancellation_deadline));
    }

    #[test]
    fn test_terminal_statuses_not_modifiable() {
        let before = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(!sample(ReservationStatus::Cancelled).is_modifiable(before));
        assert!(!sample(ReservationStatus::Completed).is_modifiable(before));
        assert!(!sample(ReservationStatus::Draft).is_modifiable(before));
    }

    #[test]
    fn test_is_upcoming() {
        let r = sample(ReservationStatus::Confirmed);
        let before = Utc.with_ymd_and_hms(2024, 6, 12, 0, 0, 0).unwrap();
        let same_day = Utc.with_ymd_and_hms(2024, 6, 13, 10, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap();
        assert!(r.is_upcoming(before));
        assert!(r.is_upcoming(same_day));
        assert!(!r.is_upcoming(after));
        assert!(!sample(ReservationStatus::Cancelled).is_upcoming(before));
    }

    #[test]
    fn test_refund_ticket_plan_direct_payment() {
        let mut r = sample(ReservationStatus::Confirmed);
        r.paid_at = Some(Utc::now());
        r.settlement = Some(SettlementOrigin::DirectPayment {
            reference: "pi_123".to_string(),
        });
        assert_eq!(r.refund_action(), RefundAction::IssueTicket);
    }

    #[test]
    fn test_refund_non_ticket_plan_gets_nothing() {
        let mut r = sample(ReservationStatus::Confirmed);
        r.price_plan = PricePlan::Basic;
        r.paid_at = Some(Utc::now());
        r.settlement = Some(SettlementOrigin::DirectPayment {
            reference: "pi_123".to_string(),
        });
        assert_eq!(r.refund_action(), RefundAction::NoRefund);
    }

    #[test]
    fn test_refund_ticket_settled_gets_nothing() {
        let mut r = sample(ReservationStatus::Confirmed);
        r.paid_at = Some(Utc::now());
        r.settlement = Some(SettlementOrigin::TicketCredit {
            ticket_id: Uuid::new_v4(),
        });
        assert_eq!(r.refund_action(), RefundAction::NoRefund);
    }

    #[test]
    fn test_refund_subscription_settled_releases_slot() {
        let mut r = sample(ReservationStatus::Confirmed);
        r.paid_at = Some(Utc::now());
        r.settlement = Some(SettlementOrigin::SubscriptionCredit {
            subscription_id: Uuid::new_v4(),
        });
        assert_eq!(r.refund_action(), RefundAction::ReleaseSubscription);
    }

    #[test]
    fn test_refund_unpaid_gets_nothing() {
        let r = sample(ReservationStatus::Pending);
        assert_eq!(r.refund_action(), RefundAction::NoRefund);
    }

    #[test]
    fn test_settlement_origin_serialization() {
        let settlement = SettlementOrigin::TicketCredit {
            ticket_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&settlement).unwrap();
        assert!(json.contains("\"kind\":\"ticket_credit\""));
        assert!(json.contains("ticket_id"));

        let direct = SettlementOrigin::DirectPayment {
            reference: "pi_abc".to_string(),
        };
        let json = serde_json::to_string(&direct).unwrap();
        assert!(json.contains("\"kind\":\"direct_payment\""));
    }

    #[test]
    fn test_into_draft_sets_canonical_deadline() {
        let req = CreateReservationRequest {
            activity_name: "Dinner".to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            event_time: None,
            venue_name: "Paris".to_string(),
            venue_address: None,
            price_plan: PricePlan::Basic,
            amount_cents: 2500,
            currency: "EUR".to_string(),
            participants_count: 1,
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let draft = req.into_draft(Uuid::new_v4(), now);
        assert_eq!(draft.status, ReservationStatus::Draft);
        assert_eq!(
            draft.cancellation_deadline,
            schedule::cancellation_deadline(draft.event_date)
        );
        assert_eq!(draft.event_time, default_event_time());
    }

    #[test]
    fn test_create_request_validation() {
        let valid = CreateReservationRequest {
            activity_name: "Dinner".to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            event_time: None,
            venue_name: "Paris".to_string(),
            venue_address: None,
            price_plan: PricePlan::Basic,
            amount_cents: 2500,
            currency: "EUR".to_string(),
            participants_count: 1,
        };
        assert!(valid.validate().is_ok());

        let mut bad_currency = valid.clone();
        bad_currency.currency = "euro".to_string();
        assert!(bad_currency.validate().is_err());

        let mut negative_amount = valid.clone();
        negative_amount.amount_cents = -1;
        assert!(negative_amount.validate().is_err());

        let mut blank_activity = valid;
        blank_activity.activity_name = String::new();
        assert!(blank_activity.validate().is_err());
    }
}
