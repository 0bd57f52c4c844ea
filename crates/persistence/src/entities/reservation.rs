//! Reservation entity (database row mapping).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use domain::models::reservation::{PricePlan, Reservation, ReservationStatus, SettlementOrigin};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for reservation_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
pub enum ReservationStatusDb {
    Draft,
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl From<ReservationStatusDb> for ReservationStatus {
    fn from(db_status: ReservationStatusDb) -> Self {
        match db_status {
            ReservationStatusDb::Draft => ReservationStatus::Draft,
            ReservationStatusDb::Pending => ReservationStatus::Pending,
            ReservationStatusDb::Confirmed => ReservationStatus::Confirmed,
            ReservationStatusDb::Cancelled => ReservationStatus::Cancelled,
            ReservationStatusDb::Completed => ReservationStatus::Completed,
        }
    }
}

impl From<ReservationStatus> for ReservationStatusDb {
    fn from(status: ReservationStatus) -> Self {
        match status {
            ReservationStatus::Draft => ReservationStatusDb::Draft,
            ReservationStatus::Pending => ReservationStatusDb::Pending,
            ReservationStatus::Confirmed => ReservationStatusDb::Confirmed,
            ReservationStatus::Cancelled => ReservationStatusDb::Cancelled,
            ReservationStatus::Completed => ReservationStatusDb::Completed,
        }
    }
}

/// Database enum for price_plan that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "price_plan", rename_all = "lowercase")]
pub enum PricePlanDb {
    Basic,
    Premium,
    Ticket,
    Subscription,
}

impl From<PricePlanDb> for PricePlan {
    fn from(db_plan: PricePlanDb) -> Self {
        match db_plan {
            PricePlanDb::Basic => PricePlan::Basic,
            PricePlanDb::Premium => PricePlan::Premium,
            PricePlanDb::Ticket => PricePlan::Ticket,
            PricePlanDb::Subscription => PricePlan::Subscription,
        }
    }
}

impl From<PricePlan> for PricePlanDb {
    fn from(plan: PricePlan) -> Self {
        match plan {
            PricePlan::Basic => PricePlanDb::Basic,
            PricePlan::Premium => PricePlanDb::Premium,
            PricePlan::Ticket => PricePlanDb::Ticket,
            PricePlan::Subscription => PricePlanDb::Subscription,
        }
    }
}

/// Database enum for settlement_kind that maps to PostgreSQL enum type.
///
/// The settlement itself is stored across three columns: the kind plus one
/// reference column per variant (payment_reference, settled_ticket_id,
/// settled_subscription_id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "settlement_kind", rename_all = "snake_case")]
pub enum SettlementKindDb {
    DirectPayment,
    TicketCredit,
    SubscriptionCredit,
}

/// Database row mapping for the reservations table.
#[derive(Debug, Clone, FromRow)]
pub struct ReservationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_name: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub venue_name: String,
    pub venue_address: Option<String>,
    pub price_plan: PricePlanDb,
    pub amount_cents: i64,
    pub currency: String,
    pub status: ReservationStatusDb,
    pub settlement_kind: Option<SettlementKindDb>,
    pub payment_reference: Option<String>,
    pub settled_ticket_id: Option<Uuid>,
    pub settled_subscription_id: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    pub participants_count: i32,
    pub cancellation_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationEntity {
    /// Reassembles the settlement from its kind and reference columns.
    fn settlement(&self) -> Option<SettlementOrigin> {
        match self.settlement_kind? {
            SettlementKindDb::DirectPayment => {
                self.payment_reference
                    .clone()
                    .map(|reference| SettlementOrigin::DirectPayment { reference })
            }
            SettlementKindDb::TicketCredit => self
                .settled_ticket_id
                .map(|ticket_id| SettlementOrigin::TicketCredit { ticket_id }),
            SettlementKindDb::SubscriptionCredit => {
                self.settled_subscription_id
                    .map(|subscription_id| SettlementOrigin::SubscriptionCredit {
                        subscription_id,
                    })
            }
        }
    }
}

impl From<ReservationEntity> for Reservation {
    fn from(entity: ReservationEntity) -> Self {
        let settlement = entity.settlement();
        Self {
            id: entity.id,
            user_id: entity.user_id,
            activity_name: entity.activity_name,
            event_date: entity.event_date,
            event_time: entity.event_time,
            venue_name: entity.venue_name,
            venue_address: entity.venue_address,
            price_plan: entity.price_plan.into(),
            amount_cents: entity.amount_cents,
            currency: entity.currency,
            status: entity.status.into(),
            settlement,
            paid_at: entity.paid_at,
            participants_count: entity.participants_count,
            cancellation_deadline: entity.cancellation_deadline,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Decomposes a settlement into its kind and reference columns for storage.
pub fn settlement_columns(
    settlement: &SettlementOrigin,
) -> (SettlementKindDb, Option<String>, Option<Uuid>, Option<Uuid>) {
    match settlement {
        SettlementOrigin::DirectPayment { reference } => (
            SettlementKindDb::DirectPayment,
            Some(reference.clone()),
            None,
            None,
        ),
        SettlementOrigin::TicketCredit { ticket_id } => {
            (SettlementKindDb::TicketCredit, None, Some(*ticket_id), None)
        }
        SettlementOrigin::SubscriptionCredit { subscription_id } => (
            SettlementKindDb::SubscriptionCredit,
            None,
            None,
            Some(*subscription_id),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> ReservationEntity {
        let now = Utc::now();
        ReservationEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            activity_name: "Dinner".to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            event_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            venue_name: "Paris".to_string(),
            venue_address: None,
            price_plan: PricePlanDb::Ticket,
            amount_cents: 2500,
            currency: "EUR".to_string(),
            status: ReservationStatusDb::Confirmed,
            settlement_kind: None,
            payment_reference: None,
            settled_ticket_id: None,
            settled_subscription_id: None,
            paid_at: None,
            participants_count: 1,
            cancellation_deadline: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_settlement_reassembly() {
        let mut e = entity();
        e.settlement_kind = Some(SettlementKindDb::DirectPayment);
        e.payment_reference = Some("pi_123".to_string());
        let reservation: Reservation = e.into();
        assert_eq!(
            reservation.settlement,
            Some(SettlementOrigin::DirectPayment {
                reference: "pi_123".to_string()
            })
        );
    }

    #[test]
    fn test_settlement_missing_reference_maps_to_none() {
        let mut e = entity();
        e.settlement_kind = Some(SettlementKindDb::TicketCredit);
        let reservation: Reservation = e.into();
        assert_eq!(reservation.settlement, None);
    }

    #[test]
    fn test_settlement_columns_round_trip() {
        let ticket_id = Uuid::new_v4();
        let (kind, reference, t, s) =
            settlement_columns(&SettlementOrigin::TicketCredit { ticket_id });
        assert_eq!(kind, SettlementKindDb::TicketCredit);
        assert_eq!(reference, None);
        assert_eq!(t, Some(ticket_id));
        assert_eq!(s, None);
    }
}
