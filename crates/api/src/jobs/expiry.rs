//! Background job that sweeps time-based state transitions.
//!
//! Expires overdue tickets, subscriptions and pending invitations, and
//! marks reservations for past events as completed.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use persistence::repositories::{
    InvitationRepository, ReservationRepository, SubscriptionRepository, TicketRepository,
};

use super::scheduler::{Job, JobFrequency};

/// Job that periodically applies expiry rules across the schema.
pub struct ExpirySweepJob {
    tickets: TicketRepository,
    subscriptions: SubscriptionRepository,
    invitations: InvitationRepository,
    reservations: ReservationRepository,
}

impl ExpirySweepJob {
    /// Create a new expiry sweep job.
    pub fn new(pool: PgPool) -> Self {
        Self {
            tickets: TicketRepository::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool.clone()),
            invitations: InvitationRepository::new(pool.clone()),
            reservations: ReservationRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl Job for ExpirySweepJob {
    fn name(&self) -> &'static str {
        "expiry_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(15)
    }

    async fn execute(&self) -> Result<(), String> {
        let now = Utc::now();
        let today = now.date_naive();

        let tickets = self
            .tickets
            .expire_due_tickets(now)
            .await
            .map_err(|e| format!("Failed to expire tickets: {}", e))?;

        let subscriptions = self
            .subscriptions
            .expire_due_subscriptions(now)
            .await
            .map_err(|e| format!("Failed to expire subscriptions: {}", e))?;

        let invitations = self
            .invitations
            .expire_due_invitations(now)
            .await
            .map_err(|e| format!("Failed to expire invitations: {}", e))?;

        let completed = self
            .reservations
            .complete_past_reservations(today)
            .await
            .map_err(|e| format!("Failed to complete past reservations: {}", e))?;

        if tickets + subscriptions + invitations + completed > 0 {
            info!(
                expired_tickets = tickets,
                expired_subscriptions = subscriptions,
                expired_invitations = invitations,
                completed_reservations = completed,
                "Expiry sweep applied changes"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_frequency() {
        // Sweeps run often enough that a missed cancellation deadline or
        // expired invitation is visible within minutes
        let freq = JobFrequency::Minutes(15);
        assert_eq!(freq.duration().as_secs(), 900);
    }
}
