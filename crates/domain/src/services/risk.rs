//! Account risk scoring for the admin surface.
//!
//! Flags accounts whose cancellation and credit patterns suggest abuse of
//! the refund rules. Scoring is additive over a handful of signals; the
//! total maps onto a coarse risk level.

use serde::Serialize;

/// Coarse risk classification of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

/// Aggregated account activity fed into the scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountActivity {
    pub total_reservations: i64,
    pub cancelled_reservations: i64,
    pub active_tickets: i64,
    pub ticket_settled_reservations: i64,
    pub has_active_subscription: bool,
}

/// Scores one account and returns its risk level.
pub fn assess(activity: &AccountActivity) -> RiskLevel {
    let mut score = 0u32;

    if activity.total_reservations > 0 {
        let cancel_ratio =
            activity.cancelled_reservations as f64 / activity.total_reservations as f64;
        if cancel_ratio > 0.5 {
            score += 3;
        } else if cancel_ratio > 0.3 {
            score += 2;
        }

        let ticket_ratio =
            activity.ticket_settled_reservations as f64 / activity.total_reservations as f64;
        if ticket_ratio > 0.7 {
            score += 2;
        }
    }

    if activity.active_tickets > 5 {
        score += 2;
    } else if activity.active_tickets > 2 {
        score += 1;
    }

    // Stockpiling tickets while a subscription covers reservations.
    if activity.has_active_subscription && activity.active_tickets > 2 {
        score += 3;
    }

    match score {
        0 => RiskLevel::None,
        1..=2 => RiskLevel::Low,
        3..=4 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_account_is_none() {
        let activity = AccountActivity {
            total_reservations: 10,
            cancelled_reservations: 1,
            active_tickets: 0,
            ticket_settled_reservations: 2,
            has_active_subscription: false,
        };
        assert_eq!(assess(&activity), RiskLevel::None);
    }

    #[test]
    fn test_empty_account_is_none() {
        assert_eq!(assess(&AccountActivity::default()), RiskLevel::None);
    }

    #[test]
    fn test_moderate_cancellation_ratio_is_low() {
        let activity = AccountActivity {
            total_reservations: 10,
            cancelled_reservations: 4,
            ..Default::default()
        };
        assert_eq!(assess(&activity), RiskLevel::Low);
    }

    #[test]
    fn test_heavy_canceller_is_medium() {
        let activity = AccountActivity {
            total_reservations: 10,
            cancelled_reservations: 6,
            ..Default::default()
        };
        assert_eq!(assess(&activity), RiskLevel::Medium);
    }

    #[test]
    fn test_ticket_hoarder_with_subscription_is_high() {
        let activity = AccountActivity {
            total_reservations: 10,
            cancelled_reservations: 6,
            active_tickets: 6,
            ticket_settled_reservations: 0,
            has_active_subscription: true,
        };
        // 3 (cancel ratio) + 2 (tickets > 5) + 3 (subscription + tickets)
        assert_eq!(assess(&activity), RiskLevel::High);
    }

    #[test]
    fn test_ticket_ratio_signal() {
        let activity = AccountActivity {
            total_reservations: 10,
            ticket_settled_reservations: 8,
            ..Default::default()
        };
        assert_eq!(assess(&activity), RiskLevel::Low);
    }

    #[test]
    fn test_level_ordering() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert!(RiskLevel::Low > RiskLevel::None);
    }
}
