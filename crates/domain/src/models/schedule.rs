//! Event schedule rules: cancellation deadlines and invitation expiry.
//!
//! Every deadline in the system derives from a single rule: a reservation
//! for an event on date D can be cancelled until the Tuesday 23:59:59
//! strictly preceding D. When D itself falls on a Tuesday the deadline is
//! the previous Tuesday, a full week earlier. Friend invitations expire one
//! second later, at Wednesday 00:00:00.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Returns the cancellation deadline for an event on `event_date`.
///
/// The deadline is the Tuesday 23:59:59 UTC strictly before the event date.
pub fn cancellation_deadline(event_date: NaiveDate) -> DateTime<Utc> {
    // 0 = Monday .. 6 = Sunday; Tuesday is 1.
    let weekday = i64::from(event_date.weekday().num_days_from_monday());
    let mut days_back = (weekday - 1).rem_euclid(7);
    if days_back == 0 {
        // Event on a Tuesday: the deadline must strictly precede it.
        days_back = 7;
    }

    let deadline_date = event_date - Duration::days(days_back);
    deadline_date
        .and_hms_opt(23, 59, 59)
        .expect("23:59:59 is a valid time of day")
        .and_utc()
}

/// Returns the expiry instant for friend invitations to an event on
/// `event_date`: one second after the cancellation deadline, i.e. the
/// Wednesday 00:00:00 preceding the event.
pub fn invitation_expiry(event_date: NaiveDate) -> DateTime<Utc> {
    cancellation_deadline(event_date) + Duration::seconds(1)
}

/// Whether new invitations may still be created for an event on
/// `event_date`. The window closes at the cancellation deadline itself,
/// one second before already-sent invitations expire.
pub fn invitation_window_open(event_date: NaiveDate, now: DateTime<Utc>) -> bool {
    now < cancellation_deadline(event_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deadline_for_thursday_event() {
        // Thursday 2024-06-13 -> Tuesday 2024-06-11 23:59:59
        let deadline = cancellation_deadline(date(2024, 6, 13));
        assert_eq!(deadline.date_naive(), date(2024, 6, 11));
        assert_eq!(deadline.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_deadline_for_tuesday_event_goes_back_a_week() {
        // Tuesday 2024-06-11 -> previous Tuesday 2024-06-04 23:59:59
        let deadline = cancellation_deadline(date(2024, 6, 11));
        assert_eq!(deadline.date_naive(), date(2024, 6, 4));
        assert_eq!(deadline.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_deadline_for_wednesday_event_is_previous_day() {
        let deadline = cancellation_deadline(date(2024, 6, 12));
        assert_eq!(deadline.date_naive(), date(2024, 6, 11));
    }

    #[test]
    fn test_deadline_always_lands_on_a_tuesday() {
        // Exhaustive over a few weeks of event dates.
        let mut day = date(2024, 1, 1);
        for _ in 0..28 {
            let deadline = cancellation_deadline(day);
            assert_eq!(deadline.weekday(), Weekday::Tue, "event date {}", day);
            assert!(deadline.date_naive() < day, "deadline must precede event");
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_invitation_expiry_is_wednesday_midnight() {
        // Thursday 2024-06-13 -> Wednesday 2024-06-12 00:00:00
        let expiry = invitation_expiry(date(2024, 6, 13));
        assert_eq!(expiry.date_naive(), date(2024, 6, 12));
        assert_eq!(expiry.time(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(expiry.weekday(), Weekday::Wed);
    }

    #[test]
    fn test_invitation_expiry_is_one_second_after_deadline() {
        let d = date(2025, 3, 7);
        assert_eq!(
            invitation_expiry(d) - cancellation_deadline(d),
            Duration::seconds(1)
        );
    }

    #[test]
    fn test_invitation_window_closes_at_deadline() {
        // Thursday 2024-06-13 -> deadline Tuesday 2024-06-11 23:59:59
        let d = date(2024, 6, 13);
        let deadline = cancellation_deadline(d);

        assert!(invitation_window_open(d, deadline - Duration::seconds(1)));
        // At the deadline the window is already closed, even though the
        // expiry instant is still one second away.
        assert!(!invitation_window_open(d, deadline));
        assert!(!invitation_window_open(d, deadline + Duration::milliseconds(500)));
        assert!(!invitation_window_open(d, invitation_expiry(d)));
    }

    #[test]
    fn test_deadline_across_month_boundary() {
        // Monday 2024-07-01 -> Tuesday 2024-06-25
        let deadline = cancellation_deadline(date(2024, 7, 1));
        assert_eq!(deadline.date_naive(), date(2024, 6, 25));
    }
}
