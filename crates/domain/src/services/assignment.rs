//! Group assignment planning.
//!
//! Splits the unassigned confirmed reservations of one event occurrence
//! into capacity-sized groups. The plan is pure: the caller fetches the
//! candidate reservations and persists the resulting groups.

use thiserror::Error;
use uuid::Uuid;

use crate::models::group::DEFAULT_GROUP_CAPACITY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("no reservations to assign")]
    NoCandidates,
    #[error("capacity must be at least 2, got {0}")]
    CapacityTooSmall(i32),
    #[error("duplicate reservation {0} in assignment input")]
    DuplicateReservation(Uuid),
}

/// One planned group: a name and the reservations seated at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    pub name: String,
    pub reservation_ids: Vec<Uuid>,
}

/// Splits `reservation_ids` into groups of at most `capacity` seats.
///
/// Input order is preserved, so callers control seating by ordering the
/// candidates (the repositories order by creation time). Groups are named
/// "{activity} - Table N". The final group may be smaller than capacity;
/// a single leftover participant still gets a group of one.
pub fn plan_groups(
    activity_name: &str,
    reservation_ids: &[Uuid],
    capacity: Option<i32>,
) -> Result<Vec<PlannedGroup>, AssignmentError> {
    let capacity = match capacity {
        Some(c) if c < 2 => return Err(AssignmentError::CapacityTooSmall(c)),
        Some(c) => c as usize,
        None => DEFAULT_GROUP_CAPACITY,
    };

    if reservation_ids.is_empty() {
        return Err(AssignmentError::NoCandidates);
    }

    let mut seen = std::collections::HashSet::with_capacity(reservation_ids.len());
    for id in reservation_ids {
        if !seen.insert(*id) {
            return Err(AssignmentError::DuplicateReservation(*id));
        }
    }

    let groups = reservation_ids
        .chunks(capacity)
        .enumerate()
        .map(|(i, chunk)| PlannedGroup {
            name: format!("{} - Table {}", activity_name, i + 1),
            reservation_ids: chunk.to_vec(),
        })
        .collect();

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_exact_multiple_of_capacity() {
        let input = ids(12);
        let groups = plan_groups("Dinner", &input, Some(6)).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].reservation_ids, input[..6]);
        assert_eq!(groups[1].reservation_ids, input[6..]);
        assert_eq!(groups[0].name, "Dinner - Table 1");
        assert_eq!(groups[1].name, "Dinner - Table 2");
    }

    #[test]
    fn test_remainder_forms_smaller_last_group() {
        let input = ids(14);
        let groups = plan_groups("Dinner", &input, Some(6)).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].reservation_ids.len(), 2);
    }

    #[test]
    fn test_single_leftover_still_gets_a_group() {
        let input = ids(7);
        let groups = plan_groups("Dinner", &input, Some(6)).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].reservation_ids.len(), 1);
    }

    #[test]
    fn test_default_capacity_is_six() {
        let input = ids(6);
        let groups = plan_groups("Dinner", &input, None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].reservation_ids.len(), 6);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(
            plan_groups("Dinner", &[], Some(6)),
            Err(AssignmentError::NoCandidates)
        );
    }

    #[test]
    fn test_capacity_below_two_rejected() {
        let input = ids(4);
        assert_eq!(
            plan_groups("Dinner", &input, Some(1)),
            Err(AssignmentError::CapacityTooSmall(1))
        );
    }

    #[test]
    fn test_duplicate_reservation_rejected() {
        let mut input = ids(3);
        input.push(input[0]);
        assert_eq!(
            plan_groups("Dinner", &input, Some(6)),
            Err(AssignmentError::DuplicateReservation(input[0]))
        );
    }

    #[test]
    fn test_input_order_preserved() {
        let input = ids(9);
        let groups = plan_groups("Dinner", &input, Some(4)).unwrap();
        let flattened: Vec<Uuid> = groups
            .into_iter()
            .flat_map(|g| g.reservation_ids)
            .collect();
        assert_eq!(flattened, input);
    }
}
