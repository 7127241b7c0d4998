//! Turn order calculator: which seat owns a given pick.

use serde::Serialize;
use utoipa::ToSchema;

use super::DraftOrderType;
use crate::error::DraftError;

/// The seat and round that own a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TurnAssignment {
    /// Pick number the assignment was computed for.
    pub pick_number: i32,
    /// Seat that owns the pick (1-based).
    pub seat_number: i32,
    /// Round shown to users, `ceil(pick_number / seat_count)`.
    pub round_number: i32,
}

/// Computes the seat and round for `pick_number`.
///
/// Snake order runs seats forward on even (0-based) rounds and backward on
/// odd ones, so the last seat of a round picks first in the next.
///
/// # Errors
///
/// - [`DraftError::InvalidTurnInput`] if either count is not positive.
/// - [`DraftError::UnsupportedOrder`] for [`DraftOrderType::Linear`].
pub fn seat_for_pick(
    seat_count: i32,
    pick_number: i32,
    order_type: DraftOrderType,
) -> Result<TurnAssignment, DraftError> {
    if seat_count <= 0 || pick_number <= 0 {
        return Err(DraftError::InvalidTurnInput {
            seat_count,
            pick_number,
        });
    }
    if order_type != DraftOrderType::Snake {
        return Err(DraftError::UnsupportedOrder(order_type));
    }

    let round_index = (pick_number - 1) / seat_count;
    let position = (pick_number - 1) % seat_count;
    let seat_number = if round_index % 2 == 0 {
        position + 1
    } else {
        seat_count - position
    };

    Ok(TurnAssignment {
        pick_number,
        seat_number,
        round_number: round_index + 1,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn seat(seat_count: i32, pick_number: i32) -> TurnAssignment {
        let Ok(turn) = seat_for_pick(seat_count, pick_number, DraftOrderType::Snake) else {
            panic!("valid input rejected: {seat_count}/{pick_number}");
        };
        turn
    }

    #[test]
    fn three_seat_scenario() {
        let turns: Vec<TurnAssignment> = (1..=9).map(|p| seat(3, p)).collect();
        let seats: Vec<i32> = turns.iter().map(|t| t.seat_number).collect();
        let rounds: Vec<i32> = turns.iter().map(|t| t.round_number).collect();
        assert_eq!(seats, vec![1, 2, 3, 3, 2, 1, 1, 2, 3]);
        assert_eq!(rounds, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn seats_in_range_and_rounds_reverse() {
        for seat_count in 1..=12 {
            let mut previous_round: Option<Vec<i32>> = None;
            for round in 0..5 {
                let current: Vec<i32> = (1..=seat_count)
                    .map(|offset| {
                        let pick = round * seat_count + offset;
                        let turn = seat(seat_count, pick);
                        assert!((1..=seat_count).contains(&turn.seat_number));
                        let expected_round = (pick + seat_count - 1) / seat_count;
                        assert_eq!(turn.round_number, expected_round);
                        turn.seat_number
                    })
                    .collect();
                if let Some(prev) = &previous_round {
                    let reversed: Vec<i32> = prev.iter().rev().copied().collect();
                    assert_eq!(current, reversed, "seat_count={seat_count} round={round}");
                }
                previous_round = Some(current);
            }
        }
    }

    #[test]
    fn single_seat_always_picks() {
        for pick in 1..=5 {
            assert_eq!(seat(1, pick).seat_number, 1);
            assert_eq!(seat(1, pick).round_number, pick);
        }
    }

    #[test]
    fn non_positive_inputs_rejected() {
        for (seats, pick) in [(0, 1), (-1, 1), (3, 0), (3, -2)] {
            let result = seat_for_pick(seats, pick, DraftOrderType::Snake);
            assert!(matches!(result, Err(DraftError::InvalidTurnInput { .. })));
        }
    }

    #[test]
    fn linear_is_a_usage_error() {
        let result = seat_for_pick(3, 1, DraftOrderType::Linear);
        assert!(matches!(
            result,
            Err(DraftError::UnsupportedOrder(DraftOrderType::Linear))
        ));
    }
}
