//! Deterministic Match Replay
//!
//! Replays the ordered move list against both validated boards and derives
//! the per-move hit/miss outcomes and the winner.
//!
//! ## Rules (applied to each move in order)
//!
//! 1. The shooter must be the seat whose turn it is (player 1 starts).
//! 2. The target must lie on the grid.
//! 3. A seat may not shoot the same cell twice.
//! 4. A shot hits if the cell is occupied on the *opponent's* board.
//! 5. The first seat to reach `SHIP_CELLS` hits wins; replay stops there and
//!    any trailing moves are ignored.
//! 6. Running out of moves without a winner is an error.
//!
//! Rules 2 and 3 are checked bounds-first. An off-grid cell can never have
//! been recorded as shot, so a move that breaks both is reported the same way
//! whichever rule is evaluated first.

use serde::{Deserialize, Serialize};

use crate::core::grid::{GridShape, CELL_COUNT, SHIP_CELLS};
use crate::game::board::Board;
use crate::game::moves::Move;
use crate::game::player::Player;

#[cfg(feature = "debug-tracing")]
use tracing::trace;

/// Outcome of a successful replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Hit (true) or miss (false) for each consumed move.
    pub hits: Vec<bool>,
    /// Winning seat.
    pub winner: Player,
    /// Moves consumed, through and including the winning shot.
    pub total_moves: u32,
}

impl ReplayResult {
    /// Hits scored by `player` against the opponent.
    ///
    /// Turns alternate strictly, so player 1 owns the even-indexed shots.
    pub fn hits_scored_by(&self, player: Player) -> usize {
        let offset = match player {
            Player::One => 0,
            Player::Two => 1,
        };
        self.hits
            .iter()
            .skip(offset)
            .step_by(2)
            .filter(|&&hit| hit)
            .count()
    }
}

/// Why a move list could not be replayed.
///
/// `index` is the 0-based position of the offending move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// Move made out of turn (or by a seat other than 1/2).
    #[error("move {index}: expected {expected} to shoot, got player {found}")]
    TurnOrderViolation {
        /// Offending move.
        index: usize,
        /// Seat whose turn it was.
        expected: Player,
        /// Seat value on the move.
        found: u8,
    },

    /// Seat shot the same cell twice.
    #[error("move {index}: {player} already shot at ({x}, {y})")]
    DuplicateShot {
        /// Offending move.
        index: usize,
        /// Shooting seat.
        player: Player,
        /// Target column.
        x: u8,
        /// Target row.
        y: u8,
    },

    /// Target is off the grid.
    #[error("move {index}: target ({x}, {y}) is outside the grid")]
    OutOfBounds {
        /// Offending move.
        index: usize,
        /// Target column.
        x: u8,
        /// Target row.
        y: u8,
    },

    /// Moves ran out before either seat sank the opposing fleet.
    #[error("no winner after {moves} moves")]
    NoWinnerDetermined {
        /// Moves replayed.
        moves: usize,
    },
}

impl ReplayError {
    /// Index of the offending move, if the error is tied to one.
    pub fn move_index(&self) -> Option<usize> {
        match self {
            Self::TurnOrderViolation { index, .. }
            | Self::DuplicateShot { index, .. }
            | Self::OutOfBounds { index, .. } => Some(*index),
            Self::NoWinnerDetermined { .. } => None,
        }
    }
}

/// Running replay state for one match.
struct ReplayState<'a> {
    board_p1: &'a Board,
    board_p2: &'a Board,
    grid: GridShape,
    expected: Player,
    hits_p1: usize,
    hits_p2: usize,
    shots_p1: [bool; CELL_COUNT],
    shots_p2: [bool; CELL_COUNT],
    outcomes: Vec<bool>,
}

impl<'a> ReplayState<'a> {
    fn new(board_p1: &'a Board, board_p2: &'a Board) -> Self {
        Self {
            board_p1,
            board_p2,
            grid: board_p1.grid(),
            expected: Player::One,
            hits_p1: 0,
            hits_p2: 0,
            shots_p1: [false; CELL_COUNT],
            shots_p2: [false; CELL_COUNT],
            outcomes: Vec::new(),
        }
    }

    /// Apply one move. Returns the winner if this move ended the match.
    fn apply(&mut self, index: usize, mv: &Move) -> Result<Option<Player>, ReplayError> {
        let shooter = match mv.shooter() {
            Some(p) if p == self.expected => p,
            _ => {
                return Err(ReplayError::TurnOrderViolation {
                    index,
                    expected: self.expected,
                    found: mv.player,
                })
            }
        };

        let cell = self
            .grid
            .index(mv.x as usize, mv.y as usize)
            .ok_or(ReplayError::OutOfBounds { index, x: mv.x, y: mv.y })?;

        let (shots, target, hits) = match shooter {
            Player::One => (&mut self.shots_p1, self.board_p2, &mut self.hits_p1),
            Player::Two => (&mut self.shots_p2, self.board_p1, &mut self.hits_p2),
        };

        if shots[cell] {
            return Err(ReplayError::DuplicateShot {
                index,
                player: shooter,
                x: mv.x,
                y: mv.y,
            });
        }
        shots[cell] = true;

        let hit = target.is_occupied(cell);
        if hit {
            *hits += 1;
        }
        let won = *hits == SHIP_CELLS;
        self.outcomes.push(hit);

        #[cfg(feature = "debug-tracing")]
        trace!(index, %mv, hit, "replayed move");

        if won {
            return Ok(Some(shooter));
        }

        self.expected = shooter.opponent();
        Ok(None)
    }
}

/// Replay a match.
///
/// # Determinism
///
/// Pure function of its inputs: no clocks, no randomness, no shared state.
/// Any two replays of the same boards and moves yield equal results.
pub fn replay(board_p1: &Board, board_p2: &Board, moves: &[Move]) -> Result<ReplayResult, ReplayError> {
    let mut state = ReplayState::new(board_p1, board_p2);

    for (index, mv) in moves.iter().enumerate() {
        if let Some(winner) = state.apply(index, mv)? {
            // Each seat has at most CELL_COUNT distinct shots, so a successful
            // replay consumes fewer than 2 * CELL_COUNT moves.
            let total_moves = (index + 1) as u32;
            return Ok(ReplayResult {
                hits: state.outcomes,
                winner,
                total_moves,
            });
        }
    }

    Err(ReplayError::NoWinnerDetermined { moves: moves.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::validate::validate;
    use proptest::prelude::*;

    /// Ships at (0,0)-(0,1) and (2,2)-(2,3): cells 0, 4, 10, 14.
    fn standard_board() -> Board {
        let mut layout = [0u8; CELL_COUNT];
        for c in [0, 4, 10, 14] {
            layout[c] = 1;
        }
        validate(&layout).unwrap()
    }

    fn p1(x: u8, y: u8) -> Move {
        Move::new(Player::One, x, y)
    }

    fn p2(x: u8, y: u8) -> Move {
        Move::new(Player::Two, x, y)
    }

    fn player_one_wins_in_seven() -> Vec<Move> {
        vec![
            p1(0, 0), // hit
            p2(3, 3), // miss
            p1(0, 1), // hit
            p2(3, 2), // miss
            p1(2, 2), // hit
            p2(1, 0), // miss
            p1(2, 3), // hit, fourth: player 1 wins
        ]
    }

    #[test]
    fn test_player_one_wins() {
        let board = standard_board();
        let result = replay(&board, &board, &player_one_wins_in_seven()).unwrap();

        assert_eq!(result.winner, Player::One);
        assert_eq!(result.total_moves, 7);
        assert_eq!(result.hits, vec![true, false, true, false, true, false, true]);
        assert_eq!(result.hits_scored_by(Player::One), 4);
        assert_eq!(result.hits_scored_by(Player::Two), 0);
    }

    #[test]
    fn test_trailing_moves_ignored() {
        let board = standard_board();
        let mut moves = player_one_wins_in_seven();
        moves.push(p2(0, 0));
        // Even an illegal trailing move is never looked at
        moves.push(p1(9, 9));

        let result = replay(&board, &board, &moves).unwrap();
        assert_eq!(result.winner, Player::One);
        assert_eq!(result.total_moves, 7);
        assert_eq!(result.hits.len(), 7);
    }

    #[test]
    fn test_player_two_wins() {
        let board = standard_board();
        let moves = vec![
            p1(3, 3),
            p2(0, 0),
            p1(3, 2),
            p2(0, 1),
            p1(3, 1),
            p2(2, 2),
            p1(3, 0),
            p2(2, 3),
        ];

        let result = replay(&board, &board, &moves).unwrap();
        assert_eq!(result.winner, Player::Two);
        assert_eq!(result.total_moves, 8);
        assert_eq!(result.hits_scored_by(Player::Two), 4);
    }

    #[test]
    fn test_hits_use_opponent_board() {
        let board_p1 = standard_board();
        // Player 2's ships at (1,0)-(2,0) and (3,2)-(3,3)
        let mut layout = [0u8; CELL_COUNT];
        for c in [1, 2, 11, 15] {
            layout[c] = 1;
        }
        let board_p2 = validate(&layout).unwrap();

        // (0,0) is a ship on P1's own board but water on P2's board
        let moves = vec![p1(0, 0), p2(0, 0)];
        let err = replay(&board_p1, &board_p2, &moves).unwrap_err();
        assert_eq!(err, ReplayError::NoWinnerDetermined { moves: 2 });

        let moves = vec![p1(1, 0), p2(1, 0), p1(2, 0), p2(0, 0), p1(3, 2), p2(0, 1), p1(3, 3)];
        let result = replay(&board_p1, &board_p2, &moves).unwrap();
        assert_eq!(result.hits, vec![true, false, true, true, true, true, true]);
        assert_eq!(result.winner, Player::One);
    }

    #[test]
    fn test_player_two_first_is_turn_violation() {
        let board = standard_board();
        let err = replay(&board, &board, &[p2(0, 0)]).unwrap_err();
        assert_eq!(
            err,
            ReplayError::TurnOrderViolation { index: 0, expected: Player::One, found: 2 }
        );
        assert_eq!(err.move_index(), Some(0));
    }

    #[test]
    fn test_same_player_twice_is_turn_violation() {
        let board = standard_board();
        let err = replay(&board, &board, &[p1(0, 0), p1(1, 0)]).unwrap_err();
        assert_eq!(
            err,
            ReplayError::TurnOrderViolation { index: 1, expected: Player::Two, found: 1 }
        );
    }

    #[test]
    fn test_unknown_seat_is_turn_violation() {
        let board = standard_board();
        let err = replay(&board, &board, &[Move { player: 0, x: 0, y: 0 }]).unwrap_err();
        assert!(matches!(err, ReplayError::TurnOrderViolation { index: 0, found: 0, .. }));
    }

    #[test]
    fn test_duplicate_shot_rejected() {
        let board = standard_board();
        let moves = vec![p1(0, 0), p2(3, 3), p1(0, 0)];
        let err = replay(&board, &board, &moves).unwrap_err();
        assert_eq!(
            err,
            ReplayError::DuplicateShot { index: 2, player: Player::One, x: 0, y: 0 }
        );
    }

    #[test]
    fn test_same_cell_by_both_players_allowed() {
        let board = standard_board();
        let moves = vec![p1(3, 3), p2(3, 3), p1(3, 2)];
        let err = replay(&board, &board, &moves).unwrap_err();
        assert_eq!(err, ReplayError::NoWinnerDetermined { moves: 3 });
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let board = standard_board();
        let err = replay(&board, &board, &[p1(4, 0)]).unwrap_err();
        assert_eq!(err, ReplayError::OutOfBounds { index: 0, x: 4, y: 0 });

        let err = replay(&board, &board, &[p1(0, 0), p2(0, 200)]).unwrap_err();
        assert_eq!(err, ReplayError::OutOfBounds { index: 1, x: 0, y: 200 });
    }

    #[test]
    fn test_empty_moves_no_winner() {
        let board = standard_board();
        let err = replay(&board, &board, &[]).unwrap_err();
        assert_eq!(err, ReplayError::NoWinnerDetermined { moves: 0 });
        assert_eq!(err.move_index(), None);
    }

    fn legal_boards() -> Vec<Board> {
        (0u32..(1 << CELL_COUNT))
            .filter(|mask| mask.count_ones() == 4)
            .filter_map(|mask| {
                let mut layout = [0u8; CELL_COUNT];
                for (i, cell) in layout.iter_mut().enumerate() {
                    *cell = ((mask >> i) & 1) as u8;
                }
                validate(&layout).ok()
            })
            .collect()
    }

    fn arb_moves() -> impl Strategy<Value = Vec<Move>> {
        prop::collection::vec((1u8..=2, 0u8..5, 0u8..5), 0..40).prop_map(|raw| {
            raw.into_iter()
                .map(|(player, x, y)| Move { player, x, y })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_replay_is_deterministic(
            i in 0usize..1000,
            j in 0usize..1000,
            moves in arb_moves(),
        ) {
            let boards = legal_boards();
            let b1 = &boards[i % boards.len()];
            let b2 = &boards[j % boards.len()];

            let first = replay(b1, b2, &moves);
            let second = replay(b1, b2, &moves);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_successful_replay_is_consistent(
            i in 0usize..1000,
            j in 0usize..1000,
            order in Just((0..CELL_COUNT).collect::<Vec<usize>>()).prop_shuffle(),
        ) {
            let boards = legal_boards();
            let b1 = &boards[i % boards.len()];
            let b2 = &boards[j % boards.len()];

            // Both seats sweep the grid in the same shuffled order: always legal.
            let mut moves = Vec::new();
            for &cell in &order {
                let (x, y) = ((cell % 4) as u8, (cell / 4) as u8);
                moves.push(Move::new(Player::One, x, y));
                moves.push(Move::new(Player::Two, x, y));
            }

            let result = replay(b1, b2, &moves).unwrap();
            prop_assert_eq!(result.hits.len(), result.total_moves as usize);
            prop_assert!(result.total_moves as usize <= moves.len());
            prop_assert_eq!(result.hits_scored_by(result.winner), SHIP_CELLS);
            prop_assert!(result.hits_scored_by(result.winner.opponent()) < SHIP_CELLS);
        }
    }
}
