//! Commitment Binding
//!
//! Binds the verified facts of a match to its session: board commitments plus
//! the replay outcome, packed into a `PublicOutput`.
//!
//! Board commitments are published (or recorded by the ledger) before play.
//! At settlement the hashes in the public output must equal them, which ties
//! the attested replay to the boards the players actually committed to.

use crate::core::hash::Hash32;
use crate::game::board::Board;
use crate::game::player::Player;
use crate::game::replay::ReplayResult;
use crate::proof::public_output::PublicOutput;

/// Commitment to a validated board (`BOARD_HASH_VERSION` 1).
pub fn board_commitment(board: &Board) -> Hash32 {
    board.commitment()
}

/// Build the public output for a verified match.
///
/// Pure: the same inputs always produce a byte-identical journal.
pub fn bind(session_id: u32, board_p1: &Board, board_p2: &Board, replay: &ReplayResult) -> PublicOutput {
    PublicOutput {
        session_id,
        winner: replay.winner.index(),
        board_hash_p1: board_commitment(board_p1),
        board_hash_p2: board_commitment(board_p2),
        total_moves: replay.total_moves,
    }
}

/// First seat whose hash in `output` differs from its recorded commitment.
///
/// A missing commitment never matches.
pub fn first_mismatch(
    output: &PublicOutput,
    commit_p1: Option<&Hash32>,
    commit_p2: Option<&Hash32>,
) -> Option<Player> {
    if commit_p1 != Some(&output.board_hash_p1) {
        return Some(Player::One);
    }
    if commit_p2 != Some(&output.board_hash_p2) {
        return Some(Player::Two);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::hash_bytes;
    use crate::game::replay::replay;
    use crate::game::validate::validate;
    use crate::proof::transcript::Transcript;

    fn sample_output(session_id: u32) -> PublicOutput {
        let t = Transcript::sample(session_id);
        let b1 = validate(&t.board_p1).unwrap();
        let b2 = validate(&t.board_p2).unwrap();
        let result = replay(&b1, &b2, &t.moves).unwrap();
        bind(t.session_id, &b1, &b2, &result)
    }

    #[test]
    fn test_bind_fields() {
        let t = Transcript::sample(5);
        let out = sample_output(5);

        assert_eq!(out.session_id, 5);
        assert_eq!(out.winner, 1);
        assert_eq!(out.total_moves, 7);
        assert_eq!(out.board_hash_p1, hash_bytes(&t.board_p1));
        assert_eq!(out.board_hash_p2, hash_bytes(&t.board_p2));
    }

    #[test]
    fn test_bind_is_byte_identical() {
        assert_eq!(sample_output(5).to_journal(), sample_output(5).to_journal());
    }

    #[test]
    fn test_session_changes_journal_only_in_session_field() {
        let a = sample_output(5);
        let b = sample_output(6);
        assert_ne!(a.to_journal(), b.to_journal());
        assert_eq!(a.to_journal()[4..], b.to_journal()[4..]);
    }

    #[test]
    fn test_first_mismatch() {
        let out = sample_output(1);
        let p1 = out.board_hash_p1;
        let p2 = out.board_hash_p2;

        assert_eq!(first_mismatch(&out, Some(&p1), Some(&p2)), None);
        assert_eq!(first_mismatch(&out, Some(&p2), Some(&p2)), Some(Player::One));
        assert_eq!(first_mismatch(&out, Some(&p1), Some(&p1)), Some(Player::Two));
        assert_eq!(first_mismatch(&out, None, Some(&p2)), Some(Player::One));
        assert_eq!(first_mismatch(&out, Some(&p1), None), Some(Player::Two));
    }
}
