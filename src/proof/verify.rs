//! Transcript Verification
//!
//! Runs the whole pipeline over one transcript: validate both boards, replay
//! the moves, bind the outcome to the session. Any failure rejects the
//! transcript; there is no partial acceptance.

use tracing::debug;

use crate::core::hash::short_hex;
use crate::game::board::Board;
use crate::game::player::Player;
use crate::game::replay::{replay, ReplayError, ReplayResult};
use crate::game::validate::{validate, BoardError};
use crate::proof::commitment::bind;
use crate::proof::public_output::PublicOutput;
use crate::proof::transcript::Transcript;

/// Everything derived from a transcript that passed verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedMatch {
    /// Player 1's validated board.
    pub board_p1: Board,
    /// Player 2's validated board.
    pub board_p2: Board,
    /// Replay outcome.
    pub replay: ReplayResult,
    /// Session-bound public output.
    pub public_output: PublicOutput,
}

/// Why a transcript was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// A board layout is illegal.
    #[error("invalid board for {player}: {source}")]
    InvalidBoard {
        /// Seat owning the board.
        player: Player,
        /// Reason.
        #[source]
        source: BoardError,
    },

    /// Moves could not be replayed.
    #[error("replay failed: {0}")]
    Replay(#[from] ReplayError),
}

/// Verify a transcript end to end.
pub fn verify_transcript(transcript: &Transcript) -> Result<VerifiedMatch, VerificationError> {
    let board_p1 = validate_seat(transcript, Player::One)?;
    let board_p2 = validate_seat(transcript, Player::Two)?;

    let result = replay(&board_p1, &board_p2, &transcript.moves)?;
    let public_output = bind(transcript.session_id, &board_p1, &board_p2, &result);

    debug!(
        session_id = transcript.session_id,
        winner = public_output.winner,
        total_moves = public_output.total_moves,
        board_p1 = %short_hex(&public_output.board_hash_p1),
        board_p2 = %short_hex(&public_output.board_hash_p2),
        "transcript verified"
    );

    Ok(VerifiedMatch {
        board_p1,
        board_p2,
        replay: result,
        public_output,
    })
}

fn validate_seat(transcript: &Transcript, player: Player) -> Result<Board, VerificationError> {
    validate(transcript.board(player)).map_err(|source| VerificationError::InvalidBoard { player, source })
}
