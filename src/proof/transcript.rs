//! Match Transcript
//!
//! The complete record of a finished match: session, both raw board layouts
//! and the ordered shot list. Boards are kept as raw bytes so that an
//! illegal layout reaches the validator (and gets a precise reason) instead
//! of failing JSON parsing.

use serde::{Deserialize, Serialize};

use crate::game::moves::Move;
use crate::game::player::Player;

/// Complete match transcript.
///
/// Never mutated after creation; verification only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transcript {
    /// Settlement session this match belongs to.
    pub session_id: u32,

    /// Player 1's layout (16 bytes of 0/1, row-major).
    pub board_p1: Vec<u8>,

    /// Player 2's layout.
    pub board_p2: Vec<u8>,

    /// Shots in the order they were taken.
    pub moves: Vec<Move>,
}

impl Transcript {
    /// Create a transcript.
    pub fn new(session_id: u32, board_p1: Vec<u8>, board_p2: Vec<u8>, moves: Vec<Move>) -> Self {
        Self {
            session_id,
            board_p1,
            board_p2,
            moves,
        }
    }

    /// Same match under a different session id.
    pub fn with_session(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    /// Raw layout for a seat.
    pub fn board(&self, player: Player) -> &[u8] {
        match player {
            Player::One => &self.board_p1,
            Player::Two => &self.board_p2,
        }
    }

    /// Parse from the JSON input format.
    pub fn from_json(json: &str) -> Result<Self, TranscriptError> {
        serde_json::from_str(json).map_err(|e| TranscriptError::ParseFailed(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, TranscriptError> {
        serde_json::to_string_pretty(self).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranscriptError> {
        bincode::serialize(self).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TranscriptError> {
        bincode::deserialize(data).map_err(|e| TranscriptError::DeserializationFailed(e.to_string()))
    }

    /// A short finished game, used when no input file is given.
    ///
    /// Player 1 sinks both of player 2's ships on the seventh move; player 2
    /// lands one hit along the way.
    pub fn sample(session_id: u32) -> Self {
        #[rustfmt::skip]
        let board_p1 = vec![
            1, 1, 0, 0,
            0, 0, 0, 0,
            0, 0, 1, 0,
            0, 0, 1, 0,
        ];
        #[rustfmt::skip]
        let board_p2 = vec![
            0, 0, 0, 1,
            0, 0, 0, 1,
            0, 0, 0, 0,
            1, 1, 0, 0,
        ];

        let moves = vec![
            Move::new(Player::One, 3, 0),
            Move::new(Player::Two, 3, 3),
            Move::new(Player::One, 3, 1),
            Move::new(Player::Two, 0, 2),
            Move::new(Player::One, 0, 3),
            Move::new(Player::Two, 0, 0),
            Move::new(Player::One, 1, 3),
        ];

        Self::new(session_id, board_p1, board_p2, moves)
    }
}

/// Transcript decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    /// JSON input could not be parsed.
    ParseFailed(String),
    /// Binary input could not be decoded.
    DeserializationFailed(String),
    /// Encoding failed.
    SerializationFailed(String),
}

impl std::fmt::Display for TranscriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailed(msg) => write!(f, "Transcript parse failed: {}", msg),
            Self::DeserializationFailed(msg) => write!(f, "Deserialization failed: {}", msg),
            Self::SerializationFailed(msg) => write!(f, "Serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for TranscriptError {}
