//! Session Records
//!
//! One record per settlement session. A record is created `Open`, gains its
//! board commitments, and is settled exactly once. `Settled` and `Aborted`
//! are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::hash::{hex32_opt, Hash32};
use crate::game::player::{Player, PlayerId};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, at least one board commitment missing.
    Open,
    /// Both commitments recorded, waiting for a result.
    AwaitingSettlement,
    /// Result applied. Terminal.
    Settled,
    /// Cancelled before settlement. Terminal.
    Aborted,
}

impl SessionStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Settled | SessionStatus::Aborted)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Open => "open",
            SessionStatus::AwaitingSettlement => "awaiting_settlement",
            SessionStatus::Settled => "settled",
            SessionStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Ledger entry for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier.
    pub session_id: u32,

    /// Account in seat 1.
    pub player1: PlayerId,

    /// Account in seat 2.
    pub player2: PlayerId,

    /// Points staked by player 1.
    #[serde(with = "stake_str")]
    pub stake_p1: i128,

    /// Points staked by player 2.
    #[serde(with = "stake_str")]
    pub stake_p2: i128,

    /// Player 1's board commitment.
    #[serde(with = "hex32_opt")]
    pub board_commit_p1: Option<Hash32>,

    /// Player 2's board commitment.
    #[serde(with = "hex32_opt")]
    pub board_commit_p2: Option<Hash32>,

    /// Lifecycle state.
    pub status: SessionStatus,

    /// Winning seat, once settled.
    pub winner: Option<Player>,

    /// Moves consumed by the winning replay, once settled.
    pub total_moves: Option<u32>,

    /// SHA-256 of the accepted journal.
    #[serde(with = "hex32_opt")]
    pub journal_digest: Option<Hash32>,

    /// SHA-256 of the accepted certificate (absent for unsealed results).
    #[serde(with = "hex32_opt")]
    pub certificate_digest: Option<Hash32>,

    /// When the session was started.
    pub created_at: DateTime<Utc>,

    /// When the result was applied.
    pub settled_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// New `Open` record with no commitments.
    pub fn new(session_id: u32, player1: PlayerId, player2: PlayerId, stake_p1: i128, stake_p2: i128) -> Self {
        Self {
            session_id,
            player1,
            player2,
            stake_p1,
            stake_p2,
            board_commit_p1: None,
            board_commit_p2: None,
            status: SessionStatus::Open,
            winner: None,
            total_moves: None,
            journal_digest: None,
            certificate_digest: None,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Seat held by an account, if any.
    pub fn seat_of(&self, player_id: &PlayerId) -> Option<Player> {
        if *player_id == self.player1 {
            Some(Player::One)
        } else if *player_id == self.player2 {
            Some(Player::Two)
        } else {
            None
        }
    }

    /// Account in a seat.
    pub fn player_id(&self, player: Player) -> PlayerId {
        match player {
            Player::One => self.player1,
            Player::Two => self.player2,
        }
    }

    /// Recorded commitment for a seat.
    pub fn commitment(&self, player: Player) -> Option<&Hash32> {
        match player {
            Player::One => self.board_commit_p1.as_ref(),
            Player::Two => self.board_commit_p2.as_ref(),
        }
    }

    pub(crate) fn set_commitment(&mut self, player: Player, hash: Hash32) {
        match player {
            Player::One => self.board_commit_p1 = Some(hash),
            Player::Two => self.board_commit_p2 = Some(hash),
        }
        if self.board_commit_p1.is_some() && self.board_commit_p2.is_some() {
            self.status = SessionStatus::AwaitingSettlement;
        }
    }

    /// Account of the winner, once settled.
    pub fn winner_id(&self) -> Option<PlayerId> {
        self.winner.map(|w| self.player_id(w))
    }

    /// Combined stake paid out to the winner.
    pub fn pot(&self) -> i128 {
        self.stake_p1.saturating_add(self.stake_p2)
    }
}

// =============================================================================
// STAKE ENCODING
// =============================================================================

/// Stakes as decimal strings in JSON, native `i128` in binary formats.
///
/// Tagged protocol enums buffer their fields before decoding and that buffer
/// has no 128-bit integers. Plain JSON numbers that fit in 64 bits are still
/// accepted on input.
pub mod stake_str {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal string.
    pub fn serialize<S: Serializer>(stake: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(stake)
        } else {
            serializer.serialize_i128(*stake)
        }
    }

    /// Deserialize from a decimal string or an integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(StakeVisitor)
        } else {
            i128::deserialize(deserializer)
        }
    }

    struct StakeVisitor;

    impl<'de> Visitor<'de> for StakeVisitor {
        type Value = i128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a decimal stake string or an integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i128, E> {
            v.trim().parse().map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i128, E> {
            Ok(v.into())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i128, E> {
            Ok(v.into())
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<i128, E> {
            Ok(v)
        }
    }
}
