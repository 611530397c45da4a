//! Public Output (Journal)
//!
//! The only artifact that crosses from verification into settlement.
//!
//! ## Journal Layout (73 bytes)
//!
//! ```text
//! offset  size  field
//!      0     4  session_id     (u32 LE)
//!      4     1  winner         (1 or 2)
//!      5    32  board_hash_p1
//!     37    32  board_hash_p2
//!     69     4  total_moves    (u32 LE)
//! ```
//!
//! This is also what `bincode` produces for the struct, so `receipt.bin`
//! embeds the journal verbatim.

use serde::{Deserialize, Serialize};

use crate::core::hash::{hex32, journal_digest, short_hex, Hash32};

/// Encoded journal length in bytes.
pub const JOURNAL_LEN: usize = 4 + 1 + 32 + 32 + 4;

/// Facts attested about a verified match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicOutput {
    /// Session the match was played under.
    pub session_id: u32,

    /// Winning seat. Kept as the wire byte: the ledger range-checks it.
    pub winner: u8,

    /// Commitment to player 1's board.
    #[serde(with = "hex32")]
    pub board_hash_p1: Hash32,

    /// Commitment to player 2's board.
    #[serde(with = "hex32")]
    pub board_hash_p2: Hash32,

    /// Moves consumed through the winning shot.
    pub total_moves: u32,
}

/// Journal could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("journal is {found} bytes, expected {}", JOURNAL_LEN)]
pub struct JournalLengthError {
    /// Bytes supplied.
    pub found: usize,
}

impl PublicOutput {
    /// Canonical journal encoding.
    pub fn to_journal(&self) -> [u8; JOURNAL_LEN] {
        let mut out = [0u8; JOURNAL_LEN];
        out[0..4].copy_from_slice(&self.session_id.to_le_bytes());
        out[4] = self.winner;
        out[5..37].copy_from_slice(&self.board_hash_p1);
        out[37..69].copy_from_slice(&self.board_hash_p2);
        out[69..73].copy_from_slice(&self.total_moves.to_le_bytes());
        out
    }

    /// Decode a journal. The length must be exact.
    pub fn from_journal(bytes: &[u8]) -> Result<Self, JournalLengthError> {
        let bytes: &[u8; JOURNAL_LEN] = bytes
            .try_into()
            .map_err(|_| JournalLengthError { found: bytes.len() })?;

        let mut session_id = [0u8; 4];
        let mut board_hash_p1 = [0u8; 32];
        let mut board_hash_p2 = [0u8; 32];
        let mut total_moves = [0u8; 4];

        session_id.copy_from_slice(&bytes[0..4]);
        board_hash_p1.copy_from_slice(&bytes[5..37]);
        board_hash_p2.copy_from_slice(&bytes[37..69]);
        total_moves.copy_from_slice(&bytes[69..73]);

        Ok(Self {
            session_id: u32::from_le_bytes(session_id),
            winner: bytes[4],
            board_hash_p1,
            board_hash_p2,
            total_moves: u32::from_le_bytes(total_moves),
        })
    }

    /// SHA-256 of the journal, as checked by the attestation backend.
    pub fn digest(&self) -> Hash32 {
        journal_digest(&self.to_journal())
    }
}

impl std::fmt::Display for PublicOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "session {} winner {} after {} moves (boards {}.. / {}..)",
            self.session_id,
            self.winner,
            self.total_moves,
            short_hex(&self.board_hash_p1),
            short_hex(&self.board_hash_p2),
        )
    }
}
