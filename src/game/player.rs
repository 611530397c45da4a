//! Player Identity
//!
//! Two notions of "player" appear in a match:
//! - `Player`: the seat (1 or 2) used in transcripts and public outputs
//! - `PlayerId`: the account behind a seat, recorded by the settlement ledger

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// PLAYER SEAT
// =============================================================================

/// Seat in a two-player match.
///
/// Serialized as the bare number `1` or `2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Player {
    /// Player 1, who always shoots first.
    One = 1,
    /// Player 2.
    Two = 2,
}

impl Player {
    /// Both seats in turn order.
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    /// Wire value (1 or 2).
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Parse a wire value.
    pub const fn from_index(value: u8) -> Option<Self> {
        match value {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    /// The other seat.
    #[inline]
    pub const fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.index())
    }
}

/// A seat number other than 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid player {0}, expected 1 or 2")]
pub struct InvalidPlayer(pub u8);

impl TryFrom<u8> for Player {
    type Error = InvalidPlayer;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Player::from_index(value).ok_or(InvalidPlayer(value))
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.index()
    }
}

// =============================================================================
// PLAYER ID
// =============================================================================

/// Account identifier (UUID as bytes).
///
/// Serialized as a UUID string so ledger records and service messages stay
/// readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a random id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

impl Serialize for PlayerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uuid_string())
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PlayerId::from_uuid_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid player id: {}", s)))
    }
}
