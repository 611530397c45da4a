//! Shot Moves
//!
//! A move is one shot at the opponent's grid. Fields are kept as raw wire
//! values: an out-of-range player or coordinate is a replay failure with a
//! move index, not a parse failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::player::Player;

/// One shot in the ordered move list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Move {
    /// Shooting seat (1 or 2).
    pub player: u8,
    /// Target column.
    pub x: u8,
    /// Target row.
    pub y: u8,
}

impl Move {
    /// Create a shot by `player` at `(x, y)`.
    pub const fn new(player: Player, x: u8, y: u8) -> Self {
        Self {
            player: player.index(),
            x,
            y,
        }
    }

    /// Shooting seat, if the wire value is valid.
    pub fn shooter(&self) -> Option<Player> {
        Player::from_index(self.player)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}@({},{})", self.player, self.x, self.y)
    }
}
