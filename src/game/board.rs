//! Validated Board
//!
//! A `Board` can only be produced by `game::validate`, so holding one means
//! the layout already satisfied the fleet rules.

use crate::core::grid::{GridShape, CELL_COUNT};
use crate::core::hash::{hash_bytes, Hash32};

/// A legal 4x4 board (two ships of length 2).
///
/// Immutable once validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [bool; CELL_COUNT],
}

impl Board {
    /// Wrap an occupancy vector that has passed validation.
    pub(crate) fn from_validated(cells: [bool; CELL_COUNT]) -> Self {
        Self { cells }
    }

    /// Grid the board lives on.
    pub const fn grid(&self) -> GridShape {
        GridShape::STANDARD
    }

    /// Whether the cell at a linear index holds part of a ship.
    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.cells.get(index).copied().unwrap_or(false)
    }

    /// Linear indices of ship cells, ascending.
    pub fn ship_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .map(|(i, _)| i)
            .collect()
    }

    /// Canonical byte encoding: 16 bytes of 0/1, row-major.
    pub fn occupancy_bytes(&self) -> [u8; CELL_COUNT] {
        let mut bytes = [0u8; CELL_COUNT];
        for (byte, occupied) in bytes.iter_mut().zip(self.cells.iter()) {
            *byte = *occupied as u8;
        }
        bytes
    }

    /// Commitment hash of this board (`BOARD_HASH_VERSION` 1).
    pub fn commitment(&self) -> Hash32 {
        hash_bytes(&self.occupancy_bytes())
    }
}
