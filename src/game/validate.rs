//! Board Validation
//!
//! Structural legality of a board layout. A legal board occupies exactly
//! `SHIP_CELLS` cells that split into `SHIP_COUNT` orthogonally connected
//! groups of `SHIP_LENGTH` cells each. Diagonal contact does not connect.
//!
//! The connectivity scan is a union-find over occupied cells and takes the
//! grid shape as a parameter, so it is not tied to the 4x4 board.

use crate::core::grid::{GridShape, CELL_COUNT, SHIP_COUNT, SHIP_LENGTH};
use crate::game::board::Board;

/// Why a board layout was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Layout has the wrong number of cells for the grid.
    #[error("board has {found} cells, expected {expected}")]
    Length {
        /// Cells required by the grid.
        expected: usize,
        /// Cells supplied.
        found: usize,
    },

    /// A cell holds something other than 0 or 1.
    #[error("cell {index} has value {value}, expected 0 or 1")]
    CellValue {
        /// Linear index of the cell.
        index: usize,
        /// Offending value.
        value: u8,
    },

    /// Wrong number of occupied cells.
    #[error("board occupies {found} cells, expected {expected}")]
    CellCount {
        /// Required ship cells.
        expected: usize,
        /// Occupied cells found.
        found: usize,
    },

    /// Occupied cells do not form the required ships.
    #[error("ship cells form groups of sizes {sizes:?}, expected {count} ships of length {length}")]
    Shape {
        /// Sizes of the connected groups found, ascending.
        sizes: Vec<usize>,
        /// Required ship count.
        count: usize,
        /// Required ship length.
        length: usize,
    },
}

/// Validate a standard 4x4 layout (row-major 0/1 bytes).
pub fn validate(cells: &[u8]) -> Result<Board, BoardError> {
    let occupied = validate_layout(cells, GridShape::STANDARD, SHIP_COUNT, SHIP_LENGTH)?;

    let mut fixed = [false; CELL_COUNT];
    fixed.copy_from_slice(&occupied);
    Ok(Board::from_validated(fixed))
}

/// Validate a layout on an arbitrary grid against a fleet of
/// `ship_count` ships of `ship_length` cells each.
///
/// Returns the occupancy vector on success.
pub fn validate_layout(
    cells: &[u8],
    grid: GridShape,
    ship_count: usize,
    ship_length: usize,
) -> Result<Vec<bool>, BoardError> {
    if cells.len() != grid.cell_count() {
        return Err(BoardError::Length {
            expected: grid.cell_count(),
            found: cells.len(),
        });
    }

    let mut occupied = Vec::with_capacity(cells.len());
    for (index, &value) in cells.iter().enumerate() {
        match value {
            0 => occupied.push(false),
            1 => occupied.push(true),
            _ => return Err(BoardError::CellValue { index, value }),
        }
    }

    let expected = ship_count * ship_length;
    let found = occupied.iter().filter(|&&o| o).count();
    if found != expected {
        return Err(BoardError::CellCount { expected, found });
    }

    let sizes = component_sizes(&occupied, grid);
    if sizes.len() != ship_count || sizes.iter().any(|&s| s != ship_length) {
        return Err(BoardError::Shape {
            sizes,
            count: ship_count,
            length: ship_length,
        });
    }

    Ok(occupied)
}

/// Sizes of the orthogonally connected groups of occupied cells, ascending.
pub fn component_sizes(occupied: &[bool], grid: GridShape) -> Vec<usize> {
    let mut sets = DisjointSet::new(occupied.len());

    for (index, &is_occupied) in occupied.iter().enumerate() {
        if !is_occupied {
            continue;
        }
        for neighbor in grid.neighbors(index) {
            // Each edge is seen from both ends; union once.
            if neighbor > index && occupied.get(neighbor).copied().unwrap_or(false) {
                sets.union(index, neighbor);
            }
        }
    }

    let mut sizes = Vec::new();
    for (index, &is_occupied) in occupied.iter().enumerate() {
        if is_occupied && sets.find(index) == index {
            sizes.push(sets.size[index]);
        }
    }
    sizes.sort_unstable();
    sizes
}

/// Union-find with path halving and union by size.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}
