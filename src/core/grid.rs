//! Grid Geometry
//!
//! Row-major cell addressing shared by board validation, replay and hashing.
//! Linear index convention: `index = y * width + x`.

/// Width of the standard board.
pub const GRID_WIDTH: usize = 4;

/// Height of the standard board.
pub const GRID_HEIGHT: usize = 4;

/// Cells on the standard board.
pub const CELL_COUNT: usize = GRID_WIDTH * GRID_HEIGHT;

/// Ships per board.
pub const SHIP_COUNT: usize = 2;

/// Cells per ship.
pub const SHIP_LENGTH: usize = 2;

/// Occupied cells on a legal board (also the hits needed to win).
pub const SHIP_CELLS: usize = SHIP_COUNT * SHIP_LENGTH;

/// Dimensions of a rectangular grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    /// Cells per row.
    pub width: usize,
    /// Rows.
    pub height: usize,
}

impl GridShape {
    /// The 4x4 grid used by the game.
    pub const STANDARD: GridShape = GridShape {
        width: GRID_WIDTH,
        height: GRID_HEIGHT,
    };

    /// Create a grid shape.
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of cells.
    #[inline]
    pub const fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether `(x, y)` lies on the grid.
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Linear index of `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        if self.contains(x, y) {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Coordinates `(x, y)` of a linear index.
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Orthogonal neighbours of a cell that lie on the grid.
    ///
    /// Diagonals are not neighbours.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let (x, y) = self.coords(index);
        let candidates = [
            x.checked_add(1).map(|nx| (nx, y)),
            x.checked_sub(1).map(|nx| (nx, y)),
            y.checked_add(1).map(|ny| (x, ny)),
            y.checked_sub(1).map(|ny| (x, ny)),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter_map(move |(nx, ny)| self.index(nx, ny))
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::STANDARD
    }
}
