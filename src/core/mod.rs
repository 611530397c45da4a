//! Core deterministic primitives.
//!
//! Grid addressing and digest rules. Everything here must produce identical
//! results on every platform, since board hashes and journal digests are
//! compared across independent implementations.

pub mod grid;
pub mod hash;

// Re-export core types
pub use grid::{GridShape, CELL_COUNT, GRID_HEIGHT, GRID_WIDTH, SHIP_CELLS};
pub use hash::{hash_bytes, journal_digest, Hash32, BOARD_HASH_VERSION};
