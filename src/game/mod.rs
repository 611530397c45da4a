//! Game Rules Module
//!
//! Board legality and match replay. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `player`: Seats (1/2) and account ids
//! - `board`: Validated board and its commitment hash
//! - `validate`: Fleet legality checks
//! - `moves`: Shot records as they appear in transcripts
//! - `replay`: Turn-by-turn replay and winner detection

pub mod board;
pub mod moves;
pub mod player;
pub mod replay;
pub mod validate;

// Re-export key types
pub use board::Board;
pub use moves::Move;
pub use player::{InvalidPlayer, Player, PlayerId};
pub use replay::{replay, ReplayError, ReplayResult};
pub use validate::{validate, BoardError};
