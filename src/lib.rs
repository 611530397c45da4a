//! # Battleship Settlement Engine
//!
//! Verifies finished zk battleship matches and settles them exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   BATTLESHIP SETTLE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── grid.rs     - 4x4 grid addressing                       │
//! │  └── hash.rs     - Board hashes and journal digests          │
//! │                                                              │
//! │  game/           - Game rules (deterministic)                │
//! │  ├── validate.rs - Fleet legality                            │
//! │  ├── board.rs    - Validated boards                          │
//! │  ├── moves.rs    - Shot records                              │
//! │  └── replay.rs   - Turn-by-turn replay, winner detection     │
//! │                                                              │
//! │  proof/          - Transcript -> attested public output      │
//! │  ├── verify.rs   - Validate + replay                         │
//! │  ├── commitment.rs - Session-bound board hashes              │
//! │  └── artifact.rs - proof-output.json / receipt.bin           │
//! │                                                              │
//! │  ledger/         - Exactly-once settlement                   │
//! │                                                              │
//! │  network/        - Settlement service (non-deterministic)    │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── auth.rs     - JWT submitter auth                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `game/` and `proof/` verification paths are deterministic:
//! - No floating-point arithmetic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//!
//! Identical transcripts produce byte-identical journals on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod ledger;
pub mod network;
pub mod proof;

// Re-export commonly used types
pub use core::hash::Hash32;
pub use game::{Board, Move, Player, PlayerId, ReplayResult};
pub use ledger::{SessionRecord, SessionStatus, SettlementLedger};
pub use proof::{prove, ProofArtifact, PublicOutput, Transcript};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
