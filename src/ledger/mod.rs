//! Settlement Ledger Module
//!
//! Exactly-once application of verified match results.
//!
//! ## Module Structure
//!
//! - `record`: Session record and lifecycle status
//! - `hub`: Lifecycle hooks into the outer ledger
//! - `ledger`: The settlement state machine

pub mod hub;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod record;

// Re-export key types
pub use hub::{GameHub, HubEvent, LoggingHub, MemoryHub};
pub use ledger::{LedgerConfig, LedgerError, SettlementLedger, SettlementReceipt};
pub use record::{SessionRecord, SessionStatus};
