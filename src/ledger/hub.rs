//! Game Hub Hooks
//!
//! The hub is the outer ledger/consensus layer that moves stakes. The
//! settlement ledger notifies it when a session starts, ends or is aborted.
//! Each hook is called exactly once per transition, after the record has
//! been written.

use std::sync::Mutex;

use tracing::info;

use crate::game::player::PlayerId;

/// Receiver of session lifecycle notifications.
pub trait GameHub: Send + Sync {
    /// A session was started with both stakes locked.
    fn start_game(&self, session_id: u32, player1: &PlayerId, player2: &PlayerId, stake_p1: i128, stake_p2: i128);

    /// A session was settled.
    fn end_game(&self, session_id: u32, player1_won: bool);

    /// A session was cancelled before settlement.
    fn abort_game(&self, session_id: u32);
}

/// Hub that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHub;

impl GameHub for LoggingHub {
    fn start_game(&self, session_id: u32, player1: &PlayerId, player2: &PlayerId, stake_p1: i128, stake_p2: i128) {
        info!(session_id, %player1, %player2, stake_p1, stake_p2, "hub: game started");
    }

    fn end_game(&self, session_id: u32, player1_won: bool) {
        info!(session_id, player1_won, "hub: game ended");
    }

    fn abort_game(&self, session_id: u32) {
        info!(session_id, "hub: game aborted");
    }
}

/// Notification captured by `MemoryHub`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// `start_game` was called.
    Started {
        /// Session.
        session_id: u32,
        /// Seat 1 account.
        player1: PlayerId,
        /// Seat 2 account.
        player2: PlayerId,
        /// Seat 1 stake.
        stake_p1: i128,
        /// Seat 2 stake.
        stake_p2: i128,
    },
    /// `end_game` was called.
    Ended {
        /// Session.
        session_id: u32,
        /// Whether seat 1 won.
        player1_won: bool,
    },
    /// `abort_game` was called.
    Aborted {
        /// Session.
        session_id: u32,
    },
}

/// Hub that records every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryHub {
    events: Mutex<Vec<HubEvent>>,
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of notifications so far, in call order.
    pub fn events(&self) -> Vec<HubEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of `end_game` calls for a session.
    pub fn end_count(&self, session_id: u32) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, HubEvent::Ended { session_id: s, .. } if *s == session_id))
            .count()
    }

    fn push(&self, event: HubEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

impl GameHub for MemoryHub {
    fn start_game(&self, session_id: u32, player1: &PlayerId, player2: &PlayerId, stake_p1: i128, stake_p2: i128) {
        self.push(HubEvent::Started {
            session_id,
            player1: *player1,
            player2: *player2,
            stake_p1,
            stake_p2,
        });
    }

    fn end_game(&self, session_id: u32, player1_won: bool) {
        self.push(HubEvent::Ended { session_id, player1_won });
    }

    fn abort_game(&self, session_id: u32) {
        self.push(HubEvent::Aborted { session_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_hub_records_in_order() {
        let hub = MemoryHub::new();
        let (a, b) = (PlayerId::new([1; 16]), PlayerId::new([2; 16]));

        hub.start_game(1, &a, &b, 10, 20);
        hub.end_game(1, false);
        hub.abort_game(2);

        let events = hub.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], HubEvent::Started { session_id: 1, stake_p2: 20, .. }));
        assert_eq!(events[1], HubEvent::Ended { session_id: 1, player1_won: false });
        assert_eq!(events[2], HubEvent::Aborted { session_id: 2 });
        assert_eq!(hub.end_count(1), 1);
        assert_eq!(hub.end_count(2), 0);
    }
}
