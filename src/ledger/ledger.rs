//! Settlement Ledger
//!
//! Per-session state machine that applies verified match results exactly
//! once.
//!
//! ## Locking
//!
//! The session map lock is held only to look up or insert a record. Each
//! record has its own mutex, held across the whole check-verify-write
//! sequence of `submit_result`: competing submissions for one session are
//! serialised, different sessions never wait on each other.
//!
//! Every check runs before any write, so a failed call leaves the record
//! exactly as it was.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::core::hash::{hash_from_hex, short_hex, Hash32};
use crate::game::player::{Player, PlayerId};
use crate::ledger::hub::GameHub;
use crate::ledger::record::{SessionRecord, SessionStatus};
use crate::proof::attestation::{AttestationBackend, BackendId, Certificate};
use crate::proof::commitment::first_mismatch;
use crate::proof::public_output::PublicOutput;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Ledger configuration.
#[derive(Clone, Debug, Default)]
pub struct LedgerConfig {
    /// Verifier id certificates are checked against. Defaults to the
    /// attestation backend's own id.
    pub backend_id: Option<BackendId>,

    /// Accept results without a certificate (non-production only).
    pub allow_unsealed: bool,
}

impl LedgerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let backend_id = match std::env::var("SETTLE_BACKEND_ID") {
            Ok(v) => match hash_from_hex(v.trim()) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %e, "ignoring invalid SETTLE_BACKEND_ID");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            backend_id,
            allow_unsealed: std::env::var("SETTLE_ALLOW_UNSEALED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No session with this id.
    #[error("session {0} not found")]
    SessionNotFound(u32),

    /// Session id already in use.
    #[error("session {0} already exists")]
    SessionAlreadyExists(u32),

    /// Result already applied.
    #[error("session {0} is already settled")]
    AlreadySettled(u32),

    /// Session was cancelled.
    #[error("session {0} was aborted")]
    SessionAborted(u32),

    /// Caller holds neither seat.
    #[error("submitter is not a player in this session")]
    NotPlayer,

    /// Public output names a different session.
    #[error("public output is for session {found}, expected {expected}")]
    SessionMismatch {
        /// Session being settled.
        expected: u32,
        /// Session in the public output.
        found: u32,
    },

    /// Board hash differs from the recorded (or missing) commitment.
    #[error("board hash for {player} does not match its commitment")]
    CommitmentMismatch {
        /// Seat whose hash differs.
        player: Player,
    },

    /// Winner is not 1 or 2.
    #[error("winner {0} out of range")]
    WinnerOutOfRange(u8),

    /// Public output claims zero moves.
    #[error("total moves must be non-zero")]
    InvalidTotalMoves,

    /// Backend rejected the certificate (or failed).
    #[error("invalid attestation: {0}")]
    InvalidAttestation(String),

    /// No certificate and unsealed results are not allowed.
    #[error("certificate required")]
    MissingCertificate,

    /// Commitment already recorded for this seat.
    #[error("board already committed for {0}")]
    BoardAlreadyCommitted(Player),

    /// Both seats name the same account.
    #[error("a player cannot play against themselves")]
    InvalidPlayers,

    /// Negative stake.
    #[error("stakes must be non-negative")]
    InvalidStake,
}

impl LedgerError {
    /// Retrying the same call cannot change anything and is safe.
    pub fn is_idempotent_noop(&self) -> bool {
        matches!(self, Self::AlreadySettled(_) | Self::SessionNotFound(_))
    }

    /// This submission is dead; a corrected one is needed.
    pub fn requires_resubmission(&self) -> bool {
        matches!(self, Self::CommitmentMismatch { .. } | Self::InvalidAttestation(_))
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Outcome of a successful settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Settled session.
    pub session_id: u32,
    /// Winning seat.
    pub winner: Player,
    /// Winning account.
    pub winner_id: PlayerId,
    /// Moves in the winning replay.
    pub total_moves: u32,
}

/// Settlement authority for all sessions.
pub struct SettlementLedger {
    /// Session records.
    sessions: RwLock<BTreeMap<u32, Arc<Mutex<SessionRecord>>>>,
    /// Certificate checker.
    attestation: Arc<dyn AttestationBackend>,
    /// Lifecycle hooks.
    hub: Arc<dyn GameHub>,
    /// Verifier id passed to the backend.
    backend_id: BackendId,
    /// Accept results with no certificate.
    allow_unsealed: bool,
}

impl SettlementLedger {
    /// Create a ledger.
    pub fn new(attestation: Arc<dyn AttestationBackend>, hub: Arc<dyn GameHub>, config: LedgerConfig) -> Self {
        let backend_id = config.backend_id.unwrap_or_else(|| attestation.backend_id());
        if config.allow_unsealed {
            warn!("ledger accepts unsealed results; do not use in production");
        }
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            attestation,
            hub,
            backend_id,
            allow_unsealed: config.allow_unsealed,
        }
    }

    /// Verifier id certificates are checked against.
    pub fn backend_id(&self) -> &BackendId {
        &self.backend_id
    }

    /// Start a session with no commitments (`Open`).
    pub async fn start(
        &self,
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        stake_p1: i128,
        stake_p2: i128,
    ) -> Result<SessionRecord, LedgerError> {
        let record = SessionRecord::new(session_id, player1, player2, stake_p1, stake_p2);
        self.insert(record).await
    }

    /// Start a session with both commitments (`AwaitingSettlement`).
    #[allow(clippy::too_many_arguments)]
    pub async fn start_with_commitments(
        &self,
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        stake_p1: i128,
        stake_p2: i128,
        commit_p1: Hash32,
        commit_p2: Hash32,
    ) -> Result<SessionRecord, LedgerError> {
        self.start_committed(session_id, player1, player2, stake_p1, stake_p2, Some(commit_p1), Some(commit_p2))
            .await
    }

    /// Start a session with whichever commitments are already known.
    ///
    /// The record is inserted with its commitments in one step, so a failure
    /// leaves no session behind.
    #[allow(clippy::too_many_arguments)]
    pub async fn start_committed(
        &self,
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        stake_p1: i128,
        stake_p2: i128,
        commit_p1: Option<Hash32>,
        commit_p2: Option<Hash32>,
    ) -> Result<SessionRecord, LedgerError> {
        let mut record = SessionRecord::new(session_id, player1, player2, stake_p1, stake_p2);
        for (player, commit) in Player::ALL.into_iter().zip([commit_p1, commit_p2]) {
            if let Some(hash) = commit {
                record.set_commitment(player, hash);
            }
        }
        self.insert(record).await
    }

    async fn insert(&self, record: SessionRecord) -> Result<SessionRecord, LedgerError> {
        if record.player1 == record.player2 {
            return Err(LedgerError::InvalidPlayers);
        }
        if record.stake_p1 < 0 || record.stake_p2 < 0 {
            return Err(LedgerError::InvalidStake);
        }

        let session_id = record.session_id;
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session_id) {
                return Err(LedgerError::SessionAlreadyExists(session_id));
            }
            sessions.insert(session_id, Arc::new(Mutex::new(record.clone())));
        }

        self.hub
            .start_game(session_id, &record.player1, &record.player2, record.stake_p1, record.stake_p2);
        info!(
            session_id,
            player1 = %record.player1,
            player2 = %record.player2,
            status = %record.status,
            pot = %record.pot(),
            "session started"
        );

        Ok(record)
    }

    async fn lookup(&self, session_id: u32) -> Result<Arc<Mutex<SessionRecord>>, LedgerError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(LedgerError::SessionNotFound(session_id))
    }

    /// Record one seat's board commitment.
    pub async fn commit_board(&self, session_id: u32, player: Player, hash: Hash32) -> Result<SessionStatus, LedgerError> {
        let entry = self.lookup(session_id).await?;
        let mut record = entry.lock().await;

        check_live(&record)?;
        if record.commitment(player).is_some() {
            return Err(LedgerError::BoardAlreadyCommitted(player));
        }

        record.set_commitment(player, hash);
        debug!(session_id, %player, hash = %short_hex(&hash), status = %record.status, "board committed");
        Ok(record.status)
    }

    /// Apply a verified result.
    ///
    /// On success the session is `Settled` and the hub's `end_game` has been
    /// called; on failure nothing changed.
    #[instrument(skip(self, submitter, public_output, certificate), fields(winner = public_output.winner))]
    pub async fn submit_result(
        &self,
        session_id: u32,
        submitter: &PlayerId,
        public_output: &PublicOutput,
        certificate: Option<&Certificate>,
    ) -> Result<SettlementReceipt, LedgerError> {
        let entry = self.lookup(session_id).await?;
        let mut record = entry.lock().await;

        check_live(&record)?;
        if record.seat_of(submitter).is_none() {
            return Err(LedgerError::NotPlayer);
        }

        if public_output.session_id != session_id {
            return Err(LedgerError::SessionMismatch {
                expected: session_id,
                found: public_output.session_id,
            });
        }

        if let Some(player) = first_mismatch(
            public_output,
            record.commitment(Player::One),
            record.commitment(Player::Two),
        ) {
            return Err(LedgerError::CommitmentMismatch { player });
        }

        let winner = Player::from_index(public_output.winner)
            .ok_or(LedgerError::WinnerOutOfRange(public_output.winner))?;
        if public_output.total_moves == 0 {
            return Err(LedgerError::InvalidTotalMoves);
        }

        let journal_digest = public_output.digest();
        let certificate_digest = match certificate {
            Some(cert) => {
                self.check_certificate(cert, &journal_digest)?;
                Some(cert.digest())
            }
            None if self.allow_unsealed => {
                warn!(session_id, "settling unsealed result");
                None
            }
            None => return Err(LedgerError::MissingCertificate),
        };

        // All checks passed
        record.winner = Some(winner);
        record.total_moves = Some(public_output.total_moves);
        record.journal_digest = Some(journal_digest);
        record.certificate_digest = certificate_digest;
        record.settled_at = Some(Utc::now());
        record.status = SessionStatus::Settled;

        self.hub.end_game(session_id, winner == Player::One);

        let receipt = SettlementReceipt {
            session_id,
            winner,
            winner_id: record.player_id(winner),
            total_moves: public_output.total_moves,
        };
        info!(
            session_id,
            %winner,
            winner_id = %receipt.winner_id,
            journal = %short_hex(&journal_digest),
            "session settled"
        );

        Ok(receipt)
    }

    fn check_certificate(&self, certificate: &Certificate, journal_digest: &Hash32) -> Result<(), LedgerError> {
        match self.attestation.verify(certificate, &self.backend_id, journal_digest) {
            Ok(true) => Ok(()),
            Ok(false) => Err(LedgerError::InvalidAttestation("certificate rejected".into())),
            Err(e) => Err(LedgerError::InvalidAttestation(e.to_string())),
        }
    }

    /// Snapshot of a session.
    pub async fn get_session(&self, session_id: u32) -> Result<SessionRecord, LedgerError> {
        let entry = self.lookup(session_id).await?;
        let record = entry.lock().await;
        Ok(record.clone())
    }

    /// Cancel a session that has not been settled.
    pub async fn abort(&self, session_id: u32) -> Result<SessionRecord, LedgerError> {
        let entry = self.lookup(session_id).await?;
        let mut record = entry.lock().await;

        check_live(&record)?;
        record.status = SessionStatus::Aborted;
        self.hub.abort_game(session_id);
        info!(session_id, "session aborted");

        Ok(record.clone())
    }

    /// Number of sessions ever started.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}

/// Reject terminal sessions.
fn check_live(record: &SessionRecord) -> Result<(), LedgerError> {
    match record.status {
        SessionStatus::Settled => Err(LedgerError::AlreadySettled(record.session_id)),
        SessionStatus::Aborted => Err(LedgerError::SessionAborted(record.session_id)),
        SessionStatus::Open | SessionStatus::AwaitingSettlement => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
