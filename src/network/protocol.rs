//! Protocol Messages
//!
//! Wire format for the settlement service over WebSocket.
//! Every frame is a JSON text message tagged with `"type"`.

use serde::{Deserialize, Serialize};

use crate::core::hash::{hex32, hex32_opt, Hash32};
use crate::game::player::{Player, PlayerId};
use crate::ledger::record::stake_str;
use crate::ledger::{LedgerError, SessionRecord, SessionStatus};
use crate::network::auth::AuthError;
use crate::proof::artifact::{ArtifactError, ProofArtifact};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the connection.
    Auth(AuthRequest),

    /// Open a settlement session.
    StartSession(StartSessionRequest),

    /// Record the caller's board commitment.
    CommitBoard {
        /// Target session.
        session_id: u32,
        /// Seat being committed (must be the caller's).
        player: Player,
        /// SHA-256 of the board occupancy.
        #[serde(with = "hex32")]
        board_hash: Hash32,
    },

    /// Submit a proven result.
    SubmitResult {
        /// Session to settle.
        session_id: u32,
        /// Proof artifact (`proof-output.json` contents).
        artifact: ProofArtifact,
    },

    /// Fetch a session record.
    GetSession {
        /// Session to fetch.
        session_id: u32,
    },

    /// Cancel a session before settlement.
    AbortSession {
        /// Session to cancel.
        session_id: u32,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Claimed player id (UUID string). Only trusted without token auth.
    pub player_id: String,
    /// Provider JWT, required when token auth is configured.
    #[serde(default)]
    pub token: Option<String>,
}

/// Session creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    /// New session id.
    pub session_id: u32,
    /// Seat 1 account.
    pub player1: PlayerId,
    /// Seat 2 account.
    pub player2: PlayerId,
    /// Seat 1 stake.
    #[serde(with = "stake_str")]
    pub stake_p1: i128,
    /// Seat 2 stake.
    #[serde(with = "stake_str")]
    pub stake_p2: i128,
    /// Seat 1 commitment, if already known.
    #[serde(default, with = "hex32_opt")]
    pub board_commit_p1: Option<Hash32>,
    /// Seat 2 commitment, if already known.
    #[serde(default, with = "hex32_opt")]
    pub board_commit_p2: Option<Hash32>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication outcome.
    AuthResult(AuthResult),

    /// Session created.
    SessionStarted {
        /// New record.
        record: SessionRecord,
    },

    /// Commitment recorded.
    BoardCommitted {
        /// Session.
        session_id: u32,
        /// Seat committed.
        player: Player,
        /// Session status afterwards.
        status: SessionStatus,
    },

    /// Result applied.
    ResultAccepted {
        /// Settled session.
        session_id: u32,
        /// Winning seat.
        winner: Player,
        /// Winning account.
        winner_id: PlayerId,
        /// Moves in the winning replay.
        total_moves: u32,
    },

    /// Session snapshot.
    Session {
        /// Current record.
        record: SessionRecord,
    },

    /// Session cancelled.
    SessionAborted {
        /// Cancelled session.
        session_id: u32,
    },

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time (Unix millis).
        server_time: u64,
    },

    /// Request failed.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Reason.
        reason: String,
    },
}

/// Successful authentication. Failures are reported as `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    /// Resolved player id.
    pub player_id: PlayerId,
    /// Server version.
    pub server_version: String,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&LedgerError> for ServerError {
    fn from(err: &LedgerError) -> Self {
        Self::new(ErrorCode::from(err), err.to_string())
    }
}

impl From<&AuthError> for ServerError {
    fn from(err: &AuthError) -> Self {
        let code = match err {
            AuthError::Expired => ErrorCode::TokenExpired,
            AuthError::NotConfigured | AuthError::InvalidPlayerId(_) => ErrorCode::AuthFailed,
            _ => ErrorCode::InvalidToken,
        };
        Self::new(code, err.to_string())
    }
}

impl From<&ArtifactError> for ServerError {
    fn from(err: &ArtifactError) -> Self {
        Self::new(ErrorCode::InvalidArtifact, err.to_string())
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Authentication failed.
    AuthFailed,
    /// Not authenticated.
    NotAuthenticated,
    /// JWT token has expired.
    TokenExpired,
    /// Invalid JWT token (signature, format, claims).
    InvalidToken,
    /// Malformed message.
    InvalidInput,
    /// Artifact failed strict parsing.
    InvalidArtifact,
    /// Unknown session.
    SessionNotFound,
    /// Session id in use.
    SessionAlreadyExists,
    /// Session already settled.
    AlreadySettled,
    /// Session aborted.
    SessionAborted,
    /// Caller holds no seat in the session.
    NotPlayer,
    /// Public output names another session.
    SessionMismatch,
    /// Board hash differs from commitment.
    CommitmentMismatch,
    /// Winner not 1 or 2.
    WinnerOutOfRange,
    /// Zero moves claimed.
    InvalidTotalMoves,
    /// Certificate rejected.
    InvalidAttestation,
    /// Certificate required.
    MissingCertificate,
    /// Commitment already recorded.
    BoardAlreadyCommitted,
    /// Same account in both seats.
    InvalidPlayers,
    /// Negative stake.
    InvalidStake,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&LedgerError> for ErrorCode {
    fn from(err: &LedgerError) -> Self {
        match err {
            LedgerError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            LedgerError::SessionAlreadyExists(_) => ErrorCode::SessionAlreadyExists,
            LedgerError::AlreadySettled(_) => ErrorCode::AlreadySettled,
            LedgerError::SessionAborted(_) => ErrorCode::SessionAborted,
            LedgerError::NotPlayer => ErrorCode::NotPlayer,
            LedgerError::SessionMismatch { .. } => ErrorCode::SessionMismatch,
            LedgerError::CommitmentMismatch { .. } => ErrorCode::CommitmentMismatch,
            LedgerError::WinnerOutOfRange(_) => ErrorCode::WinnerOutOfRange,
            LedgerError::InvalidTotalMoves => ErrorCode::InvalidTotalMoves,
            LedgerError::InvalidAttestation(_) => ErrorCode::InvalidAttestation,
            LedgerError::MissingCertificate => ErrorCode::MissingCertificate,
            LedgerError::BoardAlreadyCommitted(_) => ErrorCode::BoardAlreadyCommitted,
            LedgerError::InvalidPlayers => ErrorCode::InvalidPlayers,
            LedgerError::InvalidStake => ErrorCode::InvalidStake,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError::new(code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::artifact::prove;
    use crate::proof::attestation::KeyedDigestBackend;
    use crate::proof::transcript::Transcript;

    #[test]
    fn test_commit_board_json() {
        let json = format!(
            r#"{{"type":"commit_board","session_id":4,"player":2,"board_hash":"{}"}}"#,
            "cd".repeat(32)
        );
        match ClientMessage::from_json(&json).unwrap() {
            ClientMessage::CommitBoard { session_id, player, board_hash } => {
                assert_eq!(session_id, 4);
                assert_eq!(player, Player::Two);
                assert_eq!(board_hash, [0xcd; 32]);
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_start_session_commitments_optional() {
        let json = r#"{
            "type": "start_session",
            "session_id": 1,
            "player1": "11111111-1111-1111-1111-111111111111",
            "player2": "22222222-2222-2222-2222-222222222222",
            "stake_p1": 10,
            "stake_p2": 10
        }"#;
        match ClientMessage::from_json(json).unwrap() {
            ClientMessage::StartSession(req) => {
                assert_eq!(req.player2, PlayerId::new([0x22; 16]));
                assert_eq!(req.stake_p1, 10);
                assert_eq!(req.board_commit_p1, None);
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_start_session_round_trip_large_stake() {
        let msg = ClientMessage::StartSession(StartSessionRequest {
            session_id: 3,
            player1: PlayerId::new([0x11; 16]),
            player2: PlayerId::new([0x22; 16]),
            stake_p1: i128::MAX,
            stake_p2: 0,
            board_commit_p1: Some([0xaa; 32]),
            board_commit_p2: None,
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains(&format!(r#""stake_p1":"{}""#, i128::MAX)));

        match ClientMessage::from_json(&json).unwrap() {
            ClientMessage::StartSession(req) => {
                assert_eq!(req.stake_p1, i128::MAX);
                assert_eq!(req.stake_p2, 0);
                assert_eq!(req.board_commit_p1, Some([0xaa; 32]));
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_session_reply_round_trip() {
        let mut record = SessionRecord::new(12, PlayerId::new([1; 16]), PlayerId::new([2; 16]), 75, 1 << 70);
        record.board_commit_p2 = Some([9; 32]);

        for msg in [
            ServerMessage::Session { record: record.clone() },
            ServerMessage::SessionStarted { record: record.clone() },
        ] {
            let json = msg.to_json().unwrap();
            match ServerMessage::from_json(&json).unwrap() {
                ServerMessage::Session { record: back } | ServerMessage::SessionStarted { record: back } => {
                    assert_eq!(back, record);
                }
                other => panic!("Wrong message type: {:?}", other),
            }
        }
    }

    #[test]
    fn test_submit_result_carries_artifact() {
        let proven = prove(&Transcript::sample(8), &KeyedDigestBackend::dev(), true).unwrap();
        let msg = ClientMessage::SubmitResult {
            session_id: 8,
            artifact: proven.artifact.clone(),
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"submit_result""#));

        match ClientMessage::from_json(&json).unwrap() {
            ClientMessage::SubmitResult { artifact, .. } => {
                assert_eq!(artifact, proven.artifact);
                assert!(artifact.check().is_ok());
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_auth_token_optional() {
        let msg = ClientMessage::from_json(r#"{"type":"auth","player_id":"x"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Auth(AuthRequest { token: None, .. })));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"matchmaking"}"#).is_err());
    }

    #[test]
    fn test_ledger_error_codes() {
        let err = LedgerError::CommitmentMismatch { player: Player::One };
        let server_err = ServerError::from(&err);
        assert_eq!(server_err.code, ErrorCode::CommitmentMismatch);
        assert_eq!(server_err.message, err.to_string());

        let json = ServerMessage::Error(server_err).to_json().unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains("commitment_mismatch"));

        assert_eq!(ErrorCode::from(&LedgerError::AlreadySettled(1)), ErrorCode::AlreadySettled);
    }

    #[test]
    fn test_auth_error_codes() {
        assert_eq!(ServerError::from(&AuthError::Expired).code, ErrorCode::TokenExpired);
        assert_eq!(ServerError::from(&AuthError::InvalidSignature).code, ErrorCode::InvalidToken);
        assert_eq!(
            ServerError::from(&AuthError::InvalidPlayerId("x".into())).code,
            ErrorCode::AuthFailed
        );
    }

    #[test]
    fn test_result_accepted_json() {
        let msg = ServerMessage::ResultAccepted {
            session_id: 3,
            winner: Player::One,
            winner_id: PlayerId::new([0xaa; 16]),
            total_moves: 7,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "result_accepted");
        assert_eq!(value["winner"], 1);
        assert_eq!(value["winner_id"], "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa");
    }
}
