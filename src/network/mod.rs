//! Network Layer
//!
//! WebSocket settlement service in front of the ledger.
//! This layer is **non-deterministic**; every settlement decision is made by
//! `ledger/` on facts produced by `proof/`.

pub mod auth;
pub mod protocol;
pub mod server;

pub use auth::{authenticate, validate_token, AuthConfig, AuthError, TokenClaims};
pub use protocol::{
    AuthRequest, AuthResult, ClientMessage, ErrorCode, ServerError, ServerMessage, StartSessionRequest,
};
pub use server::{ConnectionState, ServerConfig, SettlementServer, SettlementServerError, SettlementService};
