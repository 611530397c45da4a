//! Match Proof Pipeline
//!
//! Turns a finished match into facts the settlement ledger can trust:
//! - Transcript decoding
//! - Verification by validation + deterministic replay
//! - Session-bound public output (the journal)
//! - Attestation and the artifacts that carry it
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF PIPELINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  transcript.rs    - Match transcript (input JSON)           │
//! │  verify.rs        - Validate boards, replay moves           │
//! │  commitment.rs    - Board hashes bound to the session       │
//! │  public_output.rs - 73-byte journal encoding                │
//! │  attestation.rs   - Backend trait, stub + keyed backends    │
//! │  artifact.rs      - proof-output.json and receipt.bin       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod attestation;
pub mod commitment;
pub mod public_output;
pub mod transcript;
pub mod verify;

// Re-export key types
pub use artifact::{prove, ArtifactError, ProofArtifact, ProveError, ProvenMatch, Receipt};
pub use attestation::{
    AcceptAllBackend, AttestationBackend, AttestationError, BackendId, Certificate, KeyedDigestBackend,
};
pub use commitment::{bind, board_commitment, first_mismatch};
pub use public_output::{JournalLengthError, PublicOutput, JOURNAL_LEN};
pub use transcript::{Transcript, TranscriptError};
pub use verify::{verify_transcript, VerificationError, VerifiedMatch};
