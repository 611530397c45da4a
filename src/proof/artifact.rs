//! Proof Artifacts
//!
//! What the prover hands to the settlement side:
//! - `ProofArtifact`: the JSON file (`proof-output.json`) with hex journal,
//!   optional hex seal and the decoded public output
//! - `Receipt`: compact bincode form (`receipt.bin`)
//!
//! Parsing is strict. Unknown fields are rejected, hashes must be 32-byte
//! hex, the journal must be the canonical encoding of the public output and
//! a present seal must be non-empty.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::hash::hex32;
use crate::proof::attestation::{AttestationBackend, AttestationError, BackendId, Certificate};
use crate::proof::public_output::PublicOutput;
use crate::proof::transcript::Transcript;
use crate::proof::verify::{verify_transcript, VerificationError, VerifiedMatch};

/// Artifact decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    /// Not valid artifact JSON.
    #[error("invalid artifact json: {0}")]
    Json(String),

    /// A hex field failed to decode.
    #[error("invalid hex in {field}: {reason}")]
    Hex {
        /// Field name.
        field: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// `journal_hex` is not the encoding of `public_output`.
    #[error("journal does not match public output")]
    JournalMismatch,

    /// `seal_hex` is present but empty.
    #[error("seal is present but empty")]
    EmptySeal,

    /// Binary receipt could not be (de)serialized.
    #[error("receipt encoding failed: {0}")]
    Bincode(String),
}

// =============================================================================
// JSON ARTIFACT
// =============================================================================

/// `proof-output.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProofArtifact {
    /// Hex of the 73-byte journal.
    pub journal_hex: String,

    /// Hex of the certificate, `null` when unsealed.
    pub seal_hex: Option<String>,

    /// Decoded journal.
    pub public_output: PublicOutput,
}

impl ProofArtifact {
    /// Build an artifact for a public output and optional certificate.
    pub fn new(public_output: PublicOutput, certificate: Option<&Certificate>) -> Self {
        Self {
            journal_hex: hex::encode(public_output.to_journal()),
            seal_hex: certificate.map(|c| hex::encode(c.as_bytes())),
            public_output,
        }
    }

    /// Strictly parse and check an artifact.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(json).map_err(|e| ArtifactError::Json(e.to_string()))?;
        artifact.check()?;
        Ok(artifact)
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String, ArtifactError> {
        serde_json::to_string_pretty(self).map_err(|e| ArtifactError::Json(e.to_string()))
    }

    /// Check the consistency rules that serde alone cannot express.
    ///
    /// Artifacts that arrive embedded in other messages are parsed by serde
    /// directly and must be checked with this before use.
    pub fn check(&self) -> Result<(), ArtifactError> {
        let journal = decode_hex("journal_hex", &self.journal_hex)?;
        if journal.as_slice() != self.public_output.to_journal().as_slice() {
            return Err(ArtifactError::JournalMismatch);
        }
        self.certificate()?;
        Ok(())
    }

    /// Decoded certificate, if sealed.
    pub fn certificate(&self) -> Result<Option<Certificate>, ArtifactError> {
        match &self.seal_hex {
            None => Ok(None),
            Some(seal_hex) => {
                let seal = decode_hex("seal_hex", seal_hex)?;
                if seal.is_empty() {
                    return Err(ArtifactError::EmptySeal);
                }
                Ok(Some(Certificate(seal)))
            }
        }
    }

    /// Whether the artifact carries a certificate.
    pub fn is_sealed(&self) -> bool {
        self.seal_hex.is_some()
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, ArtifactError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(trimmed).map_err(|e| ArtifactError::Hex {
        field,
        reason: e.to_string(),
    })
}

// =============================================================================
// BINARY RECEIPT
// =============================================================================

/// `receipt.bin`: public output, certificate and the backend that made it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Attested facts. Encodes to the journal bytes.
    pub public_output: PublicOutput,

    /// Certificate bytes, if sealed.
    pub seal: Option<Vec<u8>>,

    /// Backend the certificate was minted by.
    #[serde(with = "hex32")]
    pub backend_id: BackendId,
}

impl Receipt {
    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        bincode::serialize(self).map_err(|e| ArtifactError::Bincode(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ArtifactError> {
        bincode::deserialize(data).map_err(|e| ArtifactError::Bincode(e.to_string()))
    }

    /// Certificate, if sealed.
    pub fn certificate(&self) -> Option<Certificate> {
        self.seal.clone().map(Certificate)
    }

    /// JSON artifact equivalent.
    pub fn to_artifact(&self) -> ProofArtifact {
        ProofArtifact::new(self.public_output, self.certificate().as_ref())
    }
}

// =============================================================================
// PROVING
// =============================================================================

/// Failure to produce an artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProveError {
    /// Session id 0 is reserved.
    #[error("session id must be non-zero")]
    ZeroSession,

    /// Transcript failed verification.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Backend refused to certify.
    #[error(transparent)]
    Attestation(#[from] AttestationError),
}

/// Output of a successful proving run.
#[derive(Clone, Debug)]
pub struct ProvenMatch {
    /// Verified pipeline output.
    pub verified: VerifiedMatch,
    /// JSON artifact.
    pub artifact: ProofArtifact,
    /// Binary receipt.
    pub receipt: Receipt,
}

/// Verify a transcript and package the result.
///
/// With `sealed == false` the backend is not called and the artifact carries
/// no seal (development mode).
pub fn prove(
    transcript: &Transcript,
    backend: &dyn AttestationBackend,
    sealed: bool,
) -> Result<ProvenMatch, ProveError> {
    if transcript.session_id == 0 {
        return Err(ProveError::ZeroSession);
    }

    let verified = verify_transcript(transcript)?;
    let journal = verified.public_output.to_journal();

    let certificate = if sealed {
        Some(backend.attest(&journal)?)
    } else {
        None
    };

    info!(
        session_id = transcript.session_id,
        winner = verified.public_output.winner,
        total_moves = verified.public_output.total_moves,
        sealed,
        "match proven"
    );

    let artifact = ProofArtifact::new(verified.public_output, certificate.as_ref());
    let receipt = Receipt {
        public_output: verified.public_output,
        seal: certificate.map(|c| c.0),
        backend_id: backend.backend_id(),
    };

    Ok(ProvenMatch {
        verified,
        artifact,
        receipt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::attestation::KeyedDigestBackend;

    fn proven() -> ProvenMatch {
        prove(&Transcript::sample(12), &KeyedDigestBackend::dev(), true).unwrap()
    }

    #[test]
    fn test_prove_sample() {
        let proven = proven();
        assert_eq!(proven.artifact.public_output.session_id, 12);
        assert_eq!(proven.artifact.journal_hex.len(), 73 * 2);
        assert!(proven.artifact.is_sealed());
        assert_eq!(proven.receipt.backend_id, KeyedDigestBackend::dev().backend_id());
    }

    #[test]
    fn test_artifact_certificate_verifies() {
        let backend = KeyedDigestBackend::dev();
        let artifact = proven().artifact;
        let cert = artifact.certificate().unwrap().unwrap();

        let ok = backend
            .verify(&cert, &backend.backend_id(), &artifact.public_output.digest())
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_zero_session_rejected() {
        let result = prove(&Transcript::sample(0), &KeyedDigestBackend::dev(), true);
        assert!(matches!(result, Err(ProveError::ZeroSession)));
    }

    #[test]
    fn test_unsealed_artifact() {
        let proven = prove(&Transcript::sample(3), &KeyedDigestBackend::dev(), false).unwrap();
        assert_eq!(proven.artifact.seal_hex, None);
        assert_eq!(proven.receipt.seal, None);

        let json = proven.artifact.to_json().unwrap();
        assert!(json.contains("\"seal_hex\": null"));
        assert_eq!(ProofArtifact::from_json(&json).unwrap(), proven.artifact);
    }

    #[test]
    fn test_json_roundtrip_strict() {
        let artifact = proven().artifact;
        let json = artifact.to_json().unwrap();
        assert_eq!(ProofArtifact::from_json(&json).unwrap(), artifact);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut value = serde_json::to_value(proven().artifact).unwrap();
        value["extra"] = serde_json::json!(1);
        let err = ProofArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, ArtifactError::Json(_)));

        let mut value = serde_json::to_value(proven().artifact).unwrap();
        value["public_output"]["extra"] = serde_json::json!(1);
        let err = ProofArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, ArtifactError::Json(_)));
    }

    #[test]
    fn test_short_hash_rejected() {
        let mut value = serde_json::to_value(proven().artifact).unwrap();
        value["public_output"]["board_hash_p1"] = serde_json::json!("abcd");
        let err = ProofArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, ArtifactError::Json(_)));
    }

    #[test]
    fn test_journal_mismatch_rejected() {
        let mut artifact = proven().artifact;
        artifact.public_output.winner = 2;
        let json = serde_json::to_string(&artifact).unwrap();
        assert_eq!(ProofArtifact::from_json(&json).unwrap_err(), ArtifactError::JournalMismatch);
    }

    #[test]
    fn test_bad_hex_rejected() {
        let mut artifact = proven().artifact;
        artifact.journal_hex.replace_range(0..2, "zz");
        let json = serde_json::to_string(&artifact).unwrap();
        let err = ProofArtifact::from_json(&json).unwrap_err();
        assert!(matches!(err, ArtifactError::Hex { field: "journal_hex", .. }));
    }

    #[test]
    fn test_empty_seal_rejected() {
        let mut artifact = proven().artifact;
        artifact.seal_hex = Some(String::new());
        let json = serde_json::to_string(&artifact).unwrap();
        assert_eq!(ProofArtifact::from_json(&json).unwrap_err(), ArtifactError::EmptySeal);
    }

    #[test]
    fn test_receipt_roundtrip() {
        let receipt = proven().receipt;
        let bytes = receipt.to_bytes().unwrap();

        // The public output leads the receipt as the raw journal
        assert_eq!(&bytes[..73], &receipt.public_output.to_journal()[..]);

        let back = Receipt::from_bytes(&bytes).unwrap();
        assert_eq!(back, receipt);
        assert_eq!(back.to_artifact(), proven().artifact);

        assert!(Receipt::from_bytes(&bytes[..10]).is_err());
    }
}
