//! Attestation Backends
//!
//! The attestation backend is an opaque collaborator: it certifies that a
//! journal was produced by an honest run of the verification pipeline, and
//! later checks such certificates for the settlement ledger.
//!
//! Backends provided here:
//! - `AcceptAllBackend`: accepts every non-empty certificate (tests only)
//! - `KeyedDigestBackend`: certificate is a keyed SHA-256 over the journal
//!   digest, for local and dev settlement
//!
//! A production deployment plugs a proof-system verifier in behind the same
//! trait.

use tracing::warn;

use crate::core::hash::{hash_bytes, hash_from_hex, journal_digest, DomainHasher, Hash32};

/// Identifies which verifier program/key a certificate is checked against.
pub type BackendId = Hash32;

/// Domain separator for keyed certificates.
const KEYED_CERT_DOMAIN: &[u8] = b"BATTLESHIP_SETTLE_CERT_V1";

/// Domain separator for deriving a backend id from a key.
const KEYED_ID_DOMAIN: &[u8] = b"BATTLESHIP_SETTLE_BACKEND_V1";

/// Key used when `SETTLE_ATTESTATION_KEY` is unset.
const DEV_KEY_SEED: &[u8] = b"battleship-settle dev attestation key";

/// Opaque attestation certificate (the "seal").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Certificate(pub Vec<u8>);

impl Certificate {
    /// Raw certificate bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the certificate carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the certificate bytes, as recorded by the ledger.
    pub fn digest(&self) -> Hash32 {
        hash_bytes(&self.0)
    }
}

/// Attestation backend errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestationError {
    /// Certificate bytes are not in the backend's format.
    #[error("invalid certificate format")]
    InvalidCertificateFormat,

    /// Backend could not be reached or failed internally.
    #[error("attestation backend unavailable: {0}")]
    Unavailable(String),

    /// Backend key material is unusable.
    #[error("invalid attestation key: {0}")]
    InvalidKey(String),
}

/// Certifies journals and checks certificates.
///
/// Calls are blocking and carry no internal timeout.
pub trait AttestationBackend: Send + Sync {
    /// Id of the verifier this backend certifies for.
    fn backend_id(&self) -> BackendId;

    /// Produce a certificate for a journal.
    fn attest(&self, journal: &[u8]) -> Result<Certificate, AttestationError>;

    /// Check a certificate against a backend id and journal digest.
    fn verify(
        &self,
        certificate: &Certificate,
        backend_id: &BackendId,
        journal_digest: &Hash32,
    ) -> Result<bool, AttestationError>;
}

// =============================================================================
// ACCEPT-ALL STUB
// =============================================================================

/// Stub backend for testing (accepts any non-empty certificate).
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAllBackend;

impl AttestationBackend for AcceptAllBackend {
    fn backend_id(&self) -> BackendId {
        [0; 32]
    }

    fn attest(&self, journal: &[u8]) -> Result<Certificate, AttestationError> {
        Ok(Certificate(journal_digest(journal).to_vec()))
    }

    fn verify(
        &self,
        certificate: &Certificate,
        _backend_id: &BackendId,
        _journal_digest: &Hash32,
    ) -> Result<bool, AttestationError> {
        if certificate.is_empty() {
            return Err(AttestationError::InvalidCertificateFormat);
        }
        Ok(true)
    }
}

// =============================================================================
// KEYED DIGEST
// =============================================================================

/// Certificate = SHA-256(domain | key | backend_id | journal_digest).
///
/// Only parties holding the key can mint certificates, and a certificate is
/// bound to a single journal.
#[derive(Clone)]
pub struct KeyedDigestBackend {
    key: Hash32,
    backend_id: BackendId,
}

impl KeyedDigestBackend {
    /// Create from a 32-byte key. The backend id is derived from the key.
    pub fn new(key: Hash32) -> Self {
        let mut hasher = DomainHasher::new(KEYED_ID_DOMAIN);
        hasher.update_hash(&key);
        Self {
            key,
            backend_id: hasher.finalize(),
        }
    }

    /// Backend with the built-in development key.
    pub fn dev() -> Self {
        Self::new(hash_bytes(DEV_KEY_SEED))
    }

    /// Create from `SETTLE_ATTESTATION_KEY` (hex), falling back to the dev key.
    pub fn from_env() -> Result<Self, AttestationError> {
        match std::env::var("SETTLE_ATTESTATION_KEY") {
            Ok(hex_key) => hash_from_hex(hex_key.trim())
                .map(Self::new)
                .map_err(|e| AttestationError::InvalidKey(e.to_string())),
            Err(_) => {
                warn!("SETTLE_ATTESTATION_KEY not set, using development attestation key");
                Ok(Self::dev())
            }
        }
    }

    fn certificate_for(&self, backend_id: &BackendId, digest: &Hash32) -> Hash32 {
        let mut hasher = DomainHasher::new(KEYED_CERT_DOMAIN);
        hasher.update_hash(&self.key);
        hasher.update_hash(backend_id);
        hasher.update_hash(digest);
        hasher.finalize()
    }
}

impl std::fmt::Debug for KeyedDigestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedDigestBackend")
            .field("backend_id", &hex::encode(self.backend_id))
            .finish_non_exhaustive()
    }
}

impl AttestationBackend for KeyedDigestBackend {
    fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    fn attest(&self, journal: &[u8]) -> Result<Certificate, AttestationError> {
        let digest = journal_digest(journal);
        Ok(Certificate(self.certificate_for(&self.backend_id, &digest).to_vec()))
    }

    fn verify(
        &self,
        certificate: &Certificate,
        backend_id: &BackendId,
        journal_digest: &Hash32,
    ) -> Result<bool, AttestationError> {
        if certificate.as_bytes().len() != 32 {
            return Err(AttestationError::InvalidCertificateFormat);
        }
        if backend_id != &self.backend_id {
            return Ok(false);
        }
        let expected = self.certificate_for(backend_id, journal_digest);
        Ok(constant_time_eq(certificate.as_bytes(), &expected))
    }
}

/// Byte comparison whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    std::hint::black_box(diff) == 0
}
