// WipeTrust error types

use std::path::PathBuf;

use thiserror::Error;

use crate::certificate::wipe::WipeStatus;
use crate::export::ArtifactKind;

/// Top-level error type for the WipeTrust crate.
///
/// Verification outcomes are not errors: a tampered or unsupported envelope
/// is reported through [`crate::envelope::validator::VerificationResult`].
#[derive(Debug, Error)]
pub enum WipeTrustError {
    // ── Key material ────────────────────────────────────────────────────
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    SignatureVerification,

    // ── Signing ─────────────────────────────────────────────────────────
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    // ── Certificates ────────────────────────────────────────────────────
    #[error("invalid certificate id: {0}")]
    InvalidCertificateId(String),

    #[error("certificate build error: {0}")]
    CertificateBuild(String),

    #[error("refusing to issue a certificate for a wipe with status {status}")]
    IssuanceRefused { status: WipeStatus },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    // ── Export ──────────────────────────────────────────────────────────
    #[error("failed to write {kind} artifact to {}: {reason}", path.display())]
    Export {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("QR encoding failed: {0}")]
    QrEncode(String),

    #[error("PDF rendering failed: {0}")]
    PdfRender(String),

    // ── Generic ─────────────────────────────────────────────────────────
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, WipeTrustError>;
