// WipeTrust: signed, verifiable data-sanitization certificates
//
// Crate root: module declarations and public re-exports.

pub mod error;
pub mod config;
pub mod crypto;
pub mod certificate;
pub mod envelope;
pub mod export;
pub mod issuance;

// Re-export key types at crate root for convenience.
pub use certificate::builder::CertificateBuilder;
pub use certificate::id::CertificateId;
pub use certificate::wipe::{WipeResult, WipeStatus};
pub use certificate::CertificateDocument;
pub use config::IssuerConfig;
pub use crypto::keys::{Algorithm, KeyMaterial};
pub use envelope::signer::EnvelopeSigner;
pub use envelope::validator::{VerificationReason, VerificationResult, Verifier};
pub use envelope::SignedEnvelope;
pub use error::{Result, WipeTrustError};
pub use issuance::{Issuance, Issuer};
