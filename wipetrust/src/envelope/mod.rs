// Signed envelope: certificate + signature + the key that verifies it.
//
// Trust model: the verifying key travels inside the envelope, so a valid
// envelope proves only that its content was signed by *some* holder of that
// key. Nothing anchors the key to an authority; anyone can mint a valid
// envelope with a key of their own. Authenticity rests on out-of-band trust
// in the issuing installation (e.g. comparing key fingerprints).

pub mod canonical;
pub mod jws;
pub mod signer;
pub mod validator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::CertificateDocument;
use crate::crypto::jwk::PublicJwk;

/// Signature and algorithm value of envelopes issued without a key.
pub const UNSIGNED: &str = "UNSIGNED";

/// A certificate packaged with its signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Embedded by value; the signature covers its canonical serialization.
    pub certificate: CertificateDocument,
    /// Compact JWS token, or [`UNSIGNED`].
    pub signature: String,
    /// Absent only on unsigned envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicJwk>,
    /// `RS256`, `EdDSA`, or [`UNSIGNED`].
    pub algorithm: String,
    pub signed_at: DateTime<Utc>,
}

impl SignedEnvelope {
    /// An envelope explicitly marked as carrying no signature.
    pub fn unsigned(certificate: CertificateDocument, signed_at: DateTime<Utc>) -> Self {
        Self {
            certificate,
            signature: UNSIGNED.to_string(),
            public_key: None,
            algorithm: UNSIGNED.to_string(),
            signed_at,
        }
    }

    /// True for demo envelopes produced without a signing key.
    pub fn is_unsigned(&self) -> bool {
        self.signature == UNSIGNED
    }
}
