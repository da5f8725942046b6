// Signed JSON envelope file format.

use crate::envelope::SignedEnvelope;
use crate::error::{Result, WipeTrustError};

/// Pretty-printed envelope bytes.
///
/// Formatting is irrelevant to verification: the verifier canonicalizes the
/// embedded certificate before checking the signature.
pub fn to_json(envelope: &SignedEnvelope) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(envelope)
        .map_err(|e| WipeTrustError::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse an envelope file. Fails on non-JSON input or a document that does
/// not have the envelope shape; use the verifier to judge validity.
pub fn from_json(bytes: &[u8]) -> Result<SignedEnvelope> {
    serde_json::from_slice(bytes).map_err(|e| WipeTrustError::MalformedEnvelope(e.to_string()))
}
