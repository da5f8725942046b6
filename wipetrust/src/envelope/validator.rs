// Envelope validator: re-derive the signed bytes and check the signature.
//
// A bad envelope is an answer, not an error: every tampered, unsupported or
// malformed-but-parseable envelope comes back as `valid = false` with a
// reason code. Only input that cannot be read or is not JSON at all is
// returned as `Err`.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::certificate::{schema_major, CertificateDocument};
use crate::crypto::jwk::PublicJwk;
use crate::crypto::keys::{verify_signature, Algorithm};
use crate::envelope::canonical::canonicalize;
use crate::envelope::jws::{parse_compact, signing_input};
use crate::envelope::{SignedEnvelope, UNSIGNED};
use crate::error::{Result, WipeTrustError};

// ── Result types ─────────────────────────────────────────────────────────

/// Machine-readable verification outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationReason {
    /// Sentinel signature accepted by the permissive policy.
    UnsignedDemoMode,
    /// Sentinel signature refused by the strict policy.
    UnsignedRejected,
    /// `algorithm` is not one this crate verifies.
    UnsupportedAlgorithm,
    /// Token header or key type disagrees with `algorithm`.
    AlgorithmMismatch,
    /// Embedded key is not among the pinned trusted keys.
    UntrustedKey,
    /// The signature does not match the certificate.
    SignatureMismatch,
    /// Certificate schema major version is not understood.
    SchemaVersionMismatch,
    /// Required fields missing, or token / key not decodable.
    Malformed,
}

impl VerificationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationReason::UnsignedDemoMode => "unsigned-demo-mode",
            VerificationReason::UnsignedRejected => "unsigned-rejected",
            VerificationReason::UnsupportedAlgorithm => "unsupported-algorithm",
            VerificationReason::AlgorithmMismatch => "algorithm-mismatch",
            VerificationReason::UntrustedKey => "untrusted-key",
            VerificationReason::SignatureMismatch => "signature-mismatch",
            VerificationReason::SchemaVersionMismatch => "schema-version-mismatch",
            VerificationReason::Malformed => "malformed",
        }
    }
}

impl fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    /// `None` only for a fully verified signature.
    pub reason: Option<VerificationReason>,
    pub certificate_id: Option<String>,
    /// Human-oriented detail for invalid results.
    pub detail: Option<String>,
}

impl VerificationResult {
    fn verified(certificate_id: Option<String>) -> Self {
        Self {
            valid: true,
            reason: None,
            certificate_id,
            detail: None,
        }
    }

    fn unsigned_demo(certificate_id: Option<String>) -> Self {
        Self {
            valid: true,
            reason: Some(VerificationReason::UnsignedDemoMode),
            certificate_id,
            detail: None,
        }
    }

    fn invalid(
        reason: VerificationReason,
        certificate_id: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            certificate_id,
            detail: Some(detail.into()),
        }
    }

    /// One-line human message, e.g. for CLI output.
    pub fn summary(&self) -> String {
        let id = self.certificate_id.as_deref().unwrap_or("<no certificate id>");
        match (self.valid, self.reason, &self.detail) {
            (true, None, _) => format!("VALID: {id} (signature verified)"),
            (true, Some(reason), _) => format!("VALID: {id} ({reason})"),
            (false, Some(reason), Some(detail)) => format!("INVALID: {id}: {reason}: {detail}"),
            (false, Some(reason), None) => format!("INVALID: {id}: {reason}"),
            (false, None, _) => format!("INVALID: {id}"),
        }
    }
}

// ── Verifier ─────────────────────────────────────────────────────────────

/// How to treat envelopes carrying the `UNSIGNED` sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationPolicy {
    /// Accept them as valid demo certificates.
    #[default]
    Permissive,
    /// Reject them.
    Strict,
}

/// Verifies signed envelopes.
///
/// By default the key embedded in the envelope is trusted as-is. Pinning
/// keys with [`Verifier::trust_key`] additionally requires the embedded key
/// to be one of them.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    policy: VerificationPolicy,
    trusted_fingerprints: Vec<String>,
}

impl Verifier {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self {
            policy,
            trusted_fingerprints: Vec::new(),
        }
    }

    pub fn permissive() -> Self {
        Self::new(VerificationPolicy::Permissive)
    }

    pub fn strict() -> Self {
        Self::new(VerificationPolicy::Strict)
    }

    /// Only accept signatures made by `key` (or other pinned keys).
    pub fn trust_key(mut self, key: &PublicJwk) -> Self {
        self.trusted_fingerprints.push(key.fingerprint());
        self
    }

    /// Verify an in-memory envelope.
    pub fn verify(&self, envelope: &SignedEnvelope) -> VerificationResult {
        match serde_json::to_value(envelope) {
            Ok(value) => self.verify_value(&value),
            Err(e) => VerificationResult::invalid(
                VerificationReason::Malformed,
                Some(envelope.certificate.certificate_id.to_string()),
                format!("envelope serialization: {e}"),
            ),
        }
    }

    /// Read and verify an envelope file. Fails only if the file cannot be
    /// read or does not contain JSON.
    pub fn verify_file(&self, path: impl AsRef<Path>) -> Result<VerificationResult> {
        let bytes = std::fs::read(path.as_ref())?;
        self.verify_slice(&bytes)
    }

    /// Verify serialized envelope bytes. Fails only on non-JSON input.
    pub fn verify_slice(&self, bytes: &[u8]) -> Result<VerificationResult> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| WipeTrustError::MalformedEnvelope(format!("not JSON: {e}")))?;
        Ok(self.verify_value(&value))
    }

    /// Verify a parsed envelope.
    ///
    /// The certificate is canonicalized as generic JSON rather than re-parsed
    /// into [`CertificateDocument`], so edits that keep the JSON well formed
    /// surface as `signature-mismatch`.
    pub fn verify_value(&self, raw: &Value) -> VerificationResult {
        let result = self.check(raw);
        let id = result.certificate_id.as_deref().unwrap_or("-");
        if result.valid {
            info!(certificate_id = id, reason = ?result.reason, "certificate verified");
        } else {
            warn!(
                certificate_id = id,
                reason = ?result.reason,
                detail = ?result.detail,
                "certificate verification failed"
            );
        }
        result
    }

    fn check(&self, raw: &Value) -> VerificationResult {
        use VerificationReason::*;

        let Some(envelope) = raw.as_object() else {
            return VerificationResult::invalid(Malformed, None, "envelope is not a JSON object");
        };
        let Some(certificate) = envelope.get("certificate").and_then(Value::as_object) else {
            return VerificationResult::invalid(Malformed, None, "missing certificate");
        };
        let id = certificate
            .get("certificate_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(signature) = envelope.get("signature").and_then(Value::as_str) else {
            return VerificationResult::invalid(Malformed, id, "missing signature");
        };
        if signature == UNSIGNED {
            return match self.policy {
                VerificationPolicy::Permissive => VerificationResult::unsigned_demo(id),
                VerificationPolicy::Strict => VerificationResult::invalid(
                    UnsignedRejected,
                    id,
                    "envelope carries no signature",
                ),
            };
        }

        let Some(algorithm_name) = envelope.get("algorithm").and_then(Value::as_str) else {
            return VerificationResult::invalid(Malformed, id, "missing algorithm");
        };
        let Some(algorithm) = Algorithm::from_name(algorithm_name) else {
            return VerificationResult::invalid(
                UnsupportedAlgorithm,
                id,
                format!("algorithm {algorithm_name} is not supported"),
            );
        };

        let public_key = match envelope.get("public_key") {
            Some(value) => match serde_json::from_value::<PublicJwk>(value.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    return VerificationResult::invalid(Malformed, id, format!("public key: {e}"))
                }
            },
            None => return VerificationResult::invalid(Malformed, id, "missing public key"),
        };
        if !public_key.supports(algorithm) {
            return VerificationResult::invalid(
                AlgorithmMismatch,
                id,
                format!("embedded key cannot verify {algorithm}"),
            );
        }
        if !self.trusted_fingerprints.is_empty()
            && !self.trusted_fingerprints.contains(&public_key.fingerprint())
        {
            return VerificationResult::invalid(
                UntrustedKey,
                id,
                format!("key {} is not pinned", public_key.fingerprint()),
            );
        }

        let token = match parse_compact(signature) {
            Ok(token) => token,
            Err(e) => return VerificationResult::invalid(Malformed, id, e.to_string()),
        };
        if token.header.alg != algorithm_name {
            return VerificationResult::invalid(
                AlgorithmMismatch,
                id,
                format!(
                    "token header says {}, envelope says {algorithm_name}",
                    token.header.alg
                ),
            );
        }

        let payload = match canonicalize(&Value::Object(certificate.clone())) {
            Ok(bytes) => bytes,
            Err(e) => return VerificationResult::invalid(Malformed, id, e.to_string()),
        };
        let input = signing_input(&token.header_segment, &payload);
        match verify_signature(algorithm, &public_key, input.as_bytes(), &token.signature) {
            Ok(()) => {}
            Err(WipeTrustError::SignatureVerification) => {
                return VerificationResult::invalid(
                    SignatureMismatch,
                    id,
                    "signature does not match certificate contents",
                );
            }
            Err(e) => return VerificationResult::invalid(Malformed, id, e.to_string()),
        }

        match check_schema_version(certificate) {
            Ok(()) => VerificationResult::verified(id),
            Err((reason, detail)) => VerificationResult::invalid(reason, id, detail),
        }
    }
}

fn check_schema_version(
    certificate: &Map<String, Value>,
) -> std::result::Result<(), (VerificationReason, String)> {
    let Some(version) = certificate.get("version").and_then(Value::as_str) else {
        return Err((VerificationReason::Malformed, "missing schema version".into()));
    };
    match schema_major(version) {
        Some(CertificateDocument::SCHEMA_MAJOR) => Ok(()),
        _ => Err((
            VerificationReason::SchemaVersionMismatch,
            format!(
                "schema version {version} is not compatible with {}",
                CertificateDocument::SCHEMA_VERSION
            ),
        )),
    }
}

/// Verify `envelope` under the permissive policy.
pub fn verify(envelope: &SignedEnvelope) -> VerificationResult {
    Verifier::permissive().verify(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::builder::build;
    use crate::certificate::id::CertificateId;
    use crate::certificate::wipe::{DeviceDescriptor, WipeResult, WipeStatus};
    use crate::crypto::keys::KeyMaterial;
    use crate::envelope::signer::{sign, EnvelopeSigner};
    use serde_json::json;

    fn envelope(key: &KeyMaterial) -> SignedEnvelope {
        let wipe = WipeResult::new(DeviceDescriptor::default(), WipeStatus::Completed);
        sign(&build(&wipe, CertificateId::generate()), key).unwrap()
    }

    #[test]
    fn valid_envelope() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let env = envelope(&key);
        let result = verify(&env);
        assert!(result.valid);
        assert_eq!(result.reason, None);
        assert_eq!(
            result.certificate_id.as_deref(),
            Some(env.certificate.certificate_id.as_str())
        );
    }

    #[test]
    fn tampered_certificate() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let mut env = envelope(&key);
        env.certificate.device.serial = "SWAPPED".into();
        let result = verify(&env);
        assert!(!result.valid);
        assert_eq!(result.reason, Some(VerificationReason::SignatureMismatch));
    }

    #[test]
    fn tampered_version_is_signature_mismatch() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let mut env = envelope(&key);
        env.certificate.version = "9.0.0".into();
        assert_eq!(
            verify(&env).reason,
            Some(VerificationReason::SignatureMismatch)
        );
    }

    #[test]
    fn unsigned_policy() {
        let wipe = WipeResult::new(DeviceDescriptor::default(), WipeStatus::Completed);
        let doc = build(&wipe, CertificateId::generate());
        let env = EnvelopeSigner::new(None).sign(&doc).unwrap();

        let permissive = Verifier::permissive().verify(&env);
        assert!(permissive.valid);
        assert_eq!(permissive.reason, Some(VerificationReason::UnsignedDemoMode));

        let strict = Verifier::strict().verify(&env);
        assert!(!strict.valid);
        assert_eq!(strict.reason, Some(VerificationReason::UnsignedRejected));
    }

    #[test]
    fn unknown_algorithm() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let mut env = envelope(&key);
        env.algorithm = "HS256".into();
        assert_eq!(
            verify(&env).reason,
            Some(VerificationReason::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn header_algorithm_must_agree() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let env = envelope(&key);
        let mut raw = serde_json::to_value(&env).unwrap();
        // Swap in a token whose header names a different algorithm.
        let token = env.signature.replacen(
            env.signature.split('.').next().unwrap(),
            &crate::envelope::jws::encode_segment(br#"{"alg":"RS256"}"#),
            1,
        );
        raw["signature"] = json!(token);
        let result = Verifier::permissive().verify_value(&raw);
        assert_eq!(result.reason, Some(VerificationReason::AlgorithmMismatch));
    }

    #[test]
    fn missing_certificate_is_malformed() {
        let result = Verifier::permissive()
            .verify_slice(br#"{"signature":"x.y.z","algorithm":"RS256"}"#)
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, Some(VerificationReason::Malformed));
        assert_eq!(result.certificate_id, None);
    }

    #[test]
    fn non_json_is_error() {
        let err = Verifier::permissive().verify_slice(b"%PDF-1.5").unwrap_err();
        assert!(matches!(err, WipeTrustError::MalformedEnvelope(_)));
    }

    #[test]
    fn pinned_key() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let other = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let env = envelope(&key);

        let pinned = Verifier::permissive().trust_key(&key.public_jwk());
        assert!(pinned.verify(&env).valid);

        let wrong = Verifier::permissive().trust_key(&other.public_jwk());
        assert_eq!(
            wrong.verify(&env).reason,
            Some(VerificationReason::UntrustedKey)
        );
    }

    #[test]
    fn summary_names_reason() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let mut env = envelope(&key);
        env.certificate.device.model = "other".into();
        let summary = verify(&env).summary();
        assert!(summary.starts_with("INVALID:"));
        assert!(summary.contains("signature-mismatch"));
    }

    #[test]
    fn reason_codes_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&VerificationReason::SchemaVersionMismatch).unwrap(),
            r#""schema-version-mismatch""#
        );
        assert_eq!(
            VerificationReason::UnsignedDemoMode.as_str(),
            "unsigned-demo-mode"
        );
    }
}
