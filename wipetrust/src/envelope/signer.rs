// Envelope signer: canonical document bytes -> compact JWS -> SignedEnvelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::certificate::CertificateDocument;
use crate::crypto::keys::KeyMaterial;
use crate::envelope::canonical::to_canonical_bytes;
use crate::envelope::jws::{sign_compact, JwsHeader};
use crate::envelope::SignedEnvelope;
use crate::error::{Result, WipeTrustError};

/// Issuer label written into token headers.
pub const DEFAULT_ISSUER: &str = "DataWipe Pro v2.0.0";

/// What to do when a real signature cannot be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningPolicy {
    /// Emit an envelope marked `UNSIGNED` and log a warning.
    #[default]
    Permissive,
    /// Return the signing error.
    Strict,
}

/// Signs certificate documents with an injected key.
///
/// Envelopes are either fully signed or explicitly `UNSIGNED`; a failure
/// part-way through signing never leaves a partial signature behind.
///
/// RS256 (PKCS#1 v1.5) is deterministic over identical bytes, but the
/// protected header carries `iat`, so two envelopes of the same document
/// should not be expected to share a token.
pub struct EnvelopeSigner<'a> {
    key: Option<&'a KeyMaterial>,
    policy: SigningPolicy,
    issuer: String,
}

impl<'a> EnvelopeSigner<'a> {
    /// A signer using `key`; `None` produces unsigned envelopes (or errors
    /// under [`SigningPolicy::Strict`]).
    pub fn new(key: Option<&'a KeyMaterial>) -> Self {
        Self {
            key,
            policy: SigningPolicy::default(),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn policy(mut self, policy: SigningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sign `document` now.
    pub fn sign(&self, document: &CertificateDocument) -> Result<SignedEnvelope> {
        self.sign_at(document, Utc::now())
    }

    /// Sign `document` with an explicit signing time.
    pub fn sign_at(
        &self,
        document: &CertificateDocument,
        now: DateTime<Utc>,
    ) -> Result<SignedEnvelope> {
        let Some(key) = self.key else {
            return self.fall_back(
                document,
                now,
                WipeTrustError::Signing("no signing key available".into()),
            );
        };

        match self.try_sign(key, document, now) {
            Ok(envelope) => {
                debug!(
                    certificate_id = %document.certificate_id,
                    algorithm = %envelope.algorithm,
                    "certificate signed"
                );
                Ok(envelope)
            }
            Err(err) => self.fall_back(document, now, err),
        }
    }

    fn try_sign(
        &self,
        key: &KeyMaterial,
        document: &CertificateDocument,
        now: DateTime<Utc>,
    ) -> Result<SignedEnvelope> {
        let algorithm = key.algorithm();
        let header = JwsHeader {
            alg: algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
            iss: Some(self.issuer.clone()),
            iat: Some(now.timestamp()),
        };
        let payload = to_canonical_bytes(document)?;
        let token = sign_compact(&header, &payload, key)?;

        Ok(SignedEnvelope {
            certificate: document.clone(),
            signature: token,
            public_key: Some(key.public_jwk()),
            algorithm: algorithm.as_str().to_string(),
            signed_at: now,
        })
    }

    fn fall_back(
        &self,
        document: &CertificateDocument,
        now: DateTime<Utc>,
        cause: WipeTrustError,
    ) -> Result<SignedEnvelope> {
        match self.policy {
            SigningPolicy::Strict => Err(cause),
            SigningPolicy::Permissive => {
                warn!(
                    certificate_id = %document.certificate_id,
                    error = %cause,
                    "issuing UNSIGNED certificate envelope"
                );
                Ok(SignedEnvelope::unsigned(document.clone(), now))
            }
        }
    }
}

/// Sign `document` with `key` under the permissive policy.
pub fn sign(document: &CertificateDocument, key: &KeyMaterial) -> Result<SignedEnvelope> {
    EnvelopeSigner::new(Some(key)).sign(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::builder::build;
    use crate::certificate::id::CertificateId;
    use crate::certificate::wipe::{DeviceDescriptor, WipeResult, WipeStatus};
    use crate::crypto::keys::Algorithm;
    use crate::envelope::jws::parse_compact;
    use crate::envelope::UNSIGNED;

    fn document() -> CertificateDocument {
        let wipe = WipeResult::new(DeviceDescriptor::default(), WipeStatus::Completed);
        build(&wipe, CertificateId::generate())
    }

    #[test]
    fn signed_envelope_fields() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let doc = document();
        let env = sign(&doc, &key).unwrap();
        assert_eq!(env.certificate, doc);
        assert_eq!(env.algorithm, "EdDSA");
        assert_eq!(env.public_key, Some(key.public_jwk()));
        assert!(!env.is_unsigned());

        let parsed = parse_compact(&env.signature).unwrap();
        assert_eq!(parsed.header.alg, "EdDSA");
        assert_eq!(parsed.header.typ.as_deref(), Some("JWT"));
        assert_eq!(parsed.header.iss.as_deref(), Some(DEFAULT_ISSUER));
        assert_eq!(parsed.header.iat, Some(env.signed_at.timestamp()));
    }

    #[test]
    fn no_key_falls_back_to_sentinel() {
        let env = EnvelopeSigner::new(None).sign(&document()).unwrap();
        assert_eq!(env.signature, UNSIGNED);
        assert_eq!(env.algorithm, UNSIGNED);
        assert!(env.public_key.is_none());
        assert!(env.is_unsigned());
    }

    #[test]
    fn no_key_strict_fails() {
        let err = EnvelopeSigner::new(None)
            .policy(SigningPolicy::Strict)
            .sign(&document())
            .unwrap_err();
        assert!(matches!(err, WipeTrustError::Signing(_)));
    }

    #[test]
    fn custom_issuer_in_header() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let env = EnvelopeSigner::new(Some(&key))
            .issuer("Recycler Console 1.4")
            .sign(&document())
            .unwrap();
        let parsed = parse_compact(&env.signature).unwrap();
        assert_eq!(parsed.header.iss.as_deref(), Some("Recycler Console 1.4"));
    }

    #[test]
    fn policy_parses_lowercase() {
        let p: SigningPolicy = serde_json::from_str(r#""strict""#).unwrap();
        assert_eq!(p, SigningPolicy::Strict);
    }
}
