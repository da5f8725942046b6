// Public keys in JWK form (RFC 7517), embedded in every signed envelope.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::VerifyingKey as Ed25519VerifyingKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256_hex;
use crate::crypto::keys::{Algorithm, MIN_RSA_BITS};
use crate::error::{Result, WipeTrustError};

/// An exported public key. Only the members needed for verification are kept;
/// unknown members (`kid`, `use`, ...) are ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum PublicJwk {
    #[serde(rename = "RSA")]
    Rsa {
        /// Modulus, base64url big-endian.
        n: String,
        /// Public exponent, base64url big-endian.
        e: String,
    },
    #[serde(rename = "OKP")]
    Okp {
        /// Curve name; only `Ed25519` is understood.
        crv: String,
        /// Public key bytes, base64url.
        x: String,
    },
}

impl PublicJwk {
    pub fn from_rsa(key: &RsaPublicKey) -> Self {
        PublicJwk::Rsa {
            n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
        }
    }

    pub fn from_ed25519(key: &Ed25519VerifyingKey) -> Self {
        PublicJwk::Okp {
            crv: "Ed25519".to_string(),
            x: URL_SAFE_NO_PAD.encode(key.as_bytes()),
        }
    }

    /// Whether this key type can verify signatures made with `algorithm`.
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        match (self, algorithm) {
            (PublicJwk::Rsa { .. }, Algorithm::Rs256) => true,
            (PublicJwk::Okp { crv, .. }, Algorithm::EdDsa) => crv == "Ed25519",
            _ => false,
        }
    }

    /// Rebuild the RSA public key.
    pub fn to_rsa(&self) -> Result<RsaPublicKey> {
        let PublicJwk::Rsa { n, e } = self else {
            return Err(WipeTrustError::InvalidKey("expected an RSA key".into()));
        };
        let n = BigUint::from_bytes_be(&decode_member("n", n)?);
        let e = BigUint::from_bytes_be(&decode_member("e", e)?);
        let key = RsaPublicKey::new(n, e)
            .map_err(|err| WipeTrustError::InvalidKey(format!("RSA: {err}")))?;
        let bits = key.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(WipeTrustError::InvalidKey(format!(
                "RSA modulus of {bits} bits is below the {MIN_RSA_BITS}-bit minimum"
            )));
        }
        Ok(key)
    }

    /// Rebuild the Ed25519 verifying key.
    pub fn to_ed25519(&self) -> Result<Ed25519VerifyingKey> {
        let PublicJwk::Okp { crv, x } = self else {
            return Err(WipeTrustError::InvalidKey("expected an OKP key".into()));
        };
        if crv != "Ed25519" {
            return Err(WipeTrustError::InvalidKey(format!("unsupported curve: {crv}")));
        }
        let bytes: [u8; 32] = decode_member("x", x)?
            .try_into()
            .map_err(|_| WipeTrustError::InvalidKey("Ed25519 key must be 32 bytes".into()))?;
        Ed25519VerifyingKey::from_bytes(&bytes)
            .map_err(|err| WipeTrustError::InvalidKey(format!("Ed25519: {err}")))
    }

    /// RFC 7638 thumbprint input: required members only, sorted, no whitespace.
    fn thumbprint_input(&self) -> String {
        match self {
            PublicJwk::Rsa { n, e } => format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#),
            PublicJwk::Okp { crv, x } => {
                format!(r#"{{"crv":"{crv}","kty":"OKP","x":"{x}"}}"#)
            }
        }
    }

    /// Human-comparable fingerprint, `SHA256:<hex>` over the thumbprint input.
    pub fn fingerprint(&self) -> String {
        format!("SHA256:{}", sha256_hex(self.thumbprint_input().as_bytes()))
    }
}

fn decode_member(name: &str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| WipeTrustError::InvalidKey(format!("JWK member {name}: {e}")))
}
