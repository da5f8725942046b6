// Signing key material: RSA (RS256) and Ed25519 (EdDSA) keypairs.
//
// Keys are generated once and held in memory only. Neither key type needs a
// shared RNG to sign, so a `KeyMaterial` can be shared read-only across
// threads behind an `Arc`.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use rand::rngs::OsRng;
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::jwk::PublicJwk;
use crate::error::{Result, WipeTrustError};

/// Smallest RSA modulus accepted for signing or verification.
pub const MIN_RSA_BITS: usize = 2048;

// ── Algorithm ────────────────────────────────────────────────────────────

/// Signature algorithms this crate can produce and verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// Ed25519.
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl Algorithm {
    /// JOSE algorithm name, as written in token headers and envelopes.
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Rs256 => "RS256",
            Algorithm::EdDsa => "EdDSA",
        }
    }

    /// Resolve a JOSE algorithm name. Unknown names return `None`; there is
    /// no fallback scheme.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RS256" => Some(Algorithm::Rs256),
            "EdDSA" => Some(Algorithm::EdDsa),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = WipeTrustError;

    fn from_str(s: &str) -> Result<Self> {
        Algorithm::from_name(s)
            .ok_or_else(|| WipeTrustError::Config(format!("unsupported algorithm: {s}")))
    }
}

// ── RSA ──────────────────────────────────────────────────────────────────

/// An RSA keypair used for RS256 signatures.
pub struct RsaKeyPair {
    signing_key: pkcs1v15::SigningKey<Sha256>,
    public_key: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generate a fresh RSA-2048 keypair.
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(MIN_RSA_BITS)
    }

    /// Generate a fresh keypair with a modulus of `bits` (at least 2048).
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(WipeTrustError::KeyGeneration(format!(
                "RSA modulus of {bits} bits is below the {MIN_RSA_BITS}-bit minimum"
            )));
        }
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| WipeTrustError::KeyGeneration(format!("{e}")))?;
        Self::from_private_key(private_key)
    }

    /// Load a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| WipeTrustError::InvalidKey(format!("pkcs8: {e}")))?;
        Self::from_private_key(private_key)
    }

    /// Wrap an existing private key.
    pub fn from_private_key(private_key: RsaPrivateKey) -> Result<Self> {
        let public_key = private_key.to_public_key();
        let bits = public_key.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(WipeTrustError::InvalidKey(format!(
                "RSA modulus of {bits} bits is below the {MIN_RSA_BITS}-bit minimum"
            )));
        }
        Ok(Self {
            signing_key: pkcs1v15::SigningKey::<Sha256>::new(private_key),
            public_key,
        })
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public_key.size() * 8
    }

    /// The public half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// RS256 signature over `data`.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let sig: pkcs1v15::Signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| WipeTrustError::Signing(format!("RS256: {e}")))?;
        Ok(sig.to_vec())
    }
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// Verify an RS256 signature.
pub fn verify_rs256(public_key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let vk = pkcs1v15::VerifyingKey::<Sha256>::new(public_key.clone());
    let sig = pkcs1v15::Signature::try_from(signature)
        .map_err(|_| WipeTrustError::SignatureVerification)?;
    vk.verify(message, &sig)
        .map_err(|_| WipeTrustError::SignatureVerification)
}

// ── Ed25519 ──────────────────────────────────────────────────────────────

/// An Ed25519 keypair used for EdDSA signatures.
#[derive(Debug)]
pub struct Ed25519KeyPair {
    signing_key: Ed25519SigningKey,
    verifying_key: Ed25519VerifyingKey,
}

impl Ed25519KeyPair {
    /// Generate a fresh random Ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = Ed25519SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// The 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Access the raw verifying (public) key.
    pub fn verifying_key(&self) -> &Ed25519VerifyingKey {
        &self.verifying_key
    }

    /// Sign arbitrary data.
    pub fn sign(&self, data: &[u8]) -> [u8; 64] {
        let sig: ed25519_dalek::Signature = self.signing_key.sign(data);
        sig.to_bytes()
    }
}

/// Verify an EdDSA (Ed25519) signature.
pub fn verify_eddsa(
    public_key: &Ed25519VerifyingKey,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let sig = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| WipeTrustError::SignatureVerification)?;
    public_key
        .verify(message, &sig)
        .map_err(|_| WipeTrustError::SignatureVerification)
}

// ── KeyMaterial ──────────────────────────────────────────────────────────

/// The issuer's signing keypair, injected into whatever needs to sign.
#[derive(Debug)]
pub enum KeyMaterial {
    Rsa(RsaKeyPair),
    Ed25519(Ed25519KeyPair),
}

impl KeyMaterial {
    /// Generate a keypair for `algorithm` (RSA-2048 for RS256).
    pub fn generate(algorithm: Algorithm) -> Result<Self> {
        match algorithm {
            Algorithm::Rs256 => Ok(KeyMaterial::Rsa(RsaKeyPair::generate()?)),
            Algorithm::EdDsa => Ok(KeyMaterial::Ed25519(Ed25519KeyPair::generate())),
        }
    }

    /// Load an RSA PKCS#8 PEM private key.
    pub fn from_rsa_pkcs8_pem(pem: &str) -> Result<Self> {
        Ok(KeyMaterial::Rsa(RsaKeyPair::from_pkcs8_pem(pem)?))
    }

    /// The algorithm this key signs with.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            KeyMaterial::Rsa(_) => Algorithm::Rs256,
            KeyMaterial::Ed25519(_) => Algorithm::EdDsa,
        }
    }

    /// Sign `data` with this key's algorithm.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyMaterial::Rsa(kp) => kp.sign(data),
            KeyMaterial::Ed25519(kp) => Ok(kp.sign(data).to_vec()),
        }
    }

    /// The public key in exportable JWK form.
    pub fn public_jwk(&self) -> PublicJwk {
        match self {
            KeyMaterial::Rsa(kp) => PublicJwk::from_rsa(kp.public_key()),
            KeyMaterial::Ed25519(kp) => PublicJwk::from_ed25519(kp.verifying_key()),
        }
    }
}

/// Verify `signature` over `message` with an exported public key.
///
/// Fails with `InvalidKey` when the key cannot serve `algorithm`, and with
/// `SignatureVerification` on any cryptographic mismatch.
pub fn verify_signature(
    algorithm: Algorithm,
    public_key: &PublicJwk,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    match algorithm {
        Algorithm::Rs256 => verify_rs256(&public_key.to_rsa()?, message, signature),
        Algorithm::EdDsa => verify_eddsa(&public_key.to_ed25519()?, message, signature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");

    #[test]
    fn algorithm_names_roundtrip() {
        for alg in [Algorithm::Rs256, Algorithm::EdDsa] {
            assert_eq!(Algorithm::from_name(alg.as_str()), Some(alg));
        }
        assert_eq!(Algorithm::from_name("ES256"), None);
        assert_eq!(Algorithm::from_name("rs256"), None);
    }

    #[test]
    fn rsa_fixture_loads_and_signs() {
        let kp = RsaKeyPair::from_pkcs8_pem(TEST_KEY).unwrap();
        assert_eq!(kp.bits(), 2048);
        let sig = kp.sign(b"hello wipetrust").unwrap();
        assert_eq!(sig.len(), 256);
        verify_rs256(kp.public_key(), b"hello wipetrust", &sig).unwrap();
    }

    #[test]
    fn rs256_wrong_message_rejected() {
        let kp = RsaKeyPair::from_pkcs8_pem(TEST_KEY).unwrap();
        let sig = kp.sign(b"correct message").unwrap();
        let err = verify_rs256(kp.public_key(), b"wrong message", &sig).unwrap_err();
        assert!(matches!(err, WipeTrustError::SignatureVerification));
    }

    #[test]
    fn undersized_rsa_generation_refused() {
        let err = RsaKeyPair::generate_with_bits(1024).unwrap_err();
        assert!(matches!(err, WipeTrustError::KeyGeneration(_)));
    }

    #[test]
    fn garbage_pem_rejected() {
        let err = RsaKeyPair::from_pkcs8_pem("not a key").unwrap_err();
        assert!(matches!(err, WipeTrustError::InvalidKey(_)));
    }

    #[test]
    fn ed25519_seed_roundtrip() {
        let kp = Ed25519KeyPair::generate();
        let kp2 = Ed25519KeyPair::from_seed(&kp.signing_key.to_bytes());
        assert_eq!(kp.public_key_bytes(), kp2.public_key_bytes());
    }

    #[test]
    fn eddsa_sign_verify() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign(b"msg");
        verify_eddsa(kp.verifying_key(), b"msg", &sig).unwrap();
        assert!(verify_eddsa(kp.verifying_key(), b"other", &sig).is_err());
        assert!(verify_eddsa(kp.verifying_key(), b"msg", &sig[..10]).is_err());
    }

    #[test]
    fn key_material_dispatch() {
        let rsa = KeyMaterial::from_rsa_pkcs8_pem(TEST_KEY).unwrap();
        assert_eq!(rsa.algorithm(), Algorithm::Rs256);
        let sig = rsa.sign(b"data").unwrap();
        verify_signature(Algorithm::Rs256, &rsa.public_jwk(), b"data", &sig).unwrap();

        let ed = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        assert_eq!(ed.algorithm(), Algorithm::EdDsa);
        let sig = ed.sign(b"data").unwrap();
        verify_signature(Algorithm::EdDsa, &ed.public_jwk(), b"data", &sig).unwrap();
    }

    #[test]
    fn key_type_must_match_algorithm() {
        let ed = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let sig = ed.sign(b"data").unwrap();
        let err = verify_signature(Algorithm::Rs256, &ed.public_jwk(), b"data", &sig).unwrap_err();
        assert!(matches!(err, WipeTrustError::InvalidKey(_)));
    }
}
