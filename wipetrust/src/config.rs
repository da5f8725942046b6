// Issuer configuration: JSON file + environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::certificate::id::DEFAULT_VERIFY_DOMAIN;
use crate::certificate::wipe::FacilityInfo;
use crate::crypto::keys::{Algorithm, Ed25519KeyPair, KeyMaterial, RsaKeyPair, MIN_RSA_BITS};
use crate::envelope::signer::{SigningPolicy, DEFAULT_ISSUER};
use crate::envelope::validator::VerificationPolicy;
use crate::error::{Result, WipeTrustError};

pub const ENV_VERIFY_DOMAIN: &str = "WIPETRUST_VERIFY_DOMAIN";
pub const ENV_ALGORITHM: &str = "WIPETRUST_ALGORITHM";
pub const ENV_WORKSTATION_ID: &str = "WIPETRUST_WORKSTATION_ID";

/// Settings of one issuing installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Verification URLs point at `https://verify.<verify_domain>/<id>`.
    pub verify_domain: String,
    /// Label written into the token header `iss`.
    pub issuer: String,
    /// Algorithm of keys generated by [`IssuerConfig::generate_key`].
    pub algorithm: Algorithm,
    pub rsa_bits: usize,
    pub signing_policy: SigningPolicy,
    pub verification_policy: VerificationPolicy,
    /// Used when the wipe result does not name a workstation.
    pub workstation_id: Option<String>,
    pub organization: Option<String>,
    pub site: Option<String>,
    pub location: Option<String>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            verify_domain: DEFAULT_VERIFY_DOMAIN.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            algorithm: Algorithm::Rs256,
            rsa_bits: MIN_RSA_BITS,
            signing_policy: SigningPolicy::Permissive,
            verification_policy: VerificationPolicy::Permissive,
            workstation_id: None,
            organization: None,
            site: None,
            location: None,
        }
    }
}

impl IssuerConfig {
    /// Strict signing and strict verification: no `UNSIGNED` envelopes are
    /// ever produced or accepted.
    pub fn hardened() -> Self {
        Self {
            signing_policy: SigningPolicy::Strict,
            verification_policy: VerificationPolicy::Strict,
            ..Self::default()
        }
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            WipeTrustError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| WipeTrustError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WIPETRUST_*` overrides from the process environment. A missing
    /// workstation id falls back to `HOSTNAME` / `COMPUTERNAME`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(domain) = lookup(ENV_VERIFY_DOMAIN) {
            self.verify_domain = domain;
        }
        if let Some(name) = lookup(ENV_ALGORITHM) {
            self.algorithm = name.parse()?;
        }
        if let Some(ws) = lookup(ENV_WORKSTATION_ID) {
            self.workstation_id = Some(ws);
        }
        if self.workstation_id.is_none() {
            self.workstation_id = lookup("HOSTNAME").or_else(|| lookup("COMPUTERNAME"));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.verify_domain.trim().is_empty() {
            return Err(WipeTrustError::Config("verify_domain is empty".into()));
        }
        if self.rsa_bits < MIN_RSA_BITS {
            return Err(WipeTrustError::Config(format!(
                "rsa_bits {} is below the minimum of {MIN_RSA_BITS}",
                self.rsa_bits
            )));
        }
        Ok(())
    }

    /// Facility fields as builder fallbacks.
    pub fn facility(&self) -> FacilityInfo {
        FacilityInfo {
            organization: self.organization.clone(),
            site: self.site.clone(),
            location: self.location.clone(),
        }
    }

    /// Generate a fresh in-memory key for the configured algorithm.
    pub fn generate_key(&self) -> Result<KeyMaterial> {
        match self.algorithm {
            Algorithm::Rs256 => Ok(KeyMaterial::Rsa(RsaKeyPair::generate_with_bits(
                self.rsa_bits,
            )?)),
            Algorithm::EdDsa => Ok(KeyMaterial::Ed25519(Ed25519KeyPair::generate())),
        }
    }
}
