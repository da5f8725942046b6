// Audit package: the process log plus everything needed to cross-check a
// certificate, bundled as one JSON file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::process_log_hash;
use crate::envelope::{SignedEnvelope, UNSIGNED};
use crate::error::{Result, WipeTrustError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub export_timestamp: DateTime<Utc>,
    pub certificate_id: String,
    /// Certificate schema version.
    pub version: String,
    pub application: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditVerificationData {
    pub certificate_id: String,
    /// Same placeholder as the certificate's ledger section.
    pub blockchain_hash: String,
    pub anchored: bool,
    /// SHA-256 of the process log, as recorded in the certificate.
    pub process_hash: String,
    pub algorithm: String,
    /// `SHA256:<hex>` of the signing key, or `UNSIGNED`.
    pub public_key_fingerprint: String,
    pub verification_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSystemInfo {
    pub os: String,
    pub arch: String,
    pub workstation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPackage {
    pub audit_metadata: AuditMetadata,
    pub process_log: Vec<String>,
    /// Whether `process_log` hashes to `verification_data.process_hash`.
    pub process_log_matches: bool,
    pub verification_data: AuditVerificationData,
    pub system_info: AuditSystemInfo,
}

impl AuditPackage {
    /// Assemble the package for `envelope`. `process_log` should be the log
    /// the certificate was built from.
    pub fn new(
        envelope: &SignedEnvelope,
        process_log: &[String],
        application: &str,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let cert = &envelope.certificate;
        let process_hash = cert.verification.log_sha256.clone();
        let process_log_matches =
            !process_log.is_empty() && process_log_hash(process_log) == process_hash;
        let fingerprint = envelope
            .public_key
            .as_ref()
            .map(|k| k.fingerprint())
            .unwrap_or_else(|| UNSIGNED.to_string());

        Self {
            audit_metadata: AuditMetadata {
                export_timestamp: exported_at,
                certificate_id: cert.certificate_id.to_string(),
                version: cert.version.clone(),
                application: application.to_string(),
            },
            process_log: process_log.to_vec(),
            process_log_matches,
            verification_data: AuditVerificationData {
                certificate_id: cert.certificate_id.to_string(),
                blockchain_hash: cert.ledger.blockchain_hash.clone(),
                anchored: cert.ledger.anchored,
                process_hash,
                algorithm: envelope.algorithm.clone(),
                public_key_fingerprint: fingerprint,
                verification_url: cert.verification_pointer.url.clone(),
            },
            system_info: AuditSystemInfo {
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
                workstation_id: cert.execution.workstation_id.clone(),
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| WipeTrustError::Serialization(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::builder::build;
    use crate::certificate::id::CertificateId;
    use crate::certificate::wipe::{DeviceDescriptor, WipeResult, WipeStatus};
    use crate::crypto::keys::{Algorithm, KeyMaterial};
    use crate::envelope::signer::{sign, EnvelopeSigner};

    fn wipe_with_log() -> WipeResult {
        let mut wipe = WipeResult::new(DeviceDescriptor::default(), WipeStatus::Completed);
        wipe.process_log = vec![
            "[10:30:15] INFO: pass 1/3 started".into(),
            "[10:48:20] INFO: verification complete".into(),
        ];
        wipe
    }

    #[test]
    fn signed_package() {
        let key = KeyMaterial::generate(Algorithm::EdDsa).unwrap();
        let wipe = wipe_with_log();
        let env = sign(&build(&wipe, CertificateId::generate()), &key).unwrap();
        let pkg = AuditPackage::new(&env, &wipe.process_log, "DataWipe Pro v2.0.0", Utc::now());

        assert!(pkg.process_log_matches);
        let data = &pkg.verification_data;
        assert_eq!(data.certificate_id, env.certificate.certificate_id.as_str());
        assert_eq!(data.algorithm, "EdDSA");
        assert_eq!(data.public_key_fingerprint, key.public_jwk().fingerprint());
        assert_eq!(data.verification_url, env.certificate.verification_pointer.url);
        assert!(!data.anchored);
    }

    #[test]
    fn unsigned_package_and_foreign_log() {
        let wipe = wipe_with_log();
        let env = EnvelopeSigner::new(None)
            .sign(&build(&wipe, CertificateId::generate()))
            .unwrap();
        let other_log = vec!["something else".to_string()];
        let pkg = AuditPackage::new(&env, &other_log, "test", Utc::now());
        assert_eq!(pkg.verification_data.public_key_fingerprint, "UNSIGNED");
        assert!(!pkg.process_log_matches);

        let bytes = pkg.to_json().unwrap();
        let back: AuditPackage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, pkg);
    }
}
