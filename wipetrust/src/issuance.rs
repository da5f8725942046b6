// Issuance: one wipe result -> one certificate id -> every artifact.
//
// The id is drawn exactly once, in `Issuer::issue`. Exports of an `Issuance`
// (JSON, PDF, QR, audit) all read it from the same document, so artifacts of
// one issuance can never disagree about which certificate they describe.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::certificate::builder::CertificateBuilder;
use crate::certificate::id::CertificateId;
use crate::certificate::wipe::WipeResult;
use crate::certificate::CertificateDocument;
use crate::config::IssuerConfig;
use crate::crypto::jwk::PublicJwk;
use crate::crypto::keys::KeyMaterial;
use crate::envelope::signer::{EnvelopeSigner, SigningPolicy};
use crate::envelope::validator::Verifier;
use crate::envelope::SignedEnvelope;
use crate::error::{Result, WipeTrustError};
use crate::export::audit::AuditPackage;
use crate::export::qr::{render_png, render_svg, QrMatrix, QrOptions};
use crate::export::{json, pdf, write_artifact, ArtifactKind};

/// The result of issuing one certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct Issuance {
    pub envelope: SignedEnvelope,
    process_log: Vec<String>,
}

impl Issuance {
    pub fn certificate_id(&self) -> &CertificateId {
        &self.envelope.certificate.certificate_id
    }

    pub fn document(&self) -> &CertificateDocument {
        &self.envelope.certificate
    }

    pub fn verification_url(&self) -> &str {
        &self.envelope.certificate.verification_pointer.url
    }

    /// The string encoded in this issuance's QR code.
    pub fn qr_payload(&self) -> &str {
        self.verification_url()
    }

    pub fn is_signed(&self) -> bool {
        !self.envelope.is_unsigned()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        json::to_json(&self.envelope)
    }

    /// PDF with the verification QR code drawn in.
    pub fn to_pdf(&self) -> Result<Vec<u8>> {
        let qr = QrMatrix::encode(self.qr_payload(), QrOptions::default().ec_level)?;
        pdf::render_pdf(self.document(), Some(&qr))
    }

    pub fn qr_png(&self, options: &QrOptions) -> Result<Vec<u8>> {
        render_png(self.qr_payload(), options)
    }

    pub fn qr_svg(&self, options: &QrOptions) -> Result<String> {
        render_svg(self.qr_payload(), options)
    }

    pub fn audit_package(&self, application: &str, exported_at: DateTime<Utc>) -> AuditPackage {
        AuditPackage::new(&self.envelope, &self.process_log, application, exported_at)
    }
}

/// Paths written by [`Issuer::export_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArtifacts {
    pub certificate_id: String,
    pub verification_url: String,
    pub pdf: PathBuf,
    pub json: PathBuf,
    pub qr_png: PathBuf,
    pub audit: PathBuf,
}

/// Issues certificates with an injected key.
///
/// `Issuer` holds no mutable state; one instance can issue from many threads
/// at once, each call drawing its own certificate id.
#[derive(Debug, Clone)]
pub struct Issuer {
    config: IssuerConfig,
    key: Option<Arc<KeyMaterial>>,
}

impl Issuer {
    /// An issuer signing with `key`, or issuing unsigned envelopes without one
    /// (permissive signing policy only).
    pub fn new(config: IssuerConfig, key: Option<Arc<KeyMaterial>>) -> Self {
        Self { config, key }
    }

    /// An issuer with a freshly generated in-memory key.
    ///
    /// If key generation fails, a permissive configuration continues without
    /// a key (every envelope will be `UNSIGNED`); a strict one returns the
    /// error.
    pub fn with_generated_key(config: IssuerConfig) -> Result<Self> {
        match config.generate_key() {
            Ok(key) => Ok(Self::new(config, Some(Arc::new(key)))),
            Err(err) if config.signing_policy == SigningPolicy::Permissive => {
                warn!(error = %err, "key generation failed; issuing unsigned certificates");
                Ok(Self::new(config, None))
            }
            Err(err) => Err(err),
        }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    pub fn public_key(&self) -> Option<PublicJwk> {
        self.key.as_ref().map(|k| k.public_jwk())
    }

    /// A verifier with this issuer's verification policy.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.config.verification_policy)
    }

    /// Issue a certificate for a completed wipe.
    pub fn issue(&self, wipe: &WipeResult) -> Result<Issuance> {
        self.issue_at(wipe, Utc::now())
    }

    /// Issue with an explicit clock reading (id date, generation and signing
    /// time).
    pub fn issue_at(&self, wipe: &WipeResult, now: DateTime<Utc>) -> Result<Issuance> {
        if !wipe.is_completed() {
            return Err(WipeTrustError::IssuanceRefused {
                status: wipe.status,
            });
        }

        let id = CertificateId::generate_at(now);
        let document = CertificateBuilder::new(wipe)
            .certificate_id(id)
            .verify_domain(self.config.verify_domain.as_str())
            .generated_at(now)
            .workstation_fallback(self.config.workstation_id.clone())
            .facility_fallback(self.config.facility())
            .build()?;

        let envelope = EnvelopeSigner::new(self.key.as_deref())
            .policy(self.config.signing_policy)
            .issuer(self.config.issuer.as_str())
            .sign_at(&document, now)?;

        info!(
            certificate_id = %envelope.certificate.certificate_id,
            algorithm = %envelope.algorithm,
            "certificate issued"
        );
        Ok(Issuance {
            envelope,
            process_log: wipe.process_log.clone(),
        })
    }

    /// Write `<base>.pdf`, `<base>.json`, `<base>_qr.png` and
    /// `<base>_audit.json`.
    ///
    /// Everything is rendered before the first file is written, so a render
    /// failure leaves the filesystem untouched.
    pub fn export_all(
        &self,
        issuance: &Issuance,
        base: impl AsRef<Path>,
    ) -> Result<ExportedArtifacts> {
        let base = base.as_ref();
        let pdf_bytes = issuance.to_pdf()?;
        let json_bytes = issuance.to_json()?;
        let qr_bytes = issuance.qr_png(&QrOptions::default())?;
        let audit_bytes = issuance
            .audit_package(&self.config.issuer, Utc::now())
            .to_json()?;

        let artifacts = ExportedArtifacts {
            certificate_id: issuance.certificate_id().to_string(),
            verification_url: issuance.verification_url().to_string(),
            pdf: ArtifactKind::Pdf.path_for(base),
            json: ArtifactKind::Json.path_for(base),
            qr_png: ArtifactKind::QrPng.path_for(base),
            audit: ArtifactKind::Audit.path_for(base),
        };
        write_artifact(ArtifactKind::Pdf, &artifacts.pdf, &pdf_bytes)?;
        write_artifact(ArtifactKind::Json, &artifacts.json, &json_bytes)?;
        write_artifact(ArtifactKind::QrPng, &artifacts.qr_png, &qr_bytes)?;
        write_artifact(ArtifactKind::Audit, &artifacts.audit, &audit_bytes)?;

        info!(
            certificate_id = %artifacts.certificate_id,
            base = %base.display(),
            "certificate package exported"
        );
        Ok(artifacts)
    }

    /// Write the QR code as `<base>_qr.svg` and return its path.
    pub fn export_qr_svg(&self, issuance: &Issuance, base: impl AsRef<Path>) -> Result<PathBuf> {
        let svg = issuance.qr_svg(&QrOptions::default())?;
        let path = ArtifactKind::QrSvg.path_for(base.as_ref());
        write_artifact(ArtifactKind::QrSvg, &path, svg.as_bytes())?;
        Ok(path)
    }
}
