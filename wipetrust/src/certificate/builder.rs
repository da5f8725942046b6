// Certificate builder: maps a wipe result onto the fixed-shape certificate document.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::certificate::format::{
    format_capacity, format_duration, or_unknown, pass_count_for_method, UNKNOWN,
};
use crate::certificate::id::{CertificateId, DEFAULT_VERIFY_DOMAIN};
use crate::certificate::wipe::{FacilityInfo, WipeResult};
use crate::certificate::{
    CertificateDocument, Compliance, DeviceSnapshot, EcoImpact, Execution, Facility,
    LedgerPlaceholder, VerificationPointer, VerificationSummary, WipeDetails,
};
use crate::crypto::hash::process_log_hash;
use crate::error::{Result, WipeTrustError};

const VERIFICATION_METHOD: &str = "Forensic Pattern Analysis";
const VERIFIED_CONFIDENCE: f64 = 99.9;
const COMPLIANCE_STANDARDS: [&str; 3] = ["NIST SP 800-88", "DoD 5220.22-M", "ISO 27001"];

/// Builder for a [`CertificateDocument`].
///
/// The certificate id is never drawn here: the caller passes the id of the
/// issuance, so every artifact of that issuance carries the same one.
///
/// # Example
/// ```ignore
/// let doc = CertificateBuilder::new(&wipe)
///     .certificate_id(CertificateId::generate())
///     .verify_domain("datawipe.pro")
///     .build()?;
/// ```
pub struct CertificateBuilder<'a> {
    wipe: &'a WipeResult,
    certificate_id: Option<CertificateId>,
    verify_domain: String,
    generated_at: Option<DateTime<Utc>>,
    workstation_fallback: Option<String>,
    facility_fallback: FacilityInfo,
}

impl<'a> CertificateBuilder<'a> {
    pub fn new(wipe: &'a WipeResult) -> Self {
        Self {
            wipe,
            certificate_id: None,
            verify_domain: DEFAULT_VERIFY_DOMAIN.to_string(),
            generated_at: None,
            workstation_fallback: None,
            facility_fallback: FacilityInfo::default(),
        }
    }

    /// The id of the issuance this document belongs to.
    pub fn certificate_id(mut self, id: CertificateId) -> Self {
        self.certificate_id = Some(id);
        self
    }

    /// Domain of the verification service (`verify.<domain>`).
    pub fn verify_domain(mut self, domain: impl Into<String>) -> Self {
        self.verify_domain = domain.into();
        self
    }

    /// Pin the generation timestamp instead of reading the clock.
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Workstation id to use when the wipe result does not name one.
    pub fn workstation_fallback(mut self, workstation: Option<String>) -> Self {
        self.workstation_fallback = workstation;
        self
    }

    /// Facility fields to use where the wipe result leaves them empty.
    pub fn facility_fallback(mut self, facility: FacilityInfo) -> Self {
        self.facility_fallback = facility;
        self
    }

    /// Consume the builder and produce the document.
    pub fn build(mut self) -> Result<CertificateDocument> {
        let id = self
            .certificate_id
            .take()
            .ok_or_else(|| WipeTrustError::CertificateBuild("certificate_id is required".into()))?;
        Ok(self.assemble(id))
    }

    fn assemble(self, certificate_id: CertificateId) -> CertificateDocument {
        let wipe = self.wipe;
        if !wipe.is_completed() {
            warn!(
                certificate_id = %certificate_id,
                status = %wipe.status,
                "building certificate for a wipe that did not complete"
            );
        }

        let device = &wipe.device;
        let device = DeviceSnapshot {
            path: or_unknown(device.path.as_deref()),
            model: or_unknown(device.model.as_deref()),
            serial: or_unknown(device.serial.as_deref()),
            capacity: format_capacity(device.capacity),
            capacity_bytes: device.capacity,
            interface: or_unknown(device.interface.as_deref()),
            device_type: or_unknown(device.device_type.as_deref()),
            manufacturer: or_unknown(device.manufacturer.as_deref()),
            firmware: or_unknown(device.firmware.as_deref()),
            smart_health: or_unknown(device.smart_health.as_deref()),
            partition_table: or_unknown(device.partition_table.as_deref()),
        };

        let method = or_unknown(wipe.method.as_deref());
        let passes = if wipe.pass_count == 0 {
            pass_count_for_method(&method)
        } else {
            wipe.pass_count
        };
        let wipe_details = WipeDetails {
            method,
            standard: CertificateDocument::STANDARD.to_string(),
            passes,
            include_hpa: wipe.include_hidden_areas,
            verification: wipe.verification_requested,
            verify_method: or_unknown(wipe.verify_method.as_deref()),
        };

        let duration = match (wipe.start_time, wipe.completion_time) {
            (Some(start), Some(end)) => format_duration((end - start).num_seconds()),
            _ => UNKNOWN.to_string(),
        };
        let workstation = wipe
            .operator
            .workstation_id
            .as_deref()
            .or(self.workstation_fallback.as_deref());
        let execution = Execution {
            start_time: timestamp_or_unknown(wipe.start_time),
            completion_time: timestamp_or_unknown(wipe.completion_time),
            duration,
            operator: or_unknown(wipe.operator.name.as_deref()),
            operator_id: or_unknown(wipe.operator.id.as_deref()),
            workstation_id: or_unknown(workstation),
            status: wipe.status,
        };

        let passed = wipe.is_completed() && wipe.verification_passed;
        let verification = VerificationSummary {
            passed,
            method: VERIFICATION_METHOD.to_string(),
            confidence_percent: if passed { VERIFIED_CONFIDENCE } else { 0.0 },
            recovery_attempts: 0,
            log_sha256: if wipe.process_log.is_empty() {
                UNKNOWN.to_string()
            } else {
                process_log_hash(&wipe.process_log)
            },
        };

        let compliance = Compliance {
            standards: COMPLIANCE_STANDARDS.iter().map(|s| s.to_string()).collect(),
            government_approved: true,
            quantum_resistant: true,
        };
        let eco_impact = EcoImpact {
            co2_saved: "50 kg".to_string(),
            trees_equivalent: "2 trees".to_string(),
            carbon_offset: "200 g".to_string(),
        };

        let facility = Facility {
            organization: or_unknown(
                wipe.facility
                    .organization
                    .as_deref()
                    .or(self.facility_fallback.organization.as_deref()),
            ),
            site: or_unknown(
                wipe.facility
                    .site
                    .as_deref()
                    .or(self.facility_fallback.site.as_deref()),
            ),
            location: or_unknown(
                wipe.facility
                    .location
                    .as_deref()
                    .or(self.facility_fallback.location.as_deref()),
            ),
        };

        let ledger = LedgerPlaceholder {
            blockchain_hash: certificate_id.placeholder_ledger_hash(),
            anchored: false,
        };
        let verification_pointer = VerificationPointer {
            url: certificate_id.verification_url(&self.verify_domain),
            short_code: certificate_id.short_code().to_string(),
        };

        CertificateDocument {
            certificate_id,
            version: CertificateDocument::SCHEMA_VERSION.to_string(),
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            device,
            wipe_details,
            execution,
            verification,
            compliance,
            eco_impact,
            facility,
            ledger,
            verification_pointer,
        }
    }
}

/// Build a document for `wipe` under the issuance id `certificate_id`, with
/// default verification domain and no fallbacks.
pub fn build(wipe: &WipeResult, certificate_id: CertificateId) -> CertificateDocument {
    CertificateBuilder::new(wipe).assemble(certificate_id)
}

fn timestamp_or_unknown(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| UNKNOWN.to_string())
}
