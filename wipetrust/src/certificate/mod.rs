// Certificate of data sanitization: the canonical document that gets signed.

pub mod builder;
pub mod format;
pub mod id;
pub mod wipe;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::id::CertificateId;
use crate::certificate::wipe::WipeStatus;

// ── Sections ─────────────────────────────────────────────────────────────

/// Snapshot of the wiped device, copied by value at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub path: String,
    pub model: String,
    pub serial: String,
    /// Formatted capacity, e.g. "465.8 GB".
    pub capacity: String,
    pub capacity_bytes: u64,
    pub interface: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub manufacturer: String,
    pub firmware: String,
    pub smart_health: String,
    pub partition_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeDetails {
    pub method: String,
    pub standard: String,
    pub passes: u32,
    pub include_hpa: bool,
    pub verification: bool,
    pub verify_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub start_time: String,
    pub completion_time: String,
    pub duration: String,
    pub operator: String,
    pub operator_id: String,
    pub workstation_id: String,
    pub status: WipeStatus,
}

/// Post-wipe verification claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Only ever true for completed wipes.
    pub passed: bool,
    pub method: String,
    pub confidence_percent: f64,
    pub recovery_attempts: u32,
    pub log_sha256: String,
}

/// Static compliance claims. Not computed from the wipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compliance {
    pub standards: BTreeSet<String>,
    pub government_approved: bool,
    pub quantum_resistant: bool,
}

/// Static estimated environmental figures. Not measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcoImpact {
    pub co2_saved: String,
    pub trees_equivalent: String,
    pub carbon_offset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub organization: String,
    pub site: String,
    pub location: String,
}

/// Display-only ledger reference. `anchored` is always false: the hash is a
/// placeholder derived from the certificate id, not a record on any chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPlaceholder {
    pub blockchain_hash: String,
    pub anchored: bool,
}

/// Where and how to look the certificate up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPointer {
    pub url: String,
    pub short_code: String,
}

// ── CertificateDocument ──────────────────────────────────────────────────

/// The canonical certificate document.
///
/// Every field is always present; values the wipe engine did not report are
/// the literal "Unknown" (or 0), so the serialized shape is identical for all
/// documents of one schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDocument {
    pub certificate_id: CertificateId,
    /// Schema version of this document (not the application version).
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub device: DeviceSnapshot,
    pub wipe_details: WipeDetails,
    pub execution: Execution,
    pub verification: VerificationSummary,
    pub compliance: Compliance,
    pub eco_impact: EcoImpact,
    pub facility: Facility,
    pub ledger: LedgerPlaceholder,
    pub verification_pointer: VerificationPointer,
}

impl CertificateDocument {
    /// The document schema version written by this crate.
    pub const SCHEMA_VERSION: &'static str = "2.0.0";

    /// Major component of [`Self::SCHEMA_VERSION`]; documents with any other
    /// major version are not understood.
    pub const SCHEMA_MAJOR: u64 = 2;

    /// Standard label written into `wipe_details.standard`.
    pub const STANDARD: &'static str = "NIST SP 800-88 Rev. 1";

    /// Whether the certificate may be presented as a successful sanitization.
    pub fn attests_success(&self) -> bool {
        self.execution.status == WipeStatus::Completed && self.verification.passed
    }
}

/// Major component of a `MAJOR.MINOR.PATCH` version string.
pub fn schema_major(version: &str) -> Option<u64> {
    version.split('.').next()?.parse().ok()
}
