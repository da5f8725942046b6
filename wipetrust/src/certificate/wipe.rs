// Wipe-result record: the input handed over by the wipe engine once a run ends.
//
// Every descriptive field is optional on the wire; the certificate builder
// maps anything missing to "Unknown" (or 0) so documents keep a fixed shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of a wipe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WipeStatus {
    Completed,
    Failed,
    Cancelled,
}

impl WipeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WipeStatus::Completed => "completed",
            WipeStatus::Failed => "failed",
            WipeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage device as reported by drive detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDescriptor {
    pub path: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    /// Capacity in bytes; 0 when unknown.
    pub capacity: u64,
    pub interface: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub manufacturer: Option<String>,
    pub firmware: Option<String>,
    pub smart_health: Option<String>,
    pub partition_table: Option<String>,
}

/// Who ran the wipe, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operator {
    pub name: Option<String>,
    pub id: Option<String>,
    pub workstation_id: Option<String>,
}

/// Site the wipe was performed at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityInfo {
    pub organization: Option<String>,
    pub site: Option<String>,
    pub location: Option<String>,
}

/// Outcome of one wipe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeResult {
    #[serde(default)]
    pub device: DeviceDescriptor,
    /// Free-text method label, e.g. "NIST SP 800-88 Rev. 1".
    #[serde(default)]
    pub method: Option<String>,
    /// Number of overwrite passes; 0 means "derive from the method label".
    #[serde(default)]
    pub pass_count: u32,
    #[serde(default)]
    pub include_hidden_areas: bool,
    #[serde(default)]
    pub verification_requested: bool,
    #[serde(default)]
    pub verify_method: Option<String>,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub facility: FacilityInfo,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    pub status: WipeStatus,
    /// Only meaningful when `status` is `Completed`.
    #[serde(default)]
    pub verification_passed: bool,
    /// Process log lines, hashed into the certificate.
    #[serde(default)]
    pub process_log: Vec<String>,
}

impl WipeResult {
    /// A result for `device` with the given status and nothing else filled in.
    pub fn new(device: DeviceDescriptor, status: WipeStatus) -> Self {
        Self {
            device,
            method: None,
            pass_count: 0,
            include_hidden_areas: false,
            verification_requested: false,
            verify_method: None,
            operator: Operator::default(),
            facility: FacilityInfo::default(),
            start_time: None,
            completion_time: None,
            status,
            verification_passed: false,
            process_log: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == WipeStatus::Completed
    }
}
