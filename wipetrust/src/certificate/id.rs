// Certificate identifiers and the verification pointer derived from them.
//
// Format: `DWP-<YYYYMMDD>-<8 x [A-Z0-9]>`. An id is drawn once per issuance
// and then threaded through every exporter; nothing downstream mints its own.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WipeTrustError};

const PREFIX: &str = "DWP";
const SUFFIX_LEN: usize = 8;

/// Domain used for verification URLs unless configured otherwise.
pub const DEFAULT_VERIFY_DOMAIN: &str = "datawipe.pro";

/// A certificate identifier. Deserialization goes through
/// [`CertificateId::parse`], so ids read from files are always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertificateId(String);

impl CertificateId {
    /// Draw a fresh id dated today (UTC).
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Draw a fresh id dated `now`.
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        let suffix = uuid[..SUFFIX_LEN].to_ascii_uppercase();
        CertificateId(format!("{PREFIX}-{}-{suffix}", now.format("%Y%m%d")))
    }

    /// Validate an id read from outside.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || WipeTrustError::InvalidCertificateId(s.to_string());
        let mut parts = s.split('-');
        let (Some(prefix), Some(date), Some(suffix), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if prefix != PREFIX {
            return Err(invalid());
        }
        if date.len() != 8 || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return Err(invalid());
        }
        let suffix_ok = suffix.len() == SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !suffix_ok {
            return Err(invalid());
        }
        Ok(CertificateId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing random segment, used as a short lookup code.
    pub fn short_code(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or(&self.0)
    }

    /// `https://verify.<domain>/<id>`, the payload of every QR code.
    pub fn verification_url(&self, domain: &str) -> String {
        format!("https://verify.{domain}/{}", self.0)
    }

    /// Placeholder ledger hash shown on certificates. Derived from the id
    /// alone; it is not a content hash and nothing is anchored anywhere.
    pub fn placeholder_ledger_hash(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(12)..].iter().collect();
        format!("0x{}a7b2c3d4", tail.to_lowercase())
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CertificateId {
    type Error = WipeTrustError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CertificateId> for String {
    fn from(id: CertificateId) -> Self {
        id.0
    }
}

impl AsRef<str> for CertificateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
