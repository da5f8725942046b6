// Artifact exporters and the file writer they share.
//
// Renderers are pure (`&CertificateDocument` / `&SignedEnvelope` -> bytes);
// only `write_artifact` touches the filesystem. It writes into a temporary
// file next to the target and renames it into place, so a failed export
// never leaves a truncated artifact behind and the handle is released on
// every exit path.

pub mod audit;
pub mod json;
pub mod pdf;
pub mod qr;

use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, WipeTrustError};

/// The artifacts one issuance can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Pdf,
    Json,
    QrPng,
    QrSvg,
    Audit,
}

impl ArtifactKind {
    /// Suffix appended to an export base path, e.g. `report` -> `report_qr.png`.
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => ".pdf",
            ArtifactKind::Json => ".json",
            ArtifactKind::QrPng => "_qr.png",
            ArtifactKind::QrSvg => "_qr.svg",
            ArtifactKind::Audit => "_audit.json",
        }
    }

    /// `base` with this kind's suffix appended to the file name.
    pub fn path_for(self, base: &Path) -> PathBuf {
        let mut name = OsString::from(base.as_os_str());
        name.push(self.suffix());
        PathBuf::from(name)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Pdf => "PDF",
            ArtifactKind::Json => "JSON",
            ArtifactKind::QrPng => "QR PNG",
            ArtifactKind::QrSvg => "QR SVG",
            ArtifactKind::Audit => "audit",
        };
        f.write_str(name)
    }
}

/// Write `bytes` to `path` atomically.
///
/// Errors name the artifact kind, the exact target path and the cause.
pub fn write_artifact(kind: ArtifactKind, path: &Path, bytes: &[u8]) -> Result<()> {
    let fail = |reason: String| WipeTrustError::Export {
        kind,
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| fail(e.to_string()))?;
    tmp.as_file().sync_all().map_err(|e| fail(e.to_string()))?;
    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;

    debug!(kind = %kind, path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}
