// Integration tests for issuance, id threading across exporters, file
// export and concurrent issuance.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use serde_json::Value;

use wipetrust::certificate::format::format_capacity;
use wipetrust::certificate::wipe::{DeviceDescriptor, Operator};
use wipetrust::export::audit::AuditPackage;
use wipetrust::export::json::from_json;
use wipetrust::export::qr::QrOptions;
use wipetrust::{
    IssuerConfig, Issuer, KeyMaterial, VerificationReason, WipeResult, WipeStatus, WipeTrustError,
};

const TEST_KEY: &str = include_str!("fixtures/test_rsa_key.pem");

fn rsa_issuer() -> Issuer {
    let key = KeyMaterial::from_rsa_pkcs8_pem(TEST_KEY).unwrap();
    Issuer::new(IssuerConfig::default(), Some(Arc::new(key)))
}

fn ssd_wipe() -> WipeResult {
    let device = DeviceDescriptor {
        path: Some("/dev/sdb".into()),
        model: Some("CT500BX500SSD1".into()),
        serial: Some("2218E6234A1F".into()),
        capacity: 500_107_862_016,
        interface: Some("SATA".into()),
        device_type: Some("SSD".into()),
        ..DeviceDescriptor::default()
    };
    let mut wipe = WipeResult::new(device, WipeStatus::Completed);
    wipe.method = Some("NIST SP 800-88 Rev. 1".into());
    wipe.pass_count = 7;
    wipe.verification_passed = true;
    wipe.operator = Operator {
        name: Some("A. Operator".into()),
        ..Operator::default()
    };
    wipe.process_log = vec![
        "[10:30:15] INFO: secure erase started".into(),
        "[10:48:20] INFO: verification complete".into(),
    ];
    wipe
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

// ── Formatting ───────────────────────────────────────────────────────────

#[test]
fn capacity_formatting() {
    assert_eq!(format_capacity(500 * 1024 * 1024 * 1024), "500.0 GB");
    assert_eq!(format_capacity(0), "Unknown");
}

// ── Id stability ─────────────────────────────────────────────────────────

#[test]
fn json_then_pdf_share_one_id() {
    let issuer = rsa_issuer();
    let issuance = issuer.issue(&ssd_wipe()).unwrap();
    let id = issuance.certificate_id().as_str().to_string();

    let json = issuance.to_json().unwrap();
    let pdf = issuance.to_pdf().unwrap();
    let json_again = issuance.to_json().unwrap();

    let from_file = from_json(&json).unwrap();
    assert_eq!(from_file.certificate.certificate_id.as_str(), id);
    assert_eq!(from_json(&json_again).unwrap().certificate, from_file.certificate);
    assert!(contains(&pdf, &id));

    // QR payload: same string everywhere, ending in the id.
    let payload = issuance.qr_payload();
    assert_eq!(payload, from_file.certificate.verification_pointer.url);
    assert_eq!(payload, format!("https://verify.datawipe.pro/{id}"));
    assert!(payload.ends_with(from_file.certificate.certificate_id.as_str()));
    assert!(contains(&pdf, payload));
}

#[test]
fn svg_qr_available() {
    let issuance = rsa_issuer().issue(&ssd_wipe()).unwrap();
    let svg = issuance.qr_svg(&QrOptions::default()).unwrap();
    assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
}

#[test]
fn refused_for_cancelled_wipe() {
    let mut wipe = ssd_wipe();
    wipe.status = WipeStatus::Cancelled;
    let err = rsa_issuer().issue(&wipe).unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

// ── File export ──────────────────────────────────────────────────────────

#[test]
fn export_all_writes_four_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = rsa_issuer();
    let issuance = issuer.issue(&ssd_wipe()).unwrap();
    let base = dir.path().join(issuance.certificate_id().as_str());

    let out = issuer.export_all(&issuance, &base).unwrap();
    assert_eq!(out.certificate_id, issuance.certificate_id().as_str());
    assert_eq!(out.verification_url, issuance.verification_url());
    for path in [&out.pdf, &out.json, &out.qr_png, &out.audit] {
        assert!(path.is_file(), "{} missing", path.display());
    }
    assert!(out.qr_png.to_string_lossy().ends_with("_qr.png"));
    assert!(out.audit.to_string_lossy().ends_with("_audit.json"));

    let result = issuer.verifier().verify_file(&out.json).unwrap();
    assert!(result.valid, "{}", result.summary());
    assert_eq!(result.certificate_id.as_deref(), Some(out.certificate_id.as_str()));

    let pdf = std::fs::read(&out.pdf).unwrap();
    assert!(contains(&pdf, &out.certificate_id));
    assert!(contains(&pdf, &out.verification_url));

    let png = std::fs::read(&out.qr_png).unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    let audit: AuditPackage =
        serde_json::from_slice(&std::fs::read(&out.audit).unwrap()).unwrap();
    assert_eq!(audit.verification_data.certificate_id, out.certificate_id);
    assert!(audit.process_log_matches);
    assert_eq!(audit.verification_data.algorithm, "RS256");
}

#[test]
fn export_into_missing_directory_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = rsa_issuer();
    let issuance = issuer.issue(&ssd_wipe()).unwrap();
    let base = dir.path().join("missing").join("cert");

    let err = issuer.export_all(&issuance, &base).unwrap_err();
    match err {
        WipeTrustError::Export { path, .. } => {
            assert_eq!(path, dir.path().join("missing").join("cert.pdf"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("missing").exists());
}

#[test]
fn tampered_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = rsa_issuer();
    let issuance = issuer.issue(&ssd_wipe()).unwrap();
    let out = issuer.export_all(&issuance, dir.path().join("cert")).unwrap();

    let mut raw: Value = serde_json::from_slice(&std::fs::read(&out.json).unwrap()).unwrap();
    raw["certificate"]["verification"]["passed"] = Value::Bool(false);
    std::fs::write(&out.json, serde_json::to_vec_pretty(&raw).unwrap()).unwrap();

    let result = issuer.verifier().verify_file(&out.json).unwrap();
    assert!(!result.valid);
    assert_eq!(result.reason, Some(VerificationReason::SignatureMismatch));
}

#[test]
fn hardened_issuer_rejects_unsigned_files() {
    let dir = tempfile::tempdir().unwrap();
    let demo = Issuer::new(IssuerConfig::default(), None);
    let issuance = demo.issue(&ssd_wipe()).unwrap();
    let out = demo.export_all(&issuance, dir.path().join("demo")).unwrap();

    assert!(demo.verifier().verify_file(&out.json).unwrap().valid);

    let hardened = Issuer::new(IssuerConfig::hardened(), None);
    let result = hardened.verifier().verify_file(&out.json).unwrap();
    assert_eq!(result.reason, Some(VerificationReason::UnsignedRejected));
}

// ── Concurrency ──────────────────────────────────────────────────────────

#[test]
fn concurrent_issuance_shares_one_key() {
    let issuer = Arc::new(rsa_issuer());
    let ids: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let issuer = Arc::clone(&issuer);
                s.spawn(move || {
                    (0..4)
                        .map(|_| {
                            let issuance = issuer.issue(&ssd_wipe()).unwrap();
                            assert!(issuer.verifier().verify(&issuance.envelope).valid);
                            issuance.certificate_id().as_str().to_string()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    assert_eq!(ids.len(), 32);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 32);
}

// ── Wipe engine input ────────────────────────────────────────────────────

#[test]
fn sample_wipe_file() {
    let wipe: WipeResult =
        serde_json::from_str(include_str!("fixtures/sample_wipe.json")).unwrap();
    let issuance = rsa_issuer().issue(&wipe).unwrap();
    let doc = issuance.document();

    assert_eq!(doc.device.capacity, "465.8 GB");
    assert_eq!(doc.device.firmware, "Unknown");
    assert_eq!(doc.wipe_details.passes, 3);
    assert!(doc.wipe_details.include_hpa);
    assert_eq!(doc.execution.duration, "18.1 minutes");
    assert_eq!(doc.execution.operator_id, "OP-0042");
    assert_eq!(doc.facility.site, "Bay 3");
    assert_eq!(doc.facility.location, "Unknown");
    assert_eq!(doc.verification.log_sha256.len(), 64);
    assert!(doc.attests_success());
}
