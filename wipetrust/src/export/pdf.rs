// Single-page human-readable certificate.
//
// The layout is plain: Helvetica text lines plus the QR code drawn as filled
// rectangles. Content streams are stored uncompressed, so the certificate id
// and verification URL appear verbatim in the file bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::certificate::CertificateDocument;
use crate::export::qr::QrMatrix;
use crate::error::{Result, WipeTrustError};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const QR_MODULE_PT: i64 = 3;

/// Writes text top-down into a content stream.
struct Page {
    ops: Vec<Operation>,
    y: i64,
}

impl Page {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text(&mut self, font: &str, size: i64, x: i64, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), Object::Integer(size)]));
        self.ops.push(Operation::new(
            "Td",
            vec![Object::Integer(x), Object::Integer(self.y)],
        ));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(to_latin_text(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn line(&mut self, font: &str, size: i64, text: &str) {
        self.text(font, size, MARGIN, text);
        self.y -= size + 6;
    }

    fn heading(&mut self, text: &str) {
        self.y -= 8;
        self.line("F2", 11, text);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.text("F2", 9, MARGIN, label);
        self.text("F1", 9, MARGIN + 130, value);
        self.y -= 14;
    }

    /// Draw `qr` with its top-right corner at (`right`, `top`).
    fn qr(&mut self, qr: &QrMatrix, right: i64, top: i64) {
        let side = qr.width() as i64;
        let left = right - side * QR_MODULE_PT;
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("g", vec![Object::Integer(0)]));
        for y in 0..qr.width() {
            for x in 0..qr.width() {
                if qr.is_dark(x, y) {
                    self.ops.push(Operation::new(
                        "re",
                        vec![
                            Object::Integer(left + x as i64 * QR_MODULE_PT),
                            Object::Integer(top - (y as i64 + 1) * QR_MODULE_PT),
                            Object::Integer(QR_MODULE_PT),
                            Object::Integer(QR_MODULE_PT),
                        ],
                    ));
                }
            }
        }
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }
}

/// Base-14 fonts only cover Latin text; anything else becomes `?`.
fn to_latin_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

/// Render `document` as a PDF. With `qr`, the verification QR code is drawn
/// in the top-right corner.
pub fn render_pdf(document: &CertificateDocument, qr: Option<&QrMatrix>) -> Result<Vec<u8>> {
    let mut page = Page::new();
    let id = document.certificate_id.as_str();
    let pointer = &document.verification_pointer;

    if let Some(qr) = qr {
        page.qr(qr, PAGE_WIDTH - MARGIN, PAGE_HEIGHT - MARGIN);
    }

    page.line("F2", 16, "CERTIFICATE OF DATA SANITIZATION");
    page.line("F1", 9, &format!("Certificate ID: {id}"));
    page.line(
        "F1",
        9,
        &format!(
            "Generated: {} UTC",
            document.generated_at.format("%Y-%m-%d %H:%M:%S")
        ),
    );
    page.line("F1", 9, &format!("Schema version: {}", document.version));

    let device = &document.device;
    page.heading("DEVICE INFORMATION");
    page.field("Model:", &device.model);
    page.field("Serial:", &device.serial);
    page.field("Capacity:", &device.capacity);
    page.field("Interface:", &device.interface);
    page.field("Type:", &device.device_type);
    page.field("Manufacturer:", &device.manufacturer);
    page.field("Firmware:", &device.firmware);

    let wipe = &document.wipe_details;
    page.heading("SANITIZATION DETAILS");
    page.field("Method:", &wipe.method);
    page.field("Standard:", &wipe.standard);
    page.field("Passes:", &format!("{}-Pass", wipe.passes));
    page.field("Hidden areas (HPA/DCO):", yes_no(wipe.include_hpa));

    let exec = &document.execution;
    page.heading("EXECUTION");
    page.field("Status:", &exec.status.as_str().to_uppercase());
    page.field("Started:", &exec.start_time);
    page.field("Completed:", &exec.completion_time);
    page.field("Duration:", &exec.duration);
    page.field("Operator:", &exec.operator);
    page.field("Workstation:", &exec.workstation_id);

    let verification = &document.verification;
    page.heading("VERIFICATION");
    page.field("Passed:", yes_no(verification.passed));
    page.field("Method:", &verification.method);
    page.field(
        "Confidence:",
        &format!("{:.1}%", verification.confidence_percent),
    );
    page.field("Process log SHA-256:", &verification.log_sha256);

    page.heading("FACILITY");
    page.field("Organization:", &document.facility.organization);
    page.field("Site:", &document.facility.site);
    page.field("Location:", &document.facility.location);

    page.heading("LEDGER REFERENCE");
    page.field("Hash:", &document.ledger.blockchain_hash);
    page.field(
        "Anchored:",
        if document.ledger.anchored {
            "YES"
        } else {
            "NO (placeholder only)"
        },
    );

    page.heading("VERIFY THIS CERTIFICATE");
    page.field("URL:", &pointer.url);
    page.field("Short code:", &pointer.short_code);

    let compliance: Vec<&str> = document.compliance.standards.iter().map(String::as_str).collect();
    page.y -= 10;
    page.line("F1", 8, &format!("Standards claimed: {}", compliance.join(", ")));
    page.line(
        "F1",
        8,
        &format!(
            "Eco impact (estimated): CO2 saved {}, {}, offset {}",
            document.eco_impact.co2_saved,
            document.eco_impact.trees_equivalent,
            document.eco_impact.carbon_offset
        ),
    );

    assemble(page.ops)
}

fn assemble(ops: Vec<Operation>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let content = Content { operations: ops }
        .encode()
        .map_err(|e| WipeTrustError::PdfRender(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| WipeTrustError::PdfRender(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::builder::build;
    use crate::certificate::id::CertificateId;
    use crate::certificate::wipe::{DeviceDescriptor, WipeResult, WipeStatus};
    use qrcode::EcLevel;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn document() -> CertificateDocument {
        let device = DeviceDescriptor {
            model: Some("CT500BX500SSD1".into()),
            capacity: 500_107_862_016,
            ..DeviceDescriptor::default()
        };
        build(
            &WipeResult::new(device, WipeStatus::Completed),
            CertificateId::parse("DWP-20250101-ABCDEF12").unwrap(),
        )
    }

    #[test]
    fn id_and_url_visible() {
        let doc = document();
        let bytes = render_pdf(&doc, None).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, "DWP-20250101-ABCDEF12"));
        assert!(contains(&bytes, &doc.verification_pointer.url));
        assert!(contains(&bytes, "CT500BX500SSD1"));
    }

    #[test]
    fn parses_back_as_one_page() {
        let doc = document();
        let qr = QrMatrix::encode(&doc.verification_pointer.url, EcLevel::Q).unwrap();
        let bytes = render_pdf(&doc, Some(&qr)).unwrap();
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn non_latin_text_replaced() {
        assert_eq!(to_latin_text("Zürich\tok"), "Z?rich?ok");
    }
}
