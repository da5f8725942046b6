// QR verification pointer.
//
// The encoded string is exactly the document's `verification_pointer.url`,
// `https://verify.<domain>/<certificate id>`. Error correction level and
// module size only affect appearance.

use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::render::svg;
use qrcode::{Color, EcLevel, QrCode};

use crate::certificate::id::CertificateId;
use crate::error::{Result, WipeTrustError};

/// Rendering parameters.
#[derive(Debug, Clone, Copy)]
pub struct QrOptions {
    pub ec_level: EcLevel,
    /// Pixels per module (PNG) or minimum side length in px (SVG).
    pub module_px: u32,
    pub quiet_zone: bool,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::Q,
            module_px: 10,
            quiet_zone: true,
        }
    }
}

/// The string a certificate's QR code encodes.
pub fn qr_payload(id: &CertificateId, verify_domain: &str) -> String {
    id.verification_url(verify_domain)
}

fn encode(payload: &str, ec_level: EcLevel) -> Result<QrCode> {
    QrCode::with_error_correction_level(payload.as_bytes(), ec_level)
        .map_err(|e| WipeTrustError::QrEncode(e.to_string()))
}

/// PNG image of `payload`.
pub fn render_png(payload: &str, options: &QrOptions) -> Result<Vec<u8>> {
    let code = encode(payload, options.ec_level)?;
    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(options.module_px, options.module_px)
        .quiet_zone(options.quiet_zone)
        .build();

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| WipeTrustError::QrEncode(format!("png: {e}")))?;
    Ok(out.into_inner())
}

/// Standalone SVG document of `payload`.
pub fn render_svg(payload: &str, options: &QrOptions) -> Result<String> {
    let code = encode(payload, options.ec_level)?;
    let side = options.module_px * code.width() as u32;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(side, side)
        .quiet_zone(options.quiet_zone)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Module grid of a QR code, for drawing it with vector primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    pub fn encode(payload: &str, ec_level: EcLevel) -> Result<Self> {
        let code = encode(payload, ec_level)?;
        Ok(Self {
            width: code.width(),
            dark: code.to_colors().into_iter().map(|c| c == Color::Dark).collect(),
        })
    }

    /// Modules per side (without quiet zone).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row-major; `y = 0` is the top row.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }
}
