// Compact JWS (RFC 7515 §7.1): BASE64URL(header) "." BASE64URL(payload) "." BASE64URL(signature)

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::keys::KeyMaterial;
use crate::envelope::canonical::to_canonical_bytes;
use crate::error::{Result, WipeTrustError};

/// Protected header of a certificate token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Issuing application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Unix seconds at signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// A compact token split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedJws {
    pub header: JwsHeader,
    pub header_segment: String,
    pub payload_segment: String,
    pub signature: Vec<u8>,
}

pub fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| WipeTrustError::MalformedEnvelope(format!("token {name}: {e}")))
}

/// The bytes a signature covers: `<header segment>.<payload segment>`.
pub fn signing_input(header_segment: &str, payload: &[u8]) -> String {
    format!("{header_segment}.{}", encode_segment(payload))
}

/// Sign `payload` under `header` and return the compact token.
pub fn sign_compact(header: &JwsHeader, payload: &[u8], key: &KeyMaterial) -> Result<String> {
    let header_segment = encode_segment(&to_canonical_bytes(header)?);
    let input = signing_input(&header_segment, payload);
    let signature = key.sign(input.as_bytes())?;
    Ok(format!("{input}.{}", encode_segment(&signature)))
}

/// Split and decode a compact token. The signature is not checked here.
pub fn parse_compact(token: &str) -> Result<ParsedJws> {
    let mut parts = token.split('.');
    let (Some(header_segment), Some(payload_segment), Some(signature_segment), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(WipeTrustError::MalformedEnvelope(
            "token must have exactly three segments".into(),
        ));
    };

    let header_bytes = decode_segment("header", header_segment)?;
    let header: JwsHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| WipeTrustError::MalformedEnvelope(format!("token header: {e}")))?;
    // Payload only needs to be valid base64url; its content is re-derived.
    decode_segment("payload", payload_segment)?;
    let signature = decode_segment("signature", signature_segment)?;

    Ok(ParsedJws {
        header,
        header_segment: header_segment.to_string(),
        payload_segment: payload_segment.to_string(),
        signature,
    })
}
