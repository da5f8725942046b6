// Canonical JSON serializer.
//
// Output rules:
//   - objects: keys sorted by byte order, no whitespace
//   - arrays: element order preserved
//   - strings / numbers / literals: serde_json's compact encoding
//
// Signing and verification both go through here, so the signed bytes depend
// only on the JSON value and never on field declaration order or on the
// formatting of a file the envelope was read from.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, WipeTrustError};

/// Canonical bytes of any serializable value.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value =
        serde_json::to_value(value).map_err(|e| WipeTrustError::Serialization(format!("{e}")))?;
    canonicalize(&value)
}

/// Canonical bytes of an already-parsed JSON value.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(1024);
    write_value(value, &mut buf)?;
    Ok(buf)
}

fn write_value(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            buf.push(b'{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_scalar(&Value::String(key.clone()), buf)?;
                buf.push(b':');
                write_value(val, buf)?;
            }
            buf.push(b'}');
        }
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_value(item, buf)?;
            }
            buf.push(b']');
        }
        scalar => write_scalar(scalar, buf)?,
    }
    Ok(())
}

fn write_scalar(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    serde_json::to_writer(&mut *buf, value)
        .map_err(|e| WipeTrustError::Serialization(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_recursively() {
        let v = json!({"b": 1, "a": {"z": true, "m": null}, "c": [3, 1, 2]});
        let bytes = canonicalize(&v).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"m":null,"z":true},"b":1,"c":[3,1,2]}"#
        );
    }

    #[test]
    fn formatting_does_not_matter() {
        let compact: Value = serde_json::from_str(r#"{"x":1,"y":"two"}"#).unwrap();
        let pretty: Value = serde_json::from_str("{\n  \"y\" : \"two\",\n  \"x\" : 1\n}").unwrap();
        assert_eq!(canonicalize(&compact).unwrap(), canonicalize(&pretty).unwrap());
    }

    #[test]
    fn strings_escaped() {
        let v = json!({"k": "quote \" and \\ and \n"});
        let bytes = canonicalize(&v).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"k":"quote \" and \\ and \n"}"#
        );
    }

    #[test]
    fn typed_and_parsed_forms_agree() {
        #[derive(Serialize)]
        struct Doc {
            zeta: u32,
            alpha: f64,
            name: &'static str,
        }
        let doc = Doc {
            zeta: 7,
            alpha: 99.9,
            name: "CT500BX500SSD1",
        };
        let typed = to_canonical_bytes(&doc).unwrap();
        let pretty = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(typed, canonicalize(&parsed).unwrap());
    }
}
