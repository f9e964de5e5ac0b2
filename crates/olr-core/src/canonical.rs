//! Canonical JSON encoding for deterministic signing input.
//!
//! Signatures are computed over a compact JSON document with:
//! - Object keys sorted lexicographically at every nesting level
//! - No whitespace between tokens
//! - Non-ASCII characters escaped as `\uXXXX` (UTF-16 units)
//! - The top-level `sig` field removed before encoding
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break verification of
//! every previously issued receipt.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// The reserved top-level field holding the detached signature.
pub const SIG_FIELD: &str = "sig";

/// Encode a record's fields to canonical signing bytes.
///
/// The top-level `sig` field (if present) is excluded, so a sealed record
/// canonicalizes to the same bytes as its unsigned form.
pub fn canonical_bytes(fields: &Map<String, Value>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_object(&mut buf, fields, Some(SIG_FIELD))?;
    Ok(buf)
}

/// Encode an arbitrary JSON value with the same canonical rules.
///
/// No field is excluded at any level; `sig` is only special at the top
/// level of a record.
pub fn canonical_value_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_value(&mut buf, value)?;
    Ok(buf)
}

fn write_object(buf: &mut Vec<u8>, map: &Map<String, Value>, exclude: Option<&str>) -> Result<()> {
    // Sort explicitly: serde_json's Map iteration order is only sorted when
    // the `preserve_order` feature is off, and features are additive across
    // a dependency graph.
    let mut keys: Vec<&String> = map
        .keys()
        .filter(|k| exclude != Some(k.as_str()))
        .collect();
    keys.sort();

    buf.push(b'{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        write_scalar(buf, &Value::String((*key).clone()))?;
        buf.push(b':');
        write_value(buf, &map[key.as_str()])?;
    }
    buf.push(b'}');
    Ok(())
}

fn write_value(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Object(map) => write_object(buf, map, None),
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_value(buf, item)?;
            }
            buf.push(b']');
            Ok(())
        }
        scalar => write_scalar(buf, scalar),
    }
}

// Scalars (null, bool, number, string) delegate to serde_json so control
// escaping and number formatting match the standard encoder; non-ASCII
// characters are then escaped to keep the output pure ASCII.
fn write_scalar(buf: &mut Vec<u8>, scalar: &Value) -> Result<()> {
    let text = serde_json::to_string(scalar).map_err(CoreError::Canonicalization)?;
    buf.extend_from_slice(escape_non_ascii(&text).as_bytes());
    Ok(())
}

/// Escape every non-ASCII character in serialized JSON as `\uXXXX`
/// (surrogate pairs for characters beyond the basic multilingual plane).
///
/// JSON syntax outside string literals is pure ASCII, so this is safe to
/// apply to a whole serialized document.
pub fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}
