//! Document encoding for structured columns.
//!
//! A [`DocumentEncoder`] turns a plain document into the text stored in the
//! column. Values whose types JSON cannot represent (dates, times, UUIDs) have
//! already been rendered by the schema's own serde implementation by the time
//! they reach the encoder, so they round-trip to equal values on decode.

use std::fmt;
use std::fmt::Write as _;

use fields_of_gold_core::{FogError, FogResult};

use crate::value::Value;

/// Deepest container nesting the encoder accepts.
///
/// Matches `serde_json`'s parser recursion limit, so anything written can be
/// read back.
pub const MAX_NESTING: usize = 127;

/// Encodes plain documents into stored text.
pub trait DocumentEncoder: Send + Sync + fmt::Debug {
    /// Identifies the encoder in deconstructed field configuration.
    fn name(&self) -> &'static str;

    /// Encodes `doc`.
    fn encode(&self, doc: &serde_json::Value) -> FogResult<String>;
}

/// The default encoder: compact JSON with object keys sorted at every level.
///
/// Equal documents always produce identical text.
///
/// # Examples
///
/// ```
/// use fields_of_gold_db::typed::{CanonicalJsonEncoder, DocumentEncoder};
///
/// let text = CanonicalJsonEncoder
///     .encode(&serde_json::json!({"b": [1, {"d": null, "c": true}], "a": "x"}))
///     .unwrap();
/// assert_eq!(text, r#"{"a":"x","b":[1,{"c":true,"d":null}]}"#);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalJsonEncoder;

impl CanonicalJsonEncoder {
    /// The name recorded for this encoder.
    pub const NAME: &'static str = "canonical";
}

impl DocumentEncoder for CanonicalJsonEncoder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode(&self, doc: &serde_json::Value) -> FogResult<String> {
        let mut out = String::new();
        write_value(&mut out, doc, 0)?;
        Ok(out)
    }
}

fn write_value(out: &mut String, value: &serde_json::Value, depth: usize) -> FogResult<()> {
    use serde_json::Value as J;

    match value {
        J::Null => out.push_str("null"),
        J::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        J::Number(n) => {
            let _ = write!(out, "{n}");
        }
        J::String(s) => write_string(out, s)?,
        J::Array(items) => {
            enter(depth)?;
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        J::Object(map) => {
            enter(depth)?;
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key)?;
                out.push(':');
                write_value(out, &map[key.as_str()], depth + 1)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn enter(depth: usize) -> FogResult<()> {
    if depth >= MAX_NESTING {
        return Err(FogError::SerializationError(format!(
            "document nests deeper than {MAX_NESTING} levels"
        )));
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> FogResult<()> {
    let quoted = serde_json::to_string(s).map_err(|e| FogError::SerializationError(e.to_string()))?;
    out.push_str(&quoted);
    Ok(())
}

/// Decodes a stored column value into a plain document.
///
/// Text and byte columns are parsed; drivers with a native JSON type hand the
/// document over directly.
///
/// # Errors
///
/// Returns `DataIntegrityError` for malformed text or a value that is not a
/// document at all.
pub fn decode_document(value: &Value) -> FogResult<serde_json::Value> {
    match value {
        Value::Json(doc) => Ok(doc.clone()),
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| FogError::DataIntegrityError(format!("stored document is not valid JSON: {e}"))),
        Value::Bytes(bytes) => serde_json::from_slice(bytes)
            .map_err(|e| FogError::DataIntegrityError(format!("stored document is not valid JSON: {e}"))),
        other => Err(FogError::DataIntegrityError(format!(
            "expected a stored JSON document, got {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(levels: usize) -> serde_json::Value {
        (0..levels).fold(serde_json::json!(1), |inner, _| serde_json::json!([inner]))
    }

    #[test]
    fn test_sorted_compact_output() {
        let doc = serde_json::json!({"z": 1.5, "a": {"y": "é\"\n", "b": []}});
        let text = CanonicalJsonEncoder.encode(&doc).unwrap();
        assert_eq!(text, r#"{"a":{"b":[],"y":"é\"\n"},"z":1.5}"#);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), doc);
    }

    #[test]
    fn test_scalars() {
        let enc = CanonicalJsonEncoder;
        assert_eq!(enc.encode(&serde_json::json!(null)).unwrap(), "null");
        assert_eq!(enc.encode(&serde_json::json!(false)).unwrap(), "false");
        assert_eq!(enc.encode(&serde_json::json!(-7)).unwrap(), "-7");
        assert_eq!(enc.encode(&serde_json::json!("s")).unwrap(), "\"s\"");
        assert_eq!(enc.name(), "canonical");
    }

    #[test]
    fn test_depth_limit_matches_decoder() {
        let ok = CanonicalJsonEncoder.encode(&nested(MAX_NESTING)).unwrap();
        assert!(decode_document(&Value::String(ok)).is_ok());

        let err = CanonicalJsonEncoder.encode(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(matches!(err, FogError::SerializationError(_)));
    }

    #[test]
    fn test_decode_sources() {
        let doc = serde_json::json!({"a": 1});
        assert_eq!(decode_document(&Value::String(r#"{"a":1}"#.into())).unwrap(), doc);
        assert_eq!(decode_document(&Value::Bytes(br#"{"a":1}"#.to_vec())).unwrap(), doc);
        assert_eq!(decode_document(&Value::Json(doc.clone())).unwrap(), doc);
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode_document(&Value::String("{not json".into())),
            Err(FogError::DataIntegrityError(_))
        ));
        assert!(matches!(
            decode_document(&Value::Int(3)),
            Err(FogError::DataIntegrityError(_))
        ));
    }
}
