//! Cached payload envelope.
//!
//! Values are stored as JSON text wrapped with a schema version and the time
//! they were written: `{"v":1,"cached_at":"…","data":…}`. A payload written
//! under another schema version reads as a miss, so a deployment that changes
//! a DTO never deserializes a stale shape.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bump whenever a cached DTO changes shape.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T: ?Sized> {
    v: u32,
    cached_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    v: u32,
    #[allow(dead_code)]
    cached_at: DateTime<Utc>,
    data: T,
}

/// Why a stored payload could not be used.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("schema version {found} does not match {expected}")]
    SchemaMismatch { found: u32, expected: u32 },
}

/// Serializes `value` inside a versioned envelope.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, PayloadError> {
    let envelope = EnvelopeRef {
        v: CACHE_SCHEMA_VERSION,
        cached_at: Utc::now(),
        data: value,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parses a versioned envelope back into `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, PayloadError> {
    let envelope: Envelope<T> = serde_json::from_str(text)?;
    if envelope.v != CACHE_SCHEMA_VERSION {
        return Err(PayloadError::SchemaMismatch {
            found: envelope.v,
            expected: CACHE_SCHEMA_VERSION,
        });
    }
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_encode_wraps_value() {
        let text = encode(&vec!["a", "b"]).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["v"], CACHE_SCHEMA_VERSION);
        assert_eq!(json["data"], serde_json::json!(["a", "b"]));
        assert!(json["cached_at"].is_string());
    }

    #[test]
    fn test_decode_rejects_other_schema() {
        let text = r#"{"v":999,"cached_at":"2026-01-01T00:00:00Z","data":[1,2]}"#;
        let result = decode::<Vec<u32>>(text);
        assert!(matches!(
            result,
            Err(PayloadError::SchemaMismatch { found: 999, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bare_json() {
        assert!(matches!(
            decode::<Vec<u32>>("[1,2]"),
            Err(PayloadError::Malformed(_))
        ));
        assert!(decode::<Vec<u32>>("not json").is_err());
    }

    #[test]
    fn test_decode_reads_encoded() {
        let text = encode("hello").unwrap();
        assert_eq!(decode::<String>(&text).unwrap(), "hello");
    }
}
