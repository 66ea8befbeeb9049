//! Continuation cursors
//!
//! A cursor is a value token, never server-side state. Layout before
//! encoding:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ PAYLOAD (bincode)                       │
//! │   version: u8                           │
//! │   fingerprint: u32   (predicate CRC-32) │
//! │   order: String      (canonical order)  │
//! │   last_key: Vec<Value>                  │
//! │   last_id: Value                        │
//! ├─────────────────────────────────────────┤
//! │ checksum: u32 LE (CRC-32 of payload)    │
//! └─────────────────────────────────────────┘
//! ```
//! The whole buffer is then encoded as URL-safe base64 without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::collection::error::{PagingError, PagingResult};
use crate::model::{Record, Value};
use crate::query::{OrderSpec, Predicate};

/// Current cursor format version
const CURSOR_VERSION: u8 = 1;

/// Checksum size in bytes
const CHECKSUM_SIZE: usize = 4;

/// Decoded cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    version: u8,
    fingerprint: u32,
    order: String,
    last_key: Vec<Value>,
    last_id: Value,
}

impl Cursor {
    /// Cursor positioned after `record`
    pub fn after(predicate: &Predicate, order: &OrderSpec, id_field: &str, record: &Record) -> Self {
        Self {
            version: CURSOR_VERSION,
            fingerprint: predicate.fingerprint(),
            order: order.canonical(),
            last_key: order.key_of(record),
            last_id: record.value(id_field).clone(),
        }
    }

    /// Encode into an opaque token
    pub fn encode(&self) -> PagingResult<String> {
        let mut bytes =
            bincode::serialize(self).map_err(|e| PagingError::Encode(e.to_string()))?;
        let checksum = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decode and checksum-verify a token
    pub fn decode(token: &str) -> PagingResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| PagingError::Corrupt("not a valid cursor token".to_string()))?;

        if bytes.len() <= CHECKSUM_SIZE {
            return Err(PagingError::Corrupt("cursor token too short".to_string()));
        }

        let (payload, checksum) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
        let expected = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);
        if crc32fast::hash(payload) != expected {
            return Err(PagingError::Corrupt("checksum mismatch".to_string()));
        }

        let cursor: Cursor = bincode::deserialize(payload)?;
        if cursor.version != CURSOR_VERSION {
            return Err(PagingError::Corrupt(format!(
                "unsupported cursor version {}",
                cursor.version
            )));
        }

        Ok(cursor)
    }

    /// Check that the cursor belongs to this filter and order
    pub fn verify(&self, predicate: &Predicate, order: &OrderSpec) -> PagingResult<()> {
        if self.fingerprint != predicate.fingerprint() {
            return Err(PagingError::Mismatch("filter"));
        }
        if self.order != order.canonical() || self.last_key.len() != order.keys().len() {
            return Err(PagingError::Mismatch("order"));
        }
        Ok(())
    }

    /// Sort-key tuple of the last record returned
    pub fn last_key(&self) -> &[Value] {
        &self.last_key
    }

    /// Identifier of the last record returned
    pub fn last_id(&self) -> &Value {
        &self.last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldSchema};
    use crate::query::compile_at;

    fn schema() -> FieldSchema {
        FieldSchema::builder("devices", "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::string("name").sortable())
            .field(FieldDef::number("signal_percent").sortable())
            .build()
    }

    fn cursor() -> (Cursor, Predicate, OrderSpec) {
        let schema = schema();
        let predicate = compile_at(&schema, "signal_percent>50", 0).unwrap();
        let order = OrderSpec::compile(&schema, Some("name desc")).unwrap();
        let record = Record::new().with("id", "d7").with("name", "Gate \"7\", east").with("signal_percent", 72.5);
        (Cursor::after(&predicate, &order, "id", &record), predicate, order)
    }

    #[test]
    fn test_encode_decode() {
        let (cursor, predicate, order) = cursor();
        let token = cursor.encode().unwrap();

        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded = Cursor::decode(&token).unwrap();
        assert_eq!(decoded, cursor);
        assert_eq!(decoded.last_id(), &Value::from("d7"));
        decoded.verify(&predicate, &order).unwrap();
    }

    #[test]
    fn test_tampered_token_rejected() {
        let (cursor, _, _) = cursor();
        let token = cursor.encode().unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        bytes[3] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert!(matches!(Cursor::decode(&tampered), Err(PagingError::Corrupt(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        for token in ["", "not a cursor!", "abc", "AAAAAAAAAAAAAAAA"] {
            assert!(matches!(Cursor::decode(token), Err(PagingError::Corrupt(_))), "{token}");
        }
    }

    #[test]
    fn test_mismatched_filter_or_order() {
        let schema = schema();
        let (cursor, predicate, order) = cursor();

        let other_filter = compile_at(&schema, "signal_percent>60", 0).unwrap();
        let err = cursor.verify(&other_filter, &order).unwrap_err();
        assert!(err.to_string().contains("cursor mismatch"));

        let other_order = OrderSpec::compile(&schema, Some("name asc")).unwrap();
        let err = cursor.verify(&predicate, &other_order).unwrap_err();
        assert_eq!(err, PagingError::Mismatch("order"));
    }
}
