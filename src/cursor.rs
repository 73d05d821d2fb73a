//! Opaque pagination cursors.
//!
//! A cursor names a logical position `(order_key, id)` in a kind's ordered
//! records rather than an index, so resuming stays correct if records come
//! and go between requests. On the wire it is a small JSON object encoded
//! with standard base64:
//!
//! ```text
//! {"id": "10", "updated_at": 1700000010}  ->  eyJpZCI6IjEwIiwidXBkYXRlZF9hdCI6MTcwMDAwMDAxMH0=
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Decoded resume boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub order_key: i64,
    /// `None` resumes at the first record with `order_key`
    pub id: Option<String>,
}

/// Errors produced while decoding a cursor token
#[derive(Debug, thiserror::Error)]
pub enum CursorDecodeError {
    #[error("cursor is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("cursor payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("cursor is missing 'updated_at'")]
    MissingOrderKey,
}

#[derive(Serialize)]
struct WireCursor<'a> {
    id: Option<&'a str>,
    updated_at: i64,
}

#[derive(Deserialize)]
struct RawCursor {
    #[serde(default, alias = "org_id")]
    id: Option<String>,
    #[serde(default)]
    updated_at: Option<i64>,
}

/// Encode `(order_key, id)` into a cursor token
pub fn encode(order_key: i64, id: Option<&str>) -> String {
    let wire = WireCursor {
        id,
        updated_at: order_key,
    };
    let payload = serde_json::to_vec(&wire).unwrap_or_default();
    BASE64.encode(payload)
}

/// Decode a cursor token back into its boundary
pub fn decode(token: &str) -> Result<Cursor, CursorDecodeError> {
    let payload = BASE64.decode(token.trim())?;
    let raw: RawCursor = serde_json::from_slice(&payload)?;
    let order_key = raw.updated_at.ok_or(CursorDecodeError::MissingOrderKey)?;
    Ok(Cursor {
        order_key,
        id: raw.id,
    })
}
