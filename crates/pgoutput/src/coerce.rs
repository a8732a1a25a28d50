//! Best-effort interpretation of untyped binary payloads.
//!
//! The legacy binary column tag carries a value with no type information at
//! all, and no external type catalog is consulted. The interpretations below
//! are tried in a fixed order and the first applicable one wins; in
//! particular an integer reading of a span always beats the float reading of
//! the same width, so a 4-byte payload whose bits happen to form a valid
//! float still coerces to int32. This is a documented heuristic, not a
//! fidelity guarantee.

use serde_json::json;
use tracing::debug;

use crate::error::DecodeError;
use crate::time::pg_timestamp_to_datetime;

/// A coerced scalar value.
///
/// Closed so consumers handle every interpretation exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Timestamp(String),
    Boolean(bool),
    /// No interpretation applied; the payload rendered as `0x…`.
    Hex(String),
}

impl Scalar {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Integer(v) => json!(v),
            Scalar::BigInt(v) => json!(v),
            Scalar::Real(v) => json!(v),
            Scalar::Double(v) => json!(v),
            Scalar::Timestamp(v) => json!(v),
            Scalar::Boolean(v) => json!(v),
            Scalar::Hex(v) => json!(v),
        }
    }
}

/// Coerces an untyped binary payload into a [`Scalar`].
///
/// Interpretation order: int32, int64, float32 (non-NaN), float64
/// (non-NaN), positive PostgreSQL-epoch microsecond timestamp, boolean
/// (single byte 0 or 1), then the hex fallback.
pub fn coerce(bytes: &[u8]) -> Scalar {
    as_int32(bytes)
        .or_else(|| as_int64(bytes))
        .or_else(|| as_real(bytes))
        .or_else(|| as_double(bytes))
        .or_else(|| as_timestamp(bytes))
        .or_else(|| as_boolean(bytes))
        .unwrap_or_else(|| {
            debug!("{}", DecodeError::AmbiguousCoercion { len: bytes.len() });
            Scalar::Hex(format!("0x{}", hex::encode(bytes)))
        })
}

fn as_int32(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 4] = bytes.try_into().ok()?;
    Some(Scalar::Integer(i32::from_be_bytes(arr)))
}

fn as_int64(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(Scalar::BigInt(i64::from_be_bytes(arr)))
}

fn as_real(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 4] = bytes.try_into().ok()?;
    let v = f32::from_be_bytes(arr);
    if v.is_nan() {
        return None;
    }
    Some(Scalar::Real(v))
}

fn as_double(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    let v = f64::from_be_bytes(arr);
    if v.is_nan() {
        return None;
    }
    Some(Scalar::Double(v))
}

fn as_timestamp(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    let micros = i64::from_be_bytes(arr);
    if micros <= 0 {
        return None;
    }
    let dt = pg_timestamp_to_datetime(micros)?;
    Some(Scalar::Timestamp(dt.to_rfc3339()))
}

fn as_boolean(bytes: &[u8]) -> Option<Scalar> {
    match bytes {
        [0] => Some(Scalar::Boolean(false)),
        [1] => Some(Scalar::Boolean(true)),
        _ => None,
    }
}
