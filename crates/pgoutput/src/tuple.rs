//! Tuple (row value list) decoding.
//!
//! A tuple is a 2-byte column count followed by one tagged value per
//! column. Values are positional; correlating them to column names is the
//! registry's job, not the codec's.

use tracing::{debug, warn};

use crate::coerce::coerce;
use crate::cursor::Cursor;
use crate::error::DecodeError;

/// Column tag for the legacy binary representation.
const BINARY_TAG: u8 = 0;

/// Length value marking a NULL under the binary tag.
const NULL_LENGTH_SENTINEL: u32 = u32::MAX;

/// Marker string substituted for values the source did not resend because
/// they are unchanged, out-of-line TOAST storage.
pub const UNCHANGED_TOAST_MARKER: &str = "__unchanged_toast__";

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleValue {
    /// Explicit NULL.
    Null,
    /// Unchanged TOAST value, omitted by the source's replica identity.
    UnchangedToast,
    /// Textual representation of the value.
    Text(Vec<u8>),
    /// Untyped binary payload, interpreted on demand via [`coerce`].
    Binary(Vec<u8>),
    /// Unrecognized column tag; payload skipped if one was present.
    UnknownTag { code: u8 },
}

impl TupleValue {
    /// Renders the value into its JSON form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TupleValue::Null => serde_json::Value::Null,
            TupleValue::UnchangedToast => UNCHANGED_TOAST_MARKER.into(),
            TupleValue::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
            TupleValue::Binary(bytes) => coerce(bytes).to_json(),
            TupleValue::UnknownTag { code } => format!("__unknown_tag_{code}__").into(),
        }
    }
}

/// Decodes a tuple from the cursor.
///
/// Truncation never errors: if the remaining buffer is too short for the
/// next read, decoding stops and the columns decoded so far are returned.
pub fn decode_tuple(cur: &mut Cursor<'_>) -> Vec<TupleValue> {
    let Some(count) = cur.read_u16() else {
        return Vec::new();
    };

    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let Some(tag) = cur.read_u8() else { break };
        match tag {
            b'n' => values.push(TupleValue::Null),
            b'u' => values.push(TupleValue::UnchangedToast),
            b't' => {
                let Some(len) = cur.read_u32() else { break };
                let Some(bytes) = cur.read_bytes(len as usize) else {
                    warn!("{}", DecodeError::TruncatedBuffer { offset: cur.position() });
                    break;
                };
                values.push(TupleValue::Text(bytes.to_vec()));
            }
            BINARY_TAG => {
                let Some(len) = cur.read_u32() else { break };
                if len == NULL_LENGTH_SENTINEL {
                    values.push(TupleValue::Null);
                    continue;
                }
                let Some(bytes) = cur.read_bytes(len as usize) else {
                    warn!("{}", DecodeError::TruncatedBuffer { offset: cur.position() });
                    break;
                };
                values.push(TupleValue::Binary(bytes.to_vec()));
            }
            code => {
                debug!("{}", DecodeError::UnknownColumnTag { code });
                // Assume a length-prefixed payload follows and skip as much
                // of it as the buffer still holds, to keep the stream
                // aligned for the columns after it.
                if let Some(len) = cur.read_u32() {
                    let skip = (len as usize).min(cur.remaining());
                    let _ = cur.read_bytes(skip);
                }
                values.push(TupleValue::UnknownTag { code });
            }
        }
    }

    values
}
