//! The structured change events handed to consumers.
//!
//! Downstream integrations re-serialize these to JSON and depend on the
//! field names staying put: `type`, `table`, `relation_id`,
//! `data`/`old_data`/`new_data`, `primary_keys`, `namespace`, `name`,
//! `columns`, `lsn`, `xid`, `timestamp`, `timestamp_formatted`.

use serde::Serialize;

use crate::message::{ColumnDef, ReplicaIdentity};

/// Number of leading bytes included in hex previews on Unknown/Error
/// events.
pub const PREVIEW_BYTES: usize = 50;

/// Hex rendering of the first [`PREVIEW_BYTES`] bytes of a buffer, for
/// operator visibility on messages that could not be fully understood.
pub fn hex_preview(buf: &[u8]) -> String {
    hex::encode(&buf[..buf.len().min(PREVIEW_BYTES)])
}

/// One structured change event per input buffer.
///
/// Events are transient values: built per buffer, delivered synchronously,
/// never retained by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    Begin {
        lsn: u64,
        timestamp: i64,
        timestamp_formatted: String,
        xid: u32,
    },
    Commit {
        flags: u8,
        lsn: u64,
        end_lsn: u64,
        timestamp: i64,
        timestamp_formatted: String,
    },
    Insert {
        relation_id: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<String>,
        data: serde_json::Value,
        primary_keys: Vec<String>,
    },
    Update {
        relation_id: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<String>,
        has_old_tuple: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        old_data: Option<serde_json::Value>,
        new_data: serde_json::Value,
        primary_keys: Vec<String>,
    },
    Delete {
        relation_id: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<String>,
        data: serde_json::Value,
        primary_keys: Vec<String>,
    },
    Relation {
        relation_id: u32,
        namespace: String,
        name: String,
        replica_identity: ReplicaIdentity,
        columns: Vec<ColumnDef>,
    },
    Truncate {
        cascade: bool,
        restart_identity: bool,
        relation_ids: Vec<u32>,
    },
    TypeDef {
        type_id: u32,
        namespace: String,
        name: String,
    },
    Origin {
        lsn: u64,
        name: String,
    },
    /// Unrecognized message tag; carries the tag and a bounded preview.
    Unknown { raw_tag: u8, preview: String },
    /// Structural problem with the input; carries a short diagnostic and a
    /// bounded preview. Decoding continues with the next buffer.
    Error { message: String, preview: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_preview_is_bounded() {
        let buf = vec![0xAB; 200];
        let preview = hex_preview(&buf);
        assert_eq!(preview.len(), PREVIEW_BYTES * 2);
        assert!(preview.starts_with("abab"));
        assert_eq!(hex_preview(&[]), "");
        assert_eq!(hex_preview(&[0x01, 0xFF]), "01ff");
    }

    #[test]
    fn test_event_json_shape() {
        let event = ChangeEvent::Insert {
            relation_id: 42,
            table: Some("public.users".into()),
            data: serde_json::json!({"id": 1}),
            primary_keys: vec!["id".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "insert");
        assert_eq!(json["table"], "public.users");
        assert_eq!(json["relation_id"], 42);
        assert_eq!(json["data"]["id"], 1);
        assert_eq!(json["primary_keys"][0], "id");
    }

    #[test]
    fn test_absent_table_is_omitted_from_json() {
        let event = ChangeEvent::Delete {
            relation_id: 7,
            table: None,
            data: serde_json::json!([]),
            primary_keys: vec![],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "delete");
        assert!(json.get("table").is_none());
    }

    #[test]
    fn test_begin_json_carries_both_timestamp_forms() {
        let event = ChangeEvent::Begin {
            lsn: 1,
            timestamp: 0,
            timestamp_formatted: "2000-01-01T00:00:00+00:00".into(),
            xid: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["timestamp"], 0);
        assert_eq!(json["timestamp_formatted"], "2000-01-01T00:00:00+00:00");
        assert_eq!(json["xid"], 5);
    }
}
