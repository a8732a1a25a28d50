//! Mapping wal2json records into the shared ChangeEvent shape.
//!
//! Field-name and primary-key semantics must agree with the binary
//! decoder: `table` is `"{schema}.{table}"`, row data lands in
//! `data`/`old_data`/`new_data`, key column names in `primary_keys`.
//! wal2json records carry no relation oid, so `relation_id` is 0 on this
//! path.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use pg_relay_pgoutput::{format_pg_timestamp, hex_preview, ChangeEvent};

use crate::timestamp::parse_wal2json_timestamp;

/// Microseconds between the Unix epoch and 2000-01-01T00:00:00Z.
const PG_EPOCH_UNIX_MICROS: i64 = 946_684_800_000_000;

/// Normalizes a parsed wal2json value into change events.
///
/// Accepts either a single format-version-2 action record or a
/// `{"change": [...]}` batch. Structural problems with the outer value are
/// errors; problems with an individual record degrade to an
/// [`ChangeEvent::Error`] for that record only.
pub fn normalize(value: &Value) -> Result<Vec<ChangeEvent>> {
    let obj = value
        .as_object()
        .context("wal2json value must be an object")?;

    if let Some(changes) = obj.get("change") {
        let records = changes
            .as_array()
            .context("wal2json 'change' field must be an array")?;
        return Ok(records.iter().map(normalize_record).collect());
    }

    Ok(vec![normalize_record(value)])
}

/// Normalizes one action record. Never fails; malformed records become
/// [`ChangeEvent::Error`] and unrecognized actions [`ChangeEvent::Unknown`].
pub fn normalize_record(record: &Value) -> ChangeEvent {
    let Some(obj) = record.as_object() else {
        return error_event("wal2json change record is not an object", record);
    };

    let Some(action) = obj.get("action").and_then(Value::as_str) else {
        return error_event("wal2json change record missing 'action'", record);
    };

    match action {
        "B" => {
            let (timestamp, timestamp_formatted) = timestamps(obj);
            ChangeEvent::Begin {
                lsn: lsn_field(obj, "lsn"),
                timestamp,
                timestamp_formatted,
                xid: obj.get("xid").and_then(Value::as_u64).unwrap_or_default() as u32,
            }
        }
        "C" => {
            let (timestamp, timestamp_formatted) = timestamps(obj);
            ChangeEvent::Commit {
                flags: 0,
                lsn: lsn_field(obj, "lsn"),
                end_lsn: lsn_field(obj, "nextlsn"),
                timestamp,
                timestamp_formatted,
            }
        }
        "I" | "U" | "D" => data_event(action, obj, record),
        // wal2json has no relation oids, so a truncate only names the
        // table; the ids list stays empty on this path.
        "T" => ChangeEvent::Truncate {
            cascade: false,
            restart_identity: false,
            relation_ids: Vec::new(),
        },
        other => ChangeEvent::Unknown {
            raw_tag: other.bytes().next().unwrap_or(b'?'),
            preview: preview_of(record),
        },
    }
}

fn data_event(
    action: &str,
    obj: &serde_json::Map<String, Value>,
    record: &Value,
) -> ChangeEvent {
    let Some(table_name) = obj.get("table").and_then(Value::as_str) else {
        return error_event("wal2json data record missing 'table'", record);
    };
    let schema = obj
        .get("schema")
        .and_then(Value::as_str)
        .unwrap_or("public");
    let table = Some(format!("{schema}.{table_name}"));
    let primary_keys = pk_names(obj);

    match action {
        "I" => ChangeEvent::Insert {
            relation_id: 0,
            table,
            data: columns_map(obj.get("columns")),
            primary_keys,
        },
        "U" => {
            let old_data = obj.get("identity").map(|v| columns_map(Some(v)));
            ChangeEvent::Update {
                relation_id: 0,
                table,
                has_old_tuple: old_data.is_some(),
                old_data,
                new_data: columns_map(obj.get("columns")),
                primary_keys,
            }
        }
        _ => {
            // Deletes carry old values under "identity"; some wal2json
            // configurations use "columns" instead.
            let source = obj.get("identity").or_else(|| obj.get("columns"));
            ChangeEvent::Delete {
                relation_id: 0,
                table,
                data: columns_map(source),
                primary_keys,
            }
        }
    }
}

/// Builds a named map from a wal2json `columns`/`identity` array.
fn columns_map(columns: Option<&Value>) -> Value {
    let mut map = serde_json::Map::new();
    let Some(entries) = columns.and_then(Value::as_array) else {
        return Value::Object(map);
    };

    for entry in entries {
        let Some(name) = entry.get("name").and_then(Value::as_str) else {
            warn!("skipping wal2json column entry without a name: {entry}");
            continue;
        };
        let pg_type = entry.get("type").and_then(Value::as_str).unwrap_or("");
        let value = entry.get("value").cloned().unwrap_or(Value::Null);
        map.insert(name.to_string(), convert_value(value, pg_type));
    }
    Value::Object(map)
}

/// Light per-type conversion. Values are already JSON-typed; the only
/// rewrite is bytea, which arrives as a bare hex string and is rendered
/// `0x…` to match the binary path's hex fallback.
fn convert_value(value: Value, pg_type: &str) -> Value {
    if pg_type == "bytea" {
        if let Value::String(hex_str) = &value {
            return Value::String(format!("0x{}", hex_str.to_lowercase()));
        }
    }
    value
}

fn pk_names(obj: &serde_json::Map<String, Value>) -> Vec<String> {
    obj.get("pk")
        .and_then(Value::as_array)
        .map(|pks| {
            pks.iter()
                .filter_map(|pk| pk.get("name").and_then(Value::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// `(raw_micros_since_pg_epoch, formatted)` from a record's timestamp.
/// An unparseable string is kept verbatim as the formatted form.
fn timestamps(obj: &serde_json::Map<String, Value>) -> (i64, String) {
    match obj.get("timestamp").and_then(Value::as_str) {
        Some(raw) => match parse_wal2json_timestamp(raw) {
            Some(dt) => {
                let micros = dt.timestamp_micros() - PG_EPOCH_UNIX_MICROS;
                (micros, format_pg_timestamp(micros))
            }
            None => (0, raw.to_string()),
        },
        None => (0, format_pg_timestamp(0)),
    }
}

/// Parses an LSN string such as "0/16B3748" into its 64-bit form.
fn lsn_field(obj: &serde_json::Map<String, Value>, field: &str) -> u64 {
    let Some(lsn) = obj.get(field).and_then(Value::as_str) else {
        return 0;
    };
    let Some((hi, lo)) = lsn.split_once('/') else {
        return 0;
    };
    match (u64::from_str_radix(hi, 16), u64::from_str_radix(lo, 16)) {
        (Ok(hi), Ok(lo)) => (hi << 32) | lo,
        _ => 0,
    }
}

fn error_event(message: &str, record: &Value) -> ChangeEvent {
    ChangeEvent::Error {
        message: message.to_string(),
        preview: preview_of(record),
    }
}

fn preview_of(record: &Value) -> String {
    hex_preview(record.to_string().as_bytes())
}
