//! Message dispatcher and per-kind body decoders.
//!
//! The first byte of every buffer is a one-character kind tag; the rest is
//! the kind-specific body. Decoders degrade on truncation: fields that
//! could not be read come back as zero/empty, and whatever decoded before
//! the cut is kept. Real traffic occasionally truncates, and a single bad
//! message must never take the stream down.

use tracing::debug;

use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::message::{
    BeginBody, ColumnDef, CommitBody, DeleteBody, InsertBody, Message, OriginBody, RelationDef,
    ReplicaIdentity, TruncateBody, TypeDef, UpdateBody,
};
use crate::tuple::decode_tuple;

/// Marker byte on Update messages announcing that an old-row tuple
/// precedes the new-row tuple.
const OLD_TUPLE_MARKER: u8 = b'O';

/// Decodes one wire message.
///
/// The only error is an empty buffer; every other input produces a
/// [`Message`], falling back to [`Message::Unknown`] for unrecognized tags.
pub fn decode_message(buf: &[u8]) -> Result<Message, DecodeError> {
    let mut cur = Cursor::new(buf);
    let Some(tag) = cur.read_u8() else {
        return Err(DecodeError::EmptyInput);
    };

    Ok(match tag {
        b'B' => Message::Begin(decode_begin(&mut cur)),
        b'C' => Message::Commit(decode_commit(&mut cur)),
        b'I' => Message::Insert(decode_insert(&mut cur)),
        b'U' => Message::Update(decode_update(&mut cur)),
        b'D' => Message::Delete(decode_delete(&mut cur)),
        b'R' => Message::Relation(decode_relation(&mut cur)),
        b'T' => Message::Truncate(decode_truncate(&mut cur)),
        b'Y' => Message::Type(decode_type(&mut cur)),
        b'O' => Message::Origin(decode_origin(&mut cur)),
        raw_tag => {
            debug!("{}", DecodeError::UnknownMessageTag { tag: raw_tag });
            Message::Unknown { raw_tag }
        }
    })
}

fn decode_begin(cur: &mut Cursor<'_>) -> BeginBody {
    BeginBody {
        lsn: cur.read_u64().unwrap_or_default(),
        timestamp: cur.read_i64().unwrap_or_default(),
        xid: cur.read_u32().unwrap_or_default(),
    }
}

fn decode_commit(cur: &mut Cursor<'_>) -> CommitBody {
    CommitBody {
        flags: cur.read_u8().unwrap_or_default(),
        lsn: cur.read_u64().unwrap_or_default(),
        end_lsn: cur.read_u64().unwrap_or_default(),
        timestamp: cur.read_i64().unwrap_or_default(),
    }
}

fn decode_insert(cur: &mut Cursor<'_>) -> InsertBody {
    InsertBody {
        relation_id: cur.read_u32().unwrap_or_default(),
        tuple: decode_tuple(cur),
    }
}

fn decode_update(cur: &mut Cursor<'_>) -> UpdateBody {
    let relation_id = cur.read_u32().unwrap_or_default();
    let (old_tuple, new_tuple) = match cur.read_u8() {
        Some(OLD_TUPLE_MARKER) => {
            let old = decode_tuple(cur);
            (Some(old), decode_tuple(cur))
        }
        Some(_) => (None, decode_tuple(cur)),
        None => (None, Vec::new()),
    };
    UpdateBody {
        relation_id,
        old_tuple,
        new_tuple,
    }
}

fn decode_delete(cur: &mut Cursor<'_>) -> DeleteBody {
    DeleteBody {
        relation_id: cur.read_u32().unwrap_or_default(),
        tuple: decode_tuple(cur),
    }
}

fn decode_relation(cur: &mut Cursor<'_>) -> RelationDef {
    let relation_id = cur.read_u32().unwrap_or_default();
    let namespace = cur.read_cstring().unwrap_or_default();
    let name = cur.read_cstring().unwrap_or_default();
    let replica_identity = ReplicaIdentity::from(cur.read_u8().unwrap_or_default());
    let column_count = cur.read_u16().unwrap_or_default();

    let mut columns = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        let Some(flags) = cur.read_u8() else { break };
        let Some(name) = cur.read_cstring() else { break };
        let Some(type_id) = cur.read_u32() else { break };
        let Some(type_modifier) = cur.read_i32() else { break };
        columns.push(ColumnDef {
            name,
            flags,
            type_id,
            type_modifier,
        });
    }

    RelationDef {
        relation_id,
        namespace,
        name,
        replica_identity,
        columns,
    }
}

fn decode_truncate(cur: &mut Cursor<'_>) -> TruncateBody {
    let flags = cur.read_u32().unwrap_or_default();
    let count = cur.read_u16().unwrap_or_default();

    let mut relation_ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let Some(id) = cur.read_u32() else { break };
        relation_ids.push(id);
    }

    TruncateBody {
        cascade: flags & 1 != 0,
        restart_identity: flags & 2 != 0,
        relation_ids,
    }
}

fn decode_type(cur: &mut Cursor<'_>) -> TypeDef {
    TypeDef {
        type_id: cur.read_u32().unwrap_or_default(),
        namespace: cur.read_cstring().unwrap_or_default(),
        name: cur.read_cstring().unwrap_or_default(),
    }
}

fn decode_origin(cur: &mut Cursor<'_>) -> OriginBody {
    let lsn = cur.read_u64().unwrap_or_default();
    let rest = cur.rest();
    let name_bytes = rest.strip_suffix(&[0]).unwrap_or(rest);
    OriginBody {
        lsn,
        name: String::from_utf8_lossy(name_bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::TupleValue;

    fn begin_buf(lsn: u64, timestamp: i64, xid: u32) -> Vec<u8> {
        let mut buf = vec![b'B'];
        buf.extend_from_slice(&lsn.to_be_bytes());
        buf.extend_from_slice(&timestamp.to_be_bytes());
        buf.extend_from_slice(&xid.to_be_bytes());
        buf
    }

    #[test]
    fn test_decode_begin_roundtrip() {
        let msg = decode_message(&begin_buf(0x0000000100000000, 700_000_000_000_000, 1234)).unwrap();
        assert_eq!(
            msg,
            Message::Begin(BeginBody {
                lsn: 0x0000000100000000,
                timestamp: 700_000_000_000_000,
                xid: 1234,
            })
        );
    }

    #[test]
    fn test_truncated_begin_degrades_to_defaults() {
        // Only the LSN survived the wire.
        let full = begin_buf(42, 0, 0);
        let msg = decode_message(&full[..9]).unwrap();
        assert_eq!(
            msg,
            Message::Begin(BeginBody {
                lsn: 42,
                timestamp: 0,
                xid: 0,
            })
        );
    }

    #[test]
    fn test_empty_buffer_is_the_only_error() {
        assert!(matches!(
            decode_message(&[]),
            Err(DecodeError::EmptyInput)
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let msg = decode_message(&[b'Z', 1, 2, 3]).unwrap();
        assert_eq!(msg, Message::Unknown { raw_tag: b'Z' });
    }

    #[test]
    fn test_decode_commit() {
        let mut buf = vec![b'C', 0x01];
        buf.extend_from_slice(&100u64.to_be_bytes());
        buf.extend_from_slice(&200u64.to_be_bytes());
        buf.extend_from_slice(&300i64.to_be_bytes());
        let msg = decode_message(&buf).unwrap();
        assert_eq!(
            msg,
            Message::Commit(CommitBody {
                flags: 1,
                lsn: 100,
                end_lsn: 200,
                timestamp: 300,
            })
        );
    }

    #[test]
    fn test_decode_relation() {
        let mut buf = vec![b'R'];
        buf.extend_from_slice(&42u32.to_be_bytes());
        buf.extend_from_slice(b"public\0users\0");
        buf.push(b'd');
        buf.extend_from_slice(&2u16.to_be_bytes());
        // id column, key flag set
        buf.push(1);
        buf.extend_from_slice(b"id\0");
        buf.extend_from_slice(&23u32.to_be_bytes());
        buf.extend_from_slice(&(-1i32).to_be_bytes());
        // name column
        buf.push(0);
        buf.extend_from_slice(b"name\0");
        buf.extend_from_slice(&25u32.to_be_bytes());
        buf.extend_from_slice(&(-1i32).to_be_bytes());

        let Message::Relation(rel) = decode_message(&buf).unwrap() else {
            panic!("expected Relation");
        };
        assert_eq!(rel.relation_id, 42);
        assert_eq!(rel.full_name(), "public.users");
        assert_eq!(rel.replica_identity, ReplicaIdentity::Default);
        assert_eq!(rel.columns.len(), 2);
        assert!(rel.columns[0].is_key());
        assert_eq!(rel.columns[1].name, "name");
        assert_eq!(rel.columns[1].type_id, 25);
    }

    #[test]
    fn test_relation_with_truncated_column_list() {
        let mut buf = vec![b'R'];
        buf.extend_from_slice(&7u32.to_be_bytes());
        buf.extend_from_slice(b"public\0t\0");
        buf.push(b'f');
        buf.extend_from_slice(&3u16.to_be_bytes());
        // one full column, then the buffer ends
        buf.push(1);
        buf.extend_from_slice(b"id\0");
        buf.extend_from_slice(&23u32.to_be_bytes());
        buf.extend_from_slice(&(-1i32).to_be_bytes());

        let Message::Relation(rel) = decode_message(&buf).unwrap() else {
            panic!("expected Relation");
        };
        assert_eq!(rel.columns.len(), 1);
        assert_eq!(rel.columns[0].name, "id");
    }

    #[test]
    fn test_decode_insert_with_tuple() {
        let mut buf = vec![b'I'];
        buf.extend_from_slice(&42u32.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.push(b't');
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(b"abc");

        let Message::Insert(body) = decode_message(&buf).unwrap() else {
            panic!("expected Insert");
        };
        assert_eq!(body.relation_id, 42);
        assert_eq!(body.tuple, vec![TupleValue::Text(b"abc".to_vec())]);
    }

    #[test]
    fn test_decode_update_with_old_tuple() {
        let mut buf = vec![b'U'];
        buf.extend_from_slice(&9u32.to_be_bytes());
        buf.push(OLD_TUPLE_MARKER);
        // old tuple: one null
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.push(b'n');
        // new tuple: one text value
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.push(b't');
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(b"new");

        let Message::Update(body) = decode_message(&buf).unwrap() else {
            panic!("expected Update");
        };
        assert_eq!(body.relation_id, 9);
        assert_eq!(body.old_tuple, Some(vec![TupleValue::Null]));
        assert_eq!(body.new_tuple, vec![TupleValue::Text(b"new".to_vec())]);
    }

    #[test]
    fn test_decode_update_without_old_tuple() {
        let mut buf = vec![b'U'];
        buf.extend_from_slice(&9u32.to_be_bytes());
        buf.push(b'N');
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.push(b'n');

        let Message::Update(body) = decode_message(&buf).unwrap() else {
            panic!("expected Update");
        };
        assert_eq!(body.old_tuple, None);
        assert_eq!(body.new_tuple, vec![TupleValue::Null]);
    }

    #[test]
    fn test_decode_truncate() {
        let mut buf = vec![b'T'];
        buf.extend_from_slice(&3u32.to_be_bytes()); // cascade | restart identity
        buf.extend_from_slice(&2u16.to_be_bytes());
        buf.extend_from_slice(&11u32.to_be_bytes());
        buf.extend_from_slice(&12u32.to_be_bytes());

        let Message::Truncate(body) = decode_message(&buf).unwrap() else {
            panic!("expected Truncate");
        };
        assert!(body.cascade);
        assert!(body.restart_identity);
        assert_eq!(body.relation_ids, vec![11, 12]);
    }

    #[test]
    fn test_decode_type() {
        let mut buf = vec![b'Y'];
        buf.extend_from_slice(&600u32.to_be_bytes());
        buf.extend_from_slice(b"public\0mood\0");

        let Message::Type(ty) = decode_message(&buf).unwrap() else {
            panic!("expected Type");
        };
        assert_eq!(ty.type_id, 600);
        assert_eq!(ty.namespace, "public");
        assert_eq!(ty.name, "mood");
    }

    #[test]
    fn test_decode_origin_strips_trailing_terminator() {
        let mut buf = vec![b'O'];
        buf.extend_from_slice(&77u64.to_be_bytes());
        buf.extend_from_slice(b"origin_a\0");

        let Message::Origin(body) = decode_message(&buf).unwrap() else {
            panic!("expected Origin");
        };
        assert_eq!(body.lsn, 77);
        assert_eq!(body.name, "origin_a");
    }
}
