//! Per-session decoding: dispatch, registry maintenance, enrichment.

use tracing::debug;

use crate::decoder::decode_message;
use crate::event::{hex_preview, ChangeEvent};
use crate::message::{DeleteBody, InsertBody, Message, UpdateBody};
use crate::registry::{MappedTuple, SchemaRegistry};
use crate::time::format_pg_timestamp;
use crate::tuple::TupleValue;

/// A decoding session: one per replication slot connection.
///
/// Owns the [`SchemaRegistry`] learned from Relation/Type messages and uses
/// it to enrich data operations with table names, named column maps and
/// primary-key lists. Processing is strictly one buffer at a time; there is
/// no internal state besides the registry.
#[derive(Debug, Default)]
pub struct ChangeDecoder {
    registry: SchemaRegistry,
}

impl ChangeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one wire message into an enriched [`ChangeEvent`].
    ///
    /// Never fails: malformed or truncated buffers come back as partially
    /// populated events, unknown tags as [`ChangeEvent::Unknown`] and an
    /// empty buffer as [`ChangeEvent::Error`]. Relation and Type messages
    /// update the registry as a side effect.
    pub fn decode(&mut self, buf: &[u8]) -> ChangeEvent {
        let message = match decode_message(buf) {
            Ok(message) => message,
            Err(err) => {
                return ChangeEvent::Error {
                    message: err.to_string(),
                    preview: hex_preview(buf),
                }
            }
        };

        match message {
            Message::Begin(body) => ChangeEvent::Begin {
                lsn: body.lsn,
                timestamp: body.timestamp,
                timestamp_formatted: format_pg_timestamp(body.timestamp),
                xid: body.xid,
            },
            Message::Commit(body) => ChangeEvent::Commit {
                flags: body.flags,
                lsn: body.lsn,
                end_lsn: body.end_lsn,
                timestamp: body.timestamp,
                timestamp_formatted: format_pg_timestamp(body.timestamp),
            },
            Message::Relation(rel) => {
                debug!(
                    relation_id = rel.relation_id,
                    table = %rel.full_name(),
                    columns = rel.columns.len(),
                    "learned relation schema"
                );
                let event = ChangeEvent::Relation {
                    relation_id: rel.relation_id,
                    namespace: rel.namespace.clone(),
                    name: rel.name.clone(),
                    replica_identity: rel.replica_identity,
                    columns: rel.columns.clone(),
                };
                self.registry.add_relation(rel);
                event
            }
            Message::Type(ty) => {
                let event = ChangeEvent::TypeDef {
                    type_id: ty.type_id,
                    namespace: ty.namespace.clone(),
                    name: ty.name.clone(),
                };
                self.registry.add_type(ty);
                event
            }
            Message::Insert(body) => self.enrich_insert(body),
            Message::Update(body) => self.enrich_update(body),
            Message::Delete(body) => self.enrich_delete(body),
            Message::Truncate(body) => ChangeEvent::Truncate {
                cascade: body.cascade,
                restart_identity: body.restart_identity,
                relation_ids: body.relation_ids,
            },
            Message::Origin(body) => ChangeEvent::Origin {
                lsn: body.lsn,
                name: body.name,
            },
            Message::Unknown { raw_tag } => ChangeEvent::Unknown {
                raw_tag,
                preview: hex_preview(buf),
            },
        }
    }

    /// Drops all learned schema. The transport calls this when starting a
    /// fresh session against a slot, since relation identifiers are not
    /// stable across sessions.
    pub fn reset(&mut self) {
        self.registry.clear();
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    fn enrich_insert(&self, body: InsertBody) -> ChangeEvent {
        ChangeEvent::Insert {
            relation_id: body.relation_id,
            table: self.registry.get_full_table_name(body.relation_id),
            data: self.render_tuple(body.relation_id, &body.tuple, false),
            primary_keys: self.registry.get_primary_key_columns(body.relation_id),
        }
    }

    fn enrich_update(&self, body: UpdateBody) -> ChangeEvent {
        ChangeEvent::Update {
            relation_id: body.relation_id,
            table: self.registry.get_full_table_name(body.relation_id),
            has_old_tuple: body.old_tuple.is_some(),
            old_data: body
                .old_tuple
                .as_deref()
                .map(|old| self.render_tuple(body.relation_id, old, false)),
            new_data: self.render_tuple(body.relation_id, &body.new_tuple, false),
            primary_keys: self.registry.get_primary_key_columns(body.relation_id),
        }
    }

    fn enrich_delete(&self, body: DeleteBody) -> ChangeEvent {
        // Unknown-typed columns are hidden from delete maps rather than
        // surfaced as opaque markers.
        ChangeEvent::Delete {
            relation_id: body.relation_id,
            table: self.registry.get_full_table_name(body.relation_id),
            data: self.render_tuple(body.relation_id, &body.tuple, true),
            primary_keys: self.registry.get_primary_key_columns(body.relation_id),
        }
    }

    fn render_tuple(
        &self,
        relation_id: u32,
        tuple: &[TupleValue],
        drop_unknown: bool,
    ) -> serde_json::Value {
        match self.registry.map_tuple_to_columns(relation_id, tuple) {
            MappedTuple::Named(pairs) => {
                let mut map = serde_json::Map::new();
                for (name, value) in pairs {
                    if drop_unknown && matches!(value, TupleValue::UnknownTag { .. }) {
                        continue;
                    }
                    map.insert(name, value.to_json());
                }
                serde_json::Value::Object(map)
            }
            MappedTuple::Positional(values) => {
                serde_json::Value::Array(values.iter().map(TupleValue::to_json).collect())
            }
        }
    }
}
