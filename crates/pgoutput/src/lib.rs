//! Binary pgoutput change-message decoding for pg-relay.
//!
//! This crate parses the tagged binary messages emitted by PostgreSQL's
//! `pgoutput` logical decoding plugin and turns them into structured
//! [`ChangeEvent`] values. Row values arrive on the wire as positions
//! within a table, not as named columns, so the decoder maintains a
//! [`SchemaRegistry`] learned from Relation/Type messages and uses it to
//! produce named column maps, resolved table names and primary-key lists.
//!
//! The decoder never fails across its boundary: truncated messages degrade
//! to partially-populated events, unknown message tags become
//! [`ChangeEvent::Unknown`], and only an empty input buffer surfaces as
//! [`ChangeEvent::Error`].

mod coerce;
mod cursor;
mod decoder;
mod error;
mod event;
mod message;
mod registry;
mod session;
mod time;
mod tuple;

pub use coerce::{coerce, Scalar};
pub use cursor::Cursor;
pub use decoder::decode_message;
pub use error::DecodeError;
pub use event::{hex_preview, ChangeEvent, PREVIEW_BYTES};
pub use message::{
    BeginBody, ColumnDef, CommitBody, DeleteBody, InsertBody, Message, OriginBody, RelationDef,
    ReplicaIdentity, TruncateBody, TypeDef, UpdateBody,
};
pub use registry::{MappedTuple, SchemaRegistry};
pub use session::ChangeDecoder;
pub use time::{format_pg_timestamp, pg_timestamp_to_datetime};
pub use tuple::{decode_tuple, TupleValue, UNCHANGED_TOAST_MARKER};
