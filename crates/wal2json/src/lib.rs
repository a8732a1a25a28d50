//! wal2json change-record normalization for pg-relay.
//!
//! The companion ingestion path: PostgreSQL's wal2json output plugin
//! delivers changes as JSON rather than binary pgoutput messages. This
//! crate maps those records (format version 2) into the same
//! [`pg_relay_pgoutput::ChangeEvent`] shape as the binary decoder, so
//! consumers see one event format no matter which plugin produced the
//! change. No binary parsing happens here — it is field remapping only.

mod normalize;
mod parse;
mod timestamp;

pub use normalize::{normalize, normalize_record};
pub use parse::parse_wal2json;
pub use timestamp::parse_wal2json_timestamp;
