//! Replication transport for pg-relay.
//!
//! Acquires raw pgoutput message buffers from PostgreSQL over a regular
//! SQL connection: slot and publication provisioning, then polling with
//! `pg_logical_slot_peek_binary_changes` and explicit slot advancement
//! after the consumer has processed a batch. Decoding is someone else's
//! job — this crate hands buffers to the caller one message at a time.
//!
//! Callers must reset their decoder's schema registry when starting a
//! fresh session against a slot; relation identifiers are not stable
//! across sessions.

mod client;
mod config;
mod lsn;

pub use client::{Client, Slot};
pub use config::Config;
pub use lsn::compare_lsn;
