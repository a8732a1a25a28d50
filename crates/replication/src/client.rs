//! Replication client and slot handle.
//!
//! Uses regular SQL connections (not the replication protocol): slots are
//! created with `pg_create_logical_replication_slot`, changes are read
//! with `pg_logical_slot_peek_binary_changes` and acknowledged with
//! `pg_replication_slot_advance`. Peek-then-advance gives at-least-once
//! delivery: changes are only consumed after the caller confirms a batch.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_postgres::Client as PgClient;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Client for provisioning and opening logical replication sessions.
pub struct Client {
    pg_client: Arc<PgClient>,
    config: Config,
}

impl Client {
    pub fn new(pg_client: PgClient, config: Config) -> Self {
        Self {
            pg_client: Arc::new(pg_client),
            config,
        }
    }

    /// Creates the configured publication, covering the configured tables
    /// or all tables when none are listed. A publication that already
    /// exists is left alone.
    pub async fn create_publication(&self) -> Result<()> {
        let publication = &self.config.publication;
        let exists = self
            .pg_client
            .query(
                "SELECT pubname FROM pg_publication WHERE pubname = $1",
                &[publication],
            )
            .await
            .context("Failed to check for existing publication")?;

        if !exists.is_empty() {
            info!("Publication already exists: {}", publication);
            return Ok(());
        }

        let query = if self.config.tables.is_empty() {
            format!("CREATE PUBLICATION {publication} FOR ALL TABLES")
        } else {
            format!(
                "CREATE PUBLICATION {publication} FOR TABLE {}",
                self.config.tables.join(", ")
            )
        };
        self.pg_client
            .execute(&query, &[])
            .await
            .context("Failed to create publication")?;
        info!("Created publication: {}", publication);
        Ok(())
    }

    /// Creates the configured logical replication slot bound to the given
    /// output plugin (`"pgoutput"` or `"wal2json"`). A slot that already
    /// exists is left alone.
    pub async fn create_slot(&self, plugin: &str) -> Result<()> {
        let slot_name = &self.config.slot;
        let exists = self
            .pg_client
            .query(
                "SELECT slot_name FROM pg_replication_slots WHERE slot_name = $1",
                &[slot_name],
            )
            .await
            .context("Failed to check for existing replication slot")?;

        if exists.is_empty() {
            info!("Creating new logical replication slot: {}", slot_name);
            let query = format!(
                "SELECT * FROM pg_create_logical_replication_slot('{slot_name}', '{plugin}')",
            );
            self.pg_client
                .execute(&query, &[])
                .await
                .context("Failed to create logical replication slot")?;
            info!("Successfully created replication slot: {}", slot_name);
        } else {
            info!("Replication slot already exists: {}", slot_name);
        }

        Ok(())
    }

    /// Opens a [`Slot`] handle for reading changes.
    ///
    /// This starts a fresh decoding session: the caller must reset any
    /// schema state learned from a previous session on this slot.
    pub async fn start_replication(&self) -> Result<Slot> {
        let slots = self
            .pg_client
            .query(
                "SELECT slot_name, plugin, slot_type, active FROM pg_replication_slots",
                &[],
            )
            .await
            .context("Failed to list replication slots")?;

        for slot in &slots {
            let name: &str = slot.get(0);
            let plugin: &str = slot.get(1);
            let slot_type: &str = slot.get(2);
            let active: bool = slot.get(3);
            debug!(
                "Slot: {} | Plugin: {} | Type: {} | Active: {}",
                name, plugin, slot_type, active
            );
        }

        Ok(Slot {
            pg_client: Arc::clone(&self.pg_client),
            slot_name: self.config.slot.clone(),
            publication: self.config.publication.clone(),
        })
    }

    /// Drops the replication slot, releasing its WAL retention.
    pub async fn drop_slot(&self) -> Result<()> {
        let slot_name = &self.config.slot;
        info!("Dropping replication slot: {}", slot_name);
        let query = format!("SELECT pg_drop_replication_slot('{slot_name}')");
        self.pg_client
            .execute(&query, &[])
            .await
            .context("Failed to drop replication slot")?;
        info!("Successfully dropped replication slot");
        Ok(())
    }
}

/// Handle for reading raw change buffers from one replication slot.
pub struct Slot {
    pg_client: Arc<PgClient>,
    slot_name: String,
    publication: String,
}

impl Slot {
    /// Peeks at available pgoutput changes without consuming them.
    ///
    /// Returns `(lsn, buffer)` pairs, one per wire message. Changes stay
    /// in the slot until [`Slot::advance`] acknowledges them, so a crash
    /// between peek and advance redelivers the batch.
    pub async fn peek(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let query = format!(
            "SELECT lsn::text, data FROM pg_logical_slot_peek_binary_changes(\
             '{}', NULL, NULL, 'proto_version', '1', 'publication_names', '{}')",
            self.slot_name, self.publication
        );

        let rows = self
            .pg_client
            .query(&query, &[])
            .await
            .context("Failed to peek changes from replication slot")?;

        let mut changes = Vec::with_capacity(rows.len());
        for row in rows {
            let lsn: String = row.get(0);
            let data: Vec<u8> = row.get(1);
            debug!("Peeked change with LSN: {} ({} bytes)", lsn, data.len());
            changes.push((lsn, data));
        }

        Ok(changes)
    }

    /// Peeks at available changes from a wal2json slot.
    ///
    /// Returns `(lsn, record)` pairs with the record parsed as JSON.
    /// Records that fail to parse are skipped with a warning rather than
    /// failing the batch.
    pub async fn peek_wal2json(&self) -> Result<Vec<(String, serde_json::Value)>> {
        // 'include-transaction', 'false': no per-transaction begin/end
        // records; 'include-pk', 'true': primary key names and types
        let options = "'format-version', '2', 'include-lsn', 'true', \
                       'include-transaction', 'false', 'include-pk', 'true'";
        let query = format!(
            "SELECT lsn::text, data FROM pg_logical_slot_peek_changes(\
             '{}', NULL, NULL, {options})",
            self.slot_name
        );

        let rows = self
            .pg_client
            .query(&query, &[])
            .await
            .context("Failed to peek changes from replication slot")?;

        let mut changes = Vec::with_capacity(rows.len());
        for row in rows {
            let lsn: String = row.get(0);
            let data: String = row.get(1);
            match serde_json::from_str(&data) {
                Ok(parsed) => changes.push((lsn, parsed)),
                Err(e) => {
                    warn!("Failed to parse wal2json data at {}: {}", lsn, e);
                    warn!("Raw data: {}", data);
                }
            }
        }

        Ok(changes)
    }

    /// Advances the slot past `lsn`, consuming everything up to it.
    pub async fn advance(&self, lsn: &str) -> Result<()> {
        let query = format!(
            "SELECT * FROM pg_replication_slot_advance('{}', '{lsn}')",
            self.slot_name
        );
        self.pg_client
            .execute(&query, &[])
            .await
            .with_context(|| format!("Failed to advance slot to {lsn}"))?;
        debug!("Advanced slot {} to {}", self.slot_name, lsn);
        Ok(())
    }

    pub fn slot_name(&self) -> &str {
        &self.slot_name
    }
}
