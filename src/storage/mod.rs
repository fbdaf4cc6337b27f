// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Embedded mirror database backed by redb (pure Rust, ACID).
//!
//! Holds the local copies of partner-side state that webhook deliveries
//! mutate, plus the append-only journey log used for KYC auditing.
//!
//! ## Table Layout
//!
//! - `clients`: drgreen_client_id → serialized StoredClient
//! - `client_user_index`: user_id → drgreen_client_id
//! - `orders`: drgreen_order_id → serialized StoredOrder
//! - `users`: user_id → serialized StoredUser
//! - `journey_logs`: composite key (client_id_len|client_id|timestamp|entry_id) → entry

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::AdminApproval;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: partner client id → serialized StoredClient (JSON bytes).
const CLIENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("clients");

/// Index: internal user id → partner client id.
const CLIENT_USER_INDEX: TableDefinition<&str, &str> = TableDefinition::new("client_user_index");

/// Primary table: partner order id → serialized StoredOrder (JSON bytes).
const ORDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Mirror of the auth provider's user records: user id → serialized StoredUser.
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Append-only journey log.
/// Key format: `client_id_len_be|client_id|timestamp|entry_id` for
/// per-client time-ordered range scans.
const JOURNEY_LOGS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("journey_logs");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GatewayDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type GatewayDbResult<T> = Result<T, GatewayDbError>;

// =============================================================================
// Stored Records
// =============================================================================

/// Local mirror of a partner client (patient) record.
///
/// Created at registration time; mutated only by verified webhook events.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct StoredClient {
    /// Partner-side client identifier.
    pub drgreen_client_id: String,
    /// Owning internal user id.
    pub user_id: String,
    /// Whether identity verification has completed.
    pub is_kyc_verified: bool,
    /// Medical-review approval gate.
    pub admin_approval: AdminApproval,
    /// Hosted KYC flow link, persisted from `kyc.link_generated`.
    pub kyc_link: Option<String>,
    /// ISO country code used for email branding.
    pub country_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Local mirror of a partner order record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct StoredOrder {
    /// Partner-side order identifier.
    pub drgreen_order_id: String,
    /// Owning internal user id.
    pub user_id: String,
    pub status: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

/// Mirror of the auth provider's user record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct StoredUser {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// One append-only journey log entry. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct JourneyLogEntry {
    /// Unique entry id.
    pub id: String,
    pub user_id: String,
    pub client_id: String,
    /// The webhook event name that produced this entry.
    pub event_type: String,
    /// Which subsystem wrote the entry (always `drgreen-webhook` here).
    pub event_source: String,
    /// Free-form event data snapshot.
    #[schema(value_type = Object)]
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl JourneyLogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        client_id: impl Into<String>,
        event_type: impl Into<String>,
        event_data: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            client_id: client_id.into(),
            event_type: event_type.into(),
            event_source: "drgreen-webhook".to_string(),
            event_data,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Encode a signed unix timestamp so byte order matches numeric order.
///
/// Flipping the sign bit keeps pre-1970 timestamps sorting before later
/// ones in a big-endian byte comparison.
fn encode_timestamp(timestamp: i64) -> [u8; 8] {
    ((timestamp as u64) ^ (1 << 63)).to_be_bytes()
}

/// Build a composite key for the journey_logs table.
///
/// Format: `client_id_len_be | client_id | timestamp | entry_id`. The
/// length prefix keeps one client's range scan from matching another
/// client whose id shares a prefix or embeds a separator; client ids are
/// partner-issued opaque strings.
fn make_journey_key(client_id: &str, timestamp: i64, entry_id: &str) -> Vec<u8> {
    let id = client_id.as_bytes();
    let mut key = Vec::with_capacity(4 + id.len() + 8 + entry_id.len());
    key.extend_from_slice(&(id.len() as u32).to_be_bytes());
    key.extend_from_slice(id);
    key.extend_from_slice(&encode_timestamp(timestamp));
    key.extend_from_slice(entry_id.as_bytes());
    key
}

/// Build a prefix for range scanning all journey entries of a client.
fn make_journey_prefix(client_id: &str) -> Vec<u8> {
    let id = client_id.as_bytes();
    let mut prefix = Vec::with_capacity(4 + id.len());
    prefix.extend_from_slice(&(id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(id);
    prefix
}

/// Upper bound for a journey range scan. The suffix after the prefix is at
/// most 8 timestamp bytes plus a uuid string, so this padding exceeds any
/// real key.
fn make_journey_prefix_end(client_id: &str) -> Vec<u8> {
    let mut end = make_journey_prefix(client_id);
    end.extend_from_slice(&[0xFF; 64]);
    end
}

// =============================================================================
// GatewayDatabase
// =============================================================================

/// Embedded ACID mirror database.
pub struct GatewayDatabase {
    db: Database,
}

impl GatewayDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> GatewayDbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENTS)?;
            let _ = write_txn.open_table(CLIENT_USER_INDEX)?;
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(JOURNEY_LOGS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Insert or replace a client record and its user index entry.
    pub fn upsert_client(&self, client: &StoredClient) -> GatewayDbResult<()> {
        let json = serde_json::to_vec(client)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut clients = write_txn.open_table(CLIENTS)?;
            clients.insert(client.drgreen_client_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(CLIENT_USER_INDEX)?;
            index.insert(client.user_id.as_str(), client.drgreen_client_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a client by partner client id.
    pub fn get_client(&self, drgreen_client_id: &str) -> GatewayDbResult<Option<StoredClient>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        match table.get(drgreen_client_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a client by its owning internal user id.
    pub fn get_client_by_user(&self, user_id: &str) -> GatewayDbResult<Option<StoredClient>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CLIENT_USER_INDEX)?;
        let Some(client_id) = index.get(user_id)? else {
            return Ok(None);
        };
        let clients = read_txn.open_table(CLIENTS)?;
        match clients.get(client_id.value())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Apply a mutation to an existing client record.
    ///
    /// Returns the updated record, or `None` when the client is unknown.
    pub fn update_client(
        &self,
        drgreen_client_id: &str,
        mutate: impl FnOnce(&mut StoredClient),
    ) -> GatewayDbResult<Option<StoredClient>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(CLIENTS)?;
            let current = match table.get(drgreen_client_id)? {
                Some(value) => Some(serde_json::from_slice::<StoredClient>(value.value())?),
                None => None,
            };
            match current {
                Some(mut client) => {
                    mutate(&mut client);
                    let json = serde_json::to_vec(&client)?;
                    table.insert(drgreen_client_id, json.as_slice())?;
                    Some(client)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Number of mirrored client records (diagnostics).
    pub fn count_clients(&self) -> GatewayDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        let mut count = 0u64;
        for item in table.iter()? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Insert or replace an order record.
    pub fn upsert_order(&self, order: &StoredOrder) -> GatewayDbResult<()> {
        let json = serde_json::to_vec(order)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ORDERS)?;
            table.insert(order.drgreen_order_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an order by partner order id.
    pub fn get_order(&self, drgreen_order_id: &str) -> GatewayDbResult<Option<StoredOrder>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;
        match table.get(drgreen_order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Apply status/payment-status field updates to an order.
    ///
    /// Only the supplied fields change; the rest of the record is untouched.
    /// Returns the updated record, or `None` when the order is unknown.
    pub fn apply_order_update(
        &self,
        drgreen_order_id: &str,
        status: Option<&str>,
        payment_status: Option<&str>,
    ) -> GatewayDbResult<Option<StoredOrder>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(ORDERS)?;
            let current = match table.get(drgreen_order_id)? {
                Some(value) => Some(serde_json::from_slice::<StoredOrder>(value.value())?),
                None => None,
            };
            match current {
                Some(mut order) => {
                    if let Some(status) = status {
                        order.status = status.to_string();
                    }
                    if let Some(payment_status) = payment_status {
                        order.payment_status = payment_status.to_string();
                    }
                    let json = serde_json::to_vec(&order)?;
                    table.insert(drgreen_order_id, json.as_slice())?;
                    Some(order)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert or replace a mirrored user record.
    pub fn upsert_user(&self, user: &StoredUser) -> GatewayDbResult<()> {
        let json = serde_json::to_vec(user)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            table.insert(user.user_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a user by internal id.
    pub fn get_user(&self, user_id: &str) -> GatewayDbResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Journey Log
    // =========================================================================

    /// Append a journey log entry. Entries are never mutated or deleted.
    pub fn append_journey(&self, entry: &JourneyLogEntry) -> GatewayDbResult<()> {
        let json = serde_json::to_vec(entry)?;
        let key = make_journey_key(&entry.client_id, entry.created_at.timestamp(), &entry.id);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(JOURNEY_LOGS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List journey entries for a client, oldest first.
    pub fn journey_for_client(&self, client_id: &str) -> GatewayDbResult<Vec<JourneyLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOURNEY_LOGS)?;

        let start = make_journey_prefix(client_id);
        let end = make_journey_prefix_end(client_id);

        let mut entries = Vec::new();
        for item in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Total number of journey log entries (diagnostics).
    pub fn count_journey_entries(&self) -> GatewayDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOURNEY_LOGS)?;
        let mut count = 0u64;
        for item in table.iter()? {
            item?;
            count += 1;
        }
        Ok(count)
    }
}
