//! SQLite-backed document store.
//!
//! One database file holds every collection the application persists:
//! invoice records, user documents (with their logo snapshot), bearer-token
//! sessions and Google Drive access tokens. Connections are opened per
//! operation; the schema is ensured once at startup.
//!
//! Invoice rows store the payload as the JSON of the tagged
//! `InvoicePayload` variant. The `template_type` column is a denormalised
//! copy of the tag used for filtering and is always derived from the
//! payload, never accepted separately from a caller.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use common::model::invoice::InvoicePayload;
use common::model::record::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use common::model::session::SessionSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invoice not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> StoreError {
        StoreError::Backend(e.to_string())
    }
}

/// The invoice collection as the lifecycle coordinator sees it. The
/// coordinator is the only caller allowed to create records or move their
/// status forward.
pub trait InvoiceStore {
    /// Persists a new record and returns the id assigned to it.
    fn create_invoice(&self, draft: &InvoiceDraft) -> Result<String, StoreError>;

    /// The single in-place update: advances `status` and, when given, sets
    /// the Drive reference. `created_at` and the payload are never touched.
    fn set_invoice_status(
        &self,
        id: &str,
        owner_id: &str,
        status: InvoiceStatus,
        drive_url: Option<&str>,
    ) -> Result<(), StoreError>;

    fn get_invoice(&self, id: &str, owner_id: &str) -> Result<InvoiceRecord, StoreError>;

    /// Records owned by `owner_id`, newest first, optionally filtered by
    /// status.
    fn invoices_for_owner(
        &self,
        owner_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<InvoiceRecord>, StoreError>;

    /// Permanent removal; there is no soft delete.
    fn delete_invoice(&self, id: &str, owner_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> SqliteStore {
        SqliteStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }

    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS invoices (
                 id            TEXT PRIMARY KEY,
                 owner_id      TEXT NOT NULL,
                 payload       TEXT NOT NULL,
                 template_type TEXT NOT NULL,
                 status        TEXT NOT NULL,
                 created_at    TEXT NOT NULL,
                 logo_url      TEXT,
                 drive_url     TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_invoices_owner
                 ON invoices (owner_id, created_at);
             CREATE TABLE IF NOT EXISTS users (
                 id           TEXT PRIMARY KEY,
                 email        TEXT NOT NULL UNIQUE,
                 display_name TEXT NOT NULL,
                 logo_url     TEXT
             );
             CREATE TABLE IF NOT EXISTS sessions (
                 token      TEXT PRIMARY KEY,
                 user_id    TEXT NOT NULL,
                 created_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS drive_tokens (
                 user_id      TEXT PRIMARY KEY,
                 access_token TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    // ----- users & sessions -----

    /// Finds or creates the user document for `email` and returns its id.
    /// The display name is refreshed on every sign-in.
    pub fn upsert_user(&self, email: &str, display_name: &str) -> Result<String, StoreError> {
        let conn = self.conn()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE users SET display_name = ?1 WHERE id = ?2",
                    params![display_name, id],
                )?;
                Ok(id)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    "INSERT INTO users (id, email, display_name) VALUES (?1, ?2, ?3)",
                    params![id, email, display_name],
                )?;
                Ok(id)
            }
        }
    }

    pub fn create_session(&self, user_id: &str, created_at: &str) -> Result<String, StoreError> {
        let conn = self.conn()?;
        let token = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, created_at],
        )?;
        Ok(token)
    }

    pub fn session_for_token(&self, token: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        let conn = self.conn()?;
        let snapshot = conn
            .query_row(
                "SELECT u.id, u.display_name, u.email
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                |row| {
                    Ok(SessionSnapshot {
                        user_id: row.get(0)?,
                        display_name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(snapshot)
    }

    pub fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    // ----- logo asset -----

    pub fn logo_for_user(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let url: Option<Option<String>> = conn
            .query_row(
                "SELECT logo_url FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(url.flatten())
    }

    pub fn set_logo(&self, user_id: &str, url: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET logo_url = ?1 WHERE id = ?2",
            params![url, user_id],
        )?;
        Ok(())
    }

    // ----- drive tokens -----

    pub fn set_drive_token(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO drive_tokens (user_id, access_token) VALUES (?1, ?2)",
            params![user_id, token],
        )?;
        Ok(())
    }

    pub fn drive_token(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let token = conn
            .query_row(
                "SELECT access_token FROM drive_tokens WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token)
    }

    pub fn clear_drive_token(&self, user_id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM drive_tokens WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}

/// Raw invoice row before the payload JSON and status tag are decoded.
struct InvoiceRow {
    id: String,
    owner_id: String,
    payload_json: String,
    status: String,
    created_at: String,
    logo_url: Option<String>,
    drive_url: Option<String>,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvoiceRow> {
    Ok(InvoiceRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        payload_json: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        logo_url: row.get(5)?,
        drive_url: row.get(6)?,
    })
}

fn decode_record(row: InvoiceRow) -> Result<InvoiceRecord, StoreError> {
    let payload: InvoicePayload = serde_json::from_str(&row.payload_json)
        .map_err(|e| StoreError::Backend(format!("stored payload is not valid JSON: {}", e)))?;
    let status = InvoiceStatus::from_str(&row.status)
        .ok_or_else(|| StoreError::Backend(format!("unknown invoice status: {}", row.status)))?;
    Ok(InvoiceRecord {
        id: row.id,
        owner_id: row.owner_id,
        payload,
        status,
        created_at: row.created_at,
        logo_url: row.logo_url,
        drive_url: row.drive_url,
    })
}

const RECORD_COLUMNS: &str =
    "id, owner_id, payload, status, created_at, logo_url, drive_url";

impl InvoiceStore for SqliteStore {
    fn create_invoice(&self, draft: &InvoiceDraft) -> Result<String, StoreError> {
        let conn = self.conn()?;
        let id = Uuid::new_v4().to_string();
        let payload_json = serde_json::to_string(&draft.payload)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute(
            "INSERT INTO invoices
                 (id, owner_id, payload, template_type, status, created_at, logo_url, drive_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                draft.owner_id,
                payload_json,
                draft.payload.template_kind().as_str(),
                draft.status.as_str(),
                draft.created_at,
                draft.logo_url,
                draft.drive_url,
            ],
        )?;
        Ok(id)
    }

    fn set_invoice_status(
        &self,
        id: &str,
        owner_id: &str,
        status: InvoiceStatus,
        drive_url: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE invoices
             SET status = ?1, drive_url = COALESCE(?2, drive_url)
             WHERE id = ?3 AND owner_id = ?4",
            params![status.as_str(), drive_url, id, owner_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_invoice(&self, id: &str, owner_id: &str) -> Result<InvoiceRecord, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM invoices WHERE id = ?1 AND owner_id = ?2",
                    RECORD_COLUMNS
                ),
                params![id, owner_id],
                row_to_record,
            )
            .optional()?;
        match row {
            Some(pair) => decode_record(pair),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn invoices_for_owner(
        &self,
        owner_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<InvoiceRecord>, StoreError> {
        let conn = self.conn()?;
        let mut records = Vec::new();
        match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM invoices
                     WHERE owner_id = ?1 AND status = ?2
                     ORDER BY created_at DESC",
                    RECORD_COLUMNS
                ))?;
                let rows = stmt.query_map(params![owner_id, status.as_str()], row_to_record)?;
                for row in rows {
                    records.push(decode_record(row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM invoices
                     WHERE owner_id = ?1
                     ORDER BY created_at DESC",
                    RECORD_COLUMNS
                ))?;
                let rows = stmt.query_map(params![owner_id], row_to_record)?;
                for row in rows {
                    records.push(decode_record(row?)?);
                }
            }
        }
        Ok(records)
    }

    fn delete_invoice(&self, id: &str, owner_id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM invoices WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
