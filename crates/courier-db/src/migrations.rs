use tracing::{error, info, warn};

use crate::error::{DbError, Result};
use crate::pool::DbPool;
use crate::session::DbSession;

/// Table definitions in foreign-key dependency order: everything references `account`.
const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS account (
        uid               INTEGER PRIMARY KEY AUTOINCREMENT,
        username          TEXT NOT NULL UNIQUE,
        password_hash     TEXT NOT NULL,
        created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        display_name      TEXT,
        is_deleted        INTEGER NOT NULL DEFAULT 0,
        shadow_mode       INTEGER NOT NULL DEFAULT 0,
        full_name_search  INTEGER NOT NULL DEFAULT 0,
        private_key       TEXT CHECK (length(private_key) <= 5000),
        public_key        TEXT CHECK (length(public_key) <= 5000)
    )",
    "CREATE TABLE IF NOT EXISTS message (
        mid           INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_uid    INTEGER NOT NULL REFERENCES account(uid),
        receiver_uid  INTEGER NOT NULL REFERENCES account(uid),
        content       TEXT NOT NULL,
        nonce         TEXT NOT NULL,
        timestamp     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_message_pair
        ON message(sender_uid, receiver_uid, timestamp)",
    "CREATE TABLE IF NOT EXISTS contact (
        contact_id       INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id          INTEGER NOT NULL REFERENCES account(uid),
        contact_user_id  INTEGER NOT NULL REFERENCES account(uid),
        status           TEXT NOT NULL DEFAULT 'incoming_request',
        created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        UNIQUE (user_id, contact_user_id),
        CHECK (status IN ('incoming_request', 'outgoing_request', 'accepted', 'rejected', 'blocked', 'deleted'))
    )",
    "CREATE TABLE IF NOT EXISTS decrypted_messages (
        mid           INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_uid    INTEGER NOT NULL REFERENCES account(uid),
        receiver_uid  INTEGER NOT NULL REFERENCES account(uid),
        content       TEXT NOT NULL,
        timestamp     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    )",
];

/// Create any missing tables inside one transaction. Safe to call on every start.
pub fn ensure_tables_created(pool: &DbPool) -> Result<()> {
    create_tables(pool, STATEMENTS)
}

fn create_tables(pool: &DbPool, statements: &[&str]) -> Result<()> {
    let mut session = DbSession::read_write(pool)?;

    let created = statements
        .iter()
        .try_for_each(|statement| session.execute_batch(statement));

    match created {
        Ok(()) => {
            session.commit()?;
            info!("Database tables ready");
            Ok(())
        }
        Err(e) => {
            error!("Creating tables failed: {}", e);
            if let Err(rollback) = session.rollback() {
                warn!("Rolling back table creation failed: {}", rollback);
            }
            Err(DbError::Schema(e.to_string()))
        }
    }
}
