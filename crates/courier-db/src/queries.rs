use chrono::{DateTime, Utc};
use courier_types::models::ContactStatus;
use rusqlite::types::Type;

use crate::error::Result;
use crate::models::{DecryptedMessageRow, MessageRow, format_timestamp};
use crate::session::{DbSession, Mode, ReadWrite};

// -- Accounts --

/// Whether `uid` names an account that has not been soft-deleted.
pub fn account_exists<M: Mode>(session: &DbSession<M>, uid: i64) -> Result<bool> {
    session.query_row(
        "SELECT EXISTS(SELECT 1 FROM account WHERE uid = ?1 AND is_deleted = 0)",
        [uid],
        |row| row.get(0),
    )
}

// -- Contacts --

/// Status of the directed relationship `user_id -> contact_user_id`, if any.
pub fn contact_status<M: Mode>(
    session: &DbSession<M>,
    user_id: i64,
    contact_user_id: i64,
) -> Result<Option<ContactStatus>> {
    session.query_opt(
        "SELECT status FROM contact WHERE user_id = ?1 AND contact_user_id = ?2",
        [user_id, contact_user_id],
        |row| {
            let raw: String = row.get(0)?;
            raw.parse::<ContactStatus>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
        },
    )
}

// -- Messages --

/// Insert one encrypted message. `None` means the statement returned no row.
pub fn insert_message(
    session: &DbSession<ReadWrite>,
    sender_uid: i64,
    receiver_uid: i64,
    content: &str,
    nonce: &str,
) -> Result<Option<MessageRow>> {
    session.query_opt(
        "INSERT INTO message (sender_uid, receiver_uid, content, nonce)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING mid, sender_uid, receiver_uid, content, nonce, timestamp",
        rusqlite::params![sender_uid, receiver_uid, content, nonce],
        MessageRow::from_row,
    )
}

/// Every message exchanged between `a` and `b`, in either direction, oldest first.
pub fn messages_between<M: Mode>(session: &DbSession<M>, a: i64, b: i64) -> Result<Vec<MessageRow>> {
    session.query_map(
        "SELECT m.mid, m.sender_uid, m.receiver_uid, m.content, m.nonce, m.timestamp
         FROM message m
         WHERE (m.sender_uid = ?1 AND m.receiver_uid = ?2)
            OR (m.sender_uid = ?2 AND m.receiver_uid = ?1)
         ORDER BY m.timestamp ASC, m.mid ASC",
        [a, b],
        MessageRow::from_row,
    )
}

// -- Decrypted messages --

pub fn insert_decrypted_message(
    session: &DbSession<ReadWrite>,
    sender_uid: i64,
    receiver_uid: i64,
    content: &str,
    timestamp: &DateTime<Utc>,
) -> Result<Option<DecryptedMessageRow>> {
    session.query_opt(
        "INSERT INTO decrypted_messages (sender_uid, receiver_uid, content, timestamp)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING mid, sender_uid, receiver_uid, content, timestamp",
        rusqlite::params![sender_uid, receiver_uid, content, format_timestamp(timestamp)],
        DecryptedMessageRow::from_row,
    )
}

/// Plaintext log between `a` and `b`, in either direction, oldest first.
pub fn decrypted_messages_between<M: Mode>(
    session: &DbSession<M>,
    a: i64,
    b: i64,
) -> Result<Vec<DecryptedMessageRow>> {
    session.query_map(
        "SELECT d.mid, d.sender_uid, d.receiver_uid, d.content, d.timestamp
         FROM decrypted_messages d
         WHERE (d.sender_uid = ?1 AND d.receiver_uid = ?2)
            OR (d.sender_uid = ?2 AND d.receiver_uid = ?1)
         ORDER BY d.timestamp ASC, d.mid ASC",
        [a, b],
        DecryptedMessageRow::from_row,
    )
}
