//! Message access: validated inserts and lookups for the encrypted message
//! table and the plaintext `decrypted_messages` log.
//!
//! Every operation returns an [`Envelope`]. Validation, authorization and
//! not-found outcomes are expected results; database failures are logged and
//! reported as a generic internal error.

use axum::http::StatusCode;
use tracing::{error, warn};

use courier_db::models::{DecryptedMessageRow, MessageRow};
use courier_db::{DbError, DbSession, Mode, ReadWrite, queries};
use courier_types::api::DecryptedMessageInput;
use courier_types::models::{DecryptedMessage, Message};

use crate::contacts::{ContactDirectory, DenyReason};
use crate::response::Envelope;

const SEND_FAILED: &str = "Failed to send message.";
const FETCH_FAILED: &str = "Failed to fetch messages.";
const STORE_FAILED: &str = "Error processing message";

/// An early exit from an operation, turned into an error envelope.
#[derive(Debug)]
struct Rejection {
    status: StatusCode,
    message: &'static str,
}

impl Rejection {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    /// A lookup failed underneath the operation whose failure message is `message`.
    fn internal(e: DbError, message: &'static str) -> Self {
        error!("{} {}", message, e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl<T> From<Rejection> for Envelope<T> {
    fn from(rejection: Rejection) -> Self {
        Envelope::error(rejection.status, rejection.message)
    }
}

enum BatchError {
    Db(DbError),
    NotInserted,
}

impl From<DbError> for BatchError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

/// Message operations bound to one session.
pub struct MessageUtils<'s, M: Mode, D> {
    session: &'s DbSession<M>,
    directory: &'s D,
}

impl<'s, M: Mode, D: ContactDirectory> MessageUtils<'s, M, D> {
    pub fn new(session: &'s DbSession<M>, directory: &'s D) -> Self {
        Self { session, directory }
    }

    /// All messages exchanged between the two users, oldest first.
    pub fn fetch_message(&self, sender_uid: i64, receiver_uid: i64) -> Envelope<Vec<Message>> {
        self.try_fetch_message(sender_uid, receiver_uid)
            .unwrap_or_else(Envelope::from)
    }

    fn try_fetch_message(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
    ) -> Result<Envelope<Vec<Message>>, Rejection> {
        self.check_pair(sender_uid, receiver_uid, "Cannot fetch messages with self")?;
        self.require_accounts(sender_uid, receiver_uid, FETCH_FAILED)?;

        let rows = queries::messages_between(self.session, sender_uid, receiver_uid)
            .map_err(|e| Rejection::internal(e, FETCH_FAILED))?;
        Ok(Envelope::success(rows.into_iter().map(message_from_row).collect()))
    }

    /// The plaintext log between the two users, oldest first.
    pub fn fetch_decrypted_messages(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
    ) -> Envelope<Vec<DecryptedMessage>> {
        self.try_fetch_decrypted_messages(sender_uid, receiver_uid)
            .unwrap_or_else(Envelope::from)
    }

    fn try_fetch_decrypted_messages(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
    ) -> Result<Envelope<Vec<DecryptedMessage>>, Rejection> {
        self.check_pair(sender_uid, receiver_uid, "Cannot fetch messages with self")?;
        self.require_accounts(sender_uid, receiver_uid, FETCH_FAILED)?;

        let rows = queries::decrypted_messages_between(self.session, sender_uid, receiver_uid)
            .map_err(|e| Rejection::internal(e, FETCH_FAILED))?;
        Ok(Envelope::success(
            rows.into_iter().map(decrypted_message_from_row).collect(),
        ))
    }

    /// Id format and self-target checks; no database access.
    fn check_pair(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        self_target: &'static str,
    ) -> Result<(), Rejection> {
        if !self.directory.is_valid_user_id(sender_uid)
            || !self.directory.is_valid_user_id(receiver_uid)
        {
            return Err(Rejection::new(StatusCode::BAD_REQUEST, "Invalid UID"));
        }
        if sender_uid == receiver_uid {
            return Err(Rejection::new(StatusCode::BAD_REQUEST, self_target));
        }
        Ok(())
    }

    fn require_accounts(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        failure: &'static str,
    ) -> Result<(), Rejection> {
        for uid in [sender_uid, receiver_uid] {
            let exists = self
                .directory
                .user_exists(self.session, uid)
                .map_err(|e| Rejection::internal(e, failure))?;
            if !exists {
                return Err(Rejection::new(StatusCode::NOT_FOUND, "User not found"));
            }
        }
        Ok(())
    }

    fn require_contact(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        failure: &'static str,
    ) -> Result<(), Rejection> {
        let is_contact = self
            .directory
            .has_contact_with(self.session, sender_uid, receiver_uid)
            .map_err(|e| Rejection::internal(e, failure))?;
        if is_contact {
            Ok(())
        } else {
            Err(Rejection::new(StatusCode::FORBIDDEN, "Users are not contacts"))
        }
    }
}

impl<'s, D: ContactDirectory> MessageUtils<'s, ReadWrite, D> {
    /// Store one encrypted message from `sender_uid` to `receiver_uid`.
    pub fn send_message(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        content: &str,
        nonce: &str,
    ) -> Envelope<Message> {
        self.try_send_message(sender_uid, receiver_uid, content, nonce)
            .unwrap_or_else(Envelope::from)
    }

    fn try_send_message(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        content: &str,
        nonce: &str,
    ) -> Result<Envelope<Message>, Rejection> {
        self.check_pair(sender_uid, receiver_uid, "Cannot send message to self")?;
        self.require_accounts(sender_uid, receiver_uid, SEND_FAILED)?;
        self.require_contact(sender_uid, receiver_uid, SEND_FAILED)?;

        let permission = self
            .directory
            .can_send_message(self.session, sender_uid, receiver_uid)
            .map_err(|e| Rejection::internal(e, SEND_FAILED))?;
        if !permission.can_send {
            let message = match permission.reason {
                Some(DenyReason::YouBlocked) => "Cannot message, you have blocked this user",
                Some(DenyReason::UserBlocked) => "Cannot message user, user has blocked you",
                _ => "Cannot send message to this user",
            };
            return Err(Rejection::new(StatusCode::FORBIDDEN, message));
        }

        let row = queries::insert_message(self.session, sender_uid, receiver_uid, content, nonce)
            .map_err(|e| Rejection::internal(e, SEND_FAILED))?
            .ok_or_else(|| {
                warn!("Message insert {} -> {} returned no row", sender_uid, receiver_uid);
                Rejection::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send message")
            })?;

        Ok(Envelope::success(message_from_row(row)))
    }

    /// Store a client's decrypted conversation log in input order.
    ///
    /// The batch is atomic: if any entry fails, none of them stay inserted.
    pub fn store_decrypted_messages(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        messages: &[DecryptedMessageInput],
    ) -> Envelope<Vec<DecryptedMessage>> {
        self.try_store_decrypted_messages(sender_uid, receiver_uid, messages)
            .unwrap_or_else(Envelope::from)
    }

    fn try_store_decrypted_messages(
        &self,
        sender_uid: i64,
        receiver_uid: i64,
        messages: &[DecryptedMessageInput],
    ) -> Result<Envelope<Vec<DecryptedMessage>>, Rejection> {
        self.check_pair(sender_uid, receiver_uid, "Cannot send message to self")?;
        if messages.is_empty() {
            return Err(Rejection::new(StatusCode::BAD_REQUEST, "No Messages to push"));
        }
        let outside_pair = messages.iter().any(|m| {
            let forward = m.sender_uid == sender_uid && m.receiver_uid == receiver_uid;
            let backward = m.sender_uid == receiver_uid && m.receiver_uid == sender_uid;
            !(forward || backward)
        });
        if outside_pair {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                "Message does not belong to this conversation",
            ));
        }
        self.require_accounts(sender_uid, receiver_uid, STORE_FAILED)?;
        self.require_contact(sender_uid, receiver_uid, STORE_FAILED)?;

        let stored = self.session.with_savepoint("store_decrypted", |session| {
            messages
                .iter()
                .map(|m| {
                    queries::insert_decrypted_message(
                        session,
                        m.sender_uid,
                        m.receiver_uid,
                        &m.content,
                        &m.timestamp,
                    )?
                    .ok_or(BatchError::NotInserted)
                })
                .collect::<Result<Vec<_>, BatchError>>()
        });

        match stored {
            Ok(rows) => Ok(Envelope::success(
                rows.into_iter().map(decrypted_message_from_row).collect(),
            )),
            Err(BatchError::Db(e)) => Err(Rejection::internal(e, STORE_FAILED)),
            Err(BatchError::NotInserted) => {
                warn!("Decrypted message insert returned no row, batch undone");
                Err(Rejection::new(StatusCode::INTERNAL_SERVER_ERROR, STORE_FAILED))
            }
        }
    }
}

fn message_from_row(row: MessageRow) -> Message {
    Message {
        mid: row.mid,
        sender_uid: row.sender_uid,
        receiver_uid: row.receiver_uid,
        content: row.content,
        nonce: row.nonce,
        timestamp: row.timestamp,
    }
}

fn decrypted_message_from_row(row: DecryptedMessageRow) -> DecryptedMessage {
    DecryptedMessage {
        mid: row.mid,
        sender_uid: row.sender_uid,
        receiver_uid: row.receiver_uid,
        content: row.content,
        timestamp: row.timestamp,
    }
}
