use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    pub nonce: String,
}

/// One entry of a client's decrypted conversation log.
///
/// Clients echo back the `mid` they hold locally; the server assigns its own,
/// so unknown fields are tolerated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptedMessageInput {
    pub sender_uid: i64,
    pub receiver_uid: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
