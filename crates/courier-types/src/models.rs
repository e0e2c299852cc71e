use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored message. The server only keeps the encrypted payload and the nonce
/// the receiving client needs to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub mid: i64,
    pub sender_uid: i64,
    pub receiver_uid: i64,
    pub content: String,
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

/// Plaintext copy of a message, pushed in bulk from a client's decrypted log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedMessage {
    pub mid: i64,
    pub sender_uid: i64,
    pub receiver_uid: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// State of a directed relationship from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    IncomingRequest,
    OutgoingRequest,
    Accepted,
    Rejected,
    Blocked,
    Deleted,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 6] = [
        Self::IncomingRequest,
        Self::OutgoingRequest,
        Self::Accepted,
        Self::Rejected,
        Self::Blocked,
        Self::Deleted,
    ];

    /// Value stored in the `contact.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IncomingRequest => "incoming_request",
            Self::OutgoingRequest => "outgoing_request",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownContactStatus(pub String);

impl fmt::Display for UnknownContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown contact status '{}'", self.0)
    }
}

impl std::error::Error for UnknownContactStatus {}

impl FromStr for ContactStatus {
    type Err = UnknownContactStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownContactStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_status_column_values_parse_back() {
        for status in ContactStatus::ALL {
            assert_eq!(status.as_str().parse::<ContactStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_contact_status_is_rejected() {
        let err = "friends".parse::<ContactStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown contact status 'friends'");
    }

    #[test]
    fn contact_status_serializes_like_the_column() {
        let json = serde_json::to_string(&ContactStatus::IncomingRequest).unwrap();
        assert_eq!(json, "\"incoming_request\"");
    }
}
