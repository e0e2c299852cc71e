use courier_db::{DbSession, Mode, queries};
use courier_types::models::ContactStatus;

/// Why a sender may not message a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The sender has blocked the receiver.
    YouBlocked,
    /// The receiver has blocked the sender.
    UserBlocked,
    /// No mutually accepted relationship yet.
    NotAccepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPermission {
    pub can_send: bool,
    pub reason: Option<DenyReason>,
}

impl SendPermission {
    pub fn allowed() -> Self {
        Self {
            can_send: true,
            reason: None,
        }
    }

    pub fn denied(reason: DenyReason) -> Self {
        Self {
            can_send: false,
            reason: Some(reason),
        }
    }
}

/// Account and relationship lookups the message utility depends on.
///
/// Lookups run on the caller's session so they see the same transaction as
/// the writes that follow them.
pub trait ContactDirectory {
    fn is_valid_user_id(&self, uid: i64) -> bool {
        uid > 0
    }

    fn user_exists<M: Mode>(&self, session: &DbSession<M>, uid: i64) -> courier_db::Result<bool>;

    fn has_contact_with<M: Mode>(
        &self,
        session: &DbSession<M>,
        uid: i64,
        other_uid: i64,
    ) -> courier_db::Result<bool>;

    fn can_send_message<M: Mode>(
        &self,
        session: &DbSession<M>,
        sender_uid: i64,
        receiver_uid: i64,
    ) -> courier_db::Result<SendPermission>;
}

/// Directory backed by the `account` and `contact` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlContactDirectory;

impl ContactDirectory for SqlContactDirectory {
    fn user_exists<M: Mode>(&self, session: &DbSession<M>, uid: i64) -> courier_db::Result<bool> {
        queries::account_exists(session, uid)
    }

    fn has_contact_with<M: Mode>(
        &self,
        session: &DbSession<M>,
        uid: i64,
        other_uid: i64,
    ) -> courier_db::Result<bool> {
        let status = queries::contact_status(session, uid, other_uid)?;
        Ok(status.is_some_and(|s| s != ContactStatus::Deleted))
    }

    fn can_send_message<M: Mode>(
        &self,
        session: &DbSession<M>,
        sender_uid: i64,
        receiver_uid: i64,
    ) -> courier_db::Result<SendPermission> {
        let outgoing = queries::contact_status(session, sender_uid, receiver_uid)?;
        let incoming = queries::contact_status(session, receiver_uid, sender_uid)?;

        Ok(match (outgoing, incoming) {
            (Some(ContactStatus::Blocked), _) => SendPermission::denied(DenyReason::YouBlocked),
            (_, Some(ContactStatus::Blocked)) => SendPermission::denied(DenyReason::UserBlocked),
            (Some(ContactStatus::Accepted), Some(ContactStatus::Accepted)) => SendPermission::allowed(),
            _ => SendPermission::denied(DenyReason::NotAccepted),
        })
    }
}
