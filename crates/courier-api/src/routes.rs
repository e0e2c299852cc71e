use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::error;

use courier_db::{DbPool, DbSession};
use courier_types::api::{DecryptedMessageInput, SendMessageRequest};
use courier_types::models::{DecryptedMessage, Message};

use crate::contacts::SqlContactDirectory;
use crate::messages::MessageUtils;
use crate::response::Envelope;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub pool: DbPool,
    pub directory: SqlContactDirectory,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/messages/{sender_uid}/{receiver_uid}",
            get(fetch_message).post(send_message),
        )
        .route(
            "/messages/{sender_uid}/{receiver_uid}/decrypted",
            get(fetch_decrypted_messages).post(store_decrypted_messages),
        )
        .route("/health", get(health))
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn send_message(
    State(state): State<AppState>,
    Path((sender_uid, receiver_uid)): Path<(i64, i64)>,
    Json(req): Json<SendMessageRequest>,
) -> Envelope<Message> {
    run_unit_of_work("Failed to send message.", move || {
        let mut session = DbSession::read_write(&state.pool)?;
        let envelope = MessageUtils::new(&session, &state.directory).send_message(
            sender_uid,
            receiver_uid,
            &req.content,
            &req.nonce,
        );
        session.complete(envelope.is_success().into())?;
        Ok(envelope)
    })
    .await
}

pub async fn fetch_message(
    State(state): State<AppState>,
    Path((sender_uid, receiver_uid)): Path<(i64, i64)>,
) -> Envelope<Vec<Message>> {
    run_unit_of_work("Failed to fetch messages.", move || {
        let mut session = DbSession::read_only(&state.pool)?;
        let envelope =
            MessageUtils::new(&session, &state.directory).fetch_message(sender_uid, receiver_uid);
        session.complete();
        Ok(envelope)
    })
    .await
}

pub async fn store_decrypted_messages(
    State(state): State<AppState>,
    Path((sender_uid, receiver_uid)): Path<(i64, i64)>,
    Json(messages): Json<Vec<DecryptedMessageInput>>,
) -> Envelope<Vec<DecryptedMessage>> {
    run_unit_of_work("Error processing message", move || {
        let mut session = DbSession::read_write(&state.pool)?;
        let envelope = MessageUtils::new(&session, &state.directory).store_decrypted_messages(
            sender_uid,
            receiver_uid,
            &messages,
        );
        session.complete(envelope.is_success().into())?;
        Ok(envelope)
    })
    .await
}

pub async fn fetch_decrypted_messages(
    State(state): State<AppState>,
    Path((sender_uid, receiver_uid)): Path<(i64, i64)>,
) -> Envelope<Vec<DecryptedMessage>> {
    run_unit_of_work("Failed to fetch messages.", move || {
        let mut session = DbSession::read_only(&state.pool)?;
        let envelope = MessageUtils::new(&session, &state.directory)
            .fetch_decrypted_messages(sender_uid, receiver_uid);
        session.complete();
        Ok(envelope)
    })
    .await
}

/// Run one session's worth of blocking DB work off the async runtime.
/// Pool and session failures become a generic internal-error envelope.
async fn run_unit_of_work<T, F>(failure: &'static str, work: F) -> Envelope<T>
where
    T: Send + 'static,
    F: FnOnce() -> courier_db::Result<Envelope<T>> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(envelope)) => envelope,
        Ok(Err(e)) => {
            error!("{} {}", failure, e);
            Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, failure)
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, failure)
        }
    }
}
