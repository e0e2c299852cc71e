use courier_db::{DbConfig, DbError, DbPool, DbSession, ensure_tables_created};
use tempfile::TempDir;

fn fresh_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = DbPool::open(&DbConfig::new(dir.path().join("schema.db"))).unwrap();
    (dir, pool)
}

fn table_names(pool: &DbPool) -> Vec<String> {
    let mut session = DbSession::read_only(pool).unwrap();
    let names = session
        .query_map(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            [],
            |row| row.get(0),
        )
        .unwrap();
    session.complete();
    names
}

fn seed_two_accounts(pool: &DbPool) {
    let mut session = DbSession::read_write(pool).unwrap();
    session
        .execute_batch(
            "INSERT INTO account (username, password_hash) VALUES ('alice', 'h1');
             INSERT INTO account (username, password_hash) VALUES ('bob', 'h2');",
        )
        .unwrap();
    session.commit().unwrap();
}

#[test]
fn creates_all_four_tables() {
    let (_dir, pool) = fresh_pool();
    ensure_tables_created(&pool).unwrap();

    assert_eq!(
        table_names(&pool),
        vec!["account", "contact", "decrypted_messages", "message"]
    );
}

#[test]
fn second_run_succeeds_and_keeps_rows() {
    let (_dir, pool) = fresh_pool();
    ensure_tables_created(&pool).unwrap();
    seed_two_accounts(&pool);

    let mut session = DbSession::read_write(&pool).unwrap();
    session
        .execute(
            "INSERT INTO message (sender_uid, receiver_uid, content, nonce) VALUES (1, 2, 'c', 'n')",
            [],
        )
        .unwrap();
    session.commit().unwrap();

    ensure_tables_created(&pool).unwrap();

    let mut session = DbSession::read_only(&pool).unwrap();
    let accounts: i64 = session
        .query_row("SELECT COUNT(*) FROM account", [], |row| row.get(0))
        .unwrap();
    let messages: i64 = session
        .query_row("SELECT COUNT(*) FROM message", [], |row| row.get(0))
        .unwrap();
    session.complete();
    assert_eq!(accounts, 2);
    assert_eq!(messages, 1);
}

#[test]
fn contact_status_is_restricted() {
    let (_dir, pool) = fresh_pool();
    ensure_tables_created(&pool).unwrap();
    seed_two_accounts(&pool);

    let mut session = DbSession::read_write(&pool).unwrap();
    let err = session
        .execute(
            "INSERT INTO contact (user_id, contact_user_id, status) VALUES (1, 2, 'friends')",
            [],
        )
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));

    let default_status: String = session
        .query_row(
            "INSERT INTO contact (user_id, contact_user_id) VALUES (1, 2) RETURNING status",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(default_status, "incoming_request");
    session.rollback().unwrap();
}

#[test]
fn one_contact_row_per_directed_pair() {
    let (_dir, pool) = fresh_pool();
    ensure_tables_created(&pool).unwrap();
    seed_two_accounts(&pool);

    let mut session = DbSession::read_write(&pool).unwrap();
    session
        .execute(
            "INSERT INTO contact (user_id, contact_user_id, status) VALUES (1, 2, 'accepted')",
            [],
        )
        .unwrap();
    // The reverse direction is a different row.
    session
        .execute(
            "INSERT INTO contact (user_id, contact_user_id, status) VALUES (2, 1, 'accepted')",
            [],
        )
        .unwrap();
    assert!(
        session
            .execute(
                "INSERT INTO contact (user_id, contact_user_id, status) VALUES (1, 2, 'blocked')",
                [],
            )
            .is_err()
    );
    session.commit().unwrap();
}

#[test]
fn messages_must_reference_existing_accounts() {
    let (_dir, pool) = fresh_pool();
    ensure_tables_created(&pool).unwrap();
    seed_two_accounts(&pool);

    let mut session = DbSession::read_write(&pool).unwrap();
    let err = session
        .execute(
            "INSERT INTO message (sender_uid, receiver_uid, content, nonce) VALUES (1, 99, 'c', 'n')",
            [],
        )
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
    session.rollback().unwrap();
}
