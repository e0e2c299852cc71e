#![allow(dead_code)]

use courier_db::{DbConfig, DbPool, DbSession, ensure_tables_created};
use tempfile::TempDir;

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;
pub const CAROL: i64 = 3;

/// Fresh database with three accounts (alice=1, bob=2, carol=3) and no contacts.
pub fn seeded_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = DbPool::open(&DbConfig::new(dir.path().join("courier.db"))).unwrap();
    ensure_tables_created(&pool).unwrap();

    let mut session = DbSession::read_write(&pool).unwrap();
    session
        .execute_batch(
            "INSERT INTO account (username, password_hash) VALUES ('alice', 'h');
             INSERT INTO account (username, password_hash) VALUES ('bob', 'h');
             INSERT INTO account (username, password_hash) VALUES ('carol', 'h');",
        )
        .unwrap();
    session.commit().unwrap();
    (dir, pool)
}

/// Set the directed relationship `from -> to`.
pub fn set_contact(pool: &DbPool, from: i64, to: i64, status: &str) {
    let mut session = DbSession::read_write(pool).unwrap();
    session
        .execute(
            "INSERT INTO contact (user_id, contact_user_id, status) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, contact_user_id) DO UPDATE SET status = excluded.status",
            (from, to, status),
        )
        .unwrap();
    session.commit().unwrap();
}

pub fn befriend(pool: &DbPool, a: i64, b: i64) {
    set_contact(pool, a, b, "accepted");
    set_contact(pool, b, a, "accepted");
}

pub fn count_rows(pool: &DbPool, table: &str) -> i64 {
    let mut session = DbSession::read_only(pool).unwrap();
    let n = session
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap();
    session.complete();
    n
}
