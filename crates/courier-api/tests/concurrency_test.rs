//! Many units of work against one pool at the same time.

mod common;

use std::thread;

use courier_api::contacts::SqlContactDirectory;
use courier_api::messages::MessageUtils;
use courier_db::DbSession;

use common::{ALICE, BOB, befriend, count_rows, seeded_pool};

const WORKERS: usize = 8;
const SENDS_PER_WORKER: usize = 20;

#[test]
fn concurrent_sends_are_isolated_and_all_stored() {
    let (_dir, pool) = seeded_pool();
    befriend(&pool, ALICE, BOB);

    let failures: Vec<String> = thread::scope(|scope| {
        let workers: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let pool = &pool;
                scope.spawn(move || {
                    let mut failures = Vec::new();
                    for i in 0..SENDS_PER_WORKER {
                        let (sender, receiver) = if i % 2 == 0 { (ALICE, BOB) } else { (BOB, ALICE) };
                        let mut session = DbSession::read_write(pool).unwrap();
                        let envelope = MessageUtils::new(&session, &SqlContactDirectory).send_message(
                            sender,
                            receiver,
                            &format!("worker {worker} message {i}"),
                            "nonce",
                        );
                        session.complete(envelope.is_success().into()).unwrap();
                        if !envelope.is_success() {
                            failures.push(format!("{} {:?}", envelope.status_code, envelope.error));
                        }
                    }
                    failures
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert!(failures.is_empty(), "failed sends: {failures:?}");
    assert_eq!(count_rows(&pool, "message"), (WORKERS * SENDS_PER_WORKER) as i64);

    let mut session = DbSession::read_only(&pool).unwrap();
    let fetched = MessageUtils::new(&session, &SqlContactDirectory).fetch_message(ALICE, BOB);
    session.complete();
    let fetched = fetched.data.unwrap();
    assert_eq!(fetched.len(), WORKERS * SENDS_PER_WORKER);
    assert!(fetched.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
