//! Concurrency properties of the circulation engine.
//!
//! Every test shares one engine across caller threads and checks that the
//! lock-protected check-and-mutate sequences hold up: no oversell, no
//! borrow-limit race, no double terminal transition, and stock conservation
//! under churn.

use chrono::{TimeZone, Utc};
use circulation_engine::{
    BookId, CirculationEngine, CirculationError, Ledger, ManualClock, Money, NewBook, NewReader,
    ReaderId,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn setup() -> (Arc<CirculationEngine>, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::new());
    let clock = Arc::new(ManualClock::starting_at(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let engine = Arc::new(CirculationEngine::with_clock(Arc::clone(&ledger), clock));
    (engine, ledger)
}

fn add_book(ledger: &Ledger, isbn: &str, copies: u32) -> BookId {
    ledger
        .add_book(NewBook {
            title: format!("Title {}", isbn),
            author: "Author".to_string(),
            publisher: String::new(),
            isbn: isbn.to_string(),
            category: String::new(),
            price: Money::ZERO,
            total_copies: copies,
        })
        .unwrap()
}

fn add_reader(ledger: &Ledger, account: &str, limit: u32) -> ReaderId {
    ledger
        .register_reader(NewReader {
            account_name: account.to_string(),
            password_hash: String::new(),
            real_name: account.to_string(),
            id_card: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            borrow_limit: limit,
        })
        .unwrap()
}

#[test]
fn test_no_oversell_under_concurrent_borrows() {
    let (engine, ledger) = setup();
    let book = add_book(&ledger, "isbn-1", 3);

    let readers: Vec<ReaderId> = (0..8)
        .map(|n| add_reader(&ledger, &format!("reader-{}", n), 5))
        .collect();

    let barrier = Arc::new(Barrier::new(readers.len()));
    let handles: Vec<_> = readers
        .into_iter()
        .map(|reader| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.borrow(reader, book)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(CirculationError::OutOfStock(_))))
        .count();

    assert_eq!(successes, 3);
    assert_eq!(rejections, 5);

    let snapshot = ledger.book(book).unwrap();
    assert_eq!(snapshot.available_copies, 0);
    assert_eq!(snapshot.active_borrows, 3);
}

#[test]
fn test_borrow_limit_holds_under_concurrency() {
    let (engine, ledger) = setup();
    let reader = add_reader(&ledger, "ada", 3);

    let books: Vec<BookId> = (0..8)
        .map(|n| add_book(&ledger, &format!("isbn-{}", n), 1))
        .collect();

    let barrier = Arc::new(Barrier::new(books.len()));
    let handles: Vec<_> = books
        .into_iter()
        .map(|book| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.borrow(reader, book)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(CirculationError::BorrowLimitExceeded { .. })))
        .count();

    assert_eq!(successes, 3);
    assert_eq!(rejections, 5);
    assert_eq!(ledger.active_loans_of(reader).unwrap().len(), 3);
}

#[test]
fn test_concurrent_returns_close_the_loan_once() {
    let (engine, ledger) = setup();
    let book = add_book(&ledger, "isbn-1", 1);
    let reader = add_reader(&ledger, "ada", 5);
    let receipt = engine.borrow(reader, book).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let borrow_id = receipt.borrow_id;
            thread::spawn(move || {
                barrier.wait();
                engine.return_book(borrow_id)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let not_found = results
        .iter()
        .filter(|r| matches!(r, Err(CirculationError::RecordNotFound(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(not_found, 1);

    // Exactly one increment reached the shelf.
    let snapshot = ledger.book(book).unwrap();
    assert_eq!(snapshot.available_copies, 1);
    assert_eq!(snapshot.active_borrows, 0);
}

#[test]
fn test_return_and_renew_race_is_deterministic() {
    let (engine, ledger) = setup();
    let book = add_book(&ledger, "isbn-1", 1);
    let reader = add_reader(&ledger, "ada", 5);
    let receipt = engine.borrow(reader, book).unwrap();

    let barrier = Arc::new(Barrier::new(2));

    let return_handle = {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let borrow_id = receipt.borrow_id;
        thread::spawn(move || {
            barrier.wait();
            engine.return_book(borrow_id)
        })
    };
    let renew_handle = {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let borrow_id = receipt.borrow_id;
        thread::spawn(move || {
            barrier.wait();
            engine.renew(borrow_id)
        })
    };

    let return_result = return_handle.join().unwrap();
    let renew_result = renew_handle.join().unwrap();

    // The return always lands; the renew either beat it or observed the
    // terminal state. Never two terminal transitions.
    assert!(return_result.is_ok());
    let record = ledger.borrow_record(receipt.borrow_id).unwrap();
    assert!(!record.is_active());
    match renew_result {
        Ok(_) => assert_eq!(record.renewal_count, 1),
        Err(CirculationError::NotRenewable(_)) => assert_eq!(record.renewal_count, 0),
        Err(other) => panic!("unexpected renew outcome: {}", other),
    }

    let snapshot = ledger.book(book).unwrap();
    assert_eq!(snapshot.available_copies, 1);
    assert_eq!(snapshot.active_borrows, 0);
}

#[test]
fn test_stock_conserved_under_churn() {
    let (engine, ledger) = setup();
    let book = add_book(&ledger, "isbn-1", 4);

    let readers: Vec<ReaderId> = (0..6)
        .map(|n| add_reader(&ledger, &format!("reader-{}", n), 2))
        .collect();

    let barrier = Arc::new(Barrier::new(readers.len()));
    let handles: Vec<_> = readers
        .into_iter()
        .map(|reader| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..25 {
                    match engine.borrow(reader, book) {
                        Ok(receipt) => loop {
                            match engine.return_book(receipt.borrow_id) {
                                Ok(_) => break,
                                Err(e) if e.is_retryable() => continue,
                                Err(e) => panic!("unexpected return failure: {}", e),
                            }
                        },
                        Err(CirculationError::OutOfStock(_)) => {}
                        Err(e) if e.is_retryable() => {}
                        Err(e) => panic!("unexpected borrow failure: {}", e),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = ledger.book(book).unwrap();
    assert_eq!(
        snapshot.available_copies + snapshot.active_borrows,
        snapshot.total_copies
    );
    assert_eq!(snapshot.available_copies, 4);
    assert_eq!(snapshot.active_borrows, 0);
}
