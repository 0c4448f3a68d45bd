//! # Circulation Engine
//!
//! A transactional circulation core for a library: borrow, return, renew,
//! and pay-fine over a concurrent in-memory ledger of books, readers,
//! borrow records, and fine records.
//!
//! ## Design Principles
//!
//! - **Atomic transactions**: every operation locks what it touches before
//!   the first check and writes nothing until every check has passed
//! - **Bounded lock waits**: contention surfaces as a retryable `Busy`
//!   failure instead of a deadlock pile-up
//! - **Fixed-point arithmetic**: fines use 2 decimal places via `rust_decimal`
//! - **Typed failures**: callers branch on error variants, never messages
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use circulation_engine::BatchRunner;
//! use std::io::Cursor;
//!
//! let csv = "op,day,reader,book,borrow,fine,name,isbn,copies,limit\n\
//!            add-book,,,,,,Dune,9780441172719,2,\n\
//!            add-reader,,,,,,ada,,,5\n\
//!            borrow,0,1,1,,,,,,\n";
//! let mut runner = BatchRunner::new(Utc::now());
//! runner.process_csv(Cursor::new(csv)).unwrap();
//! runner.write_inventory(std::io::stdout()).unwrap();
//! ```

pub mod batch;
pub mod book;
pub mod clock;
mod eligibility;
pub mod engine;
pub mod error;
pub mod id;
pub mod ledger;
pub mod money;
pub mod reader;
pub mod record;
pub mod report;

pub use batch::{BatchRunner, Event, EventKind, EventRecord};
pub use book::{Book, BookStatus, NewBook};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    BorrowReceipt, CirculationEngine, PaymentReceipt, RenewReceipt, ReturnReceipt,
    LOAN_PERIOD_DAYS,
};
pub use error::{CirculationError, Result};
pub use id::{BookId, BorrowId, FineId, ReaderId};
pub use ledger::Ledger;
pub use money::Money;
pub use reader::{NewReader, Reader, ReaderStatus};
pub use record::{BorrowRecord, BorrowState, FineRecord, FineState};
pub use report::{rank_books, rank_readers, BookRank, ReaderRank, RANK_LIMIT};
