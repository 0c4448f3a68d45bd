//! CSV event-log replay.
//!
//! Adapts the engine to a batch setting: a chronological event log is
//! played against a fresh ledger, each rejected or malformed row is logged
//! at warn level and skipped, and the final inventory is written back out
//! as CSV sorted by book id.

use crate::book::NewBook;
use crate::clock::ManualClock;
use crate::engine::CirculationEngine;
use crate::error::Result;
use crate::id::{BookId, BorrowId, FineId, ReaderId};
use crate::ledger::Ledger;
use crate::money::Money;
use crate::reader::NewReader;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::Deserialize;
use std::io::{Read, Write};
use std::sync::Arc;

/// Raw event row as read from CSV.
///
/// Column usage depends on `op`; unused columns stay empty. A `day` value
/// moves the replay clock to that many whole days after the start of the
/// run before the event executes.
#[derive(Debug, Deserialize)]
pub struct EventRecord {
    /// Event type: add-book, add-reader, withdraw-book, borrow, return,
    /// renew, pay-fine
    pub op: String,

    #[serde(default)]
    pub day: Option<i64>,

    #[serde(default)]
    pub reader: Option<u64>,

    #[serde(default)]
    pub book: Option<u64>,

    #[serde(default)]
    pub borrow: Option<u64>,

    #[serde(default)]
    pub fine: Option<u64>,

    /// Title for add-book, account/display name for add-reader
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub isbn: Option<String>,

    #[serde(default)]
    pub copies: Option<u32>,

    #[serde(default)]
    pub limit: Option<u32>,
}

impl EventRecord {
    /// Parses the raw CSV row into a typed event.
    ///
    /// Returns `None` if the op is unknown or a required column is missing.
    pub fn parse(&self) -> Option<Event> {
        let op = self.op.trim().to_lowercase();

        let kind = match op.as_str() {
            "add-book" => EventKind::AddBook {
                name: self.name.clone()?,
                isbn: self.isbn.clone()?,
                copies: self.copies?,
            },
            "add-reader" => EventKind::AddReader {
                name: self.name.clone()?,
                limit: self.limit?,
            },
            "withdraw-book" => EventKind::WithdrawBook(BookId(self.book?)),
            "borrow" => EventKind::Borrow {
                reader: ReaderId(self.reader?),
                book: BookId(self.book?),
            },
            "return" => EventKind::Return(BorrowId(self.borrow?)),
            "renew" => EventKind::Renew(BorrowId(self.borrow?)),
            "pay-fine" => EventKind::PayFine(FineId(self.fine?)),
            _ => return None,
        };

        Some(Event {
            day: self.day,
            kind,
        })
    }
}

/// A parsed event ready for replay.
#[derive(Debug, Clone)]
pub struct Event {
    /// Whole days since the start of the run, if the row moves the clock.
    pub day: Option<i64>,

    pub kind: EventKind,
}

/// Event variants with their parameters.
#[derive(Debug, Clone)]
pub enum EventKind {
    AddBook {
        name: String,
        isbn: String,
        copies: u32,
    },
    AddReader {
        name: String,
        limit: u32,
    },
    WithdrawBook(BookId),
    Borrow {
        reader: ReaderId,
        book: BookId,
    },
    Return(BorrowId),
    Renew(BorrowId),
    PayFine(FineId),
}

/// Replays an event log against a fresh ledger.
///
/// Entity identifiers are allocated sequentially per entity family, so a
/// script can reference the first added book as `1`, the first loan it
/// opens as `1`, and so on.
pub struct BatchRunner {
    ledger: Arc<Ledger>,
    engine: CirculationEngine,
    clock: Arc<ManualClock>,
}

impl BatchRunner {
    /// Creates a runner whose clock starts frozen at `start` (day 0).
    pub fn new(start: DateTime<Utc>) -> Self {
        let ledger = Arc::new(Ledger::new());
        let clock = Arc::new(ManualClock::starting_at(start));
        let engine = CirculationEngine::with_clock(Arc::clone(&ledger), clock.clone());
        BatchRunner {
            ledger,
            engine,
            clock,
        }
    }

    /// The ledger the replay populates.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Processes events from a CSV reader in order.
    ///
    /// Records are read one at a time; invalid or rejected rows are logged
    /// at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<EventRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse() {
                    Some(event) => self.apply(event, row_num),
                    None => warn!("Row {}: unrecognized or incomplete event", row_num),
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Applies a single event, logging the outcome.
    fn apply(&mut self, event: Event, row: usize) {
        if let Some(day) = event.day {
            self.clock.jump_to_day(day);
        }

        let outcome = match event.kind {
            EventKind::AddBook { name, isbn, copies } => self
                .ledger
                .add_book(NewBook {
                    title: name,
                    author: String::new(),
                    publisher: String::new(),
                    isbn,
                    category: String::new(),
                    price: Money::ZERO,
                    total_copies: copies,
                })
                .map(|id| debug!("Row {}: added book {}", row, id)),
            EventKind::AddReader { name, limit } => self
                .ledger
                .register_reader(NewReader {
                    account_name: name.clone(),
                    password_hash: String::new(),
                    real_name: name,
                    id_card: String::new(),
                    phone: String::new(),
                    email: String::new(),
                    address: String::new(),
                    borrow_limit: limit,
                })
                .map(|id| debug!("Row {}: registered reader {}", row, id)),
            EventKind::WithdrawBook(book) => self
                .ledger
                .withdraw_book(book)
                .map(|_| debug!("Row {}: withdrew book {}", row, book)),
            EventKind::Borrow { reader, book } => self.engine.borrow(reader, book).map(|r| {
                debug!(
                    "Row {}: opened loan {} due {}",
                    row, r.borrow_id, r.due_at
                )
            }),
            EventKind::Return(borrow) => self.engine.return_book(borrow).map(|r| {
                debug!(
                    "Row {}: closed loan {}, {} days overdue, fine {}",
                    row, borrow, r.overdue_days, r.fine_amount
                )
            }),
            EventKind::Renew(borrow) => self
                .engine
                .renew(borrow)
                .map(|r| debug!("Row {}: renewed loan {} until {}", row, borrow, r.due_at)),
            EventKind::PayFine(fine) => self
                .engine
                .pay_fine(fine)
                .map(|r| debug!("Row {}: settled fine {} ({})", row, fine, r.amount)),
        };

        if let Err(e) = outcome {
            warn!("Row {}: {}", row, e);
        }
    }

    /// Writes the final inventory as CSV, sorted by book id.
    pub fn write_inventory<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["book", "title", "available", "active", "total", "status"])?;

        for book in self.ledger.books()? {
            csv_writer.write_record([
                book.id.to_string(),
                book.title.clone(),
                book.available_copies.to_string(),
                book.active_borrows.to_string(),
                book.total_copies.to_string(),
                book.status.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
