//! The ledger store: the only owner of persisted circulation state.
//!
//! Books and readers are row-locked (`Arc<Mutex<_>>` per row inside a map);
//! borrow and fine records live in tables whose write guard doubles as the
//! record-level lock. Every acquisition is bounded by [`LOCK_WAIT`]; a
//! timeout surfaces as the retryable [`CirculationError::Busy`] instead of
//! waiting forever behind a pile-up.
//!
//! Lock order everywhere in this crate: reader row, then book row, then the
//! borrow table, then the fine table.

use crate::book::{Book, BookStatus, NewBook};
use crate::error::{CirculationError, Result};
use crate::id::{BookId, BorrowId, FineId, ReaderId};
use crate::reader::{NewReader, Reader, ReaderStatus};
use crate::record::{BorrowRecord, FineRecord};
use log::debug;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on any single lock wait.
pub const LOCK_WAIT: Duration = Duration::from_millis(500);

/// Unique-key indexes maintained alongside the row maps.
#[derive(Debug, Default)]
struct UniqueIndexes {
    isbns: HashSet<String>,
    account_names: HashSet<String>,
    id_cards: HashSet<String>,
}

/// Durable record storage for books, readers, borrow records, and fine
/// records.
///
/// All mutation flows through the engine's transactions or the catalog
/// operations below; callers outside the crate only see cloned snapshots.
pub struct Ledger {
    books: RwLock<HashMap<BookId, Arc<Mutex<Book>>>>,
    readers: RwLock<HashMap<ReaderId, Arc<Mutex<Reader>>>>,
    borrows: RwLock<HashMap<BorrowId, BorrowRecord>>,
    fines: RwLock<HashMap<FineId, FineRecord>>,
    indexes: Mutex<UniqueIndexes>,
    book_id_seq: AtomicU64,
    reader_id_seq: AtomicU64,
    borrow_id_seq: AtomicU64,
    fine_id_seq: AtomicU64,
}

/// Acquires a row lock, bounded by [`LOCK_WAIT`].
pub(crate) fn lock_row<T>(row: &Arc<Mutex<T>>) -> Result<MutexGuard<'_, T>> {
    row.try_lock_for(LOCK_WAIT).ok_or(CirculationError::Busy)
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger {
            books: RwLock::new(HashMap::new()),
            readers: RwLock::new(HashMap::new()),
            borrows: RwLock::new(HashMap::new()),
            fines: RwLock::new(HashMap::new()),
            indexes: Mutex::new(UniqueIndexes::default()),
            book_id_seq: AtomicU64::new(1),
            reader_id_seq: AtomicU64::new(1),
            borrow_id_seq: AtomicU64::new(1),
            fine_id_seq: AtomicU64::new(1),
        }
    }

    // ---- catalog & registration -------------------------------------------

    /// Adds a title to the catalog with every copy on the shelf.
    ///
    /// The ISBN must be unique across the catalog.
    pub fn add_book(&self, new: NewBook) -> Result<BookId> {
        if new.total_copies == 0 {
            return Err(CirculationError::Invalid(
                "a title needs at least one copy".to_string(),
            ));
        }
        if new.isbn.trim().is_empty() {
            return Err(CirculationError::Invalid("a title needs an ISBN".to_string()));
        }

        let mut indexes = self
            .indexes
            .try_lock_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        if indexes.isbns.contains(&new.isbn) {
            return Err(CirculationError::DuplicateIsbn(new.isbn));
        }

        let mut books = self
            .books
            .try_write_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        let id = BookId(self.book_id_seq.fetch_add(1, Ordering::Relaxed));
        indexes.isbns.insert(new.isbn.clone());
        books.insert(id, Arc::new(Mutex::new(Book::new(id, new))));

        debug!("added book {} to the catalog", id);
        Ok(id)
    }

    /// Registers a reader.
    ///
    /// The account name must be unique; so must the id-card number when one
    /// is supplied. The password hash arrives pre-computed from the
    /// registration layer.
    pub fn register_reader(&self, new: NewReader) -> Result<ReaderId> {
        if new.account_name.trim().is_empty() {
            return Err(CirculationError::Invalid(
                "an account name is required".to_string(),
            ));
        }
        if new.borrow_limit == 0 {
            return Err(CirculationError::Invalid(
                "the borrow limit must be at least one".to_string(),
            ));
        }

        let mut indexes = self
            .indexes
            .try_lock_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        let id_card_taken = !new.id_card.is_empty() && indexes.id_cards.contains(&new.id_card);
        if indexes.account_names.contains(&new.account_name) || id_card_taken {
            return Err(CirculationError::DuplicateReader);
        }

        let mut readers = self
            .readers
            .try_write_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        let id = ReaderId(self.reader_id_seq.fetch_add(1, Ordering::Relaxed));
        indexes.account_names.insert(new.account_name.clone());
        if !new.id_card.is_empty() {
            indexes.id_cards.insert(new.id_card.clone());
        }
        readers.insert(id, Arc::new(Mutex::new(Reader::new(id, new))));

        debug!("registered reader {}", id);
        Ok(id)
    }

    /// Pulls a title from circulation. Outstanding copies may still be
    /// returned.
    pub fn withdraw_book(&self, id: BookId) -> Result<()> {
        let row = self.book_row(id)?;
        let mut book = lock_row(&row)?;
        book.status = BookStatus::Withdrawn;
        debug!("withdrew book {} from circulation", id);
        Ok(())
    }

    /// Disables a reader account; every later borrow attempt is rejected.
    pub fn disable_reader(&self, id: ReaderId) -> Result<()> {
        let row = self.reader_row(id)?;
        let mut reader = lock_row(&row)?;
        reader.status = ReaderStatus::Disabled;
        debug!("disabled reader {}", id);
        Ok(())
    }

    // ---- snapshots ---------------------------------------------------------

    /// Point-in-time copy of a book row.
    pub fn book(&self, id: BookId) -> Result<Book> {
        let row = self.book_row(id)?;
        let book = lock_row(&row)?;
        Ok(book.clone())
    }

    /// Point-in-time copy of a reader row.
    pub fn reader(&self, id: ReaderId) -> Result<Reader> {
        let row = self.reader_row(id)?;
        let reader = lock_row(&row)?;
        Ok(reader.clone())
    }

    /// Point-in-time copy of a borrow record.
    pub fn borrow_record(&self, id: BorrowId) -> Result<BorrowRecord> {
        let borrows = self.borrows_read()?;
        borrows
            .get(&id)
            .cloned()
            .ok_or(CirculationError::RecordNotFound(id))
    }

    /// Point-in-time copy of a fine record.
    pub fn fine(&self, id: FineId) -> Result<FineRecord> {
        let fines = self.fines_read()?;
        fines
            .get(&id)
            .cloned()
            .ok_or(CirculationError::AlreadyPaidOrMissing(id))
    }

    /// A reader's currently active loans, oldest id first.
    pub fn active_loans_of(&self, reader: ReaderId) -> Result<Vec<BorrowRecord>> {
        let borrows = self.borrows_read()?;
        let mut loans: Vec<BorrowRecord> = borrows
            .values()
            .filter(|r| r.reader_id == reader && r.is_active())
            .cloned()
            .collect();
        loans.sort_by_key(|r| r.id);
        Ok(loans)
    }

    /// A reader's unpaid fines, oldest id first.
    pub fn unpaid_fines_of(&self, reader: ReaderId) -> Result<Vec<FineRecord>> {
        let fines = self.fines_read()?;
        let mut unpaid: Vec<FineRecord> = fines
            .values()
            .filter(|f| f.reader_id == reader && f.is_unpaid())
            .cloned()
            .collect();
        unpaid.sort_by_key(|f| f.id);
        Ok(unpaid)
    }

    /// Every catalog row, sorted by book id for deterministic listings.
    pub fn books(&self) -> Result<Vec<Book>> {
        let map = self
            .books
            .try_read_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        let mut out = Vec::with_capacity(map.len());
        for row in map.values() {
            out.push(lock_row(row)?.clone());
        }
        out.sort_by_key(|b| b.id);
        Ok(out)
    }

    // ---- row and table access for the engine ------------------------------

    pub(crate) fn book_row(&self, id: BookId) -> Result<Arc<Mutex<Book>>> {
        let books = self
            .books
            .try_read_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        books
            .get(&id)
            .cloned()
            .ok_or(CirculationError::UnknownBook(id))
    }

    pub(crate) fn reader_row(&self, id: ReaderId) -> Result<Arc<Mutex<Reader>>> {
        let readers = self
            .readers
            .try_read_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)?;
        readers
            .get(&id)
            .cloned()
            .ok_or(CirculationError::UnknownReader(id))
    }

    pub(crate) fn borrows_read(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<BorrowId, BorrowRecord>>> {
        self.borrows
            .try_read_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)
    }

    pub(crate) fn borrows_write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<BorrowId, BorrowRecord>>> {
        self.borrows
            .try_write_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)
    }

    pub(crate) fn fines_read(&self) -> Result<RwLockReadGuard<'_, HashMap<FineId, FineRecord>>> {
        self.fines
            .try_read_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)
    }

    pub(crate) fn fines_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<FineId, FineRecord>>> {
        self.fines
            .try_write_for(LOCK_WAIT)
            .ok_or(CirculationError::Busy)
    }

    pub(crate) fn next_borrow_id(&self) -> BorrowId {
        BorrowId(self.borrow_id_seq.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_fine_id(&self) -> FineId {
        FineId(self.fine_id_seq.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
