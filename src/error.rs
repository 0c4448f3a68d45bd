//! Error types for the circulation engine.

use crate::id::{BookId, BorrowId, FineId, ReaderId};
use thiserror::Error;

/// Result type alias for circulation operations
pub type Result<T> = std::result::Result<T, CirculationError>;

/// Errors that can occur during circulation operations.
///
/// Business-rule rejections (out of stock, borrow limit, unpaid fines, ...)
/// are expected first-class outcomes: callers branch on the variant, never
/// on the message text. [`CirculationError::Busy`] is the only variant that
/// is safe to retry unchanged.
#[derive(Error, Debug)]
pub enum CirculationError {
    /// Malformed or out-of-range input; the caller's fault
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The referenced book is not in the catalog
    #[error("unknown book {0}")]
    UnknownBook(BookId),

    /// The referenced reader is not registered
    #[error("unknown reader {0}")]
    UnknownReader(ReaderId),

    /// The reader's account has been disabled
    #[error("reader {0} is disabled")]
    ReaderDisabled(ReaderId),

    /// No copies available, or the title has been withdrawn
    #[error("book {0} has no available copies or is withdrawn")]
    OutOfStock(BookId),

    /// The reader already holds as many active loans as allowed
    #[error("reader {reader} has reached the borrow limit of {limit}")]
    BorrowLimitExceeded { reader: ReaderId, limit: u32 },

    /// Unpaid fines block every borrow until the last one is paid
    #[error("reader {0} has unpaid fines")]
    UnpaidFineBlock(ReaderId),

    /// Borrow record missing or no longer active
    #[error("borrow record {0} does not exist or is already returned")]
    RecordNotFound(BorrowId),

    /// Loans renew at most once
    #[error("borrow record {0} has already been renewed")]
    AlreadyRenewed(BorrowId),

    /// Returned or overdue loans cannot be renewed
    #[error("borrow record {0} is not renewable")]
    NotRenewable(BorrowId),

    /// The fine is missing or was already settled
    #[error("fine record {0} is already paid or missing")]
    AlreadyPaidOrMissing(FineId),

    /// A title with this ISBN is already in the catalog
    #[error("ISBN {0} is already in the catalog")]
    DuplicateIsbn(String),

    /// Account name or id-card number already registered
    #[error("account name or id card already registered")]
    DuplicateReader,

    /// Timed out waiting for a row or table lock; safe to retry
    #[error("ledger is busy, retry the operation")]
    Busy,

    /// Counter fault detected by the inventory guard; not a caller error
    #[error("ledger inconsistency: {0}")]
    Inconsistent(String),

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: circulation-engine <events.csv>")]
    MissingArgument,
}

impl CirculationError {
    /// Returns `true` for transient failures the caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CirculationError::Busy)
    }
}
