//! Book rows and the stock operations that guard them.
//!
//! Maintains the invariant: `available_copies + active_borrows == total_copies`.

use crate::error::{CirculationError, Result};
use crate::id::BookId;
use crate::money::Money;
use serde::Serialize;
use std::fmt;

/// Whether a title is circulating or pulled from the shelves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Active,
    Withdrawn,
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookStatus::Active => write!(f, "active"),
            BookStatus::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

/// A catalog title and its copy counters.
///
/// # Invariants
///
/// - `available_copies + active_borrows == total_copies` after every operation
/// - Copies are fungible: the counters track how many are out, not which ones
///
/// The counters change only through [`Book::checkout_copy`] and
/// [`Book::return_copy`], called by the engine while it holds this row's
/// lock, so no other transaction can observe a window between a stock check
/// and the matching write.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    /// Unique catalog identifier.
    pub id: BookId,

    pub title: String,
    pub author: String,
    pub publisher: String,

    /// Unique across the catalog.
    pub isbn: String,

    pub category: String,
    pub price: Money,

    /// Physical copies owned by the library.
    pub total_copies: u32,

    /// Copies currently on the shelf.
    pub available_copies: u32,

    /// Copies currently out on active loans.
    pub active_borrows: u32,

    pub status: BookStatus,
}

/// Fields supplied when a title is added to the catalog.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub category: String,
    pub price: Money,
    pub total_copies: u32,
}

impl Book {
    /// Creates a catalog row with every copy on the shelf.
    pub(crate) fn new(id: BookId, new: NewBook) -> Self {
        Book {
            id,
            title: new.title,
            author: new.author,
            publisher: new.publisher,
            isbn: new.isbn,
            category: new.category,
            price: new.price,
            total_copies: new.total_copies,
            available_copies: new.total_copies,
            active_borrows: 0,
            status: BookStatus::Active,
        }
    }

    /// Returns `true` if the title has been withdrawn from circulation.
    pub fn is_withdrawn(&self) -> bool {
        self.status == BookStatus::Withdrawn
    }

    /// Takes one copy off the shelf for a new loan.
    ///
    /// Fails with [`CirculationError::OutOfStock`] when no copies are
    /// available or the title is withdrawn.
    pub(crate) fn checkout_copy(&mut self) -> Result<()> {
        if self.available_copies == 0 || self.is_withdrawn() {
            return Err(CirculationError::OutOfStock(self.id));
        }

        self.available_copies -= 1;
        self.active_borrows += 1;
        Ok(())
    }

    /// Puts a returned copy back on the shelf.
    ///
    /// Withdrawn titles still accept returns of outstanding copies. Failing
    /// a bounds check here means the counters were corrupted; that is the
    /// internal [`CirculationError::Inconsistent`] fault, not a user error.
    pub(crate) fn return_copy(&mut self) -> Result<()> {
        if self.active_borrows == 0 || self.available_copies >= self.total_copies {
            return Err(CirculationError::Inconsistent(format!(
                "book {} counters out of range: {} available, {} active, {} total",
                self.id, self.available_copies, self.active_borrows, self.total_copies
            )));
        }

        self.active_borrows -= 1;
        self.available_copies += 1;
        Ok(())
    }

    /// Verifies the invariant: `available_copies + active_borrows == total_copies`.
    #[cfg(debug_assertions)]
    pub fn check_invariant(&self) -> bool {
        self.available_copies + self.active_borrows == self.total_copies
    }
}
