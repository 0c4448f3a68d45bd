//! Borrow and fine records.
//!
//! A [`BorrowRecord`] moves from `Active` to exactly one terminal returned
//! state; a [`FineRecord`] moves from `Unpaid` to `Paid` exactly once. Both
//! transitions happen only through engine-held locks.

use crate::id::{BookId, BorrowId, FineId, ReaderId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of a loan. `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BorrowState {
    Active,
    ReturnedOnTime,
    ReturnedLate,
}

/// One loan of one copy.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowRecord {
    pub id: BorrowId,
    pub book_id: BookId,
    pub reader_id: ReaderId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,

    /// 0 or 1; loans renew at most once.
    pub renewal_count: u32,

    pub state: BorrowState,
}

impl BorrowRecord {
    /// Opens a new active loan.
    pub(crate) fn open(
        id: BorrowId,
        book_id: BookId,
        reader_id: ReaderId,
        borrowed_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> Self {
        BorrowRecord {
            id,
            book_id,
            reader_id,
            borrowed_at,
            due_at,
            returned_at: None,
            renewal_count: 0,
            state: BorrowState::Active,
        }
    }

    /// Returns `true` while the copy is still out.
    pub fn is_active(&self) -> bool {
        self.state == BorrowState::Active
    }

    /// Terminal transition: late iff any whole overdue day elapsed.
    pub(crate) fn mark_returned(&mut self, returned_at: DateTime<Utc>, overdue_days: i64) {
        self.returned_at = Some(returned_at);
        self.state = if overdue_days > 0 {
            BorrowState::ReturnedLate
        } else {
            BorrowState::ReturnedOnTime
        };
    }

    /// Applies the one permitted renewal.
    pub(crate) fn mark_renewed(&mut self, new_due_at: DateTime<Utc>) {
        self.due_at = new_due_at;
        self.renewal_count = 1;
    }
}

/// Settlement state of a fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FineState {
    Unpaid,
    Paid,
}

/// Penalty owed for a late return; blocks further borrowing until paid.
#[derive(Debug, Clone, Serialize)]
pub struct FineRecord {
    pub id: FineId,
    pub borrow_id: BorrowId,
    pub reader_id: ReaderId,
    pub book_id: BookId,

    /// Whole days past the due date; always positive.
    pub overdue_days: i64,

    /// `overdue_days × per-day rate`, rounded half-up to cents.
    pub amount: Money,

    pub state: FineState,
    pub paid_at: Option<DateTime<Utc>>,
}

impl FineRecord {
    /// Assesses a fine against a late return.
    pub(crate) fn assess(
        id: FineId,
        borrow: &BorrowRecord,
        overdue_days: i64,
        amount: Money,
    ) -> Self {
        FineRecord {
            id,
            borrow_id: borrow.id,
            reader_id: borrow.reader_id,
            book_id: borrow.book_id,
            overdue_days,
            amount,
            state: FineState::Unpaid,
            paid_at: None,
        }
    }

    /// Returns `true` while the fine still blocks borrowing.
    pub fn is_unpaid(&self) -> bool {
        self.state == FineState::Unpaid
    }

    /// Settles the fine.
    pub(crate) fn mark_paid(&mut self, paid_at: DateTime<Utc>) {
        self.state = FineState::Paid;
        self.paid_at = Some(paid_at);
    }
}
