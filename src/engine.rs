//! The circulation transaction engine.
//!
//! Each operation runs as one atomic transaction: every row and table it
//! touches is locked before the first check, and every fallible step runs
//! before the first write, so a failure never leaves partial state behind.
//! Lock waits are bounded; contention surfaces as the retryable
//! [`CirculationError::Busy`].
//!
//! Lock order: reader row, then book row, then the borrow table, then the
//! fine table.

use crate::clock::{Clock, SystemClock};
use crate::eligibility;
use crate::error::{CirculationError, Result};
use crate::id::{BookId, BorrowId, FineId, ReaderId};
use crate::ledger::{lock_row, Ledger};
use crate::money::Money;
use crate::record::{BorrowRecord, FineRecord};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Fixed loan period, also used for renewals.
pub const LOAN_PERIOD_DAYS: i64 = 30;

/// Fine accrued per whole overdue day, in cents.
const DAILY_FINE_CENTS: i64 = 50;

/// `overdue_days × per-day rate`, rounded half-up to cents.
fn fine_for(overdue_days: i64) -> Money {
    Money::new(Decimal::new(DAILY_FINE_CENTS, 2)) * overdue_days
}

/// Receipt for a successful borrow.
#[derive(Debug, Clone)]
pub struct BorrowReceipt {
    pub borrow_id: BorrowId,
    pub due_at: DateTime<Utc>,
}

/// Receipt for a successful return.
#[derive(Debug, Clone)]
pub struct ReturnReceipt {
    pub overdue_days: i64,

    /// Zero when the loan came back on time.
    pub fine_amount: Money,

    /// Present iff the return was late.
    pub fine_id: Option<FineId>,
}

/// Receipt for a successful renewal.
#[derive(Debug, Clone)]
pub struct RenewReceipt {
    pub due_at: DateTime<Utc>,
}

/// Receipt for a settled fine.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub fine_id: FineId,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
}

/// Orchestrates borrow, return, renew, and pay-fine over the ledger.
///
/// The engine is shared across caller threads (`&self` operations); the
/// caller supplies the authenticated reader identity with each request, and
/// no reader or book state is cached between operations.
pub struct CirculationEngine {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl CirculationEngine {
    /// Creates an engine on wall-clock time.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_clock(ledger, Arc::new(SystemClock))
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> Self {
        CirculationEngine { ledger, clock }
    }

    /// The ledger this engine operates on.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Lends one copy of `book_id` to `reader_id` for 30 days.
    ///
    /// Eligibility (account active, under the borrow limit, no unpaid
    /// fines) is checked before stock, with the reader row locked so two
    /// simultaneous borrows from the same reader cannot both slip under the
    /// limit. Stock is checked and decremented under the book row lock.
    pub fn borrow(&self, reader_id: ReaderId, book_id: BookId) -> Result<BorrowReceipt> {
        let now = self.clock.now();

        let reader_row = self.ledger.reader_row(reader_id)?;
        let reader = lock_row(&reader_row)?;
        let book_row = self.ledger.book_row(book_id)?;
        let mut book = lock_row(&book_row)?;
        let mut borrows = self.ledger.borrows_write()?;
        let fines = self.ledger.fines_read()?;

        eligibility::check_eligible(&reader, &borrows, &fines)?;
        book.checkout_copy()?;

        let due_at = now + Duration::days(LOAN_PERIOD_DAYS);
        let id = self.ledger.next_borrow_id();
        borrows.insert(id, BorrowRecord::open(id, book_id, reader_id, now, due_at));

        debug!(
            "reader {} borrowed book {} as loan {}, due {}",
            reader_id, book_id, id, due_at
        );
        Ok(BorrowReceipt {
            borrow_id: id,
            due_at,
        })
    }

    /// Takes back the copy out on `borrow_id`, assessing a fine when late.
    ///
    /// Overdue days count whole elapsed days past the due date, floored and
    /// never negative; a copy back one hour late owes nothing.
    pub fn return_book(&self, borrow_id: BorrowId) -> Result<ReturnReceipt> {
        let now = self.clock.now();

        // Peek to learn which book row to lock; re-checked under the write
        // guard in case a concurrent return wins the race.
        let book_id = {
            let borrows = self.ledger.borrows_read()?;
            borrows
                .get(&borrow_id)
                .filter(|r| r.is_active())
                .map(|r| r.book_id)
                .ok_or(CirculationError::RecordNotFound(borrow_id))?
        };

        let book_row = self.ledger.book_row(book_id)?;
        let mut book = lock_row(&book_row)?;
        let mut borrows = self.ledger.borrows_write()?;
        let record = borrows
            .get_mut(&borrow_id)
            .filter(|r| r.is_active())
            .ok_or(CirculationError::RecordNotFound(borrow_id))?;

        let overdue_days = (now - record.due_at).num_days().max(0);

        // Everything that can fail happens before the first write.
        let mut fines = if overdue_days > 0 {
            Some(self.ledger.fines_write()?)
        } else {
            None
        };
        book.return_copy()?;
        record.mark_returned(now, overdue_days);

        let (fine_amount, fine_id) = match fines.as_mut() {
            Some(fines) => {
                let amount = fine_for(overdue_days);
                let fine_id = self.ledger.next_fine_id();
                fines.insert(
                    fine_id,
                    FineRecord::assess(fine_id, record, overdue_days, amount),
                );
                (amount, Some(fine_id))
            }
            None => (Money::ZERO, None),
        };

        debug!(
            "loan {} returned, {} days overdue, fine {}",
            borrow_id, overdue_days, fine_amount
        );
        Ok(ReturnReceipt {
            overdue_days,
            fine_amount,
            fine_id,
        })
    }

    /// Extends the due date of `borrow_id` by 30 days, once per loan.
    ///
    /// Overdue loans are not renewable: a copy already past its due date
    /// must come back (and settle its fine) instead.
    pub fn renew(&self, borrow_id: BorrowId) -> Result<RenewReceipt> {
        let now = self.clock.now();

        let mut borrows = self.ledger.borrows_write()?;
        let record = borrows
            .get_mut(&borrow_id)
            .ok_or(CirculationError::RecordNotFound(borrow_id))?;

        if record.renewal_count >= 1 {
            return Err(CirculationError::AlreadyRenewed(borrow_id));
        }
        if !record.is_active() || now > record.due_at {
            return Err(CirculationError::NotRenewable(borrow_id));
        }

        let due_at = record.due_at + Duration::days(LOAN_PERIOD_DAYS);
        record.mark_renewed(due_at);

        debug!("loan {} renewed, now due {}", borrow_id, due_at);
        Ok(RenewReceipt { due_at })
    }

    /// Settles the fine `fine_id`.
    ///
    /// Borrowing unblocks only once the reader has no unpaid fine left; the
    /// next borrow re-counts them rather than trusting any cached flag.
    pub fn pay_fine(&self, fine_id: FineId) -> Result<PaymentReceipt> {
        let now = self.clock.now();

        let mut fines = self.ledger.fines_write()?;
        let fine = fines
            .get_mut(&fine_id)
            .filter(|f| f.is_unpaid())
            .ok_or(CirculationError::AlreadyPaidOrMissing(fine_id))?;
        fine.mark_paid(now);

        debug!("fine {} paid ({})", fine_id, fine.amount);
        Ok(PaymentReceipt {
            fine_id,
            amount: fine.amount,
            paid_at: now,
        })
    }
}
