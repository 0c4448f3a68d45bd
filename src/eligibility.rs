//! Borrow eligibility checks.
//!
//! Runs inside the borrowing transaction with the reader row and both
//! record tables already locked, so the counts it takes cannot be raced
//! past by a concurrent borrow from the same reader.

use crate::error::{CirculationError, Result};
use crate::id::{BorrowId, FineId};
use crate::reader::Reader;
use crate::record::{BorrowRecord, FineRecord};
use std::collections::HashMap;

/// Decides whether `reader` may open another loan.
///
/// Counts are taken from the live tables on every call; a paid fine or a
/// returned loan is visible to the next check without any cached flag.
pub(crate) fn check_eligible(
    reader: &Reader,
    borrows: &HashMap<BorrowId, BorrowRecord>,
    fines: &HashMap<FineId, FineRecord>,
) -> Result<()> {
    if reader.is_disabled() {
        return Err(CirculationError::ReaderDisabled(reader.id));
    }

    let active_loans = borrows
        .values()
        .filter(|r| r.reader_id == reader.id && r.is_active())
        .count();
    if active_loans as u32 >= reader.borrow_limit {
        return Err(CirculationError::BorrowLimitExceeded {
            reader: reader.id,
            limit: reader.borrow_limit,
        });
    }

    if fines
        .values()
        .any(|f| f.reader_id == reader.id && f.is_unpaid())
    {
        return Err(CirculationError::UnpaidFineBlock(reader.id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{BookId, ReaderId};
    use crate::money::Money;
    use crate::reader::{NewReader, ReaderStatus};
    use chrono::{Duration, TimeZone, Utc};

    fn reader_with_limit(limit: u32) -> Reader {
        Reader::new(
            ReaderId(1),
            NewReader {
                account_name: "ada".to_string(),
                password_hash: String::new(),
                real_name: "Ada Lovelace".to_string(),
                id_card: "c1".to_string(),
                phone: String::new(),
                email: String::new(),
                address: String::new(),
                borrow_limit: limit,
            },
        )
    }

    fn active_loan(id: u64, reader: ReaderId) -> BorrowRecord {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        BorrowRecord::open(BorrowId(id), BookId(9), reader, at, at + Duration::days(30))
    }

    #[test]
    fn test_fresh_reader_is_eligible() {
        let reader = reader_with_limit(2);
        assert!(check_eligible(&reader, &HashMap::new(), &HashMap::new()).is_ok());
    }

    #[test]
    fn test_disabled_reader_is_rejected() {
        let mut reader = reader_with_limit(2);
        reader.status = ReaderStatus::Disabled;

        let err = check_eligible(&reader, &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, CirculationError::ReaderDisabled(_)));
    }

    #[test]
    fn test_reader_at_limit_is_rejected() {
        let reader = reader_with_limit(2);
        let mut borrows = HashMap::new();
        borrows.insert(BorrowId(1), active_loan(1, reader.id));
        borrows.insert(BorrowId(2), active_loan(2, reader.id));

        let err = check_eligible(&reader, &borrows, &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            CirculationError::BorrowLimitExceeded { limit: 2, .. }
        ));
    }

    #[test]
    fn test_returned_loans_do_not_count_toward_limit() {
        let reader = reader_with_limit(1);
        let mut loan = active_loan(1, reader.id);
        loan.mark_returned(loan.due_at, 0);
        let mut borrows = HashMap::new();
        borrows.insert(loan.id, loan);

        assert!(check_eligible(&reader, &borrows, &HashMap::new()).is_ok());
    }

    #[test]
    fn test_other_readers_loans_do_not_count() {
        let reader = reader_with_limit(1);
        let mut borrows = HashMap::new();
        borrows.insert(BorrowId(1), active_loan(1, ReaderId(99)));

        assert!(check_eligible(&reader, &borrows, &HashMap::new()).is_ok());
    }

    #[test]
    fn test_unpaid_fine_blocks_borrowing() {
        let reader = reader_with_limit(5);
        let loan = active_loan(1, reader.id);
        let mut fines = HashMap::new();
        fines.insert(
            FineId(1),
            crate::record::FineRecord::assess(FineId(1), &loan, 3, Money::from_cents(150)),
        );

        let err = check_eligible(&reader, &HashMap::new(), &fines).unwrap_err();
        assert!(matches!(err, CirculationError::UnpaidFineBlock(_)));
    }

    #[test]
    fn test_paid_fine_no_longer_blocks() {
        let reader = reader_with_limit(5);
        let loan = active_loan(1, reader.id);
        let mut fine = crate::record::FineRecord::assess(FineId(1), &loan, 3, Money::from_cents(150));
        fine.mark_paid(loan.due_at);
        let mut fines = HashMap::new();
        fines.insert(FineId(1), fine);

        assert!(check_eligible(&reader, &HashMap::new(), &fines).is_ok());
    }

    #[test]
    fn test_limit_is_checked_before_fines() {
        let reader = reader_with_limit(1);
        let loan = active_loan(1, reader.id);
        let mut borrows = HashMap::new();
        borrows.insert(loan.id, loan.clone());
        let mut fines = HashMap::new();
        fines.insert(
            FineId(1),
            crate::record::FineRecord::assess(FineId(1), &loan, 1, Money::from_cents(50)),
        );

        let err = check_eligible(&reader, &borrows, &fines).unwrap_err();
        assert!(matches!(err, CirculationError::BorrowLimitExceeded { .. }));
    }
}
