//! Read-only ranking reports over borrow history.
//!
//! Pure aggregations of the ledger at a point in time; nothing here
//! mutates state. Ordering is deterministic: count descending, then id
//! ascending.

use crate::error::Result;
use crate::id::{BookId, ReaderId};
use crate::ledger::Ledger;
use std::collections::HashMap;

/// Maximum number of entries each ranking returns.
pub const RANK_LIMIT: usize = 10;

/// One row of the book popularity ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRank {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub borrow_count: usize,
}

/// One row of the reader activity ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderRank {
    pub reader_id: ReaderId,
    pub real_name: String,
    pub borrow_count: usize,
}

/// Top books by total number of borrow records, any state.
pub fn rank_books(ledger: &Ledger) -> Result<Vec<BookRank>> {
    let counts: HashMap<BookId, usize> = {
        let borrows = ledger.borrows_read()?;
        let mut counts = HashMap::new();
        for record in borrows.values() {
            *counts.entry(record.book_id).or_insert(0) += 1;
        }
        counts
    };

    let mut ranked: Vec<(BookId, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(RANK_LIMIT);

    ranked
        .into_iter()
        .map(|(book_id, borrow_count)| {
            let book = ledger.book(book_id)?;
            Ok(BookRank {
                book_id,
                title: book.title,
                author: book.author,
                borrow_count,
            })
        })
        .collect()
}

/// Top readers by total number of borrow records, any state.
pub fn rank_readers(ledger: &Ledger) -> Result<Vec<ReaderRank>> {
    let counts: HashMap<ReaderId, usize> = {
        let borrows = ledger.borrows_read()?;
        let mut counts = HashMap::new();
        for record in borrows.values() {
            *counts.entry(record.reader_id).or_insert(0) += 1;
        }
        counts
    };

    let mut ranked: Vec<(ReaderId, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(RANK_LIMIT);

    ranked
        .into_iter()
        .map(|(reader_id, borrow_count)| {
            let reader = ledger.reader(reader_id)?;
            Ok(ReaderRank {
                reader_id,
                real_name: reader.real_name,
                borrow_count,
            })
        })
        .collect()
}
