//! Typed identifiers for ledger entities.
//!
//! Each entity family gets its own newtype so a borrow id can never be
//! passed where a fine id is expected. Identifiers are allocated
//! sequentially by the ledger, which keeps them stable, unique, and
//! sortable for deterministic tie-breaking in reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

entity_id!(
    /// Identifies a catalog title (not an individual physical copy).
    BookId
);

entity_id!(
    /// Identifies a registered reader.
    ReaderId
);

entity_id!(
    /// Identifies one loan of one copy.
    BorrowId
);

entity_id!(
    /// Identifies a fine assessed on a late return.
    FineId
);
