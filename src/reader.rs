//! Reader rows.
//!
//! Readers are created by the external registration layer; this core reads
//! `borrow_limit` and `status` and never writes either after registration.

use crate::id::ReaderId;
use serde::Serialize;

/// Whether a reader may use the library at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderStatus {
    Active,
    Disabled,
}

/// A registered reader.
#[derive(Debug, Clone, Serialize)]
pub struct Reader {
    /// Unique reader identifier.
    pub id: ReaderId,

    /// Unique account name.
    pub account_name: String,

    /// Opaque hash computed by the registration layer; never inspected here.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub real_name: String,

    /// Government id number; unique when present.
    pub id_card: String,

    pub phone: String,
    pub email: String,
    pub address: String,

    /// Maximum number of concurrently active loans.
    pub borrow_limit: u32,

    pub status: ReaderStatus,
}

/// Fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewReader {
    pub account_name: String,
    pub password_hash: String,
    pub real_name: String,
    pub id_card: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub borrow_limit: u32,
}

impl Reader {
    pub(crate) fn new(id: ReaderId, new: NewReader) -> Self {
        Reader {
            id,
            account_name: new.account_name,
            password_hash: new.password_hash,
            real_name: new.real_name,
            id_card: new.id_card,
            phone: new.phone,
            email: new.email,
            address: new.address,
            borrow_limit: new.borrow_limit,
            status: ReaderStatus::Active,
        }
    }

    /// Returns `true` if the account has been disabled.
    pub fn is_disabled(&self) -> bool {
        self.status == ReaderStatus::Disabled
    }
}
