//! Local signed ledger for mintflow
//!
//! [`LocalLedger`] implements [`mintflow_core::Ledger`] with the same rules a
//! token-metadata registry enforces:
//! - entries may only join an existing group entry
//! - metadata limits on name, symbol, uri and royalty fee
//! - membership can only be verified by the group's update authority
//!
//! Every committed transaction lands in a signed, hash-chained [`Journal`].

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod entry;
pub mod journal;
mod ledger;

pub use entry::{EntryKind, LedgerEntry, MAX_NAME_LEN, MAX_SYMBOL_LEN, MAX_URI_LEN};
pub use journal::{Journal, JournalError, Transaction, TxKind};
pub use ledger::LocalLedger;
