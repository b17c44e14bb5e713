//! Ledger entry records

use chrono::{DateTime, Utc};
use mintflow_core::{EntryAddress, GroupRef, LedgerError, MAX_FEE_BASIS_POINTS};
use serde::{Deserialize, Serialize};

/// Longest accepted entry name, in characters
pub const MAX_NAME_LEN: usize = 32;
/// Longest accepted symbol, in characters
pub const MAX_SYMBOL_LEN: usize = 10;
/// Longest accepted descriptor uri, in bytes
pub const MAX_URI_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// A group other entries can join
    Group,
    /// An entry attached to a group, verified or not
    Member { group: GroupRef, verified: bool },
}

/// An entry as stored on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub address: EntryAddress,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub kind: EntryKind,
    /// Hex ed25519 key allowed to verify members of this entry
    pub update_authority: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, EntryKind::Group)
    }

    /// Group this entry was attached to, if it is a member
    #[must_use]
    pub fn group(&self) -> Option<&GroupRef> {
        match &self.kind {
            EntryKind::Member { group, .. } => Some(group),
            EntryKind::Group => None,
        }
    }

    #[must_use]
    pub fn membership_verified(&self) -> bool {
        matches!(self.kind, EntryKind::Member { verified: true, .. })
    }
}

/// Enforce the ledger's metadata limits
pub(crate) fn check_metadata(
    name: &str,
    symbol: &str,
    uri: &str,
    fee_basis_points: u16,
) -> Result<(), LedgerError> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::Rejected(format!(
            "name must be 1..={MAX_NAME_LEN} characters"
        )));
    }
    if symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(LedgerError::Rejected(format!(
            "symbol longer than {MAX_SYMBOL_LEN} characters"
        )));
    }
    if uri.len() > MAX_URI_LEN {
        return Err(LedgerError::Rejected(format!("uri longer than {MAX_URI_LEN} bytes")));
    }
    if i64::from(fee_basis_points) > MAX_FEE_BASIS_POINTS {
        return Err(LedgerError::Rejected(format!(
            "seller fee {fee_basis_points} exceeds {MAX_FEE_BASIS_POINTS}"
        )));
    }
    Ok(())
}
