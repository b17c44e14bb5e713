//! Registry entry creation and membership verification
//!
//! [`Ledger`] is the ledger RPC seam. Creation and verification are two
//! separate transactions: a created entry is real and addressable even when
//! verification later fails, so the two are exposed as separate components.

use crate::error::{LedgerError, PipelineError};
use crate::types::{
    CreatedEntry, EntryAddress, EntryRequest, GroupRef, Locator, RegistryEntry,
    MAX_FEE_BASIS_POINTS,
};
use async_trait::async_trait;
use serde_json::Number;
use std::sync::Arc;

/// Ledger client able to create and verify registry entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit and confirm one create-entry transaction
    async fn create_entry(&self, request: &EntryRequest) -> Result<CreatedEntry, LedgerError>;

    /// Submit and confirm one membership-verification transaction
    async fn verify_membership(
        &self,
        address: &EntryAddress,
        group: &GroupRef,
    ) -> Result<(), LedgerError>;
}

/// Check a royalty fee against `[0, 10000]`
///
/// # Errors
/// `RegistryRejected` for negative, fractional or too large values
pub fn checked_fee(fee_basis_points: &Number) -> Result<u16, PipelineError> {
    fee_basis_points
        .as_u64()
        .and_then(|fee| u16::try_from(fee).ok())
        .filter(|fee| i64::from(*fee) <= MAX_FEE_BASIS_POINTS)
        .ok_or_else(|| fee_out_of_range(fee_basis_points))
}

fn fee_out_of_range(fee: &Number) -> PipelineError {
    PipelineError::RegistryRejected(format!(
        "seller fee {fee} basis points outside [0, {MAX_FEE_BASIS_POINTS}]"
    ))
}

/// Creates registry entries inside a group
#[derive(Clone)]
pub struct RegistryMinter {
    ledger: Arc<dyn Ledger>,
    default_symbol: String,
}

impl RegistryMinter {
    #[inline]
    pub fn new(ledger: Arc<dyn Ledger>, default_symbol: impl Into<String>) -> Self {
        Self {
            ledger,
            default_symbol: default_symbol.into(),
        }
    }

    /// Create an entry pointing at `descriptor`, attached to `group`
    ///
    /// The fee is range-checked locally before anything is submitted.
    ///
    /// # Errors
    /// `RegistryRejected` for an out-of-range fee or any ledger refusal
    pub async fn create_entry(
        &self,
        descriptor: &Locator,
        name: &str,
        symbol: Option<&str>,
        fee_basis_points: &Number,
        group: &GroupRef,
    ) -> Result<RegistryEntry, PipelineError> {
        let seller_fee_basis_points = checked_fee(fee_basis_points)?;
        let symbol = symbol
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(self.default_symbol.as_str());

        let request = EntryRequest {
            uri: descriptor.clone(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            seller_fee_basis_points,
            group: group.clone(),
        };

        let created = self
            .ledger
            .create_entry(&request)
            .await
            .map_err(|e| PipelineError::RegistryRejected(e.to_string()))?;

        tracing::info!(
            address = %created.address,
            name,
            symbol,
            group = %group,
            "Registry entry created"
        );
        Ok(RegistryEntry::created(
            created.address,
            descriptor.clone(),
            group.clone(),
        ))
    }
}

/// Confirms that an entry belongs to a group
#[derive(Clone)]
pub struct MembershipVerifier {
    ledger: Arc<dyn Ledger>,
}

impl MembershipVerifier {
    #[inline]
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// # Errors
    /// `VerificationFailed` carrying the ledger error; the entry is left as is
    pub async fn verify_membership(
        &self,
        address: &EntryAddress,
        group: &GroupRef,
    ) -> Result<(), PipelineError> {
        self.ledger
            .verify_membership(address, group)
            .await
            .map_err(|source| PipelineError::VerificationFailed {
                address: address.clone(),
                source,
            })?;

        tracing::info!(address = %address, group = %group, "Group membership verified");
        Ok(())
    }
}

impl std::fmt::Debug for RegistryMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryMinter")
            .field("default_symbol", &self.default_symbol)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for MembershipVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipVerifier").finish_non_exhaustive()
    }
}
