//! Core types for the mint pipeline
//!
//! Defines:
//! - Identifiers: run ids, locators, group references, entry addresses
//! - Ledger request/response shapes
//! - Pipeline configuration and the successful run outcome

use crate::digest::AssetDigest;
use crate::state::PipelineState;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Symbol used when the descriptive record has none
pub const DEFAULT_SYMBOL: &str = "NFT";

/// Upper bound of the royalty fee, in basis points
pub const MAX_FEE_BASIS_POINTS: i64 = 10_000;

/// Unique pipeline run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Opaque storage locator returned by an upload (e.g. `ar://...`)
    Locator
}

string_id! {
    /// Address of a pre-existing group entry on the ledger
    GroupRef
}

string_id! {
    /// Ledger-assigned address of a registry entry
    EntryAddress
}

/// Parameters of a create-entry transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    /// Locator of the uploaded descriptive record
    pub uri: Locator,
    pub name: String,
    pub symbol: String,
    /// Royalty fee, already checked to lie in `[0, 10000]`
    pub seller_fee_basis_points: u16,
    /// Group the entry is attached to (unverified until confirmed)
    pub group: GroupRef,
}

/// Ledger answer to a create-entry transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEntry {
    pub address: EntryAddress,
    /// Implementation-specific receipt (signature, slot, ...)
    #[serde(default)]
    pub receipt: serde_json::Value,
}

/// Registry entry as tracked by a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub address: EntryAddress,
    pub descriptor: Locator,
    pub group: GroupRef,
    pub membership_verified: bool,
}

impl RegistryEntry {
    /// Freshly created, not yet verified
    #[inline]
    #[must_use]
    pub fn created(address: EntryAddress, descriptor: Locator, group: GroupRef) -> Self {
        Self {
            address,
            descriptor,
            group,
            membership_verified: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.membership_verified = true;
        self
    }
}

/// Configuration injected into the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Group every minted entry joins
    pub group: GroupRef,
    /// Symbol used when the record has none
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
}

fn default_symbol() -> String {
    DEFAULT_SYMBOL.to_string()
}

impl PipelineConfig {
    #[inline]
    pub fn new(group: impl Into<GroupRef>) -> Self {
        Self {
            group: group.into(),
            default_symbol: default_symbol(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_default_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.default_symbol = symbol.into();
        self
    }
}

/// Result of a run that reached `Done`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    pub run_id: RunId,
    /// The minted, membership-verified entry
    pub entry: RegistryEntry,
    pub image: Locator,
    pub descriptor: Locator,
    /// Blake3 digest of the uploaded asset bytes
    pub asset_digest: AssetDigest,
    pub history: Vec<PipelineState>,
}

impl MintOutcome {
    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        PipelineState::Done
    }

    #[inline]
    #[must_use]
    pub fn address(&self) -> &EntryAddress {
        &self.entry.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_ids_display_raw_value() {
        assert_eq!(Locator::new("ar://img5").to_string(), "ar://img5");
        assert_eq!(EntryAddress::from("ADDR123").as_str(), "ADDR123");
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let json = serde_json::to_string(&GroupRef::new("CAJt")).unwrap();
        assert_eq!(json, "\"CAJt\"");
    }

    #[test]
    fn registry_entry_starts_unverified() {
        let entry = RegistryEntry::created("A".into(), "ar://m".into(), "G".into());
        assert!(!entry.membership_verified);
        assert!(entry.verified().membership_verified);
    }

    #[test]
    fn pipeline_config_defaults_symbol() {
        let config: PipelineConfig = serde_json::from_str(r#"{"group":"G"}"#).unwrap();
        assert_eq!(config.default_symbol, DEFAULT_SYMBOL);
        assert_eq!(PipelineConfig::new("G").with_default_symbol("ART").default_symbol, "ART");
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
