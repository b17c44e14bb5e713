//! Local signed ledger
//!
//! A single-authority ledger kept in memory and, optionally, mirrored to a
//! JSON snapshot after every committed transaction. Addresses are fresh
//! ed25519 public keys, so they are unique without coordination.
//!
//! Transactions are staged on a copy of the state, one writer at a time. The
//! copy replaces the committed state only once its snapshot is on disk, so a
//! failed write leaves no trace in memory either.

use crate::entry::{check_metadata, EntryKind, LedgerEntry};
use crate::journal::{Journal, JournalError, Transaction, TxKind};
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::{SigningKey, VerifyingKey};
use mintflow_core::{CreatedEntry, EntryAddress, EntryRequest, GroupRef, Ledger, LedgerError};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use ulid::Ulid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    entries: BTreeMap<EntryAddress, LedgerEntry>,
    journal: Journal,
}

/// Ledger signed by one authority key
pub struct LocalLedger {
    authority: SigningKey,
    /// Last committed state
    state: Mutex<LedgerState>,
    /// Held from staging a transaction until its snapshot is written
    writer: tokio::sync::Mutex<()>,
    snapshot: Option<PathBuf>,
}

fn fresh_address() -> EntryAddress {
    let key = SigningKey::generate(&mut OsRng);
    EntryAddress::new(hex::encode(key.verifying_key().as_bytes()))
}

fn receipt(tx: &Transaction) -> serde_json::Value {
    serde_json::json!({
        "sequence": tx.sequence,
        "hash": tx.hash,
        "signature": tx.signature,
    })
}

impl LocalLedger {
    /// Empty in-memory ledger
    #[must_use]
    pub fn new(authority: SigningKey) -> Self {
        Self {
            authority,
            state: Mutex::new(LedgerState::default()),
            writer: tokio::sync::Mutex::new(()),
            snapshot: None,
        }
    }

    /// Ledger mirrored to `path`, loading it first if it exists
    ///
    /// # Errors
    /// `Transport` if the snapshot cannot be read or parsed
    pub async fn open(path: impl Into<PathBuf>, authority: SigningKey) -> Result<Self, LedgerError> {
        let path = path.into();
        let state = if tokio::fs::try_exists(&path).await.map_err(persist_error)? {
            let bytes = tokio::fs::read(&path).await.map_err(persist_error)?;
            serde_json::from_slice(&bytes)
                .map_err(|e| LedgerError::Transport(format!("snapshot {}: {e}", path.display())))?
        } else {
            LedgerState::default()
        };

        tracing::debug!(path = %path.display(), entries = state.entries.len(), "Ledger opened");
        Ok(Self {
            authority,
            state: Mutex::new(state),
            writer: tokio::sync::Mutex::new(()),
            snapshot: Some(path),
        })
    }

    #[must_use]
    pub fn authority(&self) -> VerifyingKey {
        self.authority.verifying_key()
    }

    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    #[must_use]
    pub fn entry(&self, address: &EntryAddress) -> Option<LedgerEntry> {
        self.state.lock().entries.get(address).cloned()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.lock().entries.values().cloned().collect()
    }

    #[must_use]
    pub fn journal(&self) -> Journal {
        self.state.lock().journal.clone()
    }

    /// Check journal hash chain and signatures
    ///
    /// # Errors
    /// First violation found
    pub fn verify_journal(&self) -> Result<(), JournalError> {
        self.state.lock().journal.verify()
    }

    /// Create a group entry owned by this ledger's authority
    ///
    /// # Errors
    /// `Rejected` when metadata limits are exceeded, `Transport` when the
    /// snapshot cannot be written
    pub async fn register_group(
        &self,
        name: &str,
        symbol: &str,
        uri: &str,
    ) -> Result<GroupRef, LedgerError> {
        check_metadata(name, symbol, uri, 0)?;
        let address = fresh_address();
        self.commit(|state| {
            state.entries.insert(
                address.clone(),
                LedgerEntry {
                    address: address.clone(),
                    name: name.to_string(),
                    symbol: symbol.to_string(),
                    uri: uri.to_string(),
                    seller_fee_basis_points: 0,
                    kind: EntryKind::Group,
                    update_authority: self.authority_hex(),
                    created_at: Utc::now(),
                },
            );
            state
                .journal
                .append(TxKind::RegisterGroup, address.clone(), uri, &self.authority);
            Ok(())
        })
        .await?;

        tracing::info!(%address, name, "Group registered");
        Ok(GroupRef::new(address.as_str()))
    }

    fn authority_hex(&self) -> String {
        hex::encode(self.authority.verifying_key().as_bytes())
    }

    /// Apply `stage` to a copy of the committed state, write the copy and
    /// then make it the committed state.
    ///
    /// A stage that appends nothing to the journal changed nothing, so no
    /// snapshot is written for it.
    async fn commit<T, F>(&self, stage: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<T, LedgerError> + Send,
        T: Send,
    {
        let _writer = self.writer.lock().await;
        let mut next = self.state.lock().clone();
        let committed = next.journal.len();

        let output = stage(&mut next)?;
        if next.journal.len() != committed {
            self.persist(&next).await?;
            *self.state.lock() = next;
        }
        Ok(output)
    }

    fn stage_create(
        &self,
        state: &mut LedgerState,
        request: &EntryRequest,
    ) -> Result<CreatedEntry, LedgerError> {
        check_metadata(
            &request.name,
            &request.symbol,
            request.uri.as_str(),
            request.seller_fee_basis_points,
        )?;

        let group_address = EntryAddress::new(request.group.as_str());
        match state.entries.get(&group_address) {
            None => {
                return Err(LedgerError::Rejected(format!(
                    "group {} does not exist",
                    request.group
                )))
            }
            Some(group) if !group.is_group() => {
                return Err(LedgerError::Rejected(format!(
                    "{} is not a group entry",
                    request.group
                )))
            }
            Some(_) => {}
        }

        let address = fresh_address();
        state.entries.insert(
            address.clone(),
            LedgerEntry {
                address: address.clone(),
                name: request.name.clone(),
                symbol: request.symbol.clone(),
                uri: request.uri.as_str().to_string(),
                seller_fee_basis_points: request.seller_fee_basis_points,
                kind: EntryKind::Member {
                    group: request.group.clone(),
                    verified: false,
                },
                update_authority: self.authority_hex(),
                created_at: Utc::now(),
            },
        );
        let tx = state.journal.append(
            TxKind::CreateEntry,
            address.clone(),
            request.uri.as_str(),
            &self.authority,
        );

        Ok(CreatedEntry {
            receipt: receipt(tx),
            address,
        })
    }

    /// Returns `None` when the entry was already verified
    fn stage_verify(
        &self,
        state: &mut LedgerState,
        address: &EntryAddress,
        group: &GroupRef,
    ) -> Result<Option<serde_json::Value>, LedgerError> {
        let group_entry = state
            .entries
            .get(&EntryAddress::new(group.as_str()))
            .ok_or_else(|| LedgerError::NotFound(group.to_string()))?;
        if !group_entry.is_group() {
            return Err(LedgerError::Rejected(format!("{group} is not a group entry")));
        }
        if group_entry.update_authority != self.authority_hex() {
            return Err(LedgerError::Unauthorized(format!(
                "signer is not the update authority of group {group}"
            )));
        }

        let entry = state
            .entries
            .get_mut(address)
            .ok_or_else(|| LedgerError::NotFound(address.to_string()))?;
        match &mut entry.kind {
            EntryKind::Group => {
                return Err(LedgerError::Rejected(format!("{address} is a group entry")))
            }
            EntryKind::Member { group: joined, .. } if joined != group => {
                return Err(LedgerError::Rejected(format!(
                    "{address} belongs to group {joined}, not {group}"
                )))
            }
            EntryKind::Member { verified: true, .. } => return Ok(None),
            EntryKind::Member { verified, .. } => *verified = true,
        }

        let tx = state.journal.append(
            TxKind::VerifyMembership,
            address.clone(),
            group.as_str(),
            &self.authority,
        );
        Ok(Some(receipt(tx)))
    }

    async fn persist(&self, state: &LedgerState) -> Result<(), LedgerError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| LedgerError::Transport(format!("snapshot encode: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(persist_error)?;
        }
        let staging = staging_path(path);
        let written = match tokio::fs::write(&staging, bytes).await {
            Ok(()) => tokio::fs::rename(&staging, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tokio::fs::remove_file(&staging).await.ok();
            return Err(persist_error(e));
        }
        Ok(())
    }
}

/// Sibling of `path` no other writer uses
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(format!(".{}.partial", Ulid::new()));
    path.with_file_name(name)
}

fn persist_error(e: std::io::Error) -> LedgerError {
    LedgerError::Transport(format!("snapshot i/o: {e}"))
}

#[async_trait]
impl Ledger for LocalLedger {
    async fn create_entry(&self, request: &EntryRequest) -> Result<CreatedEntry, LedgerError> {
        let created = self
            .commit(|state| self.stage_create(state, request))
            .await?;
        tracing::debug!(address = %created.address, uri = %request.uri, "Entry committed");
        Ok(created)
    }

    async fn verify_membership(
        &self,
        address: &EntryAddress,
        group: &GroupRef,
    ) -> Result<(), LedgerError> {
        match self
            .commit(|state| self.stage_verify(state, address, group))
            .await?
        {
            Some(receipt) => tracing::debug!(%address, %group, %receipt, "Membership committed"),
            None => tracing::debug!(%address, "Membership already verified"),
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLedger")
            .field("authority", &self.authority_hex())
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}
