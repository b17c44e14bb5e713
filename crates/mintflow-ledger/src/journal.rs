//! Hash-chained transaction journal
//!
//! Every committed ledger transaction is appended here. Each record carries
//! the SHA-256 of its predecessor and an ed25519 signature over its own hash
//! by the authority that submitted it, so tampering with any field, dropping
//! a record or reordering records is detectable.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use mintflow_core::EntryAddress;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    RegisterGroup,
    CreateEntry,
    VerifyMembership,
}

impl TxKind {
    fn tag(self) -> u8 {
        match self {
            TxKind::RegisterGroup => 1,
            TxKind::CreateEntry => 2,
            TxKind::VerifyMembership => 3,
        }
    }
}

/// One committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sequence: u64,
    pub kind: TxKind,
    /// Entry the transaction created or changed
    pub subject: EntryAddress,
    /// Descriptor uri for creations, group address for verifications
    pub detail: String,
    /// Hex ed25519 public key of the signer
    pub authority: String,
    pub timestamp: DateTime<Utc>,
    pub prev_hash: String,
    pub hash: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    #[error("hash chain broken at transaction {0}")]
    IntegrityViolation(u64),

    #[error("bad signature on transaction {0}")]
    BadSignature(u64),

    #[error("malformed transaction {sequence}: {reason}")]
    Malformed { sequence: u64, reason: String },
}

/// Append-only list of transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    transactions: Vec<Transaction>,
}

impl Journal {
    /// Sign and append a transaction, returning the stored record
    pub fn append(
        &mut self,
        kind: TxKind,
        subject: EntryAddress,
        detail: impl Into<String>,
        signer: &SigningKey,
    ) -> &Transaction {
        let prev_hash = self
            .transactions
            .last()
            .map_or_else(|| hex::encode([0u8; 32]), |tx| tx.hash.clone());

        let mut tx = Transaction {
            sequence: self.transactions.len() as u64,
            kind,
            subject,
            detail: detail.into(),
            authority: hex::encode(signer.verifying_key().as_bytes()),
            timestamp: Utc::now(),
            prev_hash,
            hash: String::new(),
            signature: String::new(),
        };
        let hash = compute_hash(&tx);
        tx.hash = hex::encode(hash);
        tx.signature = hex::encode(signer.sign(&hash).to_bytes());

        self.transactions.push(tx);
        &self.transactions[self.transactions.len() - 1]
    }

    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check the hash chain and every signature
    ///
    /// # Errors
    /// The first violation found, by sequence number
    pub fn verify(&self) -> Result<(), JournalError> {
        let mut prev = hex::encode([0u8; 32]);
        for (index, tx) in self.transactions.iter().enumerate() {
            if tx.sequence != index as u64 || tx.prev_hash != prev {
                return Err(JournalError::IntegrityViolation(tx.sequence));
            }
            let expected = compute_hash(tx);
            if tx.hash != hex::encode(expected) {
                return Err(JournalError::IntegrityViolation(tx.sequence));
            }

            let key = decode_key(tx)?;
            let signature = decode_signature(tx)?;
            key.verify(&expected, &signature)
                .map_err(|_| JournalError::BadSignature(tx.sequence))?;

            prev.clone_from(&tx.hash);
        }
        Ok(())
    }
}

fn compute_hash(tx: &Transaction) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tx.sequence.to_le_bytes());
    hasher.update([tx.kind.tag()]);
    hasher.update(tx.subject.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(tx.detail.as_bytes());
    hasher.update([0u8]);
    hasher.update(tx.authority.as_bytes());
    hasher.update([0u8]);
    hasher.update(tx.timestamp.timestamp_micros().to_le_bytes());
    hasher.update(tx.prev_hash.as_bytes());
    hasher.finalize().into()
}

fn decode_key(tx: &Transaction) -> Result<VerifyingKey, JournalError> {
    let malformed = |reason: String| JournalError::Malformed {
        sequence: tx.sequence,
        reason,
    };
    let bytes: [u8; 32] = hex::decode(&tx.authority)
        .map_err(|e| malformed(e.to_string()))?
        .try_into()
        .map_err(|_| malformed("authority is not 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| malformed(e.to_string()))
}

fn decode_signature(tx: &Transaction) -> Result<Signature, JournalError> {
    let bytes: [u8; 64] = hex::decode(&tx.signature)
        .map_err(|_| JournalError::BadSignature(tx.sequence))?
        .try_into()
        .map_err(|_| JournalError::BadSignature(tx.sequence))?;
    Ok(Signature::from_bytes(&bytes))
}
