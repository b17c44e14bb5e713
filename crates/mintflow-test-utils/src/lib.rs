//! Testing utilities for the mintflow workspace
//!
//! Scripted storage and ledger collaborators that answer from a queue and
//! append every call to a shared [`CallLog`], so tests can assert both what
//! was called and in which order across collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use mintflow_core::{
    ContentStore, CreatedEntry, EntryAddress, EntryRequest, GroupRef, Ledger, LedgerError,
    Locator, PipelineConfig, PipelineInput, StorageError,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Group reference used by fixtures
pub const TEST_GROUP: &str = "CAJtHLcFyf97Jfw1UUr1zwKCAR2vLYRfTW3zmrDhM7VA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload { name: String, size: usize },
    CreateEntry(EntryRequest),
    VerifyMembership { address: EntryAddress, group: GroupRef },
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn upload_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Upload { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::CreateEntry(_)))
            .count()
    }

    pub fn verify_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::VerifyMembership { .. }))
            .count()
    }
}

/// Content store answering from a queue of scripted results
#[derive(Debug)]
pub struct ScriptedStore {
    responses: Mutex<VecDeque<Result<Locator, StorageError>>>,
    /// Bytes of every upload, in call order
    payloads: Mutex<Vec<Vec<u8>>>,
    log: CallLog,
}

impl ScriptedStore {
    pub fn new(log: &CallLog) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            payloads: Mutex::new(Vec::new()),
            log: log.clone(),
        }
    }

    #[must_use]
    pub fn then_ok(self, locator: &str) -> Self {
        self.responses.lock().push_back(Ok(Locator::new(locator)));
        self
    }

    #[must_use]
    pub fn then_err(self, error: StorageError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().clone()
    }
}

#[async_trait]
impl ContentStore for ScriptedStore {
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<Locator, StorageError> {
        self.log.push(Call::Upload {
            name: name.to_string(),
            size: bytes.len(),
        });
        self.payloads.lock().push(bytes.to_vec());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(StorageError::Transport("no scripted upload response".into())))
    }
}

/// Ledger answering from queues of scripted results
#[derive(Debug)]
pub struct ScriptedLedger {
    creates: Mutex<VecDeque<Result<CreatedEntry, LedgerError>>>,
    verifies: Mutex<VecDeque<Result<(), LedgerError>>>,
    log: CallLog,
}

impl ScriptedLedger {
    pub fn new(log: &CallLog) -> Self {
        Self {
            creates: Mutex::new(VecDeque::new()),
            verifies: Mutex::new(VecDeque::new()),
            log: log.clone(),
        }
    }

    #[must_use]
    pub fn then_created(self, address: &str) -> Self {
        self.creates.lock().push_back(Ok(CreatedEntry {
            address: EntryAddress::new(address),
            receipt: serde_json::json!({ "scripted": true }),
        }));
        self
    }

    #[must_use]
    pub fn then_create_err(self, error: LedgerError) -> Self {
        self.creates.lock().push_back(Err(error));
        self
    }

    #[must_use]
    pub fn then_verified(self) -> Self {
        self.verifies.lock().push_back(Ok(()));
        self
    }

    #[must_use]
    pub fn then_verify_err(self, error: LedgerError) -> Self {
        self.verifies.lock().push_back(Err(error));
        self
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
    async fn create_entry(&self, request: &EntryRequest) -> Result<CreatedEntry, LedgerError> {
        self.log.push(Call::CreateEntry(request.clone()));
        self.creates
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LedgerError::Transport("no scripted create response".into())))
    }

    async fn verify_membership(
        &self,
        address: &EntryAddress,
        group: &GroupRef,
    ) -> Result<(), LedgerError> {
        self.log.push(Call::VerifyMembership {
            address: address.clone(),
            group: group.clone(),
        });
        self.verifies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LedgerError::Transport("no scripted verify response".into())))
    }
}

/// Descriptive record with one empty file slot
pub fn record_json(name: &str) -> String {
    serde_json::json!({
        "name": name,
        "properties": { "files": [{ "uri": "" }] }
    })
    .to_string()
}

/// Inline input for item `n`: asset `IMG`, record `Item #n`
pub fn item_input(n: u32) -> PipelineInput {
    PipelineInput::inline(
        format!("{n}.jpg"),
        b"IMG".to_vec(),
        format!("{n}.json"),
        record_json(&format!("Item #{n}")),
    )
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig::new(TEST_GROUP)
}
