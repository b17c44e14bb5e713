//! Error types for the mint pipeline
//!
//! Two layers:
//! - Collaborator errors ([`StorageError`], [`LedgerError`]) raised by
//!   `ContentStore` and `Ledger` implementations
//! - [`PipelineError`], the four-way taxonomy every stage failure is
//!   classified into before it reaches the caller, plus `InvalidTransition`
//!   for an orchestrator that breaks its own state machine
//!
//! [`RunFailure`] wraps a `PipelineError` with the stage it happened in and,
//! when minting already succeeded, the entry left behind on the ledger.

use crate::state::{PipelineState, Stage};
use crate::types::{EntryAddress, RegistryEntry, RunId};

/// Pipeline error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Descriptive record or asset is unusable
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Storage network did not accept the upload
    #[error("upload of {name:?} failed: {source}")]
    UploadFailed {
        /// Display name the upload was attempted under
        name: String,
        #[source]
        source: StorageError,
    },

    /// Ledger (or local validation) refused to create the entry
    #[error("registry rejected entry: {0}")]
    RegistryRejected(String),

    /// Membership confirmation failed after the entry was created
    #[error("membership verification failed for {address}: {source}")]
    VerificationFailed {
        /// Address of the entry that stays unverified
        address: EntryAddress,
        #[source]
        source: LedgerError,
    },

    /// The orchestrator attempted an illegal state transition
    #[error(transparent)]
    InvalidTransition(#[from] StateMachineError),
}

impl PipelineError {
    /// Convenience constructor for malformed input
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput(reason.into())
    }

    /// Short machine-friendly name of the error class
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MalformedInput",
            Self::UploadFailed { .. } => "UploadFailed",
            Self::RegistryRejected(_) => "RegistryRejected",
            Self::VerificationFailed { .. } => "VerificationFailed",
            Self::InvalidTransition(_) => "InvalidTransition",
        }
    }
}

/// Errors raised by storage collaborators
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Local I/O failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure (connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// Storage service answered with an error status
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Storage service answered with something unparseable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by ledger collaborators
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Transaction was refused by ledger rules
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Referenced entry does not exist
    #[error("entry not found: {0}")]
    NotFound(String),

    /// Signer lacks authority over the referenced entry
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// RPC or persistence failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Illegal pipeline state transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct StateMachineError {
    pub from: PipelineState,
    pub to: PipelineState,
}

/// Terminal failure of a pipeline run
#[derive(Debug, thiserror::Error)]
#[error("run {run_id} failed at {stage}: {error}")]
pub struct RunFailure {
    /// Run that failed
    pub run_id: RunId,
    /// Stage in which the failure happened
    pub stage: Stage,
    /// Classified cause
    #[source]
    pub error: PipelineError,
    /// Entry created before the failure, if any (never verified)
    pub entry: Option<RegistryEntry>,
    /// States visited, ending with `Failed(stage)`
    pub history: Vec<PipelineState>,
}

impl RunFailure {
    /// Terminal state of the run
    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        PipelineState::Failed(self.stage)
    }

    /// Whether the run left a created-but-unverified entry on the ledger
    #[inline]
    #[must_use]
    pub fn left_ledger_artifact(&self) -> bool {
        self.entry.is_some()
    }
}
