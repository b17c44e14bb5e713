//! mintflow core - publish, mint, verify
//!
//! Takes one collectible (binary asset + descriptive record) and:
//! - uploads the asset to a content-addressed store
//! - rewrites the record to point at the uploaded asset and uploads it
//! - creates a registry entry for it inside an existing ledger group
//! - confirms the entry's group membership in a second transaction
//!
//! Storage and ledger access go through the [`ContentStore`] and [`Ledger`]
//! traits; concrete clients live in `mintflow-storage` and `mintflow-ledger`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mintflow_core::{MintPipeline, PipelineConfig, PipelineInput};
//!
//! # async fn example(store: Arc<dyn ContentStore>, ledger: Arc<dyn Ledger>) {
//! let pipeline = MintPipeline::new(PipelineConfig::new("CAJt...7VA"), store, ledger);
//! match pipeline.run(PipelineInput::from_paths("asset/5.jpg", "asset/5.json")).await {
//!     Ok(outcome) => println!("minted {}", outcome.address()),
//!     Err(failure) if failure.left_ledger_artifact() => eprintln!("unverified: {failure}"),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod digest;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod state;
pub mod types;
pub mod upload;

pub use digest::{AssetDigest, DigestError};
pub use error::{LedgerError, PipelineError, RunFailure, StateMachineError, StorageError};
pub use pipeline::{MintPipeline, PipelineInput};
pub use record::{load_record, rewrite_locators, DescriptiveRecord, FileRef, Properties};
pub use registry::{checked_fee, Ledger, MembershipVerifier, RegistryMinter};
pub use state::{allowed_transitions, validate_transition, PipelineState, Stage};
pub use types::{
    CreatedEntry, EntryAddress, EntryRequest, GroupRef, Locator, MintOutcome, PipelineConfig,
    RegistryEntry, RunId, DEFAULT_SYMBOL, MAX_FEE_BASIS_POINTS,
};
pub use upload::{ContentStore, ContentUploader};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and running a pipeline
    pub use crate::{
        ContentStore, Ledger, Locator, MintOutcome, MintPipeline, PipelineConfig, PipelineInput,
        RunFailure,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
