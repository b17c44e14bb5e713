//! Mint pipeline orchestrator
//!
//! Runs one collectible through:
//! - Loading: read the descriptive record and the asset
//! - Uploading-Asset: push the asset to storage
//! - Rewriting: point the record at the asset locator
//! - Uploading-Descriptor: push the rewritten record
//! - Minting: create the registry entry inside the configured group
//! - Verifying: confirm group membership
//!
//! Each stage consumes the previous stage's output, so stages run strictly in
//! order. The first failure ends the run; nothing already uploaded or created
//! is undone.

use crate::digest::AssetDigest;
use crate::error::{PipelineError, RunFailure, StateMachineError};
use crate::record::{load_record, rewrite_locators, DescriptiveRecord};
use crate::registry::{Ledger, MembershipVerifier, RegistryMinter};
use crate::state::{next_stage, validate_transition, PipelineState, Stage};
use crate::types::{MintOutcome, PipelineConfig, RegistryEntry, RunId};
use crate::upload::{ContentStore, ContentUploader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Where a run reads its asset or record from
#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Inline { name: String, bytes: Vec<u8> },
}

/// The asset and descriptive record of one run
#[derive(Debug, Clone)]
pub struct PipelineInput {
    asset: Source,
    record: Source,
}

impl PipelineInput {
    /// Read both inputs from disk; display names are the file names
    pub fn from_paths(asset: impl Into<PathBuf>, record: impl Into<PathBuf>) -> Self {
        Self {
            asset: Source::Path(asset.into()),
            record: Source::Path(record.into()),
        }
    }

    /// Inputs already in memory
    pub fn inline(
        asset_name: impl Into<String>,
        asset: impl Into<Vec<u8>>,
        record_name: impl Into<String>,
        record_json: impl Into<String>,
    ) -> Self {
        Self {
            asset: Source::Inline {
                name: asset_name.into(),
                bytes: asset.into(),
            },
            record: Source::Inline {
                name: record_name.into(),
                bytes: record_json.into().into_bytes(),
            },
        }
    }
}

/// Output of the loading stage
#[derive(Debug)]
struct LoadedInput {
    asset_name: String,
    asset: Vec<u8>,
    record_name: String,
    record: DescriptiveRecord,
}

fn display_name(path: &Path) -> Result<String, PipelineError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::malformed(format!("{} has no file name", path.display())))
}

async fn load_input(input: PipelineInput) -> Result<LoadedInput, PipelineError> {
    let (record_name, record) = match input.record {
        Source::Path(path) => (display_name(&path)?, load_record(&path).await?),
        Source::Inline { name, bytes } => {
            let text = String::from_utf8(bytes)
                .map_err(|e| PipelineError::malformed(format!("{name}: {e}")))?;
            (name, DescriptiveRecord::from_json(&text)?)
        }
    };

    let (asset_name, asset) = match input.asset {
        Source::Path(path) => {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                PipelineError::malformed(format!("cannot read {}: {e}", path.display()))
            })?;
            (display_name(&path)?, bytes)
        }
        Source::Inline { name, bytes } => (name, bytes),
    };

    if asset.is_empty() {
        return Err(PipelineError::malformed(format!("asset {asset_name:?} is empty")));
    }

    Ok(LoadedInput {
        asset_name,
        asset,
        record_name,
        record,
    })
}

/// Tracks the state of one run
#[derive(Debug)]
struct RunTracker {
    run_id: RunId,
    /// Stage currently running, or the last one entered once terminal
    stage: Stage,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl RunTracker {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            stage: Stage::Loading,
            state: PipelineState::START,
            history: vec![PipelineState::START],
        }
    }

    fn transition(&mut self, to: PipelineState) -> Result<(), StateMachineError> {
        validate_transition(self.state, to)?;
        tracing::debug!(from = %self.state, to = %to, "State transition");
        if let PipelineState::Running(stage) = to {
            self.stage = stage;
        }
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to the next stage, or to `Done` after verification
    fn advance(&mut self) -> Result<(), StateMachineError> {
        let next = next_stage(self.stage).map_or(PipelineState::Done, PipelineState::Running);
        self.transition(next)
    }

    fn fail(&mut self, error: PipelineError, entry: Option<RegistryEntry>) -> RunFailure {
        let stage = self.stage;
        tracing::error!(stage = %stage, kind = error.kind(), error = %error, "Pipeline run failed");
        if let Err(e) = self.transition(PipelineState::Failed(stage)) {
            tracing::error!(error = %e, "Run was already terminal");
        }
        RunFailure {
            run_id: self.run_id,
            stage,
            error,
            entry,
            history: std::mem::take(&mut self.history),
        }
    }
}

/// Publishes, mints and verifies collectibles
///
/// Holds only immutable configuration and shared collaborator handles, so
/// one pipeline can serve concurrent, independent runs.
#[derive(Debug, Clone)]
pub struct MintPipeline {
    config: PipelineConfig,
    uploader: ContentUploader,
    minter: RegistryMinter,
    verifier: MembershipVerifier,
}

impl MintPipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            uploader: ContentUploader::new(store),
            minter: RegistryMinter::new(Arc::clone(&ledger), config.default_symbol.clone()),
            verifier: MembershipVerifier::new(ledger),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline once
    ///
    /// # Errors
    /// [`RunFailure`] naming the failed stage. After a verification failure
    /// it also carries the created, unverified entry.
    pub async fn run(&self, input: PipelineInput) -> Result<MintOutcome, RunFailure> {
        let run_id = RunId::new();
        let span = tracing::info_span!("mint_run", %run_id, group = %self.config.group);
        self.execute(run_id, input).instrument(span).await
    }

    async fn execute(&self, run_id: RunId, input: PipelineInput) -> Result<MintOutcome, RunFailure> {
        let mut run = RunTracker::new(run_id);

        tracing::info!("Loading metadata");
        let loaded = load_input(input).await.map_err(|e| run.fail(e, None))?;
        let asset_digest = AssetDigest::compute(&loaded.asset);
        run.advance().map_err(|e| run.fail(e.into(), None))?;

        tracing::info!(asset = %loaded.asset_name, digest = %asset_digest.short(), "Uploading asset");
        let image = self
            .uploader
            .upload(&loaded.asset, &loaded.asset_name)
            .await
            .map_err(|e| run.fail(e, None))?;
        run.advance().map_err(|e| run.fail(e.into(), None))?;

        let record = rewrite_locators(&loaded.record, &image).map_err(|e| run.fail(e, None))?;
        run.advance().map_err(|e| run.fail(e.into(), None))?;

        let descriptor_bytes = record.to_json_bytes().map_err(|e| run.fail(e, None))?;
        let descriptor = self
            .uploader
            .upload(&descriptor_bytes, &loaded.record_name)
            .await
            .map_err(|e| run.fail(e, None))?;
        run.advance().map_err(|e| run.fail(e.into(), None))?;

        tracing::info!(name = %record.name, "Minting entry");
        let entry = self
            .minter
            .create_entry(
                &descriptor,
                &record.name,
                record.symbol.as_deref(),
                &record.fee_basis_points(),
                &self.config.group,
            )
            .await
            .map_err(|e| run.fail(e, None))?;
        run.advance()
            .map_err(|e| run.fail(e.into(), Some(entry.clone())))?;

        if let Err(e) = self
            .verifier
            .verify_membership(&entry.address, &entry.group)
            .await
        {
            tracing::warn!(address = %entry.address, "Entry created but group membership is unverified");
            return Err(run.fail(e, Some(entry)));
        }
        run.advance()
            .map_err(|e| run.fail(e.into(), Some(entry.clone().verified())))?;

        tracing::info!(address = %entry.address, "Entry minted and added to group");
        Ok(MintOutcome {
            run_id,
            entry: entry.verified(),
            image,
            descriptor,
            asset_digest,
            history: run.history,
        })
    }
}
