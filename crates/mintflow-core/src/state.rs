//! Pipeline state machine
//!
//! A run walks `Loading -> UploadingAsset -> Rewriting -> UploadingDescriptor
//! -> Minting -> Verifying -> Done`. Any non-terminal state may instead move
//! to `Failed(stage)`. `Done` and `Failed` have no outgoing transitions.

use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Working stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Loading,
    UploadingAsset,
    Rewriting,
    UploadingDescriptor,
    Minting,
    Verifying,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 6] = [
        Stage::Loading,
        Stage::UploadingAsset,
        Stage::Rewriting,
        Stage::UploadingDescriptor,
        Stage::Minting,
        Stage::Verifying,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Loading => "Loading",
            Stage::UploadingAsset => "Uploading-Asset",
            Stage::Rewriting => "Rewriting",
            Stage::UploadingDescriptor => "Uploading-Descriptor",
            Stage::Minting => "Minting",
            Stage::Verifying => "Verifying",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Running(Stage),
    Done,
    Failed(Stage),
}

impl PipelineState {
    /// Initial state of every run
    pub const START: PipelineState = PipelineState::Running(Stage::Loading);

    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running(stage) => write!(f, "{stage}"),
            Self::Done => f.write_str("Done"),
            Self::Failed(stage) => write!(f, "Failed({stage})"),
        }
    }
}

/// Stage following `stage` on the happy path, `None` after verification
#[must_use]
pub fn next_stage(stage: Stage) -> Option<Stage> {
    use Stage::*;
    match stage {
        Loading => Some(UploadingAsset),
        UploadingAsset => Some(Rewriting),
        Rewriting => Some(UploadingDescriptor),
        UploadingDescriptor => Some(Minting),
        Minting => Some(Verifying),
        Verifying => None,
    }
}

pub fn allowed_transitions(from: PipelineState) -> Vec<PipelineState> {
    match from {
        PipelineState::Running(stage) => {
            let forward = next_stage(stage).map_or(PipelineState::Done, PipelineState::Running);
            vec![forward, PipelineState::Failed(stage)]
        }
        PipelineState::Done | PipelineState::Failed(_) => vec![],
    }
}

/// Validates a state transition.
pub fn validate_transition(from: PipelineState, to: PipelineState) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_linear() {
        let mut state = PipelineState::START;
        let mut visited = vec![state];
        while let PipelineState::Running(stage) = state {
            let next = next_stage(stage).map_or(PipelineState::Done, PipelineState::Running);
            assert!(validate_transition(state, next).is_ok());
            state = next;
            visited.push(state);
        }
        assert_eq!(visited.len(), 7);
        assert_eq!(visited.last(), Some(&PipelineState::Done));
    }

    #[test]
    fn every_stage_can_fail_in_place() {
        for stage in Stage::ALL {
            assert!(validate_transition(PipelineState::Running(stage), PipelineState::Failed(stage)).is_ok());
        }
    }

    #[test]
    fn cannot_skip_or_fail_elsewhere() {
        let minting = PipelineState::Running(Stage::Minting);
        assert!(validate_transition(PipelineState::START, minting).is_err());
        assert!(validate_transition(minting, PipelineState::Failed(Stage::Loading)).is_err());
        assert!(validate_transition(minting, PipelineState::Done).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(allowed_transitions(PipelineState::Done).is_empty());
        assert!(allowed_transitions(PipelineState::Failed(Stage::Minting)).is_empty());
        assert!(PipelineState::Failed(Stage::Verifying).is_terminal());
    }

    #[test]
    fn display_names() {
        assert_eq!(PipelineState::Failed(Stage::Minting).to_string(), "Failed(Minting)");
        assert_eq!(Stage::UploadingAsset.to_string(), "Uploading-Asset");
    }
}
