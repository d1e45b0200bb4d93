//! State machine for tracking a distribution run
//!
//! A run is a strict sequence of steps with a single absorbing `Failed`
//! state. Nothing is persisted; the history only lives for the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Initial,
    ParsingCredentials,
    Authenticating,
    ResolvingArtifact,
    Uploading,
    Distributing,
    Reporting,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether the run may move from `self` to `to`
    pub fn can_transition_to(self, to: PipelineState) -> bool {
        use PipelineState::*;

        match (self, to) {
            (Succeeded | Failed, _) => false,
            (_, Failed) => true,
            (Initial, ParsingCredentials)
            | (ParsingCredentials, Authenticating)
            | (Authenticating, ResolvingArtifact)
            | (ResolvingArtifact, Uploading)
            | (Uploading, Distributing)
            | (Uploading, Reporting)
            | (Distributing, Reporting)
            | (Reporting, Succeeded) => true,
            _ => false,
        }
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub timestamp: DateTime<Utc>,
}

/// Rejected transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pipeline transition {from:?} → {to:?}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

/// In-memory state machine for a single run
#[derive(Debug)]
pub struct PipelineStateMachine {
    current_state: PipelineState,
    transitions: Vec<StateTransition>,
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: PipelineState::Initial,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, to: PipelineState) -> Result<(), InvalidTransition> {
        let from = self.current_state;
        if !from.can_transition_to(to) {
            return Err(InvalidTransition { from, to });
        }

        tracing::debug!(?from, ?to, "pipeline transition");

        self.transitions.push(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;

        Ok(())
    }

    /// Move to `Failed` unless the run already finished
    pub fn fail(&mut self) {
        if !self.current_state.is_terminal() {
            // Every non-terminal state may fail.
            let _ = self.transition(PipelineState::Failed);
        }
    }

    pub fn get_state(&self) -> PipelineState {
        self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get elapsed time since the first transition, in milliseconds
    pub fn get_elapsed_time(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {:?} → {:?}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
