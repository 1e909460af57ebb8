use std::time::Duration;

use thiserror::Error;

use crate::application::codec::escape::escape_text;

/// Why an embed ended in the error state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedFailure {
    #[error("{0}")]
    MissingIdentifier(&'static str),
    #[error("{kind} failed to load: {reason}")]
    LoadFailed { kind: &'static str, reason: String },
    #[error("{kind} did not load within {}s", .timeout.as_secs())]
    TimedOut {
        kind: &'static str,
        timeout: Duration,
    },
    #[error("{kind} could not be requested: {reason}")]
    HostUnavailable { kind: &'static str, reason: String },
}

/// Display state of a single embed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedState {
    Loading,
    Ready,
    Error(EmbedFailure),
}

impl EmbedState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, EmbedState::Loading)
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            EmbedState::Loading => "loading",
            EmbedState::Ready => "ready",
            EmbedState::Error(_) => "error",
        }
    }
}

/// One-way `Loading -> Ready | Error` state holder. Once settled, further
/// transitions are ignored and reported as not applied.
#[derive(Debug, Clone)]
pub struct EmbedLifecycle {
    state: EmbedState,
}

impl Default for EmbedLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbedLifecycle {
    pub fn new() -> Self {
        Self {
            state: EmbedState::Loading,
        }
    }

    /// A lifecycle that never loads.
    pub fn failed(failure: EmbedFailure) -> Self {
        Self {
            state: EmbedState::Error(failure),
        }
    }

    pub fn state(&self) -> &EmbedState {
        &self.state
    }

    pub fn mark_ready(&mut self) -> bool {
        self.settle(EmbedState::Ready)
    }

    pub fn mark_failed(&mut self, failure: EmbedFailure) -> bool {
        self.settle(EmbedState::Error(failure))
    }

    fn settle(&mut self, next: EmbedState) -> bool {
        if self.state.is_settled() {
            return false;
        }
        self.state = next;
        true
    }
}

/// Inline placeholder shown in place of a broken embed.
pub fn error_placeholder(failure: &EmbedFailure) -> String {
    format!(
        "<div class=\"embed-error\" role=\"alert\">{}</div>",
        escape_text(&failure.to_string())
    )
}
