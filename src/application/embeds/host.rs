//! Seams between embed renderers and whatever actually loads their resources.
//!
//! A host receives a request together with a [`LoadNotifier`] and reports the
//! outcome through it at some later point. Renderers release what they asked
//! for through a [`HostGuard`], on every exit path.

use tokio::sync::oneshot;

use super::EmbedError;

/// Script element a Gist renderer asks the host to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    /// Element id, unique per embed instance.
    pub id: String,
    /// Container the script writes into.
    pub container_id: String,
    pub src: String,
}

/// Image a Giphy renderer asks the host to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub id: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed(String),
}

/// Single-use load callback. Dropping it unused reports a failure to the
/// waiting renderer; notifying after the renderer is gone is a no-op.
#[derive(Debug)]
pub struct LoadNotifier {
    sender: oneshot::Sender<LoadOutcome>,
}

impl LoadNotifier {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<LoadOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    pub fn loaded(self) {
        let _ = self.sender.send(LoadOutcome::Loaded);
    }

    pub fn failed(self, reason: impl Into<String>) {
        let _ = self.sender.send(LoadOutcome::Failed(reason.into()));
    }

    pub fn notify(self, outcome: LoadOutcome) {
        let _ = self.sender.send(outcome);
    }

    /// Whether the renderer stopped listening.
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_closed()
    }
}

pub trait ScriptHost: Send + Sync {
    fn inject_script(
        &self,
        script: &ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<(), EmbedError>;

    /// Remove an injected script and drop any pending callback for it.
    fn remove_script(&self, script_id: &str);
}

pub trait ImageHost: Send + Sync {
    fn load_image(&self, request: &ImageRequest, notifier: LoadNotifier)
    -> Result<(), EmbedError>;

    /// Abandon an image load. Loads that already finished are unaffected.
    fn cancel_image(&self, request_id: &str);
}

/// Runs its release action exactly once, when dropped.
pub struct HostGuard {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl HostGuard {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for HostGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostGuard")
            .field("armed", &self.release.is_some())
            .finish()
    }
}
