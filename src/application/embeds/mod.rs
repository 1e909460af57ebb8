//! Embed renderers.
//!
//! Every embed instance is mounted once and settles independently, from
//! `Loading` into `Ready` or `Error`. Loading goes through host traits
//! ([`ScriptHost`], [`ImageHost`]) so renderers work the same against a
//! browser bridge, the HTTP host used by the CLI, or a test double.

mod gist;
mod giphy;
mod host;
mod http;
mod page;
mod state;

use metrics::counter;
use thiserror::Error;

pub use gist::{DEFAULT_GIST_TIMEOUT, GistEmbed};
pub use giphy::GiphyEmbed;
pub use host::{
    HostGuard, ImageHost, ImageRequest, LoadNotifier, LoadOutcome, ScriptElement, ScriptHost,
};
pub use http::HttpEmbedHost;
pub use page::{EmbedResolver, ResolvedPage};
pub use state::{EmbedFailure, EmbedLifecycle, EmbedState, error_placeholder};

const METRIC_EMBED_SETTLED: &str = "folio_embed_settled_total";

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("failed to rewrite embed containers: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no async runtime available to load `{0}`")]
    NoRuntime(String),
    #[error("embed host rejected `{0}`")]
    Rejected(String),
}

fn record_settled(kind: &'static str, state: &EmbedState) {
    counter!(METRIC_EMBED_SETTLED, "kind" => kind, "outcome" => state.label()).increment(1);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::EmbedError;
    use super::host::{
        ImageHost, ImageRequest, LoadNotifier, LoadOutcome, ScriptElement, ScriptHost,
    };

    #[derive(Debug, Clone)]
    pub(crate) enum HostMode {
        /// Report success immediately.
        Load,
        /// Report failure immediately.
        Fail(String),
        /// Keep the notifier until the test fires it.
        Hold,
        /// Refuse the request.
        Reject,
    }

    #[derive(Default)]
    struct Recorded {
        injected: Vec<ScriptElement>,
        images: Vec<ImageRequest>,
        removed: Vec<String>,
        pending: Vec<(String, LoadNotifier)>,
    }

    pub(crate) struct FakeHost {
        mode: HostMode,
        recorded: Mutex<Recorded>,
    }

    impl FakeHost {
        pub(crate) fn new(mode: HostMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                recorded: Mutex::new(Recorded::default()),
            })
        }

        pub(crate) fn injected(&self) -> Vec<ScriptElement> {
            self.recorded.lock().expect("lock").injected.clone()
        }

        pub(crate) fn images(&self) -> Vec<ImageRequest> {
            self.recorded.lock().expect("lock").images.clone()
        }

        pub(crate) fn removed(&self) -> Vec<String> {
            self.recorded.lock().expect("lock").removed.clone()
        }

        pub(crate) fn pending_count(&self) -> usize {
            self.recorded.lock().expect("lock").pending.len()
        }

        pub(crate) fn fire(&self, id: &str, outcome: LoadOutcome) {
            let notifier = {
                let mut recorded = self.recorded.lock().expect("lock");
                let position = recorded.pending.iter().position(|(pending, _)| pending == id);
                position.map(|index| recorded.pending.remove(index).1)
            };
            if let Some(notifier) = notifier {
                notifier.notify(outcome);
            }
        }

        pub(crate) fn fire_all(&self, outcome: LoadOutcome) {
            let pending = std::mem::take(&mut self.recorded.lock().expect("lock").pending);
            for (_, notifier) in pending {
                notifier.notify(outcome.clone());
            }
        }

        fn handle(&self, id: &str, notifier: LoadNotifier) -> Result<(), EmbedError> {
            match &self.mode {
                HostMode::Load => notifier.loaded(),
                HostMode::Fail(reason) => notifier.failed(reason.clone()),
                HostMode::Hold => self
                    .recorded
                    .lock()
                    .expect("lock")
                    .pending
                    .push((id.to_string(), notifier)),
                HostMode::Reject => return Err(EmbedError::Rejected(id.to_string())),
            }
            Ok(())
        }

        fn release(&self, id: &str) {
            let mut recorded = self.recorded.lock().expect("lock");
            recorded.pending.retain(|(pending, _)| pending != id);
            recorded.removed.push(id.to_string());
        }
    }

    impl ScriptHost for FakeHost {
        fn inject_script(
            &self,
            script: &ScriptElement,
            notifier: LoadNotifier,
        ) -> Result<(), EmbedError> {
            self.handle(&script.id, notifier)?;
            self.recorded
                .lock()
                .expect("lock")
                .injected
                .push(script.clone());
            Ok(())
        }

        fn remove_script(&self, script_id: &str) {
            self.release(script_id);
        }
    }

    impl ImageHost for FakeHost {
        fn load_image(
            &self,
            request: &ImageRequest,
            notifier: LoadNotifier,
        ) -> Result<(), EmbedError> {
            self.handle(&request.id, notifier)?;
            self.recorded
                .lock()
                .expect("lock")
                .images
                .push(request.clone());
            Ok(())
        }

        fn cancel_image(&self, request_id: &str) {
            self.release(request_id);
        }
    }
}
