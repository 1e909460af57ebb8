use std::{sync::Arc, time::Duration};

use tokio::{sync::oneshot, time};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::codec::escape::escape_attribute;
use crate::domain::{document::GistEmbedAttrs, embeds::gist_script_url};

use super::host::{HostGuard, LoadNotifier, LoadOutcome, ScriptElement, ScriptHost};
use super::record_settled;
use super::state::{EmbedFailure, EmbedLifecycle, EmbedState, error_placeholder};

pub const DEFAULT_GIST_TIMEOUT: Duration = Duration::from_secs(10);

const KIND: &str = "Gist";

/// A mounted Gist embed.
///
/// Mounting injects a script scoped to a per-instance container. The script is
/// removed when the embed is dropped, whether it loaded, failed, timed out or
/// never settled.
#[derive(Debug)]
pub struct GistEmbed {
    container_id: String,
    script: Option<ScriptElement>,
    lifecycle: EmbedLifecycle,
    pending: Option<oneshot::Receiver<LoadOutcome>>,
    timeout: Duration,
    _guard: Option<HostGuard>,
}

impl GistEmbed {
    pub fn mount(host: Arc<dyn ScriptHost>, attrs: &GistEmbedAttrs, timeout: Duration) -> Self {
        let container_id = format!("gist-{}", Uuid::new_v4());
        let Some(gist_id) = attrs.gist_id() else {
            debug!(
                target = "application::embeds::gist",
                container_id = %container_id,
                "gist embed has no id"
            );
            return Self::settled(
                container_id,
                None,
                timeout,
                EmbedFailure::MissingIdentifier("Gist embed is missing its id"),
            );
        };

        let filename = attrs
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let script = ScriptElement {
            id: format!("{container_id}-script"),
            container_id: container_id.clone(),
            src: gist_script_url(gist_id, filename),
        };

        let (notifier, receiver) = LoadNotifier::channel();
        if let Err(err) = host.inject_script(&script, notifier) {
            warn!(
                target = "application::embeds::gist",
                script_id = %script.id,
                error = %err,
                "gist script injection failed"
            );
            let failure = EmbedFailure::HostUnavailable {
                kind: KIND,
                reason: err.to_string(),
            };
            return Self::settled(container_id, Some(script), timeout, failure);
        }

        let guard = {
            let host = Arc::clone(&host);
            let script_id = script.id.clone();
            HostGuard::new(move || host.remove_script(&script_id))
        };

        Self {
            container_id,
            script: Some(script),
            lifecycle: EmbedLifecycle::new(),
            pending: Some(receiver),
            timeout,
            _guard: Some(guard),
        }
    }

    fn settled(
        container_id: String,
        script: Option<ScriptElement>,
        timeout: Duration,
        failure: EmbedFailure,
    ) -> Self {
        record_settled("gist", &EmbedState::Error(failure.clone()));
        Self {
            container_id,
            script,
            lifecycle: EmbedLifecycle::failed(failure),
            pending: None,
            timeout,
            _guard: None,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn script(&self) -> Option<&ScriptElement> {
        self.script.as_ref()
    }

    pub fn state(&self) -> &EmbedState {
        self.lifecycle.state()
    }

    /// Wait for the script callback, bounded by the mount timeout.
    pub async fn settle(&mut self) -> &EmbedState {
        let Some(pending) = self.pending.take() else {
            return self.lifecycle.state();
        };

        match time::timeout(self.timeout, pending).await {
            Ok(Ok(LoadOutcome::Loaded)) => {
                self.lifecycle.mark_ready();
            }
            Ok(Ok(LoadOutcome::Failed(reason))) => {
                self.lifecycle
                    .mark_failed(EmbedFailure::LoadFailed { kind: KIND, reason });
            }
            Ok(Err(_closed)) => {
                self.lifecycle.mark_failed(EmbedFailure::LoadFailed {
                    kind: KIND,
                    reason: "load callback was dropped".to_string(),
                });
            }
            Err(_elapsed) => {
                self.lifecycle.mark_failed(EmbedFailure::TimedOut {
                    kind: KIND,
                    timeout: self.timeout,
                });
            }
        }

        let state = self.lifecycle.state();
        debug!(
            target = "application::embeds::gist",
            container_id = %self.container_id,
            state = state.label(),
            "gist embed settled"
        );
        record_settled("gist", state);
        state
    }

    pub fn render_html(&self) -> String {
        match (self.lifecycle.state(), &self.script) {
            (EmbedState::Error(failure), _) => error_placeholder(failure),
            (EmbedState::Ready, Some(script)) => format!(
                "<div id=\"{}\" class=\"gist-embed-frame\"><script id=\"{}\" src=\"{}\"></script></div>",
                escape_attribute(&self.container_id),
                escape_attribute(&script.id),
                escape_attribute(&script.src)
            ),
            _ => format!(
                "<div id=\"{}\" class=\"embed-loading\" aria-busy=\"true\">Loading Gist</div>",
                escape_attribute(&self.container_id)
            ),
        }
    }
}
