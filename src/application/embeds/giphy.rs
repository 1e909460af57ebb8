use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::codec::escape::escape_attribute;
use crate::domain::{
    document::{GiphyEmbedAttrs, GiphySource},
    embeds::giphy_media_url,
};

use super::host::{HostGuard, ImageHost, ImageRequest, LoadNotifier, LoadOutcome};
use super::record_settled;
use super::state::{EmbedFailure, EmbedLifecycle, EmbedState, error_placeholder};

const KIND: &str = "GIF";

/// A mounted Giphy embed. Image failures are reported by the host, so there
/// is no timeout; dropping the embed cancels a load still in flight.
#[derive(Debug)]
pub struct GiphyEmbed {
    request: Option<ImageRequest>,
    lifecycle: EmbedLifecycle,
    pending: Option<oneshot::Receiver<LoadOutcome>>,
    _guard: Option<HostGuard>,
}

impl GiphyEmbed {
    pub fn mount(host: Arc<dyn ImageHost>, attrs: &GiphyEmbedAttrs) -> Self {
        let src = match attrs.source() {
            Some(GiphySource::Id(giphy_id)) => giphy_media_url(giphy_id),
            Some(GiphySource::Url(src)) => src.to_string(),
            None => {
                debug!(
                    target = "application::embeds::giphy",
                    "giphy embed needs exactly one of id and src"
                );
                return Self::settled(
                    None,
                    EmbedFailure::MissingIdentifier("GIF embed has no Giphy id or image URL"),
                );
            }
        };

        let request = ImageRequest {
            id: format!("giphy-{}", Uuid::new_v4()),
            src,
        };
        let (notifier, receiver) = LoadNotifier::channel();
        if let Err(err) = host.load_image(&request, notifier) {
            warn!(
                target = "application::embeds::giphy",
                request_id = %request.id,
                error = %err,
                "giphy image request failed"
            );
            let failure = EmbedFailure::HostUnavailable {
                kind: KIND,
                reason: err.to_string(),
            };
            return Self::settled(Some(request), failure);
        }

        let guard = {
            let host = Arc::clone(&host);
            let request_id = request.id.clone();
            HostGuard::new(move || host.cancel_image(&request_id))
        };

        Self {
            request: Some(request),
            lifecycle: EmbedLifecycle::new(),
            pending: Some(receiver),
            _guard: Some(guard),
        }
    }

    fn settled(request: Option<ImageRequest>, failure: EmbedFailure) -> Self {
        record_settled("giphy", &EmbedState::Error(failure.clone()));
        Self {
            request,
            lifecycle: EmbedLifecycle::failed(failure),
            pending: None,
            _guard: None,
        }
    }

    /// Resolved image URL, when the attributes produced one.
    pub fn src(&self) -> Option<&str> {
        self.request.as_ref().map(|request| request.src.as_str())
    }

    pub fn state(&self) -> &EmbedState {
        self.lifecycle.state()
    }

    pub async fn settle(&mut self) -> &EmbedState {
        let Some(pending) = self.pending.take() else {
            return self.lifecycle.state();
        };

        match pending.await {
            Ok(LoadOutcome::Loaded) => {
                self.lifecycle.mark_ready();
            }
            Ok(LoadOutcome::Failed(reason)) => {
                self.lifecycle
                    .mark_failed(EmbedFailure::LoadFailed { kind: KIND, reason });
            }
            Err(_closed) => {
                self.lifecycle.mark_failed(EmbedFailure::LoadFailed {
                    kind: KIND,
                    reason: "load callback was dropped".to_string(),
                });
            }
        }

        let state = self.lifecycle.state();
        record_settled("giphy", state);
        state
    }

    pub fn render_html(&self) -> String {
        match (self.lifecycle.state(), &self.request) {
            (EmbedState::Error(failure), _) => error_placeholder(failure),
            (EmbedState::Ready, Some(request)) => format!(
                "<img class=\"giphy-embed-image\" src=\"{}\" alt=\"GIF\" loading=\"lazy\">",
                escape_attribute(&request.src)
            ),
            _ => "<div class=\"embed-loading\" aria-busy=\"true\">Loading GIF</div>".to_string(),
        }
    }
}
