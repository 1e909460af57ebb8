use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use reqwest::{Client, header::CONTENT_TYPE};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::debug;

use super::EmbedError;
use super::host::{ImageHost, ImageRequest, LoadNotifier, LoadOutcome, ScriptElement, ScriptHost};

/// Host that "loads" embed resources by fetching them over HTTP.
///
/// Each request runs as a tokio task registered under the script or image id.
/// Removing or cancelling the id aborts the task, so a late response never
/// reaches the renderer.
#[derive(Clone)]
pub struct HttpEmbedHost {
    client: Client,
    in_flight: Arc<DashMap<String, JoinHandle<()>>>,
}

impl HttpEmbedHost {
    pub fn new(user_agent: &str, request_timeout: Duration) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Number of registered requests that have not been released yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn spawn_fetch(
        &self,
        id: &str,
        url: &str,
        expect_image: bool,
        notifier: LoadNotifier,
    ) -> Result<(), EmbedError> {
        let runtime = Handle::try_current().map_err(|_| EmbedError::NoRuntime(id.to_string()))?;

        let client = self.client.clone();
        let url = url.to_string();
        let handle = runtime.spawn(async move {
            let outcome = fetch(&client, &url, expect_image).await;
            debug!(
                target = "application::embeds::http",
                url = %url,
                outcome = ?outcome,
                "embed resource fetched"
            );
            notifier.notify(outcome);
        });

        if let Some(previous) = self.in_flight.insert(id.to_string(), handle) {
            previous.abort();
        }
        Ok(())
    }

    fn release(&self, id: &str) {
        if let Some((_id, handle)) = self.in_flight.remove(id) {
            handle.abort();
        }
    }
}

async fn fetch(client: &Client, url: &str, expect_image: bool) -> LoadOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(err) => return LoadOutcome::Failed(err.to_string()),
    };

    let status = response.status();
    if !status.is_success() {
        return LoadOutcome::Failed(format!("status {}", status.as_u16()));
    }

    if expect_image {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !content_type.is_empty() && !content_type.starts_with("image/") {
            return LoadOutcome::Failed(format!("unexpected content type {content_type}"));
        }
    }

    LoadOutcome::Loaded
}

impl ScriptHost for HttpEmbedHost {
    fn inject_script(
        &self,
        script: &ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<(), EmbedError> {
        self.spawn_fetch(&script.id, &script.src, false, notifier)
    }

    fn remove_script(&self, script_id: &str) {
        self.release(script_id);
    }
}

impl ImageHost for HttpEmbedHost {
    fn load_image(&self, request: &ImageRequest, notifier: LoadNotifier) -> Result<(), EmbedError> {
        self.spawn_fetch(&request.id, &request.src, true, notifier)
    }

    fn cancel_image(&self, request_id: &str) {
        self.release(request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HttpEmbedHost {
        HttpEmbedHost::new("folio-test", Duration::from_secs(1)).expect("client")
    }

    #[test]
    fn requests_outside_a_runtime_are_rejected() {
        let (notifier, _receiver) = LoadNotifier::channel();
        let request = ImageRequest {
            id: "giphy-1".into(),
            src: "https://media.giphy.com/media/XyZ789/giphy.gif".into(),
        };
        let err = host()
            .load_image(&request, notifier)
            .expect_err("no runtime");
        assert!(matches!(err, EmbedError::NoRuntime(id) if id == "giphy-1"));
    }

    #[tokio::test]
    async fn releasing_aborts_and_forgets_the_request() {
        let host = host();
        let (notifier, receiver) = LoadNotifier::channel();
        let script = ScriptElement {
            id: "gist-1-script".into(),
            container_id: "gist-1".into(),
            // Unroutable address: the fetch stays pending until aborted.
            src: "http://10.255.255.1/never.js".into(),
        };
        host.inject_script(&script, notifier).expect("spawned");
        assert_eq!(host.in_flight(), 1);

        host.remove_script(&script.id);
        assert_eq!(host.in_flight(), 0);
        assert!(receiver.await.is_err());
    }
}
