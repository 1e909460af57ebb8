//! Display-time post-processing of stored HTML.
//!
//! The processor derives a display variant of the stored string: foreign
//! images are routed through the image proxy, and paragraphs holding a lone
//! Gist or Giphy link are upgraded to embed containers. It is deterministic,
//! idempotent and never fails; a stage that cannot run leaves its input as is.

mod images;
mod links;
mod sanitize;

use std::sync::Arc;

use metrics::counter;
use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;
use tracing::{debug, warn};

pub use images::proxy_image_url;
pub use sanitize::sanitize_stored_html;

use images::rewrite_images;
use links::{upgrade_giphy_links, upgrade_gist_links};

pub const DEFAULT_IMAGE_PROXY_PATH: &str = "/api/image-proxy";

const METRIC_IMAGES_PROXIED: &str = "folio_content_images_proxied_total";
const METRIC_EMBEDS_UPGRADED: &str = "folio_content_embeds_upgraded_total";

/// Per-stage counts for a single processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentReport {
    pub images_proxied: u32,
    pub gists_upgraded: u32,
    pub giphys_upgraded: u32,
}

impl ContentReport {
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedContent {
    pub html: String,
    pub report: ContentReport,
}

#[derive(Debug, Clone)]
pub struct ContentProcessor {
    proxy_path: String,
}

impl Default for ContentProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_PROXY_PATH)
    }
}

impl ContentProcessor {
    pub fn new(proxy_path: impl Into<String>) -> Self {
        Self {
            proxy_path: proxy_path.into(),
        }
    }

    /// Derive the display variant of `html`.
    pub fn process(&self, html: &str) -> String {
        self.process_with_report(html).html
    }

    /// Same as [`ContentProcessor::process`], also returning what changed.
    pub fn process_with_report(&self, html: &str) -> ProcessedContent {
        let mut report = ContentReport::default();
        if html.is_empty() {
            return ProcessedContent {
                html: String::new(),
                report,
            };
        }

        let html = match rewrite_images(html, &self.proxy_path) {
            Ok(outcome) => {
                report.images_proxied = outcome.proxied;
                outcome.html
            }
            Err(err) => {
                warn!(
                    target = "application::content",
                    error = %err,
                    "image rewrite skipped"
                );
                html.to_string()
            }
        };

        let gists = upgrade_gist_links(&html);
        report.gists_upgraded = gists.upgraded;

        let giphys = upgrade_giphy_links(&gists.html);
        report.giphys_upgraded = giphys.upgraded;

        record_metrics(&report);
        debug!(
            target = "application::content",
            images_proxied = report.images_proxied,
            gists_upgraded = report.gists_upgraded,
            giphys_upgraded = report.giphys_upgraded,
            "content processed"
        );

        ProcessedContent {
            html: giphys.html,
            report,
        }
    }
}

fn record_metrics(report: &ContentReport) {
    if report.images_proxied > 0 {
        counter!(METRIC_IMAGES_PROXIED).increment(u64::from(report.images_proxied));
    }
    if report.gists_upgraded > 0 {
        counter!(METRIC_EMBEDS_UPGRADED, "kind" => "gist")
            .increment(u64::from(report.gists_upgraded));
    }
    if report.giphys_upgraded > 0 {
        counter!(METRIC_EMBEDS_UPGRADED, "kind" => "giphy")
            .increment(u64::from(report.giphys_upgraded));
    }
}

#[derive(Debug, Clone)]
pub struct ContentPipelineConfig {
    pub image_proxy_path: String,
}

impl Default for ContentPipelineConfig {
    fn default() -> Self {
        Self {
            image_proxy_path: DEFAULT_IMAGE_PROXY_PATH.to_string(),
        }
    }
}

impl From<&crate::config::ContentSettings> for ContentPipelineConfig {
    fn from(settings: &crate::config::ContentSettings) -> Self {
        Self {
            image_proxy_path: settings.image_proxy_path.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentConfigError {
    #[error("content processor already configured")]
    AlreadyConfigured,
}

static CONTENT_PIPELINE_CONFIG: OnceCell<ContentPipelineConfig> = OnceCell::new();

static CONTENT_PROCESSOR: Lazy<Arc<ContentProcessor>> = Lazy::new(|| {
    let config = CONTENT_PIPELINE_CONFIG.get().cloned().unwrap_or_default();
    Arc::new(ContentProcessor::new(config.image_proxy_path))
});

/// Set the process-wide processor configuration. Must run before the first
/// call to [`content_processor`].
pub fn configure_content_processor(
    config: ContentPipelineConfig,
) -> Result<(), ContentConfigError> {
    CONTENT_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| ContentConfigError::AlreadyConfigured)
}

/// Access the shared processor, initialised on first use.
pub fn content_processor() -> Arc<ContentProcessor> {
    Arc::clone(&CONTENT_PROCESSOR)
}

pub fn process_content(html: &str) -> String {
    content_processor().process(html)
}
