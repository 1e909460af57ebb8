//! Resolution of every embed container on a display page.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use futures::future::join_all;
use lol_html::{
    RewriteStrSettings, element, errors::RewritingError, html_content::ContentType, rewrite_str,
};
use tracing::info;

use crate::application::codec::escape::decode_attribute;
use crate::domain::document::{GiphyEmbedAttrs, GistEmbedAttrs};

use super::EmbedError;
use super::gist::{DEFAULT_GIST_TIMEOUT, GistEmbed};
use super::giphy::GiphyEmbed;
use super::host::{ImageHost, ScriptHost};
use super::state::EmbedState;

const GIST_SELECTOR: &str = "div[data-type=\"gist-embed\"]";
const GIPHY_SELECTOR: &str = "div[data-type=\"giphy-embed\"]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub html: String,
    pub ready: usize,
    pub failed: usize,
}

/// Mounts one renderer per embed container, settles them concurrently and
/// writes each one's state markup into its container.
#[derive(Clone)]
pub struct EmbedResolver {
    scripts: Arc<dyn ScriptHost>,
    images: Arc<dyn ImageHost>,
    gist_timeout: Duration,
}

impl EmbedResolver {
    pub fn new(scripts: Arc<dyn ScriptHost>, images: Arc<dyn ImageHost>) -> Self {
        Self {
            scripts,
            images,
            gist_timeout: DEFAULT_GIST_TIMEOUT,
        }
    }

    pub fn with_gist_timeout(mut self, timeout: Duration) -> Self {
        self.gist_timeout = timeout;
        self
    }

    pub async fn resolve(&self, html: &str) -> Result<ResolvedPage, EmbedError> {
        let slots = collect_slots(html)?;
        if slots.is_empty() {
            return Ok(ResolvedPage {
                html: html.to_string(),
                ready: 0,
                failed: 0,
            });
        }

        let mut embeds: Vec<MountedEmbed> = slots.iter().map(|slot| self.mount(slot)).collect();
        join_all(embeds.iter_mut().map(MountedEmbed::settle)).await;

        let rendered: Vec<String> = embeds.iter().map(MountedEmbed::render_html).collect();
        let ready = embeds
            .iter()
            .filter(|embed| matches!(embed.state(), EmbedState::Ready))
            .count();
        let failed = embeds.len() - ready;

        let html = splice(html, &rendered)?;
        info!(
            target = "application::embeds",
            embeds = embeds.len(),
            ready,
            failed,
            "embeds resolved"
        );

        Ok(ResolvedPage {
            html,
            ready,
            failed,
        })
    }

    fn mount(&self, slot: &EmbedSlot) -> MountedEmbed {
        match slot {
            EmbedSlot::Gist(attrs) => MountedEmbed::Gist(GistEmbed::mount(
                Arc::clone(&self.scripts),
                attrs,
                self.gist_timeout,
            )),
            EmbedSlot::Giphy(attrs) => {
                MountedEmbed::Giphy(GiphyEmbed::mount(Arc::clone(&self.images), attrs))
            }
        }
    }
}

enum EmbedSlot {
    Gist(GistEmbedAttrs),
    Giphy(GiphyEmbedAttrs),
}

enum MountedEmbed {
    Gist(GistEmbed),
    Giphy(GiphyEmbed),
}

impl MountedEmbed {
    async fn settle(&mut self) {
        match self {
            MountedEmbed::Gist(embed) => {
                embed.settle().await;
            }
            MountedEmbed::Giphy(embed) => {
                embed.settle().await;
            }
        }
    }

    fn state(&self) -> &EmbedState {
        match self {
            MountedEmbed::Gist(embed) => embed.state(),
            MountedEmbed::Giphy(embed) => embed.state(),
        }
    }

    fn render_html(&self) -> String {
        match self {
            MountedEmbed::Gist(embed) => embed.render_html(),
            MountedEmbed::Giphy(embed) => embed.render_html(),
        }
    }
}

fn collect_slots(html: &str) -> Result<Vec<EmbedSlot>, RewritingError> {
    let slots = Rc::new(RefCell::new(Vec::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(GIST_SELECTOR, {
                    let slots = Rc::clone(&slots);
                    move |el| {
                        let gist_id = el
                            .get_attribute("data-gist-id")
                            .map(|value| decode_attribute(&value))
                            .unwrap_or_default();
                        let filename = el
                            .get_attribute("data-filename")
                            .map(|value| decode_attribute(&value));
                        slots
                            .borrow_mut()
                            .push(EmbedSlot::Gist(GistEmbedAttrs { gist_id, filename }));
                        Ok(())
                    }
                }),
                element!(GIPHY_SELECTOR, {
                    let slots = Rc::clone(&slots);
                    move |el| {
                        let giphy_id = el
                            .get_attribute("data-giphy-id")
                            .map(|value| decode_attribute(&value));
                        let src = el
                            .get_attribute("data-src")
                            .map(|value| decode_attribute(&value));
                        slots
                            .borrow_mut()
                            .push(EmbedSlot::Giphy(GiphyEmbedAttrs { giphy_id, src }));
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(slots.take())
}

fn splice(html: &str, rendered: &[String]) -> Result<String, RewritingError> {
    let position = Rc::new(Cell::new(0usize));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(GIST_SELECTOR, {
                    let position = Rc::clone(&position);
                    move |el| {
                        if let Some(markup) = next_markup(&position, rendered) {
                            el.set_inner_content(markup, ContentType::Html);
                        }
                        Ok(())
                    }
                }),
                element!(GIPHY_SELECTOR, {
                    let position = Rc::clone(&position);
                    move |el| {
                        if let Some(markup) = next_markup(&position, rendered) {
                            el.set_inner_content(markup, ContentType::Html);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
}

/// Containers are visited in document order, matching `collect_slots`.
fn next_markup<'a>(position: &Cell<usize>, rendered: &'a [String]) -> Option<&'a str> {
    let index = position.get();
    position.set(index + 1);
    rendered.get(index).map(String::as_str)
}
