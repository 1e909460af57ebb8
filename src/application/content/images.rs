use std::{cell::Cell, rc::Rc};

use lol_html::{RewriteStrSettings, element, errors::RewritingError, rewrite_str};
use url::{Url, form_urlencoded};

use crate::application::codec::escape::decode_attribute;

pub(crate) struct ImageRewrite {
    pub(crate) html: String,
    pub(crate) proxied: u32,
}

/// Route every foreign `<img src>` through the image proxy.
pub(crate) fn rewrite_images(html: &str, proxy_path: &str) -> Result<ImageRewrite, RewritingError> {
    let proxied = Rc::new(Cell::new(0u32));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img[src]", {
                let proxied = Rc::clone(&proxied);
                move |el| {
                    if let Some(raw) = el.get_attribute("src")
                        && let Some(target) = proxy_image_url(&decode_attribute(&raw), proxy_path)
                    {
                        el.set_attribute("src", &target)?;
                        proxied.set(proxied.get().saturating_add(1));
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(ImageRewrite {
        html: rewritten,
        proxied: proxied.get(),
    })
}

/// Proxy URL for `src`, or `None` when the source must be left untouched:
/// already proxied, root-relative, inline data, or not an absolute http(s)
/// URL. Protocol-relative sources are treated as https.
pub fn proxy_image_url(src: &str, proxy_path: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with(proxy_path) {
        return None;
    }
    if src.starts_with('/') && !src.starts_with("//") {
        return None;
    }

    let absolute = if src.starts_with("//") {
        format!("https:{src}")
    } else {
        src.to_string()
    };
    // Relative paths and data URIs resolve against the page, not a remote host.
    let parsed = Url::parse(&absolute).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    if parsed.path() == proxy_path {
        return None;
    }

    let encoded: String = form_urlencoded::byte_serialize(absolute.as_bytes()).collect();
    Some(format!("{proxy_path}?url={encoded}"))
}
