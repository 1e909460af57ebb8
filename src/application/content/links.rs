//! Upgrades for paragraphs that hold nothing but a single Gist or Giphy link.
//!
//! The patterns target the normalised markup the editor stores
//! (`<p><a href="…">…</a></p>`); any other shape passes through untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::application::codec::{
    GIPHY_EMBED_TYPE, GIST_EMBED_TYPE,
    escape::{decode_attribute, escape_attribute},
};
use crate::domain::embeds::{
    extract_gist_id, extract_giphy_id, gist_script_url, giphy_embed_url, is_giphy_url,
    is_gist_url,
};

static LINK_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<p(?:\s[^>]*)?>\s*<a(\s[^>]*)?>[^<]*</a>\s*</p>"#)
        .expect("link paragraph pattern must compile")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("attribute pattern must compile")
});

pub(crate) struct LinkUpgrade {
    pub(crate) html: String,
    pub(crate) upgraded: u32,
}

pub(crate) fn upgrade_gist_links(html: &str) -> LinkUpgrade {
    upgrade_with(html, |href| {
        if !is_gist_url(href) {
            return None;
        }
        let gist = extract_gist_id(href)?;
        Some(gist_markup(&gist.gist_id, gist.filename.as_deref()))
    })
}

pub(crate) fn upgrade_giphy_links(html: &str) -> LinkUpgrade {
    upgrade_with(html, |href| {
        if !is_giphy_url(href) {
            return None;
        }
        extract_giphy_id(href).map(|giphy_id| giphy_markup(&giphy_id))
    })
}

fn upgrade_with<F>(html: &str, mut build: F) -> LinkUpgrade
where
    F: FnMut(&str) -> Option<String>,
{
    let mut upgraded = 0u32;
    let rewritten = LINK_PARAGRAPH.replace_all(html, |captures: &Captures<'_>| {
        let built = captures
            .get(1)
            .and_then(|attributes| anchor_href(attributes.as_str()))
            .and_then(|href| build(&href));
        match built {
            Some(markup) => {
                upgraded = upgraded.saturating_add(1);
                markup
            }
            None => captures[0].to_string(),
        }
    });

    LinkUpgrade {
        html: rewritten.into_owned(),
        upgraded,
    }
}

/// Decoded value of the `href` attribute itself. Attributes such as
/// `data-href` and quoted values mentioning `href=` never match.
fn anchor_href(attributes: &str) -> Option<String> {
    ATTRIBUTE.captures_iter(attributes).find_map(|attribute| {
        if !attribute[1].eq_ignore_ascii_case("href") {
            return None;
        }
        let value = attribute
            .get(2)
            .or_else(|| attribute.get(3))
            .or_else(|| attribute.get(4))?;
        Some(decode_attribute(value.as_str()))
    })
}

fn gist_markup(gist_id: &str, filename: Option<&str>) -> String {
    let mut html = format!(
        "<div class=\"gist-embed\" data-type=\"{GIST_EMBED_TYPE}\" data-gist-id=\"{}\"",
        escape_attribute(gist_id)
    );
    if let Some(filename) = filename {
        html.push_str(" data-filename=\"");
        html.push_str(&escape_attribute(filename));
        html.push('"');
    }
    html.push_str(&format!(
        "><script src=\"{}\"></script></div>",
        escape_attribute(&gist_script_url(gist_id, filename))
    ));
    html
}

fn giphy_markup(giphy_id: &str) -> String {
    format!(
        "<div class=\"giphy-embed\" data-type=\"{GIPHY_EMBED_TYPE}\" data-giphy-id=\"{}\">\
         <iframe src=\"{}\" width=\"480\" height=\"270\" frameborder=\"0\" class=\"giphy-embed-frame\" allowfullscreen></iframe></div>",
        escape_attribute(giphy_id),
        escape_attribute(&giphy_embed_url(giphy_id))
    )
}
