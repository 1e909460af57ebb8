//! Embed identity: classify user-supplied URLs as Gist or Giphy references and
//! extract stable identifiers from them.
//!
//! Every function here runs against untrusted input and answers with
//! `false`/`None` rather than failing.

use url::{Url, form_urlencoded};

pub const GIST_HOST: &str = "gist.github.com";
pub const GIPHY_HOST: &str = "giphy.com";

const GIST_FILE_FRAGMENT_PREFIX: &str = "file-";
const GIPHY_SLUG_PREFIXES: &[&str] = &["gifs", "embed", "stickers", "clips"];

/// A Gist reference extracted from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistRef {
    pub gist_id: String,
    pub filename: Option<String>,
}

pub fn is_gist_url(url: &str) -> bool {
    parse_url(url).is_some_and(|parsed| parsed.host_str() == Some(GIST_HOST))
}

/// Extract the Gist ID (last non-empty path segment) and the optional
/// `#file-<name>` filename. The filename is kept literally, so GitHub's
/// anchor form (`main-rb`) is not mapped back to `main.rb`.
pub fn extract_gist_id(url: &str) -> Option<GistRef> {
    let parsed = parse_url(url)?;
    let last = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?;
    let gist_id = last.strip_suffix(".js").unwrap_or(last);
    if gist_id.is_empty() {
        return None;
    }

    let filename = parsed
        .fragment()
        .and_then(|fragment| fragment.strip_prefix(GIST_FILE_FRAGMENT_PREFIX))
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Some(GistRef {
        gist_id: gist_id.to_string(),
        filename,
    })
}

/// True when the host is `giphy.com` or any of its subdomains (which covers
/// `media.giphy.com` asset URLs).
pub fn is_giphy_url(url: &str) -> bool {
    let Some(parsed) = parse_url(url) else {
        return false;
    };
    parsed
        .host_str()
        .is_some_and(|host| host == GIPHY_HOST || host.ends_with(".giphy.com"))
}

/// Extract a Giphy ID. Patterns are tried from most to least specific and the
/// first one producing a plausible ID wins:
///
/// 1. media hosts: `/media/…/<id>/<file>.gif` yields the segment before the file;
/// 2. `/gifs/<slug>`, `/embed/<slug>`, `/stickers/<slug>`, `/clips/<slug>`
///    yield the last hyphen-delimited token of the slug;
/// 3. `/media/<id>` yields the second segment;
/// 4. a compound first segment `gifs-<source>-<id>` yields its last token;
/// 5. otherwise the final segment with a `.gif` suffix stripped.
pub fn extract_giphy_id(url: &str) -> Option<String> {
    let parsed = parse_url(url)?;
    let host = parsed.host_str().unwrap_or_default();
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    let (&first, rest) = segments.split_first()?;

    let slug_id = GIPHY_SLUG_PREFIXES
        .contains(&first)
        .then(|| rest.first().map(|slug| last_hyphen_token(slug)))
        .flatten();
    let media_path_id = (first == "media").then(|| rest.first().copied()).flatten();
    let compound_id = first
        .starts_with("gifs-")
        .then(|| last_hyphen_token(first));
    let fallback_id = segments
        .last()
        .map(|&segment| segment.strip_suffix(".gif").unwrap_or(segment))
        .filter(|segment| *segment != "media" && !GIPHY_SLUG_PREFIXES.contains(segment));

    [
        media_asset_id(host, first, &segments),
        slug_id,
        media_path_id,
        compound_id,
        fallback_id,
    ]
    .into_iter()
    .flatten()
    .find(|candidate| is_plausible_giphy_id(candidate))
    .map(str::to_string)
}

/// Script URL that renders a Gist into the page.
pub fn gist_script_url(gist_id: &str, filename: Option<&str>) -> String {
    let mut url = format!("https://{GIST_HOST}/{gist_id}.js");
    if let Some(filename) = filename.filter(|name| !name.is_empty()) {
        url.push_str("?file=");
        url.extend(form_urlencoded::byte_serialize(filename.as_bytes()));
    }
    url
}

/// Direct image URL for a Giphy ID.
pub fn giphy_media_url(giphy_id: &str) -> String {
    format!("https://media.{GIPHY_HOST}/media/{giphy_id}/giphy.gif")
}

/// Embeddable player URL for a Giphy ID.
pub fn giphy_embed_url(giphy_id: &str) -> String {
    format!("https://{GIPHY_HOST}/embed/{giphy_id}")
}

fn parse_url(url: &str) -> Option<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    Url::parse(trimmed).ok()
}

fn media_asset_id<'a>(host: &str, first: &str, segments: &[&'a str]) -> Option<&'a str> {
    let is_media_host = host == "i.giphy.com"
        || (host.starts_with("media") && host.ends_with(".giphy.com"));
    if !is_media_host || first != "media" || segments.len() < 3 {
        return None;
    }
    let file = segments.last()?;
    if !(file.ends_with(".gif") || file.ends_with(".webp") || file.ends_with(".mp4")) {
        return None;
    }
    segments.get(segments.len() - 2).copied()
}

fn last_hyphen_token(slug: &str) -> &str {
    slug.rsplit('-').next().unwrap_or(slug)
}

fn is_plausible_giphy_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate != "giphy"
        && candidate.chars().all(|ch| ch.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gist_host_must_match_exactly() {
        assert!(is_gist_url("https://gist.github.com/alice/abc123"));
        assert!(!is_gist_url("https://github.com/alice/abc123"));
        assert!(!is_gist_url("https://evil-gist.github.com.example/abc"));
        assert!(!is_gist_url("not a url"));
        assert!(!is_gist_url(""));
    }

    #[test]
    fn gist_id_and_filename_are_extracted() {
        assert_eq!(
            extract_gist_id("https://gist.github.com/alice/abc123#file-main-rb"),
            Some(GistRef {
                gist_id: "abc123".into(),
                filename: Some("main-rb".into()),
            })
        );
        assert_eq!(
            extract_gist_id("https://gist.github.com/abc123/"),
            Some(GistRef {
                gist_id: "abc123".into(),
                filename: None,
            })
        );
        assert_eq!(
            extract_gist_id("https://gist.github.com/alice/abc123.js"),
            Some(GistRef {
                gist_id: "abc123".into(),
                filename: None,
            })
        );
    }

    #[test]
    fn gist_extraction_rejects_pathless_and_invalid_urls() {
        assert_eq!(extract_gist_id("https://gist.github.com/"), None);
        assert_eq!(extract_gist_id("::::"), None);
    }

    #[test]
    fn giphy_hosts_are_classified() {
        assert!(is_giphy_url("https://giphy.com/gifs/funny-cat-XyZ789"));
        assert!(is_giphy_url("https://media.giphy.com/media/XyZ789/giphy.gif"));
        assert!(is_giphy_url("https://media2.giphy.com/media/XyZ789/giphy.gif"));
        assert!(!is_giphy_url("https://notgiphy.com/gifs/XyZ789"));
        assert!(!is_giphy_url("https://giphy.com.evil.test/gifs/XyZ789"));
        assert!(!is_giphy_url("giphy"));
    }

    #[test]
    fn giphy_ids_follow_documented_precedence() {
        let cases = [
            ("https://giphy.com/gifs/funny-cat-XyZ789", Some("XyZ789")),
            ("https://giphy.com/gifs/XyZ789", Some("XyZ789")),
            ("https://giphy.com/embed/XyZ789", Some("XyZ789")),
            ("https://giphy.com/stickers/happy-dance-Ab12", Some("Ab12")),
            ("https://media.giphy.com/media/XyZ789/giphy.gif", Some("XyZ789")),
            (
                "https://media4.giphy.com/media/v1.Y2lkPTc5/XyZ789/giphy.gif",
                Some("XyZ789"),
            ),
            ("https://giphy.com/media/XyZ789", Some("XyZ789")),
            ("https://giphy.com/gifs-nbc-snl-XyZ789", Some("XyZ789")),
            ("https://i.giphy.com/XyZ789.gif", Some("XyZ789")),
            ("https://giphy.com/", None),
            ("https://giphy.com/gifs/", None),
            ("not a url", None),
        ];

        for (input, expected) in cases {
            assert_eq!(
                extract_giphy_id(input).as_deref(),
                expected,
                "unexpected id for {input}"
            );
        }
    }

    #[test]
    fn script_url_encodes_filename() {
        assert_eq!(
            gist_script_url("abc123", None),
            "https://gist.github.com/abc123.js"
        );
        assert_eq!(
            gist_script_url("abc123", Some("main rb")),
            "https://gist.github.com/abc123.js?file=main+rb"
        );
        assert_eq!(
            giphy_media_url("XyZ789"),
            "https://media.giphy.com/media/XyZ789/giphy.gif"
        );
    }
}
