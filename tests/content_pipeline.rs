use std::sync::Arc;

use folio::application::{
    codec::{parse_document, render_document},
    content::{ContentProcessor, process_content, sanitize_stored_html},
    editor::Editor,
    embeds::{
        EmbedError, EmbedResolver, ImageHost, ImageRequest, LoadNotifier, ScriptElement,
        ScriptHost,
    },
};
use folio::domain::document::{Block, CodeBlockAttrs, Document, GiphyEmbedAttrs, Inline, MarkKind};

fn stored_fixture() -> &'static str {
    include_str!("fixtures/post_stored.html")
}

/// Host that reports every resource as loaded.
struct LoadingHost;

impl ScriptHost for LoadingHost {
    fn inject_script(
        &self,
        _script: &ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<(), EmbedError> {
        notifier.loaded();
        Ok(())
    }

    fn remove_script(&self, _script_id: &str) {}
}

impl ImageHost for LoadingHost {
    fn load_image(
        &self,
        _request: &ImageRequest,
        notifier: LoadNotifier,
    ) -> Result<(), EmbedError> {
        notifier.loaded();
        Ok(())
    }

    fn cancel_image(&self, _request_id: &str) {}
}

fn resolver() -> EmbedResolver {
    let host = Arc::new(LoadingHost);
    EmbedResolver::new(host.clone(), host)
}

#[test]
fn stored_fixture_processes_to_display_fixture() {
    let expected = include_str!("fixtures/post_display.html");
    let processed = ContentProcessor::default().process_with_report(stored_fixture());

    assert_eq!(expected.trim_end(), processed.html.trim_end());
    assert_eq!(processed.report.images_proxied, 2);
    assert_eq!(processed.report.gists_upgraded, 1);
    assert_eq!(processed.report.giphys_upgraded, 1);
}

#[test]
fn processing_is_idempotent_on_the_fixture() {
    let once = process_content(stored_fixture());
    assert_eq!(process_content(&once), once);
}

#[test]
fn image_classification_examples() {
    let foreign = process_content("<img src=\"https://example.com/a.png\">");
    assert!(foreign.contains("/api/image-proxy?url=https%3A%2F%2Fexample.com%2Fa.png"));

    let local = "<img src=\"/local/a.png\">";
    assert_eq!(process_content(local), local);
    assert_eq!(process_content(""), "");
}

#[test]
fn editor_output_survives_storage_and_reload() {
    let mut editor = Editor::default();
    editor.insert_paragraph("Release notes for the week");
    editor.select(0, 0..7);
    editor.toggle_mark(MarkKind::Bold);
    editor.insert_link("https://example.com/releases");
    editor.insert_paragraph("fn main() {}");
    editor.set_code_block(Some(CodeBlockAttrs::new(Some("rust")).with_filename("main.rs")));
    editor.insert_gist_embed("https://gist.github.com/alice/abc123#file-main-rb");
    editor.insert_giphy_embed("https://media.giphy.com/media/XyZ789/giphy.gif");

    let stored = sanitize_stored_html(&editor.to_html());
    let reloaded = Editor::from_html(&stored);
    assert_eq!(reloaded.document(), editor.document());
}

#[tokio::test]
async fn display_page_isolates_a_broken_giphy_node() {
    let document = Document::new(vec![
        Block::paragraph(vec![Inline::text("Intro")]),
        Block::GiphyEmbed(GiphyEmbedAttrs::default()),
        Block::GiphyEmbed(GiphyEmbedAttrs::from_id("XyZ789")),
        Block::paragraph(vec![Inline::text("Outro")]),
    ]);
    let display = process_content(&render_document(&document));

    let page = resolver().resolve(&display).await.expect("resolve");
    assert_eq!((page.ready, page.failed), (1, 1));
    assert!(page.html.starts_with("<p>Intro</p>"));
    assert!(page.html.contains("<div class=\"embed-error\" role=\"alert\">"));
    assert!(page.html.contains("https://media.giphy.com/media/XyZ789/giphy.gif"));
    assert!(page.html.ends_with("<p>Outro</p>"));
}

#[tokio::test]
async fn upgraded_links_resolve_to_ready_embeds() {
    let display = process_content(stored_fixture());
    let page = resolver().resolve(&display).await.expect("resolve");

    // Upgraded gist, upgraded giphy and the stored gist container.
    assert_eq!((page.ready, page.failed), (3, 0));
    assert!(page.html.contains("src=\"https://gist.github.com/abc123.js?file=main-rb\""));
    assert!(page.html.contains("src=\"https://gist.github.com/fed987.js\""));
    assert!(!page.html.contains("<iframe"));
}

#[test]
fn parsed_display_html_keeps_the_document_shape() {
    let document = parse_document(stored_fixture());
    assert!(matches!(document.content.first(), Some(Block::Heading { .. })));
    assert!(document.content.iter().any(|block| matches!(
        block,
        Block::CodeBlock(attrs) if attrs.code == "<img src=\"https://example.com/x.png\">"
    )));
}
