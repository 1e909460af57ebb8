use std::{process, sync::Arc};

use folio::{
    application::{
        codec::{document_from_json, document_to_json, parse_document, render_document},
        content::{
            ContentPipelineConfig, configure_content_processor, content_processor,
            sanitize_stored_html,
        },
        embeds::{EmbedResolver, HttpEmbedHost},
        error::AppError,
    },
    config,
    infra::{
        error::InfraError,
        io::{read_input, write_output},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    let log = || {
        error!(
            kind = error.presentation_message(),
            chain = ?report.messages,
            "{error}"
        );
    };

    if dispatcher::has_been_set() {
        log();
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, log);
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;
    configure_content_processor(ContentPipelineConfig::from(&settings.content))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match cli_args.command {
        config::Command::Process(args) => run_process(args).await,
        config::Command::Parse(args) => run_parse(args).await,
        config::Command::Render(args) => run_render(args).await,
        config::Command::Embeds(args) => run_embeds(&settings, args).await,
    }
}

async fn run_process(args: config::ProcessArgs) -> Result<(), AppError> {
    let html = read_input(&args.input.input).await?;
    let processed = content_processor().process_with_report(&html);

    info!(
        target = "folio::process",
        input = %args.input.input.display(),
        images_proxied = processed.report.images_proxied,
        gists_upgraded = processed.report.gists_upgraded,
        giphys_upgraded = processed.report.giphys_upgraded,
        "Content processed"
    );

    write_output(&processed.html).await?;
    Ok(())
}

async fn run_parse(args: config::InputArgs) -> Result<(), AppError> {
    let html = read_input(&args.input).await?;
    let document = parse_document(&html);
    info!(
        target = "folio::parse",
        blocks = document.content.len(),
        "Document parsed"
    );
    write_output(&document_to_json(&document)?).await?;
    Ok(())
}

async fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let json = read_input(&args.input.input).await?;
    let document = document_from_json(&json)?;
    let html = render_document(&document);
    let html = if args.skip_sanitize {
        html
    } else {
        sanitize_stored_html(&html)
    };
    write_output(&html).await?;
    Ok(())
}

async fn run_embeds(settings: &config::Settings, args: config::EmbedsArgs) -> Result<(), AppError> {
    let html = read_input(&args.input.input).await?;
    let processed = content_processor().process(&html);

    let host = Arc::new(HttpEmbedHost::new(
        &settings.embeds.user_agent,
        settings.embeds.http_timeout,
    )?);
    let resolver =
        EmbedResolver::new(host.clone(), host).with_gist_timeout(settings.embeds.gist_timeout);
    let page = resolver.resolve(&processed).await?;

    info!(
        target = "folio::embeds",
        ready = page.ready,
        failed = page.failed,
        "Embeds resolved"
    );

    write_output(&page.html).await?;
    Ok(())
}
