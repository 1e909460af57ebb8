//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::content::DEFAULT_IMAGE_PROXY_PATH;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_GIST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(
    name = "folio",
    version,
    about = "Blog content pipeline: process, parse, render and resolve embeds"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Post-process stored HTML into its display form.
    Process(ProcessArgs),
    /// Parse stored HTML into a JSON document.
    Parse(InputArgs),
    /// Render a JSON document into sanitised stored HTML.
    Render(RenderArgs),
    /// Post-process stored HTML and resolve its embeds over HTTP.
    Embeds(EmbedsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Input file, or `-` for standard input.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub content: ContentOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Emit the serialised document without sanitisation.
    #[arg(long = "skip-sanitize", action = clap::ArgAction::SetTrue)]
    pub skip_sanitize: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EmbedsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub embeds: EmbedOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the path of the image proxy endpoint.
    #[arg(long = "image-proxy-path", value_name = "PATH")]
    pub image_proxy_path: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct EmbedOverrides {
    /// Override how long a Gist script may take to load.
    #[arg(long = "gist-timeout-seconds", value_name = "SECONDS")]
    pub gist_timeout_seconds: Option<u64>,

    /// Override the HTTP request timeout used when resolving embeds.
    #[arg(long = "http-timeout-seconds", value_name = "SECONDS")]
    pub http_timeout_seconds: Option<u64>,

    /// Override the user agent sent when resolving embeds.
    #[arg(long = "user-agent", value_name = "AGENT")]
    pub user_agent: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub embeds: EmbedSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub image_proxy_path: String,
}

#[derive(Debug, Clone)]
pub struct EmbedSettings {
    pub gist_timeout: Duration,
    pub http_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_logging_overrides(&cli.logging);
    match &cli.command {
        Command::Process(args) => raw.apply_content_overrides(&args.content),
        Command::Embeds(args) => {
            raw.apply_content_overrides(&args.content);
            raw.apply_embed_overrides(&args.embeds);
        }
        Command::Parse(_) | Command::Render(_) => {}
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    content: RawContentSettings,
    embeds: RawEmbedSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(path) = overrides.image_proxy_path.as_ref() {
            self.content.image_proxy_path = Some(path.clone());
        }
    }

    fn apply_embed_overrides(&mut self, overrides: &EmbedOverrides) {
        if let Some(seconds) = overrides.gist_timeout_seconds {
            self.embeds.gist_timeout_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.http_timeout_seconds {
            self.embeds.http_timeout_seconds = Some(seconds);
        }
        if let Some(agent) = overrides.user_agent.as_ref() {
            self.embeds.user_agent = Some(agent.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            content,
            embeds,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let embeds = build_embed_settings(embeds)?;

        Ok(Self {
            logging,
            content,
            embeds,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let image_proxy_path = content
        .image_proxy_path
        .map(|path| path.trim().to_string())
        .unwrap_or_else(|| DEFAULT_IMAGE_PROXY_PATH.to_string());

    if !image_proxy_path.starts_with('/') || image_proxy_path.starts_with("//") {
        return Err(LoadError::invalid(
            "content.image_proxy_path",
            "must be a root-relative path such as `/api/image-proxy`",
        ));
    }
    if image_proxy_path.contains(['?', '#']) {
        return Err(LoadError::invalid(
            "content.image_proxy_path",
            "must not carry a query or fragment",
        ));
    }

    Ok(ContentSettings { image_proxy_path })
}

fn build_embed_settings(embeds: RawEmbedSettings) -> Result<EmbedSettings, LoadError> {
    let gist_timeout = positive_seconds(
        embeds
            .gist_timeout_seconds
            .unwrap_or(DEFAULT_GIST_TIMEOUT_SECS),
        "embeds.gist_timeout_seconds",
    )?;
    let http_timeout = positive_seconds(
        embeds
            .http_timeout_seconds
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        "embeds.http_timeout_seconds",
    )?;

    let user_agent = embeds
        .user_agent
        .map(|agent| agent.trim().to_string())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
    if user_agent.is_empty() {
        return Err(LoadError::invalid(
            "embeds.user_agent",
            "must not be empty",
        ));
    }

    Ok(EmbedSettings {
        gist_timeout,
        http_timeout,
        user_agent,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    image_proxy_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEmbedSettings {
    gist_timeout_seconds: Option<u64>,
    http_timeout_seconds: Option<u64>,
    user_agent: Option<String>,
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
