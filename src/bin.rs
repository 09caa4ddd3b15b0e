//! Binary entry point for `minibot`.
//!
//! This module provides the command-line interface for minibot with options
//! for the configuration file, connection overrides and logging verbosity.
//! It initializes logging and starts the bot.

use clap::Parser;
use minibot::base::{
    config::{Config, Overrides},
    types::Void,
};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Minibot – a small IRC bot with seen tracking, offline messages and countdowns.
///
/// Configuration can come from `config.toml`, `MINIBOT_*` environment
/// variables, or the flags below (which win).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// The IRC `host:port` to connect to.
    #[arg(long)]
    host: Option<String>,
    /// The IRC nick to use.
    #[arg(long)]
    nick: Option<String>,
    /// The IRC user to use.
    #[arg(long)]
    user: Option<String>,
    /// The IRC channel to join.
    #[arg(long)]
    channel: Option<String>,
    /// The SQLite database file.
    #[arg(long)]
    database: Option<String>,
    /// Export spans to an OTLP collector.
    #[arg(long)]
    otlp: bool,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Main entry point for the minibot binary.
///
/// Loads configuration, sets up logging based on verbosity, and starts the bot.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    let overrides = Overrides {
        host: args.host,
        nick: args.nick,
        user: args.user,
        channel: args.channel,
        database: args.database,
        otlp: args.otlp.then_some(true),
    };

    let config = Config::load(args.config.as_deref(), &overrides)?;

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // Prepare the otlp layer, if asked for.

    let otel = if config.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_batch_exporter(exporter).build().tracer("minibot");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    minibot::start(config).await
}
