use anyhow::Context;
use clap::Parser;
use discord_scraper::config::load_settings;
use discord_scraper::discord::{ChannelTarget, DiscordClient, HttpTransport, RetryPolicy};
use discord_scraper::export::{self, ExportFormat};
use discord_scraper::retrieval::{RetrievalOptions, Retriever, StopReason};
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Export the message history of a Discord channel
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Channel id, or `server_id/channel_id`
    channel: String,

    /// Message limit (positional form, prefer --limit)
    #[arg(hide = true)]
    legacy_limit: Option<usize>,

    /// Maximum number of messages to retrieve (newest first)
    #[arg(short, long)]
    limit: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = ExportFormat::Markdown)]
    format: ExportFormat,

    /// Output file; defaults to a name derived from the channel
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Member lookups in flight per page
    #[arg(short, long)]
    concurrent: Option<usize>,

    /// Retries after the first attempt of each request
    #[arg(short = 'r', long)]
    retries: Option<u32>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "discord_scraper=debug"
    } else {
        "discord_scraper=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    let mut settings = load_settings().context("Failed to load configuration")?;
    if let Some(concurrent) = args.concurrent {
        anyhow::ensure!(concurrent > 0, "--concurrent must be at least 1");
        settings.retrieval.concurrent_requests = concurrent;
    }
    if let Some(retries) = args.retries {
        settings.retrieval.max_retries = retries;
    }
    tracing::debug!(?settings, "Configuration loaded");

    let target: ChannelTarget = args
        .channel
        .parse()
        .with_context(|| format!("Invalid channel argument '{}'", args.channel))?;

    let transport = HttpTransport::new(&settings.discord, &settings.http)
        .context("Failed to create HTTP client")?;
    let retry = RetryPolicy::new(
        settings.retrieval.max_retries,
        settings.retrieval.retry_base_delay,
    );
    let retriever = Retriever::new(
        DiscordClient::new(transport, retry),
        RetrievalOptions {
            limit: args.limit.or(args.legacy_limit),
            concurrent_requests: settings.retrieval.concurrent_requests,
            ..RetrievalOptions::default()
        },
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(signal_name) => {
                tracing::info!(signal = %signal_name, "Received shutdown signal, stopping retrieval");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install signal handlers"),
        }
    });

    let retrieval = retriever
        .retrieve(&target, &cancel)
        .await
        .with_context(|| format!("Failed to retrieve channel {}", target.channel_id))?;

    if !retrieval.stop.is_complete() {
        tracing::warn!(
            retrieved = retrieval.messages.len(),
            "Exporting partial history"
        );
    }
    if let StopReason::Aborted(cause) = &retrieval.stop {
        tracing::warn!(cause = %cause, "Retrieval stopped early");
    }

    let written = export::export_retrieval(&retrieval, args.format, args.output.as_deref())
        .await
        .context("Failed to write export")?;

    if let Some(path) = written {
        tracing::info!(
            path = %path.display(),
            messages = retrieval.messages.len(),
            "Done"
        );
    }
    Ok(())
}

/// Resolves with the name of the first shutdown signal received.
/// Handles SIGINT (Ctrl+C), SIGTERM, and SIGQUIT on Unix systems
async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigquit = signal(SignalKind::quit())?;

        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT (Ctrl+C)",
            _ = sigterm.recv() => "SIGTERM",
            _ = sigquit.recv() => "SIGQUIT",
        };
        Ok(name)
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}
