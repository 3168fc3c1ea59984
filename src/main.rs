//! Fansly Grabber - host bridge entry point.

use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use fansly_grabber::{
    api::{EndpointMatcher, Interceptor, RefetchClient, API_BASE},
    bridge::Bridge,
    cli::Args,
    config::{validate_config, Config, SettingsHandle},
    download::{DownloadQueue, DownloadService, FileDownloadService, QueueStats, RecordingService},
    error::{exit_codes, Error},
    fs::default_config_path,
    output::{
        create_spinner, print_banner, print_config_summary, print_error, print_info,
        print_queue_stats, print_success, print_warning, summary_line, ConsoleNotifier,
    },
    store::CorrelationStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(stats) if stats.failed > 0 => ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8),
        Ok(_) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{:#}", e));
            let code = match e.downcast_ref::<Error>() {
                Some(Error::Config(_) | Error::ConfigValidation { .. } | Error::TomlParse(_)) => {
                    exit_codes::CONFIG_ERROR
                }
                Some(Error::Download(_) | Error::InvalidFilename(_)) => exit_codes::DOWNLOAD_ERROR,
                _ => exit_codes::UNEXPECTED_ERROR,
            };
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> anyhow::Result<QueueStats> {
    let args = Args::parse();

    // stdout carries the bridge protocol, so logs go to stderr
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    print_banner();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = if config_path.exists() {
        Config::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };

    args.merge_into_config(&mut config);
    validate_config(&config)?;

    let download_dir = config.download_directory();
    print_config_summary(
        &config.settings.quality.to_string(),
        config.settings.auto_create_folder,
        &download_dir.display().to_string(),
        config.store.capacity,
    );

    let capacity = NonZeroUsize::new(config.store.capacity).ok_or_else(|| Error::ConfigValidation {
        field: "store.capacity".to_string(),
        message: "must be greater than zero".to_string(),
    })?;
    let store = CorrelationStore::shared(capacity, config.store_ttl());
    let settings = SettingsHandle::new(config.settings);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let interceptor = Interceptor::new(
        EndpointMatcher::new(API_BASE)?,
        RefetchClient::new(config.intercept.header_denylist.as_slice(), config.intercept_timeout())?,
        store.clone(),
        events_tx,
    );

    let service: Arc<dyn DownloadService> = if args.dry_run {
        print_info("Dry run: downloads are logged, not performed");
        Arc::new(RecordingService::default())
    } else {
        Arc::new(FileDownloadService::new(&download_dir, config.download_timeout())?)
    };
    let queue = DownloadQueue::new(
        service,
        Arc::new(ConsoleNotifier),
        settings.subscribe(),
        config.cool_down(),
    );

    let bridge = Bridge::new(Arc::new(interceptor), queue, settings);
    print_info("Listening for messages on stdin");

    let spinner = create_spinner("Waiting for messages...");
    let stats = bridge
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), events_rx)
        .await;
    spinner.finish_and_clear();

    print_queue_stats(&stats, store.read().fingerprint_count());
    if stats.failed > 0 {
        print_warning(&summary_line(&stats));
    } else {
        print_success(&summary_line(&stats));
    }

    Ok(stats)
}
