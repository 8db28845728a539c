use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Error;
use log::LevelFilter;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::metadata::MetadataFetcher;
use crate::orchestrator::Orchestrator;
use crate::server::AppState;
use crate::yt_dlp_interface::{Extractor, YoutubeFetcher, ensure_yt_dlp};

mod archive;
mod config;
mod error;
mod metadata;
mod orchestrator;
mod render;
mod server;
mod source;
mod utils;
mod yt_dlp_interface;

/// Console logging for everything, plus error records appended to `error_log`.
fn init_logging(error_log: &Path) -> Result<(), Error> {
    let error_log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(error_log)?;
    let error_log_file = Arc::new(Mutex::new(error_log_file));

    let mut builder = pretty_env_logger::formatted_builder();
    builder
        .format(move |buf, record| {
            use std::io::Write;
            let output = format!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );

            if record.level() == log::Level::Error {
                if let Ok(mut file) = error_log_file.try_lock() {
                    let _ = writeln!(file, "{}", &output);
                }
            }

            writeln!(buf, "{}", &output)
        })
        .filter(None, LevelFilter::Info)
        .parse_default_env()
        .init();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let env_file = config::load_environment()?;
    let settings = Settings::from_env()?;
    init_logging(&settings.error_log_path)?;

    log::info!("Starting video downloader...");
    let start_time = std::time::Instant::now();
    match &env_file {
        Some(path) => log::info!("Loaded environment variables from {:?}", path),
        None => log::warn!("No .env file found. Using system environment variables."),
    }
    log::info!("Libraries directory: {:?}", settings.libraries_dir);

    let http = reqwest::Client::new();
    if let Err(e) = ensure_yt_dlp(&http, &settings.yt_dlp_path, settings.yt_dlp_auto_install).await {
        log::error!("Failed to ensure yt-dlp: {}", e);
        return Err(e);
    }

    std::fs::create_dir_all(&settings.scratch_dir)?;
    log::info!("Scratch directory: {:?}", settings.scratch_dir);

    let extractor: Arc<dyn Extractor> = Arc::new(YoutubeFetcher::new(
        settings.yt_dlp_path.clone(),
        settings.metadata_timeout,
        settings.download_timeout,
    ));
    let state = AppState {
        metadata: Arc::new(MetadataFetcher::new(extractor.clone())),
        orchestrator: Arc::new(Orchestrator::new(extractor, http, settings.scratch_dir.clone())),
    };

    let listener = TcpListener::bind(settings.bind_addr).await?;
    log::info!("Initialization completed in {:.2?}", start_time.elapsed());

    server::serve(listener, state, shutdown_signal()).await
}
