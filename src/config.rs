use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::yt_dlp_interface::urls::yt_dlp_binary_name;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 900; // 15 minutes
pub const DEFAULT_ERROR_LOG: &str = "server_errors.log";

pub fn find_dotenv() -> Result<Option<PathBuf>> {
    // 1. Check directory where the executable is located
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(exe_dir) = current_exe.parent() {
            let exe_dir_dotenv = exe_dir.join(".env");
            if exe_dir_dotenv.exists() {
                return Ok(Some(exe_dir_dotenv));
            }
        }
    }

    // 2. Check current working directory (for cargo run compatibility)
    let current_dir = std::env::current_dir()?;
    let current_dotenv = current_dir.join(".env");
    if current_dotenv.exists() {
        return Ok(Some(current_dotenv));
    }

    Ok(None)
}

/// Loads `.env` if there is one. Runs before the logger exists, so the
/// caller reports the outcome.
pub fn load_environment() -> Result<Option<PathBuf>> {
    let found = find_dotenv()?;
    if let Some(path) = &found {
        dotenv::from_path(path).with_context(|| format!("Failed to read {:?}", path))?;
    }
    Ok(found)
}

/// Runtime settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub libraries_dir: PathBuf,
    pub yt_dlp_path: PathBuf,
    pub yt_dlp_auto_install: bool,
    pub scratch_dir: PathBuf,
    pub metadata_timeout: Duration,
    pub download_timeout: Duration,
    pub error_log_path: PathBuf,
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("{} must be a boolean, got {:?}", key, other)),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a number of seconds, got {:?}", key, value))?;
    if secs == 0 {
        return Err(anyhow::anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_secs(secs))
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Builds settings from any key lookup; missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 127.0.0.1:8000")?;

        let libraries_dir = lookup("LIBRARIES_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("lib"));
        let yt_dlp_path = lookup("YT_DLP_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| libraries_dir.join(yt_dlp_binary_name()));

        let yt_dlp_auto_install = match lookup("YT_DLP_AUTO_INSTALL") {
            Some(value) => parse_bool("YT_DLP_AUTO_INSTALL", &value)?,
            None => true,
        };

        let scratch_dir = lookup("SCRATCH_DIR").map(PathBuf::from).unwrap_or_else(std::env::temp_dir);

        let metadata_timeout = match lookup("METADATA_TIMEOUT_SECS") {
            Some(value) => parse_secs("METADATA_TIMEOUT_SECS", &value)?,
            None => Duration::from_secs(DEFAULT_METADATA_TIMEOUT_SECS),
        };
        let download_timeout = match lookup("DOWNLOAD_TIMEOUT_SECS") {
            Some(value) => parse_secs("DOWNLOAD_TIMEOUT_SECS", &value)?,
            None => Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        };

        let error_log_path = lookup("ERROR_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_LOG));

        Ok(Settings {
            bind_addr,
            libraries_dir,
            yt_dlp_path,
            yt_dlp_auto_install,
            scratch_dir,
            metadata_timeout,
            download_timeout,
            error_log_path,
        })
    }
}
