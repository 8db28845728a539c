use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{Duration, timeout};

use crate::yt_dlp_interface::extractor::Extractor;
use crate::yt_dlp_interface::models::{PlaylistInfo, VideoInfo};
use crate::yt_dlp_interface::options::DownloadOptions;

lazy_static! {
    static ref ANSI_CODES: Regex = Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").unwrap();
    static ref PROGRESS_LINE: Regex =
        Regex::new(r"\[download\]\s+(\d+\.?\d*)%(?:\s+of\s+~?\s*(\d+\.?\d*[KMGT]?i?B))?").unwrap();
}

/// Extractor backed by the yt-dlp executable.
#[derive(Clone)]
pub struct YoutubeFetcher {
    pub yt_dlp_path: PathBuf,
    pub metadata_timeout: Duration,
    pub download_timeout: Duration,
}

impl YoutubeFetcher {
    pub fn new(yt_dlp_path: PathBuf, metadata_timeout: Duration, download_timeout: Duration) -> Self {
        YoutubeFetcher {
            yt_dlp_path,
            metadata_timeout,
            download_timeout,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.yt_dlp_path);
        cmd.kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    async fn dump_json<T: DeserializeOwned>(&self, args: &[&str], url: &str) -> Result<T> {
        let mut cmd = self.command();
        cmd.args(args).arg("--").arg(url);

        log::info!("Fetching metadata for {}", url);
        let output = timeout(self.metadata_timeout, cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("Timed out after {:?} fetching metadata", self.metadata_timeout))?
            .with_context(|| format!("Failed to run {:?}", self.yt_dlp_path))?;

        if !output.status.success() {
            let message = error_message(&String::from_utf8_lossy(&output.stderr));
            log::error!("yt-dlp metadata fetch failed for {}: {}", url, message);
            return Err(anyhow::anyhow!(message));
        }
        if output.stdout.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(anyhow::anyhow!("yt-dlp returned an empty response"));
        }

        serde_json::from_slice(&output.stdout).context("yt-dlp returned malformed JSON")
    }

    async fn run_download(&self, url: &str, options: &DownloadOptions) -> Result<PathBuf> {
        let mut cmd = self.command();
        cmd.args(options.to_args()).arg("--").arg(url);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to run {:?}", self.yt_dlp_path))?;
        let stdout = child.stdout.take().context("stdout not captured")?;
        let stderr = child.stderr.take().context("stderr not captured")?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let mut printed_path: Option<String> = None;
        let mut stderr_tail = String::new();
        let mut last_logged = 0u32;
        let mut stderr_done = false;

        loop {
            tokio::select! {
                line = stdout_reader.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            log::trace!("yt-dlp stdout: {}", line);
                            if let Some((percentage, size)) = parse_progress_line(&line) {
                                log_progress(url, percentage, size.as_deref(), &mut last_logged);
                            } else if !line.trim().is_empty() && !line.starts_with('[') {
                                printed_path = Some(line.trim().to_string());
                            }
                        },
                        Ok(None) | Err(_) => break,
                    }
                },
                line = stderr_reader.next_line(), if !stderr_done => {
                    match line {
                        Ok(Some(line)) => {
                            log::trace!("yt-dlp stderr: {}", line);
                            if let Some((percentage, size)) = parse_progress_line(&line) {
                                log_progress(url, percentage, size.as_deref(), &mut last_logged);
                            } else {
                                stderr_tail.push_str(&line);
                                stderr_tail.push('\n');
                            }
                        },
                        Ok(None) | Err(_) => stderr_done = true,
                    }
                }
            }
        }

        while !stderr_done {
            match stderr_reader.next_line().await {
                Ok(Some(line)) => {
                    stderr_tail.push_str(&line);
                    stderr_tail.push('\n');
                }
                _ => stderr_done = true,
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let message = error_message(&stderr_tail);
            log::error!("yt-dlp download failed for {}: {}", url, message);
            return Err(anyhow::anyhow!(message));
        }

        resolve_output(&options.output_dir, &options.filename_stem, printed_path.as_deref())
            .with_context(|| format!("Downloaded file not found in {:?}", options.output_dir))
    }
}

#[async_trait]
impl Extractor for YoutubeFetcher {
    async fn fetch_video(&self, url: &str) -> Result<VideoInfo> {
        self.dump_json(&["--dump-single-json", "--skip-download", "--no-playlist", "--no-warnings"], url)
            .await
    }

    async fn fetch_playlist(&self, url: &str) -> Result<PlaylistInfo> {
        self.dump_json(&["--flat-playlist", "--dump-single-json", "--no-warnings"], url)
            .await
    }

    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<PathBuf> {
        log::info!("Downloading {} with format {}", url, options.format_selector());
        timeout(self.download_timeout, self.run_download(url, options))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out after {:?} downloading {}", self.download_timeout, url))?
    }
}

fn log_progress(url: &str, percentage: f64, size: Option<&str>, last_logged: &mut u32) {
    let step = (percentage / 25.0) as u32;
    if step > *last_logged {
        *last_logged = step;
        log::debug!("Downloading {}: {:.1}% of {}", url, percentage, size.unwrap_or("unknown size"));
    }
}

fn parse_progress_line(line: &str) -> Option<(f64, Option<String>)> {
    let clean_line = remove_ansi_codes(line);
    let caps = PROGRESS_LINE.captures(&clean_line)?;
    let percentage = caps[1].parse::<f64>().ok()?;
    Some((percentage, caps.get(2).map(|m| m.as_str().to_string())))
}

fn remove_ansi_codes(text: &str) -> String {
    ANSI_CODES.replace_all(text, "").to_string()
}

/// The most useful line of yt-dlp's stderr: the last `ERROR:` line, else the last line.
fn error_message(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| "yt-dlp exited with an error".to_string())
}

/// Finds the finished file: the path yt-dlp printed if it lies inside
/// `output_dir`, otherwise `<stem>.<ext>` for any known media extension.
fn resolve_output(output_dir: &Path, stem: &str, printed: Option<&str>) -> Result<PathBuf> {
    let canonical_dir = output_dir.canonicalize()?;

    if let Some(printed) = printed {
        let candidate = PathBuf::from(printed);
        let candidate = if candidate.is_absolute() { candidate } else { output_dir.join(candidate) };
        if let Ok(canonical) = candidate.canonicalize() {
            if canonical.starts_with(&canonical_dir) && canonical.is_file() {
                return Ok(canonical);
            }
        }
    }

    for ext in ["mp4", "webm", "mkv", "mov", "flv", "m4a", "mp3"] {
        let alt_path = canonical_dir.join(format!("{}.{}", stem, ext));
        if alt_path.is_file() {
            return Ok(alt_path);
        }
    }
    Err(anyhow::anyhow!("Downloaded file not found"))
}
