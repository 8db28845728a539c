use std::path::Path;
use tokio::fs;
use tokio::io;
use anyhow::Result;
use bytes::Bytes;

pub async fn download_file(client: &reqwest::Client, url: &str, path: &Path) -> Result<()> {
    log::info!("Downloading from {} to {:?}", url, path);

    let mut response = client.get(url).send().await.map_err(|e| {
        log::error!("Failed to send GET request to {}: {:?}", url, e);
        anyhow::anyhow!("Failed to send GET request to {}: {}", url, e)
    })?;

    if !response.status().is_success() {
        log::error!("Download failed for {}: HTTP status {}", url, response.status());
        return Err(anyhow::anyhow!("Download failed for {}: HTTP status {}", url, response.status()));
    }

    let mut file = fs::File::create(path).await.map_err(|e| {
        log::error!("Failed to create file {:?}: {:?}", path, e);
        anyhow::anyhow!("Failed to create file {:?}: {}", path, e)
    })?;

    // Read the response body in chunks and write to the file
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        log::error!("Failed to read chunk from response for {}: {:?}", url, e);
        anyhow::anyhow!("Failed to read chunk from response for {}: {}", url, e)
    })? {
        io::copy(&mut chunk.as_ref(), &mut file).await.map_err(|e| {
            log::error!("Failed to write chunk to file {:?}: {:?}", path, e);
            anyhow::anyhow!("Failed to write chunk to file {:?}: {}", path, e)
        })?;
    }

    log::info!("Download completed successfully to {:?}", path);
    Ok(())
}

/// Fetches a small resource (a thumbnail) fully into memory.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Bytes> {
    log::debug!("Fetching {}", url);

    let response = client.get(url).send().await.map_err(|e| {
        anyhow::anyhow!("Failed to send GET request to {}: {}", url, e)
    })?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!("Fetch failed for {}: HTTP status {}", url, response.status()));
    }

    let body = response.bytes().await.map_err(|e| {
        anyhow::anyhow!("Failed to read response body from {}: {}", url, e)
    })?;
    Ok(body)
}
