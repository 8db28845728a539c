use std::fs::File;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{AppError, AppResult};

/// A file on disk and the name it gets inside the archive.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    pub path: PathBuf,
    pub name: String,
}

fn write_zip(members: &[ArchiveMember], dest: &Path) -> AppResult<u64> {
    let mut zip = ZipWriter::new(File::create(dest)?);

    for member in members {
        let len = std::fs::metadata(&member.path)?.len();
        // Media is already compressed
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(len >= u32::MAX as u64);
        zip.start_file(member.name.as_str(), options)?;
        let mut source = File::open(&member.path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let file = zip.finish()?;
    Ok(file.metadata()?.len())
}

/// Writes `members` into a zip at `dest` on the blocking pool and returns
/// the archive size.
pub async fn build_zip(members: Vec<ArchiveMember>, dest: PathBuf) -> AppResult<u64> {
    let count = members.len();
    let size = tokio::task::spawn_blocking(move || write_zip(&members, &dest))
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))??;
    log::info!("Built archive with {} entries ({} bytes)", count, size);
    Ok(size)
}
