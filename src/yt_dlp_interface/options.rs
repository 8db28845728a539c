use std::ffi::OsString;
use std::path::PathBuf;

/// Containers we are willing to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Container::Mp4 => "video/mp4",
        }
    }
}

/// Everything the extractor needs for one download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Format id taken from the metadata listing.
    pub format_id: String,
    pub container: Container,
    pub output_dir: PathBuf,
    /// File name without extension; the extractor appends it. Kept short and
    /// fixed by callers, the served name comes from the title instead.
    pub filename_stem: String,
}

impl DownloadOptions {
    pub fn format_selector(&self) -> String {
        self.format_id.clone()
    }

    pub fn output_template(&self) -> PathBuf {
        // `%` would be read as a template field
        let stem = self.filename_stem.replace('%', "%%");
        self.output_dir.join(format!("{}.%(ext)s", stem))
    }

    /// yt-dlp arguments, without the binary and the URL.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        args.push("--format".into());
        args.push(self.format_selector().into());
        args.push("--output".into());
        args.push(self.output_template().into_os_string());
        for flag in ["--no-playlist", "--no-part", "--no-mtime", "--no-simulate", "--progress", "--newline"] {
            args.push(flag.into());
        }
        args.push("--print".into());
        args.push("after_move:filepath".into());
        args
    }
}
