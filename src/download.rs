use std::path::{Path, PathBuf};
use tracing::info;

use crate::backend::SubtitleBackend;
use crate::error::PipelineError;

/// Writes downloaded subtitle files into a directory
#[derive(Debug, Clone)]
pub struct Downloader {
    dir: PathBuf,
}

impl Downloader {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path an output token is stored under
    pub fn target_path(&self, subtitle_file: &str) -> PathBuf {
        self.dir.join(local_file_name(subtitle_file))
    }

    /// Fetch the file behind `subtitle_file` and store it locally
    pub async fn fetch(&self, backend: &dyn SubtitleBackend, subtitle_file: &str) -> Result<PathBuf, PipelineError> {
        let failed = |reason: String| PipelineError::DownloadFailed {
            token: subtitle_file.to_string(),
            reason,
        };

        let content = backend
            .download(subtitle_file)
            .await
            .map_err(|e| failed(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let path = self.target_path(subtitle_file);
        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| failed(e.to_string()))?;

        info!("💾 Downloaded {} ({} bytes) to {}", subtitle_file, content.len(), path.display());
        Ok(path)
    }
}

/// Keep only the final path component of a server token
fn local_file_name(subtitle_file: &str) -> String {
    Path::new(subtitle_file)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("subtitles")
        .to_string()
}
