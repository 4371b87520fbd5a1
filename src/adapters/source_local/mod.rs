// Local source adapter - Videos already on disk

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::ports::VideoSourcePort;

/// Source for files that already exist locally; nothing is copied
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSource;

#[async_trait]
impl VideoSourcePort for LocalFileSource {
    async fn fetch(&self, locator: &str, _work_dir: &Path) -> StudioResult<PathBuf> {
        let path = PathBuf::from(locator);
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| StudioError::fetch(locator, format!("cannot read local file: {}", e)))?;
        if !meta.is_file() {
            return Err(StudioError::fetch(locator, "not a regular file"));
        }
        if meta.len() == 0 {
            return Err(StudioError::fetch(locator, "file is empty"));
        }

        let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        info!(path = %path.display(), bytes = meta.len(), "Using local video");
        Ok(path)
    }
}
