// Auto source adapter - Picks local or remote acquisition per locator

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::source_local::LocalFileSource;
use crate::adapters::source_ytdlp::YtDlpSource;
use crate::error::{StudioError, StudioResult};
use crate::ports::VideoSourcePort;

/// Existing local paths are used in place; URLs go to the remote source
pub struct AutoSource {
    local: LocalFileSource,
    remote: Option<Arc<dyn VideoSourcePort>>,
}

impl AutoSource {
    /// `remote` is optional so local-only runs work without yt-dlp installed
    pub fn new(remote: Option<Arc<dyn VideoSourcePort>>) -> Self {
        Self {
            local: LocalFileSource,
            remote,
        }
    }
}

#[async_trait]
impl VideoSourcePort for AutoSource {
    async fn fetch(&self, locator: &str, work_dir: &Path) -> StudioResult<PathBuf> {
        if Path::new(locator).exists() {
            return self.local.fetch(locator, work_dir).await;
        }
        if !YtDlpSource::accepts(locator) {
            return Err(StudioError::fetch(
                locator,
                "neither an existing file nor an http(s) URL",
            ));
        }
        match &self.remote {
            Some(remote) => remote.fetch(locator, work_dir).await,
            None => Err(StudioError::ToolNotFound {
                tool: "yt-dlp".to_string(),
            }),
        }
    }
}
