// Local filesystem adapter - Output directory management

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::rules::OutputDirRule;
use crate::error::{StudioError, StudioResult};
use crate::ports::FsPort;

/// Local filesystem adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    pub fn new() -> Self {
        Self
    }

    fn output_dir_error(path: &Path, message: impl Into<String>) -> StudioError {
        StudioError::OutputDir {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Whether `dir` is the filesystem root or `home` itself
    fn is_protected(dir: &Path, home: Option<&Path>) -> bool {
        let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if dir.parent().is_none() || resolved.parent().is_none() {
            return true;
        }
        home.map(|home| home.canonicalize().unwrap_or_else(|_| home.to_path_buf()))
            .is_some_and(|home| home == resolved)
    }

    /// Create `dir` or clear the clips of an earlier run from it, then
    /// check that it accepts new files
    fn prepare_blocking(dir: &Path, home: Option<&Path>) -> StudioResult<usize> {
        if Self::is_protected(dir, home) {
            return Err(Self::output_dir_error(
                dir,
                "refusing to clear a filesystem root or home directory",
            ));
        }
        if dir.exists() && !dir.is_dir() {
            return Err(Self::output_dir_error(dir, "exists and is not a directory"));
        }
        std::fs::create_dir_all(dir)
            .map_err(|e| Self::output_dir_error(dir, format!("cannot create: {}", e)))?;

        let entries: Vec<(PathBuf, bool)> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .map(|entry| {
                entry
                    .map(|e| (e.path().to_path_buf(), e.file_type().is_dir()))
                    .map_err(|e| Self::output_dir_error(dir, format!("cannot list: {}", e)))
            })
            .collect::<StudioResult<_>>()?;

        let foreign = entries.iter().find(|(path, _)| {
            !path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(OutputDirRule::is_owned_entry)
        });
        if let Some((path, _)) = foreign {
            return Err(Self::output_dir_error(
                dir,
                format!(
                    "holds {} which this tool did not create; pick an empty or new directory",
                    path.display()
                ),
            ));
        }

        for (path, is_dir) in &entries {
            let removed = if *is_dir {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_file(path)
            };
            removed.map_err(|e| {
                Self::output_dir_error(dir, format!("cannot remove {}: {}", path.display(), e))
            })?;
        }

        // Try to create a test file
        tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Self::output_dir_error(dir, format!("not writable: {}", e)))?;

        Ok(entries.len())
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn prepare_output_dir(&self, dir_path: &Path) -> StudioResult<()> {
        let dir = dir_path.to_path_buf();
        let home = directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        let removed =
            tokio::task::spawn_blocking(move || Self::prepare_blocking(&dir, home.as_deref()))
                .await
                .map_err(|e| {
                    Self::output_dir_error(dir_path, format!("preparation task failed: {}", e))
                })??;

        if removed > 0 {
            debug!(removed, "Cleared previous output");
        }
        info!(path = %dir_path.display(), "Output directory ready");
        Ok(())
    }

    async fn file_exists(&self, file_path: &Path) -> StudioResult<bool> {
        Ok(tokio::fs::metadata(file_path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Downloads").join("ytstudio");

        FsLocalAdapter::new().prepare_output_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_clears_previous_run() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out");
        let stale_work = dir.join(".fetch-x1y2");
        std::fs::create_dir_all(&stale_work).unwrap();
        std::fs::write(dir.join("subclip_1.mp4"), b"old").unwrap();
        std::fs::write(dir.join("subclip_12.mp4"), b"old").unwrap();
        std::fs::write(stale_work.join("video.mp4"), b"old").unwrap();

        FsLocalAdapter::new().prepare_output_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_refuses_directory_with_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Documents");
        std::fs::create_dir_all(dir.join("taxes")).unwrap();
        std::fs::write(dir.join("subclip_1.mp4"), b"old").unwrap();
        std::fs::write(dir.join("thesis.docx"), b"precious").unwrap();

        let err = FsLocalAdapter::new().prepare_output_dir(&dir).await.unwrap_err();
        assert!(matches!(err, StudioError::OutputDir { .. }));
        assert!(dir.join("thesis.docx").is_file());
        assert!(dir.join("taxes").is_dir());
        assert!(dir.join("subclip_1.mp4").is_file());
    }

    #[test]
    fn test_refuses_home_and_root() {
        let home = tempfile::tempdir().unwrap();
        let err = FsLocalAdapter::prepare_blocking(home.path(), Some(home.path())).unwrap_err();
        assert!(err.to_string().contains("home directory"));

        let dotted = home.path().join(".");
        assert!(FsLocalAdapter::is_protected(&dotted, Some(home.path())));
        assert!(FsLocalAdapter::is_protected(Path::new("/"), None));
        assert!(!FsLocalAdapter::is_protected(
            &home.path().join("ytstudio"),
            Some(home.path())
        ));
    }

    #[tokio::test]
    async fn test_rejects_file_in_place_of_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("out");
        std::fs::write(&path, b"file").unwrap();

        let err = FsLocalAdapter::new().prepare_output_dir(&path).await.unwrap_err();
        assert!(matches!(err, StudioError::OutputDir { .. }));
    }

    #[tokio::test]
    async fn test_file_exists_only_for_files() {
        let root = tempfile::tempdir().unwrap();
        let fs = FsLocalAdapter::new();
        let path = root.path().join("talk.mp4");

        assert!(!fs.file_exists(&path).await.unwrap());
        std::fs::write(&path, b"video").unwrap();
        assert!(fs.file_exists(&path).await.unwrap());
        assert!(!fs.file_exists(root.path()).await.unwrap());
    }
}
