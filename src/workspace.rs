use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Working directory for extracted frames.
///
/// Dropping it removes the directory again, on success, early return and
/// unwinding alike.
#[derive(Debug)]
pub struct FrameWorkspace {
    path: PathBuf,
}

impl FrameWorkspace {
    /// Use `path` as the workspace, wiping any previous contents
    pub async fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => debug!("Removed stale frame directory {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&path).await?;

        debug!("📁 Created frame workspace: {}", path.display());
        Ok(Self { path })
    }

    /// Fresh, uniquely named workspace under the system temp dir
    pub fn create_temp() -> io::Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("sports-news-frames-")
            .tempdir()?
            .keep();

        debug!("📁 Created frame workspace: {}", path.display());
        Ok(Self { path })
    }

    /// `path` when given, otherwise a temporary workspace
    pub async fn open(path: Option<&Path>) -> io::Result<Self> {
        match path {
            Some(path) => Self::create(path).await,
            None => Self::create_temp(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FrameWorkspace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("🧹 Removed frame workspace: {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove frame workspace {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_recreates_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let frames = temp_dir.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        std::fs::write(frames.join("stale.jpg"), b"old").unwrap();

        let workspace = FrameWorkspace::create(&frames).await.unwrap();

        assert!(workspace.path().exists());
        assert!(!frames.join("stale.jpg").exists());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let frames = temp_dir.path().join("frames");

        {
            let workspace = FrameWorkspace::create(&frames).await.unwrap();
            std::fs::write(workspace.path().join("frame_000001.jpg"), b"jpeg").unwrap();
        }

        assert!(!frames.exists());
    }

    #[tokio::test]
    async fn test_drop_runs_on_early_error_return() {
        async fn failing_step(dir: &Path) -> io::Result<()> {
            let _workspace = FrameWorkspace::create(dir).await?;
            Err(io::Error::new(io::ErrorKind::Other, "scoring blew up"))
        }

        let temp_dir = TempDir::new().unwrap();
        let frames = temp_dir.path().join("frames");

        assert!(failing_step(&frames).await.is_err());
        assert!(!frames.exists());
    }

    #[test]
    fn test_temp_workspaces_are_unique_and_removed() {
        let first = FrameWorkspace::create_temp().unwrap();
        let second = FrameWorkspace::create_temp().unwrap();
        let first_path = first.path().to_path_buf();

        assert_ne!(first.path(), second.path());
        assert!(first_path.starts_with(std::env::temp_dir()));
        assert!(first_path.is_dir());

        drop(first);
        assert!(!first_path.exists());
        assert!(second.path().is_dir());
    }

    #[tokio::test]
    async fn test_open_without_path_leaves_working_directory_alone() {
        let workspace = FrameWorkspace::open(None).await.unwrap();
        assert!(workspace
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("sports-news-frames-"));
    }
}
