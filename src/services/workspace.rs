//! Workspace lifecycle - capability layer
//!
//! A workspace is a directory exclusively owned by one provider run. It is
//! empty when handed out and removed once the run is over.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::WorkspaceError;

/// Empty directory owned by one provider run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Absolute path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates, cleans and removes workspaces under one root directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh empty workspace named `name` under the root
    pub async fn acquire(&self, name: &str) -> Result<Workspace, WorkspaceError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| WorkspaceError::io("creating", &self.root, e))?;
        ensure_empty(&self.root.join(name)).await
    }

    /// Remove the root once every workspace under it is gone.
    ///
    /// Leaves it alone if something else still lives there. A missing root
    /// is fine, any other I/O failure is reported.
    pub async fn release_root(&self) -> Result<(), WorkspaceError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(WorkspaceError::io("inspecting", &self.root, e)),
        };
        let occupied = entries
            .next_entry()
            .await
            .map_err(|e| WorkspaceError::io("inspecting", &self.root, e))?
            .is_some();
        if occupied {
            debug!("keeping {}: not empty", self.root.display());
            return Ok(());
        }

        match fs::remove_dir(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkspaceError::io("removing", &self.root, e)),
        }
    }
}

/// Make sure `path` is an empty directory.
///
/// Creates it when missing, wipes it when it has content, and fails when
/// it exists but is not a directory. Returns the workspace with its
/// canonical (absolute) path.
pub async fn ensure_empty(path: &Path) -> Result<Workspace, WorkspaceError> {
    debug!("creating / emptying directory {}", path.display());

    match fs::symlink_metadata(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir(path)
                .await
                .map_err(|e| WorkspaceError::io("creating", path, e))?;
        }
        Err(e) => return Err(WorkspaceError::io("inspecting", path, e)),
        Ok(meta) if !meta.is_dir() => {
            return Err(WorkspaceError::NotADirectory(path.to_path_buf()));
        }
        Ok(_) => {
            let mut entries = fs::read_dir(path)
                .await
                .map_err(|e| WorkspaceError::io("listing", path, e))?;
            let has_content = entries
                .next_entry()
                .await
                .map_err(|e| WorkspaceError::io("listing", path, e))?
                .is_some();

            if has_content {
                warn!("⚠️ Removing leftovers from {}", path.display());
                fs::remove_dir_all(path)
                    .await
                    .map_err(|e| WorkspaceError::io("removing", path, e))?;
                fs::create_dir(path)
                    .await
                    .map_err(|e| WorkspaceError::io("creating", path, e))?;
            }
        }
    }

    let path = fs::canonicalize(path)
        .await
        .map_err(|e| WorkspaceError::io("resolving", path, e))?;
    Ok(Workspace { path })
}

/// Recursively remove `path`. Missing paths are fine.
pub async fn destroy(path: &Path) -> Result<(), WorkspaceError> {
    info!("🗑️ Cleaning temporary directory {}", path.display());
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WorkspaceError::io("removing", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_empty_dir(path: &Path) -> bool {
        path.is_dir() && std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("fresh");

        let workspace = ensure_empty(&target).await.unwrap();

        assert!(workspace.path().is_absolute());
        assert!(is_empty_dir(&target));
    }

    #[tokio::test]
    async fn test_ensure_empty_twice_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("twice");

        let first = ensure_empty(&target).await.unwrap();
        assert!(is_empty_dir(&target));
        let second = ensure_empty(&target).await.unwrap();
        assert!(is_empty_dir(&target));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_wipes_existing_content() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("dirty");
        std::fs::create_dir_all(target.join("nested")).unwrap();
        std::fs::write(target.join("stale.pdf"), b"old").unwrap();
        std::fs::write(target.join("nested/also-stale"), b"old").unwrap();

        ensure_empty(&target).await.unwrap();

        assert!(is_empty_dir(&target));
    }

    #[tokio::test]
    async fn test_file_in_the_way_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("occupied");
        std::fs::write(&target, b"not a dir").unwrap();

        let err = ensure_empty(&target).await.unwrap_err();

        assert!(matches!(err, WorkspaceError::NotADirectory(_)));
        assert!(target.is_file());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("gone");
        std::fs::create_dir_all(target.join("inner")).unwrap();
        std::fs::write(target.join("inner/file"), b"x").unwrap();

        tokio_test::assert_ok!(destroy(&target).await);
        assert!(!target.exists());
        tokio_test::assert_ok!(destroy(&target).await);
    }

    #[tokio::test]
    async fn test_manager_gives_each_name_its_own_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().join("assets"));

        let a = manager.acquire("har-gal").await.unwrap();
        let b = manager.acquire("hilan").await.unwrap();
        assert_ne!(a.path(), b.path());

        destroy(a.path()).await.unwrap();
        destroy(b.path()).await.unwrap();
        manager.release_root().await.unwrap();
        assert!(!manager.root().exists());
    }

    #[tokio::test]
    async fn test_release_root_keeps_foreign_content() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().join("assets"));
        std::fs::create_dir_all(manager.root()).unwrap();
        std::fs::write(manager.root().join("notes.txt"), b"keep me").unwrap();

        tokio_test::assert_ok!(manager.release_root().await);
        assert!(manager.root().join("notes.txt").exists());

        std::fs::remove_file(manager.root().join("notes.txt")).unwrap();
        tokio_test::assert_ok!(manager.release_root().await);
        assert!(!manager.root().exists());
        tokio_test::assert_ok!(manager.release_root().await);
    }

    #[tokio::test]
    async fn test_release_root_reports_a_root_that_is_not_a_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().join("assets"));
        std::fs::write(manager.root(), b"not a directory").unwrap();

        tokio_test::assert_err!(manager.release_root().await);
    }
}
