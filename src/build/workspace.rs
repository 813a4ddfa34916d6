//! Ephemeral build directory.
//!
//! Each run gets `<source dir>/crun_tmp_<millis>_<pid>`. The directory is
//! removed when the [`Workspace`] is dropped, and also from the interrupt
//! handler armed by [`arm_interrupt_cleanup`], unless `--keep-temp` was given.

use crate::error::{CrunError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

pub const WORKSPACE_PREFIX: &str = "crun_tmp";

/// Exit code after an interrupt or termination request.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    keep: bool,
}

impl Workspace {
    pub fn create(parent: &Path, keep: bool) -> Result<Self> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let name = format!("{}_{}_{}", WORKSPACE_PREFIX, millis, std::process::id());
        let path = parent.join(name);

        fs::create_dir(&path).map_err(|source| CrunError::Workspace {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(workspace = %path.display(), keep, "created workspace");

        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keep(&self) -> bool {
        self.keep
    }

    /// Path of the executable built from the source with this stem.
    pub fn artifact_path(&self, stem: &str) -> PathBuf {
        self.path
            .join(format!("{}{}", stem, std::env::consts::EXE_SUFFIX))
    }

    /// Remove the directory unless it is retained. Safe to call repeatedly.
    pub fn cleanup(&self) {
        if self.keep {
            return;
        }
        match remove_tree(&self.path) {
            Ok(()) => tracing::debug!(workspace = %self.path.display(), "removed workspace"),
            Err(e) => tracing::warn!(
                workspace = %self.path.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// `remove_dir_all` that treats an already-missing directory as success.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// What the interrupt handler needs. Published once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct CleanupContext {
    pub path: PathBuf,
    pub keep: bool,
}

impl CleanupContext {
    pub fn run(&self) {
        if !self.keep {
            let _ = remove_tree(&self.path);
        }
    }
}

static CLEANUP: OnceLock<CleanupContext> = OnceLock::new();

/// Store `context` in `cell`. Returns `false` if another workspace got there first.
fn publish_cleanup(cell: &OnceLock<CleanupContext>, context: CleanupContext) -> bool {
    match cell.set(context) {
        Ok(()) => true,
        Err(rejected) => {
            tracing::debug!(
                workspace = %rejected.path.display(),
                "interrupt cleanup already registered for another workspace"
            );
            false
        }
    }
}

/// Arm Ctrl-C / termination cleanup for `workspace`.
///
/// Only the first workspace of a process is registered. Failure to install
/// the handler is logged and the run continues without it.
pub fn arm_interrupt_cleanup(workspace: &Workspace) {
    let context = CleanupContext {
        path: workspace.path.clone(),
        keep: workspace.keep,
    };
    if !publish_cleanup(&CLEANUP, context) {
        return;
    }

    if let Err(e) = ctrlc::set_handler(|| {
        if let Some(context) = CLEANUP.get() {
            context.run();
        }
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }) {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_name_and_location() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path(), false).unwrap();
        let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();

        assert_eq!(ws.path().parent().unwrap(), dir.path());
        assert!(name.starts_with("crun_tmp_"));
        assert!(name.ends_with(&format!("_{}", std::process::id())));
        assert!(ws.path().is_dir());
    }

    #[test]
    fn test_drop_removes_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path(), false).unwrap();
        let path = ws.path().to_path_buf();
        fs::write(ws.artifact_path("main"), b"binary").unwrap();
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_retains_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path(), true).unwrap();
        let path = ws.path().to_path_buf();
        ws.cleanup();
        drop(ws);
        assert!(path.is_dir());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path(), false).unwrap();
        ws.cleanup();
        ws.cleanup();
        assert!(!ws.path().exists());

        let ctx = CleanupContext {
            path: ws.path().to_path_buf(),
            keep: false,
        };
        ctx.run();
        assert!(!ws.path().exists());
    }

    #[test]
    fn test_interrupt_cleanup_removes_populated_workspace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crun_tmp_1_1");
        fs::create_dir_all(path.join("obj")).unwrap();
        fs::write(path.join("prog"), b"binary").unwrap();
        fs::write(path.join("obj").join("main.o"), b"object").unwrap();

        CleanupContext {
            path: path.clone(),
            keep: false,
        }
        .run();
        assert!(!path.exists());
    }

    #[test]
    fn test_interrupt_cleanup_honours_keep() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crun_tmp_2_2");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("prog"), b"binary").unwrap();

        CleanupContext {
            path: path.clone(),
            keep: true,
        }
        .run();
        assert!(path.join("prog").is_file());
    }

    #[test]
    fn test_only_first_cleanup_context_is_published() {
        let cell = OnceLock::new();
        let first = CleanupContext {
            path: PathBuf::from("first"),
            keep: false,
        };
        let second = CleanupContext {
            path: PathBuf::from("second"),
            keep: true,
        };

        assert!(publish_cleanup(&cell, first));
        assert!(!publish_cleanup(&cell, second));
        let published = cell.get().unwrap();
        assert_eq!(published.path, PathBuf::from("first"));
        assert!(!published.keep);
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = Workspace::create(&dir.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, CrunError::Workspace { .. }));
    }

    #[test]
    fn test_artifact_uses_source_stem() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path(), false).unwrap();
        let artifact = ws.artifact_path("hello");
        assert_eq!(artifact.parent().unwrap(), ws.path());
        assert_eq!(
            artifact.file_name().unwrap().to_string_lossy(),
            format!("hello{}", std::env::consts::EXE_SUFFIX)
        );
    }
}
