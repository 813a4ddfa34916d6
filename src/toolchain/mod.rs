//! Compiler discovery
//!
//! Maps a compiler family and language mode to a driver name and looks it up
//! on `PATH`. The resolved path is absolute but not canonicalized, so
//! symlinked drivers (ccache shims, versioned `g++-13` links) keep the name
//! they were invoked by.

pub mod types;

pub use types::{CompilerKind, Toolchain};

use crate::deps::DependencyLister;
use crate::error::{CrunError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locate the driver for `kind` on the process `PATH`.
pub fn locate(kind: CompilerKind, has_cpp: bool) -> Result<Toolchain> {
    let path_env = std::env::var_os("PATH");
    locate_in(kind, has_cpp, path_env.as_deref())
}

/// Same as [`locate`] but against an explicit search path.
pub fn locate_in(kind: CompilerKind, has_cpp: bool, search_path: Option<&OsStr>) -> Result<Toolchain> {
    let exe = kind.executable_name(has_cpp);
    match find_executable(&exe, search_path) {
        Some(path) => {
            tracing::debug!(compiler = %path.display(), "located toolchain");
            Ok(Toolchain::new(kind, path, has_cpp))
        }
        None => Err(CrunError::ToolchainNotFound { exe }),
    }
}

/// Search each directory of `search_path` for a runnable file named `name`.
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    for dir in std::env::split_paths(search_path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(std::path::absolute(&candidate).unwrap_or(candidate));
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

impl DependencyLister for Toolchain {
    /// Runs `<compiler> -MM <sources...>` and returns its combined output.
    fn list_dependencies(&self, sources: &[PathBuf]) -> Option<String> {
        let output = Command::new(&self.path)
            .arg("-MM")
            .args(sources)
            .output()
            .ok()?;
        if !output.status.success() {
            tracing::debug!(status = %output.status, "dependency listing failed");
            return None;
        }
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }
}
