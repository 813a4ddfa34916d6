//! Leftover workspace cleanup.
//!
//! `crun --clean` removes every `crun_tmp_*` directory directly inside the
//! current directory, whichever run created it. Runs killed before their own
//! cleanup could finish leave these behind.

use super::workspace::{WORKSPACE_PREFIX, remove_tree};
use colored::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Workspace directories directly inside `dir`.
pub fn find_workspaces(dir: &Path) -> Vec<PathBuf> {
    let prefix = format!("{}_", WORKSPACE_PREFIX);
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

/// Remove every workspace directory in `dir`, returning how many were removed.
pub fn clean_workspaces(dir: &Path) -> usize {
    let workspaces = find_workspaces(dir);
    if workspaces.is_empty() {
        println!(
            "{} No crun temporary directories found to clean.",
            "!".yellow()
        );
        return 0;
    }

    let mut removed = 0;
    for path in &workspaces {
        println!("   {} Removing: {}", "🗑️".red(), path.display());
        match remove_tree(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "{} Failed to remove directory {}: {}",
                "!".yellow(),
                path.display(),
                e
            ),
        }
    }

    if removed > 0 {
        println!(
            "{} Successfully removed {} temporary director{}.",
            "✓".green(),
            removed,
            if removed == 1 { "y" } else { "ies" }
        );
    } else {
        println!(
            "{} No crun temporary directories found to clean.",
            "!".yellow()
        );
    }
    removed
}
