//! Compiler command assembly.

use crate::config::{BuildMode, BuildRequest};
use crate::error::{CrunError, Result};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEBUG_FLAGS: &[&str] = &["-g", "-O0"];
pub const RELEASE_FLAGS: &[&str] = &["-O2", "-s"];
pub const WARNINGS_ALL_FLAG: &str = "-Wall";

pub fn mode_flags(mode: BuildMode) -> &'static [&'static str] {
    match mode {
        BuildMode::Debug => DEBUG_FLAGS,
        BuildMode::Release => RELEASE_FLAGS,
    }
}

/// One compiler run: sources in, one executable out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInvocation {
    pub compiler: PathBuf,
    pub sources: Vec<PathBuf>,
    /// Mode flags, auto link flags, `-Wall`, user cflags, user libs, in that order.
    pub flags: Vec<String>,
    pub output: PathBuf,
}

impl CompileInvocation {
    pub fn new(
        request: &BuildRequest,
        compiler: &Path,
        sources: Vec<PathBuf>,
        auto_flags: &[String],
        output: &Path,
    ) -> Self {
        let mut flags: Vec<String> = mode_flags(request.mode)
            .iter()
            .map(|f| f.to_string())
            .collect();
        flags.extend(auto_flags.iter().cloned());
        if request.warnings_all {
            flags.push(WARNINGS_ALL_FLAG.to_string());
        }
        flags.extend(request.cflags.iter().cloned());
        flags.extend(request.libs.iter().cloned());

        Self {
            compiler: compiler.to_path_buf(),
            sources,
            flags,
            output: output.to_path_buf(),
        }
    }

    /// Arguments after the compiler path.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .sources
            .iter()
            .map(|p| p.as_os_str().to_owned())
            .collect();
        args.push("-o".into());
        args.push(self.output.as_os_str().to_owned());
        args.extend(self.flags.iter().map(OsString::from));
        args
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.compiler);
        cmd.args(self.args());
        cmd
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

impl fmt::Display for CompileInvocation {
    /// Shell-style rendering for `--verbose`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.compiler.display())?;
        for src in &self.sources {
            write!(f, " \"{}\"", src.display())?;
        }
        write!(f, " -o \"{}\"", self.output.display())?;
        for flag in &self.flags {
            write!(f, " {}", flag)?;
        }
        Ok(())
    }
}

/// Resolve every source to an absolute path; the first failure aborts.
///
/// Sources must exist. Returned paths are absolute but not canonical: symlinks
/// are kept and Windows paths carry no `\\?\` prefix.
pub fn absolute_sources(sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
    sources
        .iter()
        .map(|src| {
            fs::canonicalize(src)
                .and_then(|_| std::path::absolute(src))
                .map_err(|source| CrunError::PathResolution {
                    path: src.clone(),
                    source,
                })
        })
        .collect()
}
