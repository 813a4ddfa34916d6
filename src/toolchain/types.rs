use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// Supported compiler families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompilerKind {
    /// GNU Compiler Collection (gcc / g++)
    #[default]
    Gcc,
    /// Clang/LLVM (clang / clang++)
    Clang,
}

impl CompilerKind {
    pub fn name(&self) -> &'static str {
        match self {
            CompilerKind::Gcc => "gcc",
            CompilerKind::Clang => "clang",
        }
    }

    /// Front-end name for the requested language mode, without any suffix.
    pub fn driver_name(&self, has_cpp: bool) -> &'static str {
        match (self, has_cpp) {
            (CompilerKind::Gcc, false) => "gcc",
            (CompilerKind::Gcc, true) => "g++",
            (CompilerKind::Clang, false) => "clang",
            (CompilerKind::Clang, true) => "clang++",
        }
    }

    /// Executable file name as it appears on disk (`g++.exe` on Windows).
    pub fn executable_name(&self, has_cpp: bool) -> String {
        format!(
            "{}{}",
            self.driver_name(has_cpp),
            std::env::consts::EXE_SUFFIX
        )
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompilerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gcc" | "g++" => Ok(CompilerKind::Gcc),
            "clang" | "clang++" => Ok(CompilerKind::Clang),
            other => Err(format!(
                "Invalid compiler '{}'. Use 'gcc' or 'clang'.",
                other
            )),
        }
    }
}

/// A located compiler front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub kind: CompilerKind,
    /// Absolute path to the driver executable
    pub path: PathBuf,
    /// Whether this is the C++ driver
    pub cxx: bool,
}

impl Toolchain {
    pub fn new(kind: CompilerKind, path: PathBuf, cxx: bool) -> Self {
        Self { kind, path, cxx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of `<compiler> --version`, if the compiler answers.
    pub fn version_line(&self) -> Option<String> {
        let output = Command::new(&self.path).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}
