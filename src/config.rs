//! Command-line options, `crun.toml` defaults, and the resulting [`BuildRequest`].
//!
//! ```text
//! crun [options] <source.c|.cpp>... [program args...] [-- -args-with-dashes]
//! crun --clean
//! ```

use crate::error::{CrunError, Result};
use crate::toolchain::CompilerKind;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "crun.toml";

const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "cc", "cxx"];

#[derive(Parser, Debug, Default)]
#[command(name = "crun")]
#[command(about = "Compile and run C/C++ source files in one step")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Source files, followed by arguments for the compiled program
    #[arg(value_name = "SOURCES_AND_ARGS")]
    pub inputs: Vec<String>,

    /// Compiler family to use [default: gcc]
    #[arg(long, value_enum)]
    pub compiler: Option<CompilerKind>,

    /// Extra flags passed to the compiler (e.g. "-std=c17 -DDEBUG")
    #[arg(long, allow_hyphen_values = true)]
    pub cflags: Option<String>,

    /// Extra libraries to link (e.g. "-luser32 -lgdi32")
    #[arg(long, allow_hyphen_values = true)]
    pub libs: Option<String>,

    /// Debug build (-g -O0) instead of release (-O2 -s)
    #[arg(short = 'g', long)]
    pub debug: bool,

    /// Enable all compiler warnings (-Wall)
    #[arg(long)]
    pub wall: bool,

    /// Keep the temporary build directory after running
    #[arg(long)]
    pub keep_temp: bool,

    /// Show the compiler command and its output
    #[arg(short, long)]
    pub verbose: bool,

    /// Measure and print the program's execution time
    #[arg(long)]
    pub time: bool,

    /// Remove leftover temporary directories (crun_tmp_*) in the current directory
    #[arg(long)]
    pub clean: bool,

    /// Print version information
    #[arg(long)]
    pub version: bool,
}

/// Defaults read from `crun.toml` beside the primary source file.
#[derive(Deserialize, Debug, Default)]
pub struct CrunConfig {
    pub build: Option<BuildConfig>,
}

#[derive(Deserialize, Debug, Default)]
pub struct BuildConfig {
    pub compiler: Option<String>,
    pub cflags: Option<Vec<String>>,
    pub libs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    Debug,
    #[default]
    Release,
}

/// Everything one compile-and-run cycle needs. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub sources: Vec<PathBuf>,
    pub compiler: CompilerKind,
    pub mode: BuildMode,
    pub warnings_all: bool,
    pub cflags: Vec<String>,
    pub libs: Vec<String>,
    pub verbose: bool,
    pub keep_temp: bool,
    pub measure_time: bool,
    pub program_args: Vec<String>,
}

impl BuildRequest {
    /// Validate the parsed command line and merge in `crun.toml`, if present.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let (sources, program_args) = split_inputs(&cli.inputs);
        if sources.is_empty() {
            return Err(CrunError::Configuration(
                "No source files specified. Run 'crun --help' for usage.".to_string(),
            ));
        }

        let config = load_config(&source_dir(&sources[0]))?;
        Self::from_parts(cli, sources, program_args, config)
    }

    fn from_parts(
        cli: Cli,
        sources: Vec<PathBuf>,
        program_args: Vec<String>,
        config: CrunConfig,
    ) -> Result<Self> {
        let build = config.build.unwrap_or_default();

        let compiler = match (cli.compiler, &build.compiler) {
            (Some(kind), _) => kind,
            (None, Some(name)) => name
                .parse::<CompilerKind>()
                .map_err(|e| CrunError::Configuration(format!("{}: {}", CONFIG_FILE, e)))?,
            (None, None) => CompilerKind::default(),
        };

        let mut cflags = build.cflags.unwrap_or_default();
        cflags.extend(split_flags(cli.cflags.as_deref()));
        let mut libs = build.libs.unwrap_or_default();
        libs.extend(split_flags(cli.libs.as_deref()));

        Ok(Self {
            sources,
            compiler,
            mode: if cli.debug {
                BuildMode::Debug
            } else {
                BuildMode::Release
            },
            warnings_all: cli.wall,
            cflags,
            libs,
            verbose: cli.verbose,
            keep_temp: cli.keep_temp,
            measure_time: cli.time,
            program_args,
        })
    }

    /// True if any source needs the C++ driver.
    pub fn has_cpp(&self) -> bool {
        self.sources.iter().any(|p| {
            p.extension()
                .is_some_and(|ext| !ext.to_string_lossy().eq_ignore_ascii_case("c"))
        })
    }
}

pub fn is_source_file(arg: &str) -> bool {
    Path::new(arg).extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        SOURCE_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Leading source paths, then everything from the first non-source token on.
pub fn split_inputs(inputs: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let split = inputs
        .iter()
        .position(|arg| !is_source_file(arg))
        .unwrap_or(inputs.len());
    let sources = inputs[..split].iter().map(PathBuf::from).collect();
    let program_args = inputs[split..].to_vec();
    (sources, program_args)
}

pub fn split_flags(flags: Option<&str>) -> Vec<String> {
    flags
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn source_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load `crun.toml` from `dir`. A missing file means defaults.
pub fn load_config(dir: &Path) -> Result<CrunConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(CrunConfig::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| {
        CrunError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config = toml::from_str(&text).map_err(|e| {
        CrunError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    tracing::debug!(config = %path.display(), "loaded defaults");
    Ok(config)
}
