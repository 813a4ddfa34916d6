//! Error taxonomy for the compile-and-run pipeline.
//!
//! Every variant is terminal: the binary prints it and exits with code 1.
//! Scan problems inside the dependency resolver never surface here, they
//! only cause a file to contribute no link flags.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrunError {
    /// Invalid or missing source selection, bad option values, bad `crun.toml`.
    #[error("{0}")]
    Configuration(String),

    #[error(
        "Compiler '{exe}' not found in PATH.\n\
         Please make sure GCC or Clang is installed and its 'bin' directory is in PATH."
    )]
    ToolchainNotFound { exe: String },

    #[error("Could not get full path for source file: {path}: {source}")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create temporary directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Compile(String),

    #[error("Failed to run {path}: {source}")]
    RuntimeProcess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = CrunError> = std::result::Result<T, E>;
