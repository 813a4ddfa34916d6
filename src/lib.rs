//! # crun - compile and run C/C++ in one step
//!
//! `crun main.c` compiles the given sources into a throwaway directory next to
//! them, runs the result with the remaining arguments, and deletes the
//! directory again. Libraries are linked automatically when the sources (or
//! their local headers) mention a known header or carry a
//! `#pragma comment(lib, "...")` line.
//!
//! ```bash
//! crun hello.c
//! crun --debug --wall server.cpp util.cpp 8080
//! crun --clean
//! ```
//!
//! ## Module Organization
//!
//! - [`toolchain`] - Compiler lookup on `PATH`
//! - [`deps`] - Link-flag detection from source text
//! - [`build`] - Command assembly, compile/run pipeline, temporary directories
//! - [`config`] - Command line and `crun.toml` defaults

/// Compile/run pipeline and workspace management.
pub mod build;

/// Command-line options and `crun.toml`.
pub mod config;

/// Automatic link-library detection.
pub mod deps;

/// Error types.
pub mod error;

/// Compiler discovery.
pub mod toolchain;

pub use error::{CrunError, Result};
