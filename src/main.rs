//! # crun CLI Entry Point
//!
//! Parses the command line, then either sweeps leftover temporary
//! directories (`--clean`), prints version info (`--version`), or runs the
//! compile-and-run pipeline. The exit code is the compiled program's own exit
//! code, or 1 if anything failed before it could run.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing_subscriber::EnvFilter;

use crun::build;
use crun::config::{BuildRequest, Cli};
use crun::toolchain;

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
    fn SetConsoleCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
        SetConsoleCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "crun=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to initialise logging")
}

fn print_version(cli: &Cli) {
    println!("crun version {}", env!("CARGO_PKG_VERSION"));

    let kind = cli.compiler.unwrap_or_default();
    match toolchain::locate(kind, false) {
        Ok(tc) => match tc.version_line() {
            Some(line) => println!("{}", line),
            None => eprintln!(
                "{} Could not get version information from {}.",
                "!".yellow(),
                tc.path().display()
            ),
        },
        Err(_) => eprintln!(
            "{} Compiler '{}' not found in PATH.",
            "!".yellow(),
            kind.executable_name(false)
        ),
    }
}

fn run(cli: Cli) -> Result<i32> {
    if cli.clean {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        build::clean_workspaces(&cwd);
        return Ok(0);
    }

    if cli.version {
        print_version(&cli);
        return Ok(0);
    }

    let request = BuildRequest::from_cli(cli)?;
    let result = build::build_and_run(&request)?;
    Ok(result.exit_code)
}

fn main() {
    enable_windows_utf8_console();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{} {:#}", "!".yellow(), e);
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "x".red(), e);
            1
        }
    };
    std::process::exit(code);
}
