use super::command::{CompileInvocation, absolute_sources};
use super::feedback::FeedbackAnalyzer;
use super::workspace::{Workspace, arm_interrupt_cleanup};
use crate::config::BuildRequest;
use crate::deps;
use crate::error::{CrunError, Result};
use crate::toolchain;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

/// Outcome of the run step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Wall-clock time of the run step, when `--time` was given.
    pub elapsed: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Compiling,
    Running,
    Done,
    Failed,
}

/// Compile, then run. The two children never overlap.
pub struct Pipeline<'a> {
    request: &'a BuildRequest,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(request: &'a BuildRequest) -> Self {
        Self {
            request,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = ?self.stage, to = ?next, "pipeline stage");
        self.stage = next;
    }

    /// Run the compiler. Only valid from `Idle`.
    pub fn compile(&mut self, invocation: &CompileInvocation) -> Result<()> {
        debug_assert_eq!(self.stage, Stage::Idle);
        self.advance(Stage::Compiling);

        let result = if self.request.verbose {
            compile_verbose(invocation)
        } else {
            compile_quiet(invocation)
        };

        if result.is_err() {
            self.advance(Stage::Failed);
        }
        result
    }

    /// Run the compiled program with inherited stdio. Only valid after a successful compile.
    pub fn run(&mut self, executable: &Path) -> Result<ExecutionResult> {
        debug_assert_eq!(self.stage, Stage::Compiling);
        self.advance(Stage::Running);

        if self.request.verbose {
            println!("--- Running ---");
        }

        let start = Instant::now();
        let status = Command::new(executable)
            .args(&self.request.program_args)
            .status();
        let elapsed = start.elapsed();

        let status = match status {
            Ok(status) => status,
            Err(source) => {
                self.advance(Stage::Failed);
                return Err(CrunError::RuntimeProcess {
                    path: executable.to_path_buf(),
                    source,
                });
            }
        };

        let exit_code = exit_code(status);
        let elapsed = self.request.measure_time.then_some(elapsed);
        if let Some(elapsed) = elapsed {
            println!(
                "\nExecution time: {:.3} ms",
                elapsed.as_secs_f64() * 1000.0
            );
        }
        if self.request.verbose {
            println!(
                "\n--- Finished ---\nProgram exited with code {}.",
                exit_code
            );
        }

        self.advance(Stage::Done);
        Ok(ExecutionResult { exit_code, elapsed })
    }
}

fn compile_verbose(invocation: &CompileInvocation) -> Result<()> {
    println!("--- Compiling ---\nCommand: {}", invocation);
    let status = invocation
        .command()
        .status()
        .map_err(|e| spawn_error(invocation, e))?;
    if !status.success() {
        return Err(CrunError::Compile("Compilation failed.".to_string()));
    }
    println!("Compilation successful.");
    Ok(())
}

fn compile_quiet(invocation: &CompileInvocation) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Compiling...");

    let mut cmd = invocation.command();
    hide_console_window(&mut cmd);
    let output = cmd.output();
    pb.finish_and_clear();

    let output = output.map_err(|e| spawn_error(invocation, e))?;
    if output.status.success() {
        return Ok(());
    }

    let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
    diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
    if !diagnostics.trim().is_empty() {
        eprintln!("{}", diagnostics.trim_end());
    }
    if let Some(hint) = FeedbackAnalyzer::analyze(&diagnostics) {
        eprintln!("\n{} {}", "💡".yellow(), hint);
    }
    Err(CrunError::Compile("Compilation failed.".to_string()))
}

fn spawn_error(invocation: &CompileInvocation, e: std::io::Error) -> CrunError {
    CrunError::Compile(format!(
        "Failed to start compiler {}: {}",
        invocation.compiler.display(),
        e
    ))
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}

/// The program's own exit code; `128 + signal` if it was killed on Unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Name of the executable built for the primary source.
fn artifact_stem(primary: &Path) -> String {
    primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "a".to_string())
}

// --- COMMAND: Build & Run ---
pub fn build_and_run(request: &BuildRequest) -> Result<ExecutionResult> {
    let has_cpp = request.has_cpp();
    let toolchain = toolchain::locate(request.compiler, has_cpp)?;
    let sources: Vec<PathBuf> = absolute_sources(&request.sources)?;
    let primary = sources
        .first()
        .ok_or_else(|| CrunError::Configuration("No source files specified.".to_string()))?;
    let source_dir = primary.parent().unwrap_or(Path::new("."));

    let workspace = Workspace::create(source_dir, request.keep_temp)?;
    arm_interrupt_cleanup(&workspace);
    if request.keep_temp {
        println!(
            "   {} Keeping temporary directory: {}",
            "📁".blue(),
            workspace.path().display()
        );
    }

    let auto_flags = deps::resolve_link_flags(&sources, Some(&toolchain));
    let executable = workspace.artifact_path(&artifact_stem(primary));
    let invocation =
        CompileInvocation::new(request, toolchain.path(), sources, &auto_flags, &executable);

    let mut pipeline = Pipeline::new(request);
    pipeline.compile(&invocation)?;
    drop(invocation);
    pipeline.run(&executable)
}
