mod clean;
pub mod command;
mod core;
mod feedback;
pub mod workspace;

pub use clean::{clean_workspaces, find_workspaces};
pub use command::{CompileInvocation, absolute_sources, mode_flags};
pub use core::{ExecutionResult, Pipeline, Stage, build_and_run, exit_code};
pub use feedback::FeedbackAnalyzer;
pub use workspace::{CleanupContext, WORKSPACE_PREFIX, Workspace, arm_interrupt_cleanup};
