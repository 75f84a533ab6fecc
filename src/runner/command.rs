//! Command execution
//!
//! This module handles executing shell commands. Command text arrives with
//! placeholders escaped (`$${name}`); it is unescaped right before the shell
//! sees it. Every command, including condition checks and captured defaults,
//! sees the resolved variables as environment variables.

use crate::error::{ExecutionError, ExecutionResult};
use crate::interp::unescape;
use crate::runner::{Command, Context};
use std::process::{Command as StdCommand, Stdio};

/// Build a shell invocation of `command_text` through the context interpreter
fn shell_command(command_text: &str, ctx: &Context) -> ExecutionResult<StdCommand> {
    let (program, interpreter_args) =
        ctx.interpreter
            .split_first()
            .ok_or_else(|| ExecutionError::Spawn {
                command: command_text.to_string(),
                error: "no interpreter configured".to_string(),
            })?;

    let mut command = StdCommand::new(program);
    command.args(interpreter_args);
    command.arg(command_text);
    command.current_dir(&ctx.working_dir);

    for (key, value) in &ctx.env {
        match value {
            Some(value) => command.env(key, value),
            None => command.env_remove(key),
        };
    }

    // Resolved variables are visible to the command as environment variables
    for (key, value) in &ctx.vars {
        command.env(key, value);
    }

    Ok(command)
}

fn spawn_error(command_text: &str, error: std::io::Error) -> ExecutionError {
    ExecutionError::Spawn {
        command: command_text.to_string(),
        error: error.to_string(),
    }
}

/// Execute a command in the given context
pub fn execute_command(cmd: &Command, ctx: &Context) -> ExecutionResult<()> {
    let exec_str = unescape(cmd.exec());

    if !cmd.is_quiet() {
        ctx.print_command(&unescape(cmd.print()));
    }

    let mut command = shell_command(&exec_str, ctx)?;

    if let Some(dir) = cmd.dir() {
        command.current_dir(ctx.working_dir.join(unescape(dir)));
    }

    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command
        .status()
        .map_err(|e| spawn_error(&exec_str, e))?;

    if !status.success() {
        return Err(ExecutionError::CommandFailed(status.code()));
    }

    Ok(())
}

/// Check if a command succeeds (for when conditions)
pub fn check_command(cmd_str: &str, ctx: &Context) -> ExecutionResult<bool> {
    let mut command = shell_command(cmd_str, ctx)?;

    // Suppress output
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    let status = command.status().map_err(|e| spawn_error(cmd_str, e))?;
    log::debug!("condition command '{}' exited with {:?}", cmd_str, status.code());

    Ok(status.success())
}

/// Run a command and return its trimmed standard output
///
/// Standard error goes to the terminal. A non-zero exit is an error.
pub fn capture_command(cmd_str: &str, ctx: &Context) -> ExecutionResult<String> {
    let mut command = shell_command(cmd_str, ctx)?;
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::inherit());

    let output = command.output().map_err(|e| spawn_error(cmd_str, e))?;
    if !output.status.success() {
        return Err(ExecutionError::CommandFailed(output.status.code()));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|_| ExecutionError::InvalidOutput(cmd_str.to_string()))?;
    Ok(stdout.trim().to_string())
}
