//! Child process execution for external build operations.
//!
//! Build tools stream their own diagnostics, so stdio is inherited rather than
//! captured, except for queries whose output we parse.

use std::fmt;

use tokio::process::Command;
use tracing::{debug, info};

use super::ToolError;

/// A program and its arguments, printable as a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", quote(&self.program))?;
    for arg in &self.args {
      write!(f, " {}", quote(arg))?;
    }
    Ok(())
  }
}

fn quote(arg: &str) -> String {
  if arg.is_empty() || arg.chars().any(char::is_whitespace) {
    format!("\"{}\"", arg)
  } else {
    arg.to_string()
  }
}

/// Run `invocation` to completion with inherited stdio.
///
/// In dry-run mode the command line is printed and nothing is spawned.
pub async fn run(invocation: &Invocation, dry_run: bool) -> Result<(), ToolError> {
  println!("RUN: {}", invocation);
  if dry_run {
    return Ok(());
  }

  info!(cmd = %invocation, "executing command");

  let status = Command::new(&invocation.program)
    .args(&invocation.args)
    .status()
    .await
    .map_err(|source| ToolError::Spawn {
      program: invocation.program.clone(),
      source,
    })?;

  if !status.success() {
    return Err(ToolError::Failed {
      cmd: invocation.to_string(),
      code: status.code(),
    });
  }

  Ok(())
}

/// Run `invocation` and return its stdout.
pub async fn capture(invocation: &Invocation) -> Result<String, ToolError> {
  debug!(cmd = %invocation, "capturing command output");

  let output = Command::new(&invocation.program)
    .args(&invocation.args)
    .output()
    .await
    .map_err(|source| ToolError::Spawn {
      program: invocation.program.clone(),
      source,
    })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(ToolError::Failed {
      cmd: invocation.to_string(),
      code: output.status.code(),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
