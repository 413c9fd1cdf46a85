// src/collector/supervisor.rs
//! Spawning and terminating the external tracing tool.
//!
//! The tool's stdout is piped and handed back to the caller; stderr is
//! discarded (the bcc tools print attach diagnostics there). The child is
//! created with `kill_on_drop` so a leaked handle never leaves a tracer
//! running behind the agent.

use std::{fmt, io, process::Stdio};

use tokio::process::{Child, ChildStdout, Command};

use crate::collector::CollectorError;

/// argv of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args:    Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args:    args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a full argv (program first). `None` when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub struct ProcessSupervisor;

impl ProcessSupervisor {
    /// Spawn `spec` with stdout attached.
    pub fn spawn(spec: &CommandSpec) -> Result<(SupervisedProcess, ChildStdout), CollectorError> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollectorError::Spawn { program: spec.program.clone(), source })?;

        let Some(stdout) = child.stdout.take() else {
            // Nothing to read from: don't leave the process behind.
            let _ = child.start_kill();
            return Err(CollectorError::MissingStdout { program: spec.program.clone() });
        };

        Ok((SupervisedProcess { child, program: spec.program.clone() }, stdout))
    }
}

/// A running tool; owned by the collector's reader task.
pub struct SupervisedProcess {
    child:   Child,
    program: String,
}

impl SupervisedProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Kill the process if it is still alive and reap it.
    ///
    /// Best effort: an already-exited child is simply waited on.
    pub async fn terminate(mut self) -> io::Result<Option<i32>> {
        if self.child.try_wait()?.is_none() {
            match self.child.start_kill() {
                Ok(()) => {}
                // Raced with a natural exit.
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => return Err(e),
            }
        }
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}
