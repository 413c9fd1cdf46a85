// src/collector/collector.rs
//! Generic collector: one supervised tool + its grammar + its buffer.
//!
//! ```text
//!   Idle ──start()──▶ Running ──stop() / EOF / read error──▶ Idle
//! ```
//!
//! * `start` while Running is a no-op; `stop` while Idle returns at once.
//! * A single reader task per run owns the child process. It exits on
//!   cancellation, end of stream or a read error, terminates the child,
//!   and flips the state back to Idle.
//! * `stop` does not return until that task has been joined.

use std::{
    marker::PhantomData,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use log::Level;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::ChildStdout,
    sync::{Mutex as AsyncMutex, oneshot},
    task::JoinHandle,
};

use crate::agent_log;
use crate::collector::{
    CollectorError,
    buffer::EventBuffer,
    parser::LineParser,
    supervisor::{CommandSpec, ProcessSupervisor, SupervisedProcess},
};
use crate::events::SourceKind;
use crate::logging::ComponentLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Running,
}

/// Uniform lifecycle surface shared by every collector, whatever its event type.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn source(&self) -> SourceKind;

    fn state(&self) -> CollectorState;

    /// Spawn the tool and start reading; no-op while running.
    async fn start(&self) -> Result<(), CollectorError>;

    /// Cancel the reader, kill the tool, wait for both; no-op while idle.
    async fn stop(&self);
}

/// Why a reader task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCause {
    Cancelled,
    EndOfStream,
    ReadError,
}

/// Handles for the run in progress (or one that ended on its own and has not
/// been reaped yet).
struct ActiveRun {
    cancel: oneshot::Sender<()>,
    reader: JoinHandle<()>,
}

pub struct Collector<P: LineParser> {
    command: CommandSpec,
    buffer:  Arc<EventBuffer<P::Event>>,
    state:   Arc<Mutex<CollectorState>>,
    /// Serializes start/stop; held across the join in `stop`.
    run:     AsyncMutex<Option<ActiveRun>>,
    log:     ComponentLogger,
    _parser: PhantomData<fn() -> P>,
}

impl<P: LineParser> Collector<P> {
    pub fn new(command: CommandSpec, capacity: usize, log: ComponentLogger) -> Self {
        Self {
            command,
            buffer: Arc::new(EventBuffer::new(capacity)),
            state: Arc::new(Mutex::new(CollectorState::Idle)),
            run: AsyncMutex::new(None),
            log,
            _parser: PhantomData,
        }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Everything parsed since the previous drain, oldest first.
    pub fn drain(&self) -> Vec<P::Event> {
        self.buffer.drain_all()
    }

    /// Events discarded so far because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.buffer.dropped()
    }

    pub fn state(&self) -> CollectorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: CollectorState) {
        set_state(&self.state, next);
    }

    pub async fn start(&self) -> Result<(), CollectorError> {
        let mut run = self.run.lock().await;
        if self.state() == CollectorState::Running {
            return Ok(());
        }

        // The previous reader already went Idle by itself; reap it first.
        if let Some(stale) = run.take() {
            self.join(stale.reader).await;
        }

        let (process, stdout) = ProcessSupervisor::spawn(&self.command)?;
        agent_log!(
            self.log,
            Level::Info,
            "started `{}` (pid={:?})",
            self.command,
            process.pid()
        );

        self.set_state(CollectorState::Running);
        let (cancel, cancelled) = oneshot::channel();
        let reader = tokio::spawn(read_loop(
            P::default(),
            process,
            stdout,
            cancelled,
            Arc::clone(&self.buffer),
            Arc::clone(&self.state),
            self.log.clone(),
        ));
        *run = Some(ActiveRun { cancel, reader });
        Ok(())
    }

    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(active) = run.take() else { return };

        // Err only if the reader is already gone.
        let _ = active.cancel.send(());
        self.join(active.reader).await;
        self.set_state(CollectorState::Idle);
    }

    async fn join(&self, reader: JoinHandle<()>) {
        if let Err(e) = reader.await {
            agent_log!(self.log, Level::Error, "reader task failed: {}", e);
        }
    }
}

#[async_trait]
impl<P: LineParser> Lifecycle for Collector<P> {
    fn source(&self) -> SourceKind {
        P::SOURCE
    }

    fn state(&self) -> CollectorState {
        Collector::state(self)
    }

    async fn start(&self) -> Result<(), CollectorError> {
        Collector::start(self).await
    }

    async fn stop(&self) {
        Collector::stop(self).await
    }
}

fn set_state(state: &Mutex<CollectorState>, next: CollectorState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// Body of the reader task.
async fn read_loop<P: LineParser>(
    mut parser: P,
    process: SupervisedProcess,
    stdout: ChildStdout,
    mut cancelled: oneshot::Receiver<()>,
    buffer: Arc<EventBuffer<P::Event>>,
    state: Arc<Mutex<CollectorState>>,
    log: ComponentLogger,
) {
    let mut reader = BufReader::new(stdout);
    let mut raw = Vec::with_capacity(256);

    let cause = loop {
        raw.clear();
        let read = tokio::select! {
            biased;
            _ = &mut cancelled => break ExitCause::Cancelled,
            read = reader.read_until(b'\n', &mut raw) => read,
        };

        match read {
            Ok(0) => break ExitCause::EndOfStream,
            Ok(_) => {
                let line = String::from_utf8_lossy(&raw);
                for event in parser.parse_line(line.trim()) {
                    buffer.push(event);
                }
            }
            Err(e) => {
                agent_log!(log, Level::Error, "{} read error: {}", process.program(), e);
                break ExitCause::ReadError;
            }
        }
    };

    for event in parser.finish() {
        buffer.push(event);
    }

    let program = process.program().to_string();
    match process.terminate().await {
        Ok(code) => agent_log!(log, Level::Debug, "{} reaped (exit code {:?})", program, code),
        Err(e) => agent_log!(log, Level::Warn, "failed to terminate {}: {}", program, e),
    }

    set_state(&state, CollectorState::Idle);
    agent_log!(log, Level::Info, "stopped ({:?})", cause);
}
