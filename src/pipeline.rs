// src/pipeline.rs
//! Drain cycles: the service layer between collectors and SQLite.
//!
//! One [`DrainCycle`] per running source. Every `drain_interval` it empties
//! the collector's buffer and writes the batch in one transaction. On
//! shutdown it stops the collector, flushes whatever is left, and returns its
//! [`CycleStats`].
//!
//! Restarting a tool that exited on its own is a policy decision made here
//! (`restart_on_exit`), never inside the collector.

use std::{path::Path, sync::Arc, time::Duration};

use log::Level;
use rusqlite::Connection;
use tokio::{sync::watch, task::JoinHandle, time};

use crate::agent_log;
use crate::collector::{
    Collector, CollectorState, CommandSpec, LineParser,
    parsers::{ExecParser, HistogramParser, StackParser, SyscallParser, TcpConnectParser, TcpLifeParser},
};
use crate::config::model::{CollectorsConfig, DatabaseConfig, SourceConfig};
use crate::db::{BatchInsert, DbError, open_db_connection, save_batch};
use crate::events::SourceKind;
use crate::logging::ComponentLogger;

/// What a cycle did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub ticks:    u64,
    pub saved:    u64,
    /// Events lost because a save failed.
    pub lost:     u64,
    pub restarts: u64,
}

pub struct DrainCycle<P: LineParser>
where
    P::Event: BatchInsert,
{
    collector:       Arc<Collector<P>>,
    conn:            Connection,
    period:          Duration,
    restart_on_exit: bool,
    last_dropped:    u64,
    stats:           CycleStats,
    log:             ComponentLogger,
}

impl<P: LineParser> DrainCycle<P>
where
    P::Event: BatchInsert,
{
    pub fn new(
        collector: Arc<Collector<P>>,
        conn: Connection,
        period: Duration,
        log: ComponentLogger,
    ) -> Self {
        Self {
            collector,
            conn,
            period,
            restart_on_exit: false,
            last_dropped: 0,
            stats: CycleStats::default(),
            log,
        }
    }

    pub fn restart_on_exit(mut self, enabled: bool) -> Self {
        self.restart_on_exit = enabled;
        self
    }

    /// Run until `shutdown` turns `true` (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> CycleStats {
        let mut ticker = time::interval_at(time::Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.collector.stop().await;
        self.flush();
        agent_log!(
            self.log,
            Level::Info,
            "cycle finished: {} ticks, {} saved, {} lost, {} restarts",
            self.stats.ticks,
            self.stats.saved,
            self.stats.lost,
            self.stats.restarts
        );
        self.stats
    }

    async fn tick(&mut self) {
        self.stats.ticks += 1;
        self.flush();

        if self.restart_on_exit && self.collector.state() == CollectorState::Idle {
            match self.collector.start().await {
                Ok(()) => {
                    self.stats.restarts += 1;
                    agent_log!(self.log, Level::Info, "restarted `{}`", self.collector.command());
                }
                Err(e) => agent_log!(self.log, Level::Warn, "restart failed: {}", e),
            }
        }
    }

    /// Drain once and persist. DB work is synchronous; see `db_writer`.
    fn flush(&mut self) {
        let batch = self.collector.drain();

        let dropped = self.collector.dropped();
        if dropped > self.last_dropped {
            agent_log!(
                self.log,
                Level::Debug,
                "buffer full: {} events dropped since last drain",
                dropped - self.last_dropped
            );
            self.last_dropped = dropped;
        }

        if batch.is_empty() {
            return;
        }
        let table = <P::Event as BatchInsert>::TABLE;
        match save_batch(&mut self.conn, &batch) {
            Ok(n) => {
                self.stats.saved += n as u64;
                agent_log!(self.log, Level::Debug, "saved {} rows to {}", n, table);
            }
            Err(e) => {
                self.stats.lost += batch.len() as u64;
                agent_log!(
                    self.log,
                    Level::Error,
                    "failed to save {} events to {}: {}",
                    batch.len(),
                    table,
                    e
                );
            }
        }
    }
}

/// Resolves once shutdown has been requested.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop || rx.changed().await.is_err() {
            return;
        }
    }
}

/// Why a source was not launched.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("collectors.{0}.command is empty")]
    EmptyCommand(SourceKind),

    #[error(transparent)]
    Collector(#[from] crate::collector::CollectorError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Everything a source needs besides its own `[collectors.<source>]` table.
pub struct LaunchContext<'a> {
    pub collectors: &'a CollectorsConfig,
    pub db_path:    &'a Path,
    pub db:         &'a DatabaseConfig,
    pub log:        &'a ComponentLogger,
}

/// Build, start and spawn the drain cycle for one configured source.
///
/// Each cycle gets its own SQLite connection.
pub async fn launch(
    source: &SourceConfig,
    ctx: &LaunchContext<'_>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<CycleStats>, LaunchError> {
    match source.kind {
        SourceKind::Biolatency => launch_with::<HistogramParser>(source, ctx, shutdown).await,
        SourceKind::Execsnoop  => launch_with::<ExecParser>(source, ctx, shutdown).await,
        SourceKind::Profile    => launch_with::<StackParser>(source, ctx, shutdown).await,
        SourceKind::Syscount   => launch_with::<SyscallParser>(source, ctx, shutdown).await,
        SourceKind::Tcplife    => launch_with::<TcpLifeParser>(source, ctx, shutdown).await,
        SourceKind::Tcpconnect => launch_with::<TcpConnectParser>(source, ctx, shutdown).await,
    }
}

async fn launch_with<P>(
    source: &SourceConfig,
    ctx: &LaunchContext<'_>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<CycleStats>, LaunchError>
where
    P: LineParser,
    P::Event: BatchInsert,
{
    let command =
        CommandSpec::from_argv(&source.command).ok_or(LaunchError::EmptyCommand(source.kind))?;
    let conn = open_db_connection(ctx.db_path, ctx.db).map_err(DbError::from)?;

    let log = ctx.log.child(format!("collector::{}", source.kind));
    let collector = Arc::new(Collector::<P>::new(command, ctx.collectors.buffer_capacity, log));
    collector.start().await?;

    let cycle_log = ctx.log.child(format!("pipeline::{}", source.kind));
    let cycle = DrainCycle::new(collector, conn, source.drain_interval, cycle_log)
        .restart_on_exit(ctx.collectors.restart_on_exit);
    Ok(tokio::spawn(cycle.run(shutdown)))
}
