// src/main.rs

//! Agent entry-point.
//!
//! 1. Resolve and load configuration (first CLI argument, or `config.toml`
//!    next to the executable)
//! 2. Set up structured logging
//! 3. Initialise SQLite (WAL) and apply the schema
//! 4. Start one collector + drain cycle per enabled source
//! 5. Spawn WAL / TTL maintenance
//! 6. Wait for Ctrl-C or SIGTERM, then stop every collector and flush

// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::{Context, Result};
use futures::future::join_all;
use log::Log;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    runtime::{Builder, Handle},
    sync::watch,
};

// ───── local imports ────────────────────────────────────────────────────────
use agent::config::{self, Config};
use agent::db::{self, maintenance};
use agent::logging::{self, ComponentLogger};
use agent::pipeline::{self, LaunchContext};

const CONFIG_FILE: &str = "config.toml";

// ───── helpers ──────────────────────────────────────────────────────────────

/// Print an error with context and terminate the process.
macro_rules! fatal {
    ($ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            chrono::Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        std::process::exit(1);
    }};
}

/// Directory that contains the running executable.
fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine executable path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable must live in some directory")
}

/// Config file named on the command line, else `config.toml` beside the binary.
fn config_path() -> Result<PathBuf> {
    match std::env::args_os().nth(1) {
        Some(arg) => Ok(PathBuf::from(arg)),
        None => Ok(exe_dir()?.join(CONFIG_FILE)),
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = term.recv() => log::warn!("SIGTERM received"),
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

// ───── agent logic ──────────────────────────────────────────────────────────

async fn serve(cfg: Config, db_path: PathBuf, sink: Arc<dyn Log>) {
    let root = ComponentLogger::new(sink, "agent");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 4 ─ Collectors & drain cycles
    let ctx = LaunchContext {
        collectors: &cfg.collectors,
        db_path:    &db_path,
        db:         &cfg.database,
        log:        &root,
    };
    let mut cycles = Vec::new();
    for source in cfg.collectors.enabled() {
        match pipeline::launch(source, &ctx, shutdown_rx.clone()).await {
            Ok(handle) => cycles.push((source.kind, handle)),
            Err(e) => log::error!("{} not started: {}", source.kind, e),
        }
    }
    drop(shutdown_rx);
    if cycles.is_empty() {
        log::warn!("No collector is running; waiting for shutdown anyway");
    } else {
        log::info!("Agent running with {} collector(s)", cycles.len());
    }

    // 5 ─ Maintenance
    let rt = Handle::current();
    let mut housekeeping = vec![maintenance::spawn_wal_maintenance(&rt, db_path.clone(), &cfg.database)];
    housekeeping.extend(maintenance::spawn_ttl_cleanup(&rt, db_path.clone(), &cfg.database));

    // 6 ─ Wait for shutdown
    if let Err(e) = shutdown_signal().await {
        log::error!("Signal handling failed: {}; shutting down", e);
    }
    log::warn!("Shutdown initiated");
    let _ = shutdown_tx.send(true);

    let (kinds, handles): (Vec<_>, Vec<_>) = cycles.into_iter().unzip();
    for (kind, joined) in kinds.into_iter().zip(join_all(handles).await) {
        match joined {
            Ok(stats) => log::info!("{} stopped: {} rows saved", kind, stats.saved),
            Err(e) => log::error!("{} drain cycle failed: {}", kind, e),
        }
    }
    for task in housekeeping {
        task.abort();
    }
    log::info!("Agent stopped cleanly");
}

fn run() -> Result<()> {
    // 1 ─ Context
    let cfg_path = config_path()?;
    let cfg = config::load(&cfg_path)
        .with_context(|| format!("loading {}", cfg_path.display()))?;
    let base_dir = cfg_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    // 2 ─ Logging
    let sink = logging::init(&cfg.logging).context("logging setup failed")?;
    log::info!("Agent bootstrap initiated ({})", cfg_path.display());

    // 3 ─ Database; every drain cycle opens its own connection afterwards
    let db_path = db::db_path(&base_dir, &cfg.database);
    db::init_database(&db_path, &cfg.database)
        .with_context(|| format!("initialising {}", db_path.display()))?;

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Tokio runtime creation failed")?;
    rt.block_on(serve(cfg, db_path, sink));
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        fatal!("main", "{:#}", e);
    }
}
