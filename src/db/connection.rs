// src/db/connection.rs
//! Opening and initialising SQLite with runtime parameters.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::Connection;

use crate::config::model::DatabaseConfig;
use crate::db::DbError;

const SCHEMA: &str = include_str!("../../resources/schema.sql");

/// Resolve the configured path against `base_dir` (absolute paths win).
pub fn db_path(base_dir: &Path, cfg: &DatabaseConfig) -> PathBuf {
    base_dir.join(&cfg.path)
}

pub fn open_db_connection(path: &Path, cfg: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(1_000))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", cfg.synchronous.as_str())?;
    Ok(conn)
}

/// Open the database at `path`, creating its directory and tables as needed.
///
/// With `purge_on_restart` any existing file (and its WAL side files) is
/// removed first. The schema only uses `IF NOT EXISTS`, so applying it to an
/// existing database is harmless.
pub fn init_database(path: &Path, cfg: &DatabaseConfig) -> Result<Connection, DbError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    if cfg.purge_on_restart && path.exists() {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut side = path.as_os_str().to_owned();
            side.push(suffix);
            let _ = fs::remove_file(PathBuf::from(side));
        }
        log::info!("Purged previous database at {}", path.display());
    }

    let conn = open_db_connection(path, cfg)?;
    conn.pragma_update(None, "journal_size_limit", cfg.journal_size_limit as i64)?;
    conn.execute_batch(SCHEMA)?;

    log::info!("Database ready at {}", path.display());
    Ok(conn)
}
