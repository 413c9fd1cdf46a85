// src/db/maintenance.rs
//! Periodic TTL cleanup & WAL checkpoints.

use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use rusqlite::Connection;
use tokio::{runtime::Handle, task::JoinHandle, time};

use crate::config::model::DatabaseConfig;
use crate::db::{DbError, TABLES, open_db_connection};

/// Delete rows whose batch timestamp is older than `cutoff_micros` from every
/// telemetry table. Returns the number of rows removed.
pub fn purge_older_than(conn: &Connection, cutoff_micros: i64) -> Result<usize, DbError> {
    let mut removed = 0;
    for table in TABLES {
        removed += conn.execute(&format!("DELETE FROM {table} WHERE ts < ?1"), [cutoff_micros])?;
    }
    Ok(removed)
}

pub fn checkpoint(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
    Ok(())
}

/// Ticker whose first tick is one full period away.
fn ticker(period: Duration) -> time::Interval {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    ticker
}

/// `None` when no TTL is configured.
pub fn spawn_ttl_cleanup(
    rt: &Handle,
    db_path: PathBuf,
    cfg: &DatabaseConfig,
) -> Option<JoinHandle<()>> {
    let ttl = cfg.ttl?;
    let ttl_micros = i64::try_from(ttl.as_micros()).unwrap_or(i64::MAX);
    let period = cfg.cleanup_interval;
    let cfg = cfg.clone();

    Some(rt.spawn(async move {
        let mut ticker = ticker(period);
        loop {
            ticker.tick().await;
            let cutoff = Utc::now().timestamp_micros().saturating_sub(ttl_micros);
            let result = open_db_connection(&db_path, &cfg)
                .map_err(DbError::from)
                .and_then(|conn| {
                    let removed = purge_older_than(&conn, cutoff)?;
                    checkpoint(&conn)?;
                    Ok(removed)
                });
            match result {
                Ok(removed) => log::debug!("TTL cleanup removed {} rows before {}", removed, cutoff),
                Err(e) => log::warn!("TTL cleanup failed: {}", e),
            }
        }
    }))
}

pub fn spawn_wal_maintenance(rt: &Handle, db_path: PathBuf, cfg: &DatabaseConfig) -> JoinHandle<()> {
    let period = cfg.checkpoint_interval;
    let cfg = cfg.clone();

    rt.spawn(async move {
        let mut ticker = ticker(period);
        loop {
            ticker.tick().await;
            let result = open_db_connection(&db_path, &cfg)
                .map_err(DbError::from)
                .and_then(|conn| checkpoint(&conn));
            if let Err(e) = result {
                log::warn!("WAL checkpoint failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, recent, save_batch};
    use crate::events::SyscallCountSample;

    #[test]
    fn purge_removes_only_expired_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = init_database(&dir.path().join("m.db"), &DatabaseConfig::default()).unwrap();

        conn.execute(
            "INSERT INTO syscall_stats (ts, syscall_name, count) VALUES (?1, 'old', 1)",
            [Utc::now().timestamp_micros() - 3_600_000_000],
        )
        .unwrap();
        save_batch(&mut conn, &[SyscallCountSample { syscall_name: "new".into(), count: 2 }])
            .unwrap();

        let cutoff = Utc::now().timestamp_micros() - 60_000_000;
        assert_eq!(purge_older_than(&conn, cutoff).unwrap(), 1);

        let left = recent::<SyscallCountSample>(&conn, 10).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].event.syscall_name, "new");
        checkpoint(&conn).unwrap();
    }

    #[tokio::test]
    async fn ttl_cleanup_is_disabled_without_ttl() {
        let cfg = DatabaseConfig::default();
        assert!(spawn_ttl_cleanup(&Handle::current(), PathBuf::from("unused.db"), &cfg).is_none());
    }
}
