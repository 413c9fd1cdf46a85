// src/db/db_writer.rs
//! Batched writes and newest-first reads.
//!
//! All DB work here is synchronous so no `&Connection` is ever held across an
//! `.await`; callers run it between ticks of their own loop.

use std::{thread::sleep, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode};

use crate::db::{BatchInsert, DbError, Stored};

/// Retries after the first attempt when the database is busy.
const MAX_RETRIES: u64 = 5;
const BACKOFF_STEP: Duration = Duration::from_millis(50);

/// Insert `batch` in a single transaction; returns the number of rows written.
///
/// Every row gets the same `ts` (now, UTC micros). A busy or locked database
/// is retried with linear backoff; any other error aborts the whole batch.
pub fn save_batch<E: BatchInsert>(conn: &mut Connection, batch: &[E]) -> Result<usize, DbError> {
    if batch.is_empty() {
        return Ok(0);
    }

    let ts = Utc::now().timestamp_micros();
    let mut attempts = 0;
    loop {
        match insert_all(conn, ts, batch) {
            Ok(n) => return Ok(n),
            Err(e) if is_busy(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                log::debug!("{} is busy, retry {}/{}", E::TABLE, attempts, MAX_RETRIES);
                sleep(BACKOFF_STEP * attempts as u32);
            }
            Err(e) => return Err(DbError::Sql(e)),
        }
    }
}

fn insert_all<E: BatchInsert>(conn: &mut Connection, ts: i64, batch: &[E]) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(E::insert_sql())?;
        for rec in batch {
            E::bind_and_execute(&mut stmt, ts, rec)?;
        }
    }
    tx.commit()?;
    Ok(batch.len())
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// The `limit` most recently inserted rows of `E`'s table, newest first.
pub fn recent<E: BatchInsert>(conn: &Connection, limit: usize) -> Result<Vec<Stored<E>>, DbError> {
    let sql = format!(
        "SELECT id, ts, {} FROM {} ORDER BY id DESC LIMIT ?1",
        E::COLUMNS,
        E::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([limit as i64], |row| {
        Ok(Stored {
            id:    row.get(0)?,
            ts:    DateTime::from_timestamp_micros(row.get(1)?).unwrap_or_default(),
            event: E::from_row(row)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::DatabaseConfig;
    use crate::db::init_database;
    use crate::events::{SyscallCountSample, TcpConnectEvent};

    fn fresh() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = init_database(&dir.path().join("m.db"), &DatabaseConfig::default()).unwrap();
        (dir, conn)
    }

    fn syscall(name: &str, count: u64) -> SyscallCountSample {
        SyscallCountSample { syscall_name: name.into(), count }
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let (_dir, mut conn) = fresh();
        assert_eq!(save_batch::<SyscallCountSample>(&mut conn, &[]).unwrap(), 0);
        assert!(recent::<SyscallCountSample>(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn batch_shares_one_timestamp_and_reads_back_newest_first() {
        let (_dir, mut conn) = fresh();
        let batch = vec![syscall("read", 10), syscall("write", 4)];
        assert_eq!(save_batch(&mut conn, &batch).unwrap(), 2);

        let rows = recent::<SyscallCountSample>(&conn, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event, syscall("write", 4));
        assert_eq!(rows[1].event, syscall("read", 10));
        assert_eq!(rows[0].ts, rows[1].ts);
        assert!(rows[0].id > rows[1].id);
    }

    #[test]
    fn limit_caps_the_result() {
        let (_dir, mut conn) = fresh();
        let batch: Vec<_> = (0..5).map(|i| syscall("futex", i)).collect();
        save_batch(&mut conn, &batch).unwrap();

        let rows = recent::<SyscallCountSample>(&conn, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event.count, 4);
    }

    #[test]
    fn tcpconnect_rows_store_an_empty_source_port() {
        let (_dir, mut conn) = fresh();
        let ev = TcpConnectEvent {
            pid:         "1234".into(),
            comm:        "curl".into(),
            ip_version:  "IPv4".into(),
            source_addr: "10.0.0.5".into(),
            dest_addr:   "93.184.216.34".into(),
            dest_port:   "443".into(),
        };
        save_batch(&mut conn, std::slice::from_ref(&ev)).unwrap();

        let port: String = conn
            .query_row("SELECT source_port FROM network_connections", [], |r| r.get(0))
            .unwrap();
        assert_eq!(port, "");
        assert_eq!(recent::<TcpConnectEvent>(&conn, 1).unwrap()[0].event, ev);
    }

    #[test]
    fn locked_database_surfaces_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.db");
        let cfg = DatabaseConfig::default();
        let mut conn = init_database(&path, &cfg).unwrap();
        conn.busy_timeout(Duration::from_millis(1)).unwrap();

        let holder = init_database(&path, &cfg).unwrap();
        holder.execute_batch("BEGIN IMMEDIATE").unwrap();

        let err = save_batch(&mut conn, &[syscall("read", 1)]).unwrap_err();
        assert!(matches!(err, DbError::Sql(ref e) if is_busy(e)));

        holder.execute_batch("ROLLBACK").unwrap();
        assert_eq!(save_batch(&mut conn, &[syscall("read", 1)]).unwrap(), 1);
    }
}
