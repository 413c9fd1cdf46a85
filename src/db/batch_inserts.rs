// src/db/batch_inserts.rs

use chrono::{DateTime, Utc};
use rusqlite::{Result as SqlResult, Row, Statement, params};
use serde::Serialize;

use crate::events::{
    CpuStackSample, DiskLatencyBucket, ProcessExecEvent, SyscallCountSample, TcpConnectEvent,
    TcpConnectionSummary,
};

/// How one event type maps onto its table.
///
/// `ts` is supplied by the writer so a whole batch shares one timestamp.
pub trait BatchInsert: Sized {
    const TABLE: &'static str;
    /// Payload columns, in the order `from_row` reads them (after `id, ts`).
    const COLUMNS: &'static str;

    fn insert_sql() -> &'static str;
    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, record: &Self) -> SqlResult<()>;
    /// Decode the payload from a row selected as `id, ts, COLUMNS`.
    fn from_row(row: &Row<'_>) -> SqlResult<Self>;
}

/// A persisted event together with its row id and batch timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<E> {
    pub id:    i64,
    pub ts:    DateTime<Utc>,
    #[serde(flatten)]
    pub event: E,
}

/// DISK LATENCY
impl BatchInsert for DiskLatencyBucket {
    const TABLE: &'static str = "disk_latency";
    const COLUMNS: &'static str = "range_min, range_max, count";

    fn insert_sql() -> &'static str {
        "INSERT INTO disk_latency (ts, range_min, range_max, count) VALUES (?1,?2,?3,?4)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, rec: &Self) -> SqlResult<()> {
        stmt.execute(params![
            ts,
            rec.range_min as i64,
            rec.range_max as i64,
            rec.count as i64,
        ])?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            range_min: row.get::<_, i64>(2)? as u64,
            range_max: row.get::<_, i64>(3)? as u64,
            count:     row.get::<_, i64>(4)? as u64,
        })
    }
}

/// PROCESS EXECS
impl BatchInsert for ProcessExecEvent {
    const TABLE: &'static str = "processes";
    const COLUMNS: &'static str = "time, pid, comm, args";

    fn insert_sql() -> &'static str {
        "INSERT INTO processes (ts, time, pid, comm, args) VALUES (?1,?2,?3,?4,?5)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, rec: &Self) -> SqlResult<()> {
        stmt.execute(params![ts, rec.time, rec.pid, rec.comm, rec.args])?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            time: row.get(2)?,
            pid:  row.get(3)?,
            comm: row.get(4)?,
            args: row.get(5)?,
        })
    }
}

/// CPU STACKS
impl BatchInsert for CpuStackSample {
    const TABLE: &'static str = "cpu_profiles";
    const COLUMNS: &'static str = "process_name, stack_trace, sample_count";

    fn insert_sql() -> &'static str {
        "INSERT INTO cpu_profiles (ts, process_name, stack_trace, sample_count) \
         VALUES (?1,?2,?3,?4)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, rec: &Self) -> SqlResult<()> {
        stmt.execute(params![ts, rec.process_name, rec.stack_trace, rec.sample_count as i64])?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            process_name: row.get(2)?,
            stack_trace:  row.get(3)?,
            sample_count: row.get::<_, i64>(4)? as u64,
        })
    }
}

/// SYSCALL COUNTS
impl BatchInsert for SyscallCountSample {
    const TABLE: &'static str = "syscall_stats";
    const COLUMNS: &'static str = "syscall_name, count";

    fn insert_sql() -> &'static str {
        "INSERT INTO syscall_stats (ts, syscall_name, count) VALUES (?1,?2,?3)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, rec: &Self) -> SqlResult<()> {
        stmt.execute(params![ts, rec.syscall_name, rec.count as i64])?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            syscall_name: row.get(2)?,
            count:        row.get::<_, i64>(3)? as u64,
        })
    }
}

/// TCP LIFETIMES
impl BatchInsert for TcpConnectionSummary {
    const TABLE: &'static str = "tcp_lifecycle";
    const COLUMNS: &'static str =
        "pid, comm, local_addr, local_port, remote_addr, remote_port, tx_kb, rx_kb, duration_ms";

    fn insert_sql() -> &'static str {
        "INSERT INTO tcp_lifecycle \
           (ts, pid, comm, local_addr, local_port, remote_addr, remote_port, \
            tx_kb, rx_kb, duration_ms) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, rec: &Self) -> SqlResult<()> {
        stmt.execute(params![
            ts,
            rec.pid,
            rec.comm,
            rec.local_addr,
            rec.local_port,
            rec.remote_addr,
            rec.remote_port,
            rec.tx_kb,
            rec.rx_kb,
            rec.duration_ms,
        ])?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            pid:         row.get(2)?,
            comm:        row.get(3)?,
            local_addr:  row.get(4)?,
            local_port:  row.get(5)?,
            remote_addr: row.get(6)?,
            remote_port: row.get(7)?,
            tx_kb:       row.get(8)?,
            rx_kb:       row.get(9)?,
            duration_ms: row.get(10)?,
        })
    }
}

/// TCP CONNECTS
impl BatchInsert for TcpConnectEvent {
    const TABLE: &'static str = "network_connections";
    const COLUMNS: &'static str = "pid, comm, ip_version, source_addr, dest_addr, dest_port";

    // source_port is always written empty: tcpconnect does not print one.
    fn insert_sql() -> &'static str {
        "INSERT INTO network_connections \
           (ts, pid, comm, ip_version, source_addr, source_port, dest_addr, dest_port) \
         VALUES (?1,?2,?3,?4,?5,'',?6,?7)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, ts: i64, rec: &Self) -> SqlResult<()> {
        stmt.execute(params![
            ts,
            rec.pid,
            rec.comm,
            rec.ip_version,
            rec.source_addr,
            rec.dest_addr,
            rec.dest_port,
        ])?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            pid:         row.get(2)?,
            comm:        row.get(3)?,
            ip_version:  row.get(4)?,
            source_addr: row.get(5)?,
            dest_addr:   row.get(6)?,
            dest_port:   row.get(7)?,
        })
    }
}
