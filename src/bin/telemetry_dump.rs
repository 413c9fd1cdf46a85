//! Print the newest rows of one telemetry table as JSON lines.
//!
//! ```text
//! telemetry_dump <db-path> <source> [limit]
//! ```
//! `source` is one of biolatency, execsnoop, profile, syscount, tcplife,
//! tcpconnect. `limit` defaults to 100 and is capped at 1000.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::io::{self, Write};

use agent::db::{BatchInsert, recent};
use agent::events::{
    CpuStackSample, DiskLatencyBucket, ProcessExecEvent, SourceKind, SyscallCountSample,
    TcpConnectEvent, TcpConnectionSummary,
};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize     = 1_000;

fn parse_limit(arg: Option<&str>) -> Result<usize> {
    let Some(raw) = arg else { return Ok(DEFAULT_LIMIT) };
    let n: usize = raw.parse().with_context(|| format!("invalid limit '{raw}'"))?;
    if n == 0 {
        bail!("limit must be at least 1");
    }
    Ok(n.min(MAX_LIMIT))
}

fn dump<E: BatchInsert + Serialize>(conn: &Connection, limit: usize) -> Result<usize> {
    let rows = recent::<E>(conn, limit)?;
    let mut out = io::stdout().lock();
    for row in &rows {
        serde_json::to_writer(&mut out, row)?;
        writeln!(out)?;
    }
    Ok(rows.len())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [db_path, source, rest @ ..] = args.as_slice() else {
        bail!("usage: telemetry_dump <db-path> <source> [limit]");
    };
    let source: SourceKind = source.parse().map_err(anyhow::Error::msg)?;
    let limit = parse_limit(rest.first().map(String::as_str))?;

    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("opening {db_path}"))?;

    let printed = match source {
        SourceKind::Biolatency => dump::<DiskLatencyBucket>(&conn, limit)?,
        SourceKind::Execsnoop  => dump::<ProcessExecEvent>(&conn, limit)?,
        SourceKind::Profile    => dump::<CpuStackSample>(&conn, limit)?,
        SourceKind::Syscount   => dump::<SyscallCountSample>(&conn, limit)?,
        SourceKind::Tcplife    => dump::<TcpConnectionSummary>(&conn, limit)?,
        SourceKind::Tcpconnect => dump::<TcpConnectEvent>(&conn, limit)?,
    };
    eprintln!("{printed} {source} row(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(parse_limit(None).unwrap(), 100);
        assert_eq!(parse_limit(Some("5")).unwrap(), 5);
        assert_eq!(parse_limit(Some("50000")).unwrap(), 1_000);
        assert!(parse_limit(Some("0")).is_err());
        assert!(parse_limit(Some("ten")).is_err());
    }
}
