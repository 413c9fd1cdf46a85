// src/db/mod.rs
//! Public façade for DB helpers.
//!
//! Each event type knows its own table ([`BatchInsert`]); everything else
//! here is generic over that trait.

pub mod batch_inserts;
pub mod connection;
pub mod db_writer;
pub mod maintenance;

use thiserror::Error;

use crate::events::{
    CpuStackSample, DiskLatencyBucket, ProcessExecEvent, SyscallCountSample, TcpConnectEvent,
    TcpConnectionSummary,
};

pub use batch_inserts::{BatchInsert, Stored};
pub use connection::{db_path, init_database, open_db_connection};
pub use db_writer::{recent, save_batch};

/// Every telemetry table, in schema order.
pub const TABLES: [&str; 6] = [
    DiskLatencyBucket::TABLE,
    ProcessExecEvent::TABLE,
    CpuStackSample::TABLE,
    SyscallCountSample::TABLE,
    TcpConnectionSummary::TABLE,
    TcpConnectEvent::TABLE,
];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
