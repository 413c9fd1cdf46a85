// src/events.rs
//! Typed telemetry model produced by the collectors.
//!
//! Every tracing tool we supervise prints its own text format; the parsers in
//! [`crate::collector::parsers`] turn those lines into the plain values below.
//! An event owns all of its data and is never mutated after it leaves a
//! parser, so it can be buffered, drained and persisted without any link back
//! to the process that produced it.
//!
//! ## Sources
//! | Source        | Tool          | Event                    |
//! |---------------|---------------|--------------------------|
//! | disk latency  | `biolatency`  | [`DiskLatencyBucket`]    |
//! | process exec  | `execsnoop`   | [`ProcessExecEvent`]     |
//! | CPU stacks    | `profile`     | [`CpuStackSample`]       |
//! | syscalls      | `syscount`    | [`SyscallCountSample`]   |
//! | TCP lifetimes | `tcplife`     | [`TcpConnectionSummary`] |
//! | TCP connects  | `tcpconnect`  | [`TcpConnectEvent`]      |

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One histogram row of block I/O latency (microsecond buckets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskLatencyBucket {
    pub range_min: u64,
    pub range_max: u64,
    pub count:     u64,
}

/// A process `exec()` as reported by `execsnoop -T`.
///
/// Fields stay textual: the tool's columns are stored as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExecEvent {
    pub time: String,
    pub pid:  String,
    pub comm: String,
    pub args: String,
}

/// One sampled kernel/user stack with the number of times it was seen.
///
/// `stack_trace` holds the frames in the order the tool printed them,
/// joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStackSample {
    pub process_name: String,
    pub stack_trace:  String,
    pub sample_count: u64,
}

/// Per-interval count for a single system call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyscallCountSample {
    pub syscall_name: String,
    pub count:        u64,
}

/// Summary of a closed TCP session as printed by `tcplife`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpConnectionSummary {
    pub pid:         u32,
    pub comm:        String,
    pub local_addr:  String,
    pub local_port:  u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub tx_kb:       f64,
    pub rx_kb:       f64,
    pub duration_ms: f64,
}

/// An active TCP `connect()` as printed by `tcpconnect`.
///
/// The tool does not print a source port in its default layout, so none is
/// carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpConnectEvent {
    pub pid:         String,
    pub comm:        String,
    pub ip_version:  String,
    pub source_addr: String,
    pub dest_addr:   String,
    pub dest_port:   String,
}

/// Identifies one telemetry source (and therefore one collector + table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Biolatency,
    Execsnoop,
    Profile,
    Syscount,
    Tcplife,
    Tcpconnect,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Biolatency,
        SourceKind::Execsnoop,
        SourceKind::Profile,
        SourceKind::Syscount,
        SourceKind::Tcplife,
        SourceKind::Tcpconnect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Biolatency => "biolatency",
            SourceKind::Execsnoop  => "execsnoop",
            SourceKind::Profile    => "profile",
            SourceKind::Syscount   => "syscount",
            SourceKind::Tcplife    => "tcplife",
            SourceKind::Tcpconnect => "tcpconnect",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("TCPLife".parse::<SourceKind>(), Ok(SourceKind::Tcplife));
        assert!("nope".parse::<SourceKind>().is_err());
    }

    #[test]
    fn events_serialize_with_snake_case_fields() {
        let ev = SyscallCountSample { syscall_name: "read".into(), count: 7 };
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"syscall_name":"read","count":7}"#);
    }
}
