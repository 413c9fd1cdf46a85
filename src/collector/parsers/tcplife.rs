// src/collector/parsers/tcplife.rs
//! `tcplife` session summaries.
//!
//! ```text
//! PID   COMM       LADDR           LPORT RADDR           RPORT TX_KB RX_KB MS
//! 22597 Socket Thread 10.0.2.15   43312 93.184.216.34   443      1     4 120.55
//! ```
//!
//! COMM may contain spaces, so the row is read from the right: the trailing
//! seven columns have fixed meaning and everything between the PID and LADDR
//! is glued back together as the command name. Numeric columns that fail to
//! parse are stored as zero.

use crate::collector::parser::LineParser;
use crate::events::{SourceKind, TcpConnectionSummary};

const MIN_FIELDS: usize = 9;
const FIXED_TAIL: usize = 7;

#[derive(Debug, Default)]
pub struct TcpLifeParser;

impl LineParser for TcpLifeParser {
    type Event = TcpConnectionSummary;
    const SOURCE: SourceKind = SourceKind::Tcplife;

    fn parse_line(&mut self, line: &str) -> Vec<TcpConnectionSummary> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let n = fields.len();
        if n < MIN_FIELDS || fields[0] == "PID" {
            return Vec::new();
        }

        vec![TcpConnectionSummary {
            pid:         fields[0].parse().unwrap_or_default(),
            comm:        fields[1..n - FIXED_TAIL].join(" "),
            local_addr:  fields[n - 7].to_string(),
            local_port:  fields[n - 6].parse().unwrap_or_default(),
            remote_addr: fields[n - 5].to_string(),
            remote_port: fields[n - 4].parse().unwrap_or_default(),
            tx_kb:       fields[n - 3].parse().unwrap_or_default(),
            rx_kb:       fields[n - 2].parse().unwrap_or_default(),
            duration_ms: fields[n - 1].parse().unwrap_or_default(),
        }]
    }
}
