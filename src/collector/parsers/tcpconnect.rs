// src/collector/parsers/tcpconnect.rs
//! `tcpconnect` rows.
//!
//! ```text
//! PID     COMM         IP SADDR            DADDR            DPORT
//! 1479    telnet       4  127.0.0.1        127.0.0.1        23
//! ```
//!
//! The default layout has no source port column, so the event has none.

use crate::collector::parser::LineParser;
use crate::events::{SourceKind, TcpConnectEvent};

const MIN_FIELDS: usize = 6;

#[derive(Debug, Default)]
pub struct TcpConnectParser {
    header_seen: bool,
}

impl LineParser for TcpConnectParser {
    type Event = TcpConnectEvent;
    const SOURCE: SourceKind = SourceKind::Tcpconnect;

    fn parse_line(&mut self, line: &str) -> Vec<TcpConnectEvent> {
        if !std::mem::replace(&mut self.header_seen, true) || line.is_empty() {
            return Vec::new();
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Vec::new();
        }

        vec![TcpConnectEvent {
            pid:         fields[0].to_string(),
            comm:        fields[1].to_string(),
            ip_version:  format!("IPv{}", fields[2]),
            source_addr: fields[3].to_string(),
            dest_addr:   fields[4].to_string(),
            dest_port:   fields[5].to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::parse_all;

    #[test]
    fn rows_after_header() {
        let out = parse_all::<TcpConnectParser>(&[
            "PID     COMM         IP SADDR            DADDR            DPORT",
            "1479    telnet       4  127.0.0.1        127.0.0.1        23",
            "",
            "1500    curl         6  ::1              ::1              8080",
        ]);
        assert_eq!(
            out,
            vec![
                TcpConnectEvent {
                    pid:         "1479".into(),
                    comm:        "telnet".into(),
                    ip_version:  "IPv4".into(),
                    source_addr: "127.0.0.1".into(),
                    dest_addr:   "127.0.0.1".into(),
                    dest_port:   "23".into(),
                },
                TcpConnectEvent {
                    pid:         "1500".into(),
                    comm:        "curl".into(),
                    ip_version:  "IPv6".into(),
                    source_addr: "::1".into(),
                    dest_addr:   "::1".into(),
                    dest_port:   "8080".into(),
                },
            ]
        );
    }

    #[test]
    fn short_rows_are_ignored() {
        let out = parse_all::<TcpConnectParser>(&["PID COMM IP SADDR DADDR DPORT", "1479 telnet 4 127.0.0.1 127.0.0.1"]);
        assert!(out.is_empty());
    }
}
