// src/collector/parsers/syscount.rs
//! `syscount -i N` tables.
//!
//! ```text
//! Tracing syscalls, printing top 10... Ctrl+C to quit.
//! [14:31:05]
//! SYSCALL                   COUNT
//! read                       2245
//! ```

use crate::collector::parser::LineParser;
use crate::events::{SourceKind, SyscallCountSample};

#[derive(Debug, Default)]
pub struct SyscallParser;

fn is_noise(line: &str) -> bool {
    line.is_empty()
        || line.starts_with("SYSCALL")
        || line.contains("Tracing")
        || line.starts_with('[')
}

impl LineParser for SyscallParser {
    type Event = SyscallCountSample;
    const SOURCE: SourceKind = SourceKind::Syscount;

    fn parse_line(&mut self, line: &str) -> Vec<SyscallCountSample> {
        if is_noise(line) {
            return Vec::new();
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(count)) = (fields.next(), fields.next()) else {
            return Vec::new();
        };
        match count.parse::<u64>() {
            Ok(count) => vec![SyscallCountSample { syscall_name: name.to_string(), count }],
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::parse_all;

    #[test]
    fn count_row() {
        assert_eq!(
            SyscallParser.parse_line("read 2245"),
            vec![SyscallCountSample { syscall_name: "read".into(), count: 2245 }]
        );
    }

    #[test]
    fn non_numeric_count_drops_the_line() {
        assert!(SyscallParser.parse_line("read notanumber").is_empty());
        assert!(SyscallParser.parse_line("read -3").is_empty());
    }

    #[test]
    fn interval_block() {
        let out = parse_all::<SyscallParser>(&[
            "Tracing syscalls, printing top 10... Ctrl+C to quit.",
            "[14:31:05]",
            "SYSCALL                   COUNT",
            "futex                      9120",
            "epoll_wait                  311",
            "",
            "Detaching...",
        ]);
        assert_eq!(
            out,
            vec![
                SyscallCountSample { syscall_name: "futex".into(), count: 9120 },
                SyscallCountSample { syscall_name: "epoll_wait".into(), count: 311 },
            ]
        );
    }
}
