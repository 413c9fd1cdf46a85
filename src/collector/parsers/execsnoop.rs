// src/collector/parsers/execsnoop.rs
//! `execsnoop -T` rows.
//!
//! ```text
//! TIME     PCOMM            PID     PPID    RET ARGS
//! 14:02:11 bash             41530   41525     0 /bin/ls --color=auto
//! ```
//!
//! Columns 3 (PPID) and 4 (RET) are not carried into the event.

use crate::collector::parser::LineParser;
use crate::events::{ProcessExecEvent, SourceKind};

const MIN_FIELDS: usize = 5;
const ARGS_FROM: usize = 5;

#[derive(Debug, Default)]
pub struct ExecParser {
    header_seen: bool,
}

impl LineParser for ExecParser {
    type Event = ProcessExecEvent;
    const SOURCE: SourceKind = SourceKind::Execsnoop;

    fn parse_line(&mut self, line: &str) -> Vec<ProcessExecEvent> {
        // The very first line is the column header, whatever it contains.
        if !std::mem::replace(&mut self.header_seen, true) {
            return Vec::new();
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Vec::new();
        }

        vec![ProcessExecEvent {
            time: fields[0].to_string(),
            comm: fields[1].to_string(),
            pid:  fields[2].to_string(),
            args: fields[ARGS_FROM.min(fields.len())..].join(" "),
        }]
    }
}
