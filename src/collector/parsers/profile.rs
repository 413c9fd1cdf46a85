// src/collector/parsers/profile.rs
//! Multi-line stack blocks from `profile`.
//!
//! The tool prints one block per distinct stack: frames innermost first, then
//! a line naming the process, then the sample count on its own line:
//!
//! ```text
//! Sampling at 99 Hertz of all threads by user + kernel stack for 5 secs.
//!
//!     native_safe_halt
//!     default_idle
//!     -                swapper/0 (0)
//!         12
//!
//! ```
//!
//! Grammar, per trimmed line:
//! * blank or `Sampling…`: skipped; pending frames are kept.
//! * bare integer: sample count. The last pending frame is the process name
//!   and the frames before it form the stack. A count too large for `u64` is
//!   stored as 0 so the block still closes. A count with no pending frames is
//!   ignored.
//! * anything else: a stack frame, appended to the pending block.
//!
//! An incomplete block at end of stream is discarded.

use crate::collector::parser::{LineParser, is_bare_integer};
use crate::events::{CpuStackSample, SourceKind};

#[derive(Debug, Default)]
pub struct StackParser {
    frames: Vec<String>,
}

impl StackParser {
    fn complete(&mut self, sample_count: u64) -> Option<CpuStackSample> {
        let process_name = self.frames.pop()?;
        let sample = CpuStackSample {
            process_name,
            stack_trace: self.frames.join("\n"),
            sample_count,
        };
        self.frames.clear();
        Some(sample)
    }
}

impl LineParser for StackParser {
    type Event = CpuStackSample;
    const SOURCE: SourceKind = SourceKind::Profile;

    fn parse_line(&mut self, line: &str) -> Vec<CpuStackSample> {
        if line.is_empty() || line.starts_with("Sampling") {
            return Vec::new();
        }

        if is_bare_integer(line) {
            let count = line.parse::<u64>().unwrap_or(0);
            return self.complete(count).into_iter().collect();
        }

        self.frames.push(line.to_string());
        Vec::new()
    }

    fn finish(&mut self) -> Vec<CpuStackSample> {
        self.frames.clear();
        Vec::new()
    }
}
