// src/collector/parsers/biolatency.rs
//! `biolatency` histogram rows.
//!
//! ```text
//!      usecs               : count     distribution
//!          0 -> 1          : 0        |                                        |
//!          4 -> 7          : 10       |**                                      |
//! ```

use regex::Regex;
use std::sync::LazyLock;

use crate::collector::parser::LineParser;
use crate::events::{DiskLatencyBucket, SourceKind};

static BUCKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*->\s*(\d+)\s*:\s*(\d+)").expect("static histogram pattern")
});

#[derive(Debug, Default)]
pub struct HistogramParser;

impl LineParser for HistogramParser {
    type Event = DiskLatencyBucket;
    const SOURCE: SourceKind = SourceKind::Biolatency;

    fn parse_line(&mut self, line: &str) -> Vec<DiskLatencyBucket> {
        parse_bucket(line).into_iter().collect()
    }
}

fn parse_bucket(line: &str) -> Option<DiskLatencyBucket> {
    let caps = BUCKET.captures(line)?;
    Some(DiskLatencyBucket {
        range_min: caps[1].parse().ok()?,
        range_max: caps[2].parse().ok()?,
        count:     caps[3].parse().ok()?,
    })
}
