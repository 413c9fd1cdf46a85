// src/collector/parser.rs

use crate::events::SourceKind;

/// Per-source grammar turning tool output into events.
///
/// A fresh parser is built for every run of the tool (`Default`), so any
/// header-skipping or block state starts over with the new process.
///
/// Lines are handed over already trimmed. Lines that do not fit the grammar
/// are skipped without error: the tools interleave headers and diagnostics
/// with their data.
pub trait LineParser: Default + Send + 'static {
    type Event: Send + 'static;

    /// Which tool this grammar understands.
    const SOURCE: SourceKind;

    /// Consume one line, returning the events it completes (often none).
    fn parse_line(&mut self, line: &str) -> Vec<Self::Event>;

    /// End of stream. Incomplete state is discarded by default.
    fn finish(&mut self) -> Vec<Self::Event> {
        Vec::new()
    }
}

/// `true` for a non-empty, all-ASCII-digit line.
pub(crate) fn is_bare_integer(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

/// Feed a whole transcript through a parser; test helper.
#[cfg(test)]
pub(crate) fn parse_all<P: LineParser>(lines: &[&str]) -> Vec<P::Event> {
    let mut parser = P::default();
    let mut out: Vec<P::Event> = lines
        .iter()
        .flat_map(|line| parser.parse_line(line.trim()))
        .collect();
    out.extend(parser.finish());
    out
}
