//! Collector subsystem
//! ===================
//! One [`Collector`] per tracing tool. Each owns:
//!   • a [`SupervisedProcess`] (the tool, spawned by [`ProcessSupervisor`]),
//!   • a reader task feeding stdout line by line to a [`LineParser`],
//!   • an [`EventBuffer`] the periodic drain cycle empties.
//!
//! The six sources differ only in their grammar, so a single generic
//! `Collector<P>` covers them all; the aliases below name each instance.

pub mod buffer;
#[allow(clippy::module_inception)]
pub mod collector;
pub mod parser;
pub mod parsers;
pub mod supervisor;

use thiserror::Error;

pub use buffer::EventBuffer;
pub use collector::{Collector, CollectorState, Lifecycle};
pub use parser::LineParser;
pub use supervisor::{CommandSpec, ProcessSupervisor, SupervisedProcess};

use parsers::{
    ExecParser, HistogramParser, StackParser, SyscallParser, TcpConnectParser, TcpLifeParser,
};

pub type DiskLatencyCollector = Collector<HistogramParser>;
pub type ProcessExecCollector = Collector<ExecParser>;
pub type CpuProfileCollector = Collector<StackParser>;
pub type SyscallCollector = Collector<SyscallParser>;
pub type TcpLifeCollector = Collector<TcpLifeParser>;
pub type TcpConnectCollector = Collector<TcpConnectParser>;

/// Errors returned by [`Collector::start`]. The collector stays Idle.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The tool could not be executed.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source:  std::io::Error,
    },

    /// The tool started but its stdout could not be attached.
    #[error("no stdout pipe for '{program}'")]
    MissingStdout { program: String },
}
