//! One grammar per tracing tool.

pub mod biolatency;
pub mod execsnoop;
pub mod profile;
pub mod syscount;
pub mod tcpconnect;
pub mod tcplife;

pub use biolatency::HistogramParser;
pub use execsnoop::ExecParser;
pub use profile::StackParser;
pub use syscount::SyscallParser;
pub use tcpconnect::TcpConnectParser;
pub use tcplife::TcpLifeParser;
