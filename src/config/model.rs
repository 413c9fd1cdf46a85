// src/config/model.rs

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

use crate::events::SourceKind;

/// Default capacity of every collector's event buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;
/// Drain intervals below this are rejected.
pub const MIN_DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// Top-level runtime config
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub logging:    LoggingConfig,
    pub database:   DatabaseConfig,
    pub collectors: CollectorsConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]            pub enable: bool,
    #[serde(default)]            pub file:   Option<String>,
    #[serde(default = "default_level")] pub level: String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

impl LoggingConfig {
    pub fn file_path(&self) -> PathBuf {
        PathBuf::from(self.file.as_deref().unwrap_or("logs/agent.log"))
    }
}

/// Fully-typed `[database]` table
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path:                PathBuf,
    pub purge_on_restart:    bool,
    pub synchronous:         String,
    pub journal_size_limit:  u64,
    pub checkpoint_interval: Duration,
    /// `None` disables TTL cleanup.
    pub ttl:                 Option<Duration>,
    pub cleanup_interval:    Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path:                PathBuf::from("metrics.db"),
            purge_on_restart:    false,
            synchronous:         "NORMAL".into(),
            journal_size_limit:  50_000_000,
            checkpoint_interval: Duration::from_secs(300),
            ttl:                 None,
            cleanup_interval:    Duration::from_secs(60),
        }
    }
}

/// Fully-typed `[collectors]` table
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorsConfig {
    pub buffer_capacity: usize,
    pub restart_on_exit: bool,
    pub sources:         Vec<SourceConfig>,
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            restart_on_exit: false,
            sources:         SourceKind::ALL.into_iter().map(SourceConfig::defaults).collect(),
        }
    }
}

impl CollectorsConfig {
    pub fn source(&self, kind: SourceKind) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.kind == kind)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// How one tracing tool is launched and drained.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub kind:           SourceKind,
    pub enabled:        bool,
    /// argv; element 0 is the program.
    pub command:        Vec<String>,
    pub drain_interval: Duration,
}

impl SourceConfig {
    /// Invocation and drain period used when the config file says nothing.
    pub fn defaults(kind: SourceKind) -> Self {
        let (argv, secs): (&[&str], u64) = match kind {
            SourceKind::Biolatency => (&["sudo", "biolatency", "1"], 5),
            SourceKind::Execsnoop  => (&["execsnoop", "-T"], 1),
            SourceKind::Profile    => (&["sudo", "profile-bpfcc", "-F", "99", "5"], 5),
            SourceKind::Syscount   => (&["sudo", "syscount-bpfcc", "-i", "5"], 5),
            SourceKind::Tcplife    => (&["stdbuf", "-oL", "tcplife"], 1),
            SourceKind::Tcpconnect => (&["stdbuf", "-oL", "tcpconnect"], 1),
        };
        Self {
            kind,
            enabled: true,
            command: argv.iter().map(|s| s.to_string()).collect(),
            drain_interval: Duration::from_secs(secs),
        }
    }
}

// ───── raw TOML mirrors ─────────────────────────────────────────────────────

/// Whole file as deserialized from TOML; every table is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub logging:    LoggingConfig,
    pub database:   DatabaseStub,
    pub collectors: CollectorsStub,
}

/// Holds the raw `[database]` entries; durations are humantime strings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseStub {
    pub path:                String,
    pub purge_on_restart:    bool,
    pub synchronous:         String,
    pub journal_size_limit:  u64,
    pub checkpoint_interval: String,
    pub ttl:                 String,
    pub cleanup_interval:    String,
}

impl Default for DatabaseStub {
    fn default() -> Self {
        Self {
            path:                "metrics.db".into(),
            purge_on_restart:    false,
            synchronous:         "NORMAL".into(),
            journal_size_limit:  50_000_000,
            checkpoint_interval: "5m".into(),
            ttl:                 "0s".into(),
            cleanup_interval:    "1m".into(),
        }
    }
}

/// Holds the raw `[collectors]` entries
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorsStub {
    pub buffer_capacity: usize,
    pub restart_on_exit: bool,
    pub biolatency:      Option<SourceStub>,
    pub execsnoop:       Option<SourceStub>,
    pub profile:         Option<SourceStub>,
    pub syscount:        Option<SourceStub>,
    pub tcplife:         Option<SourceStub>,
    pub tcpconnect:      Option<SourceStub>,
}

impl Default for CollectorsStub {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            restart_on_exit: false,
            biolatency:      None,
            execsnoop:       None,
            profile:         None,
            syscount:        None,
            tcplife:         None,
            tcpconnect:      None,
        }
    }
}

impl CollectorsStub {
    pub fn stub(&self, kind: SourceKind) -> Option<&SourceStub> {
        match kind {
            SourceKind::Biolatency => self.biolatency.as_ref(),
            SourceKind::Execsnoop  => self.execsnoop.as_ref(),
            SourceKind::Profile    => self.profile.as_ref(),
            SourceKind::Syscount   => self.syscount.as_ref(),
            SourceKind::Tcplife    => self.tcplife.as_ref(),
            SourceKind::Tcpconnect => self.tcpconnect.as_ref(),
        }
    }
}

/// One `[collectors.<source>]` table; omitted keys keep the source defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceStub {
    #[serde(default = "enabled_by_default")]
    pub enabled:        bool,
    #[serde(default)]
    pub command:        Option<Vec<String>>,
    #[serde(default)]
    pub drain_interval: Option<String>,
}
fn enabled_by_default() -> bool { true }

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("collector '{0}' has an empty command")]
    EmptyCommand(SourceKind),

    #[error("collectors.buffer_capacity must be greater than zero")]
    ZeroCapacity,

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_source_once() {
        let cfg = CollectorsConfig::default();
        assert_eq!(cfg.sources.len(), SourceKind::ALL.len());
        for kind in SourceKind::ALL {
            assert!(cfg.source(kind).is_some(), "missing {kind}");
        }
    }

    #[test]
    fn high_frequency_sources_drain_every_second() {
        let fast = [SourceKind::Execsnoop, SourceKind::Tcplife, SourceKind::Tcpconnect];
        for kind in SourceKind::ALL {
            let expected = if fast.contains(&kind) { 1 } else { 5 };
            assert_eq!(
                SourceConfig::defaults(kind).drain_interval,
                Duration::from_secs(expected),
                "{kind}"
            );
        }
    }

    #[test]
    fn profile_default_command_samples_at_99hz() {
        let cfg = SourceConfig::defaults(SourceKind::Profile);
        assert_eq!(cfg.command, ["sudo", "profile-bpfcc", "-F", "99", "5"]);
    }
}
