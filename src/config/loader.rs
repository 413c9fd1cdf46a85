// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads the agent's TOML file, deserializes it into [`RawConfig`], applies
//! environment overrides and converts everything into the runtime [`Config`].

use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::config::model::{
    CollectorsConfig, CollectorsStub, Config, ConfigError, DatabaseConfig, DatabaseStub,
    MIN_DRAIN_INTERVAL, RawConfig, SourceConfig, SourceStub,
};
use crate::events::SourceKind;

/// Overrides the database file location.
pub const ENV_DB_PATH: &str = "BPF_AGENT_DB_PATH";
/// Overrides the log file location (and turns file logging on).
pub const ENV_LOG_FILE: &str = "BPF_AGENT_LOG_FILE";
/// Overrides the log level.
pub const ENV_LOG_LEVEL: &str = "BPF_AGENT_LOG_LEVEL";

const LEVELS: [&str; 6] = ["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Load, override from the process environment, and validate.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    log::debug!("Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let mut cfg = parse(&txt)?;
    apply_overrides(&mut cfg, |key| std::env::var(key).ok());
    validate(&cfg)?;
    log::info!("Loaded config from {:?}", path);
    Ok(cfg)
}

/// Parse TOML text into a runtime config (no environment, no validation).
pub fn parse(txt: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(txt)?;
    Ok(Config {
        logging:    raw.logging,
        database:   convert_database(raw.database)?,
        collectors: convert_collectors(raw.collectors)?,
    })
}

/// Apply `BPF_AGENT_*` overrides using `lookup` to read variables.
pub fn apply_overrides<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(path) = set(ENV_DB_PATH) {
        cfg.database.path = PathBuf::from(path);
    }
    if let Some(file) = set(ENV_LOG_FILE) {
        cfg.logging.enable = true;
        cfg.logging.file = Some(file);
    }
    if let Some(level) = set(ENV_LOG_LEVEL) {
        cfg.logging.level = level;
    }
}

/// Reject configurations the agent cannot run with.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if !LEVELS.contains(&cfg.logging.level.to_uppercase().as_str()) {
        return Err(ConfigError::InvalidLevel(cfg.logging.level.clone()));
    }
    if cfg.database.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("database.path cannot be empty".into()));
    }
    if cfg.collectors.buffer_capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    for source in &cfg.collectors.sources {
        if source.command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyCommand(source.kind));
        }
        if source.drain_interval < MIN_DRAIN_INTERVAL {
            return Err(ConfigError::Validation(format!(
                "collectors.{}.drain_interval must be at least {:?}",
                source.kind, MIN_DRAIN_INTERVAL
            )));
        }
    }
    Ok(())
}

fn parse_duration(txt: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(txt.trim())
        .map_err(|e| ConfigError::InvalidDuration(txt.to_string(), e))
}

fn convert_database(stub: DatabaseStub) -> Result<DatabaseConfig, ConfigError> {
    let ttl = parse_duration(&stub.ttl)?;
    Ok(DatabaseConfig {
        path:                PathBuf::from(stub.path),
        purge_on_restart:    stub.purge_on_restart,
        synchronous:         stub.synchronous,
        journal_size_limit:  stub.journal_size_limit,
        checkpoint_interval: parse_duration(&stub.checkpoint_interval)?,
        ttl:                 (!ttl.is_zero()).then_some(ttl),
        cleanup_interval:    parse_duration(&stub.cleanup_interval)?,
    })
}

fn convert_collectors(stub: CollectorsStub) -> Result<CollectorsConfig, ConfigError> {
    let sources = SourceKind::ALL
        .into_iter()
        .map(|kind| convert_source(kind, stub.stub(kind)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CollectorsConfig {
        buffer_capacity: stub.buffer_capacity,
        restart_on_exit: stub.restart_on_exit,
        sources,
    })
}

/// Merge one `[collectors.<source>]` table over the source defaults.
fn convert_source(kind: SourceKind, stub: Option<&SourceStub>) -> Result<SourceConfig, ConfigError> {
    let mut cfg = SourceConfig::defaults(kind);
    let Some(stub) = stub else { return Ok(cfg) };

    cfg.enabled = stub.enabled;
    if let Some(command) = &stub.command {
        cfg.command = command.clone();
    }
    if let Some(interval) = &stub.drain_interval {
        cfg.drain_interval = parse_duration(interval)?;
    }
    log::debug!(
        "Converted {} source: enabled={}, command={:?}, drain={:?}",
        kind,
        cfg.enabled,
        cfg.command,
        cfg.drain_interval
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.database, DatabaseConfig::default());
        assert_eq!(cfg.collectors, CollectorsConfig::default());
        assert_eq!(cfg.logging.level, "INFO");
        validate(&cfg).unwrap();
    }

    #[test]
    fn source_table_overrides_only_given_keys() {
        let cfg = parse(
            r#"
            [collectors.tcplife]
            drain_interval = "250ms"

            [collectors.profile]
            enabled = false
            command = ["profile", "-F", "49"]
            "#,
        )
        .unwrap();

        let tcplife = cfg.collectors.source(SourceKind::Tcplife).unwrap();
        assert_eq!(tcplife.drain_interval, Duration::from_millis(250));
        assert_eq!(tcplife.command, ["stdbuf", "-oL", "tcplife"]);

        let profile = cfg.collectors.source(SourceKind::Profile).unwrap();
        assert!(!profile.enabled);
        assert_eq!(profile.command, ["profile", "-F", "49"]);
        assert_eq!(cfg.collectors.enabled().count(), 5);
    }

    #[test]
    fn zero_ttl_disables_cleanup() {
        let cfg = parse("[database]\nttl = \"0s\"").unwrap();
        assert_eq!(cfg.database.ttl, None);
        let cfg = parse("[database]\nttl = \"2h\"").unwrap();
        assert_eq!(cfg.database.ttl, Some(Duration::from_secs(7200)));
    }

    #[test]
    fn bad_duration_is_reported() {
        let err = parse("[collectors.syscount]\ndrain_interval = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration(ref s, _) if s == "soon"), "{err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(parse("[collectors]\nbuffer = 3"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn validation_catches_empty_command_and_zero_capacity() {
        let mut cfg = parse("[collectors.execsnoop]\ncommand = []").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::EmptyCommand(SourceKind::Execsnoop))));

        cfg = parse("[collectors]\nbuffer_capacity = 0").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::ZeroCapacity)));

        cfg = parse("[collectors.biolatency]\ndrain_interval = \"10ms\"").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        cfg = parse("[logging]\nlevel = \"chatty\"").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::InvalidLevel(_))));
    }

    #[test]
    fn environment_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/var/lib/agent/metrics.db"),
            (ENV_LOG_FILE, "/var/log/agent.log"),
            (ENV_LOG_LEVEL, ""),
        ]);
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.database.path, PathBuf::from("/var/lib/agent/metrics.db"));
        assert!(cfg.logging.enable);
        assert_eq!(cfg.logging.file.as_deref(), Some("/var/log/agent.log"));
        assert_eq!(cfg.logging.level, "INFO", "blank values are ignored");
    }
}
