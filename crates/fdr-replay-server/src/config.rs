//! Server configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use fdr_replay::EngineConfig;

use crate::error::{Error, Result};

/// Configuration for a replay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// CSV export the telemetry store reads from
    pub data_path: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Evict sessions idle for this long (unset keeps them forever)
    pub idle_timeout: Option<Duration>,

    /// Ticks buffered per flight before slow viewers start skipping
    pub tick_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./fdr-data/records.csv"),
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            idle_timeout: None,
            tick_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// - `FDR_DATA_PATH`
    /// - `FDR_API_ADDR`
    /// - `FDR_IDLE_TIMEOUT_SECS`
    /// - `FDR_TICK_BUFFER`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("FDR_DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("FDR_API_ADDR") {
            config.api_addr = addr
                .trim()
                .parse()
                .map_err(|e| invalid("FDR_API_ADDR", &addr, e))?;
        }

        if let Some(secs) = lookup("FDR_IDLE_TIMEOUT_SECS").filter(|s| !s.trim().is_empty()) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| invalid("FDR_IDLE_TIMEOUT_SECS", &secs, e))?;
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(size) = lookup("FDR_TICK_BUFFER") {
            let parsed: usize = size
                .trim()
                .parse()
                .map_err(|e| invalid("FDR_TICK_BUFFER", &size, e))?;
            if parsed == 0 {
                return Err(invalid("FDR_TICK_BUFFER", &size, "must be at least 1"));
            }
            config.tick_buffer = parsed;
        }

        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            idle_timeout: self.idle_timeout,
            ..EngineConfig::default()
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Error {
    Error::Config {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_addr.port(), 8080);
        assert_eq!(config.tick_buffer, 256);
        assert!(config.idle_timeout.is_none());
        assert!(config.engine_config().idle_timeout.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("FDR_DATA_PATH", "/srv/fdr/export.csv"),
            ("FDR_API_ADDR", "127.0.0.1:9100"),
            ("FDR_IDLE_TIMEOUT_SECS", "600"),
            ("FDR_TICK_BUFFER", "32"),
        ]))
        .unwrap();

        assert_eq!(config.data_path, PathBuf::from("/srv/fdr/export.csv"));
        assert_eq!(config.api_addr, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.tick_buffer, 32);
        assert_eq!(
            config.engine_config().idle_timeout,
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn zero_idle_timeout_disables_eviction() {
        let config = ServerConfig::from_lookup(lookup(&[("FDR_IDLE_TIMEOUT_SECS", "0")])).unwrap();
        assert!(config.idle_timeout.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let err = ServerConfig::from_lookup(lookup(&[("FDR_API_ADDR", "nowhere")])).unwrap_err();
        assert!(err.to_string().contains("FDR_API_ADDR"));

        assert!(ServerConfig::from_lookup(lookup(&[("FDR_TICK_BUFFER", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("FDR_IDLE_TIMEOUT_SECS", "-5")])).is_err());
    }
}
