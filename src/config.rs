//! Runtime configuration, environment-driven with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_ROOTSERVER_URL: &str =
    "https://tomato.bmltenabled.org/main_server/api/v1/rootservers/";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub rootserver_url: String,
    pub data_dir: PathBuf,
    pub collect_interval_secs: u64,
    pub per_source: bool,
    pub fetch_timeout: Duration,
    pub debug_routes: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:8000")
            .parse()
            .context("BIND_ADDR must be a socket address")?;
        let collect_interval_secs = env_or("COLLECT_INTERVAL_SECS", "86400")
            .parse()
            .context("COLLECT_INTERVAL_SECS must be an integer")?;
        let fetch_timeout_secs: u64 = env_or("FETCH_TIMEOUT_SECS", "30")
            .parse()
            .context("FETCH_TIMEOUT_SECS must be an integer")?;

        Ok(Self {
            bind_addr,
            rootserver_url: env_or("ROOTSERVER_URL", DEFAULT_ROOTSERVER_URL),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            collect_interval_secs,
            per_source: env_flag("COLLECT_PER_SOURCE", true),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            debug_routes: env_flag("DEBUG_ROUTES", false),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("1") => true,
        Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn defaults_apply_when_env_is_unset() {
        for key in [
            "BIND_ADDR",
            "ROOTSERVER_URL",
            "DATA_DIR",
            "COLLECT_INTERVAL_SECS",
            "COLLECT_PER_SOURCE",
            "FETCH_TIMEOUT_SECS",
            "DEBUG_ROUTES",
        ] {
            env::remove_var(key);
        }

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert_eq!(cfg.rootserver_url, DEFAULT_ROOTSERVER_URL);
        assert_eq!(cfg.collect_interval_secs, 86_400);
        assert!(cfg.per_source);
        assert!(!cfg.debug_routes);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_take_precedence() {
        env::set_var("ROOTSERVER_URL", "http://localhost:9000/rootservers/");
        env::set_var("COLLECT_PER_SOURCE", "0");
        env::set_var("COLLECT_INTERVAL_SECS", "3600");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.rootserver_url, "http://localhost:9000/rootservers/");
        assert!(!cfg.per_source);
        assert_eq!(cfg.collect_interval_secs, 3600);

        env::remove_var("ROOTSERVER_URL");
        env::remove_var("COLLECT_PER_SOURCE");
        env::remove_var("COLLECT_INTERVAL_SECS");
    }

    #[serial_test::serial]
    #[test]
    fn malformed_values_are_rejected() {
        env::set_var("COLLECT_INTERVAL_SECS", "daily");
        assert!(Config::from_env().is_err());
        env::remove_var("COLLECT_INTERVAL_SECS");
    }
}
