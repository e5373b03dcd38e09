use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// Seconds between counter audits. Zero disables the auditor.
    pub audit_interval_secs: u64,
    pub audit_repair: bool,
    pub bootstrap_admin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://course_portal.db".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_connections: 5,
            audit_interval_secs: 300,
            audit_repair: false,
            bootstrap_admin: None,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a local `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: parse_var(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            audit_interval_secs: parse_var(&lookup, "AUDIT_INTERVAL_SECS")?
                .unwrap_or(defaults.audit_interval_secs),
            audit_repair: parse_var(&lookup, "AUDIT_REPAIR")?.unwrap_or(defaults.audit_repair),
            bootstrap_admin: lookup("BOOTSTRAP_ADMIN").filter(|s| !s.trim().is_empty()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).expect("defaults should load");
        assert_eq!(config.database_url, "sqlite://course_portal.db");
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.audit_interval_secs, 300);
        assert!(!config.audit_repair);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("AUDIT_INTERVAL_SECS", "0"),
            ("AUDIT_REPAIR", "true"),
            ("BOOTSTRAP_ADMIN", "root"),
        ]))
        .expect("config should load");

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.audit_interval_secs, 0);
        assert!(config.audit_repair);
        assert_eq!(config.bootstrap_admin.as_deref(), Some("root"));
    }

    #[test]
    fn test_invalid_value_names_variable() {
        let err = Config::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "many")]))
            .expect_err("non-numeric pool size must fail");
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }
}
