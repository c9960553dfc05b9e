//! Layered configuration for the resolution pipeline.
//!
//! Sources, later layers winning:
//! - built-in defaults
//! - `.caretnav/settings.toml` (searched from the current directory upward)
//! - environment variables prefixed `CARETNAV_`, with double underscores
//!   separating nested levels: `CARETNAV_RESOLVER__TIMEOUT_MS=750` sets
//!   `resolver.timeout_ms`, `CARETNAV_CONNECTION__HOST=dev` sets
//!   `connection.host`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::types::{ConnectionContext, Credentials};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Resolution server connection.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Remote lookup tuning.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Logging levels.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where (and as whom) to reach the resolution server. Every field except
/// the flags is optional: an incomplete connection quietly disables remote
/// lookups rather than erroring.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    /// Master switch; `false` disables remote resolution entirely.
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Server-side namespace the documents resolve under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Use https for the resolution endpoint.
    #[serde(default = "default_false")]
    pub tls: bool,

    /// URL path prefix in front of the API base path, for servers mounted
    /// behind a reverse proxy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolverConfig {
    /// Wall-clock budget for one network attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per lookup; only timeouts consume extra attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `resolver = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_timeout_ms() -> u64 {
    500
}
fn default_max_attempts() -> u32 {
    2
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            active: true,
            host: None,
            port: None,
            namespace: None,
            username: None,
            password: None,
            tls: false,
            path_prefix: None,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl ConnectionConfig {
    /// Derive the per-call connection context the resolvers consume.
    pub fn to_context(&self) -> ConnectionContext {
        let credentials = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        ConnectionContext {
            active: self.active,
            namespace: self.namespace.clone(),
            host: self.host.clone(),
            port: self.port,
            tls: self.tls,
            path_prefix: self.path_prefix.clone(),
            credentials,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| PathBuf::from(".caretnav/settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still layering defaults
    /// underneath and environment variables on top.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CARETNAV_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace settings file by walking ancestors for a
    /// `.caretnav` directory.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".caretnav");
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }
        None
    }

    /// Save the configuration to a file, creating parent directories.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        std::fs::write(path, rendered)?;
        Ok(())
    }

    /// Write a default settings file at `.caretnav/settings.toml`.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(".caretnav/settings.toml");
        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_the_resolution_contract() {
        let settings = Settings::default();
        assert_eq!(settings.resolver.timeout_ms, 500);
        assert_eq!(settings.resolver.max_attempts, 2);
        assert!(settings.connection.active);
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        std::fs::write(
            &config_path,
            r#"
[connection]
host = "devbox"
port = 52773
namespace = "USER"
username = "dev"
password = "dev"

[resolver]
timeout_ms = 750
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.connection.host.as_deref(), Some("devbox"));
        assert_eq!(settings.resolver.timeout_ms, 750);
        // Untouched fields keep their defaults
        assert_eq!(settings.resolver.max_attempts, 2);
    }

    #[test]
    fn context_requires_both_credential_halves() {
        let mut config = ConnectionConfig {
            host: Some("h".into()),
            port: Some(1),
            namespace: Some("NS".into()),
            username: Some("u".into()),
            password: None,
            ..ConnectionConfig::default()
        };
        assert!(!config.to_context().has_credentials());

        config.password = Some("p".into());
        let context = config.to_context();
        assert!(context.has_credentials());
        assert!(context.is_complete());
    }

    #[test]
    fn save_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".caretnav/settings.toml");

        let mut settings = Settings::default();
        settings.connection.host = Some("devbox".into());
        settings.save(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.connection.host.as_deref(), Some("devbox"));
    }
}
