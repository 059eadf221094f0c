//! Configuration for the control plane
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/switchyard/config.toml)
//! 3. Built-in defaults (lowest priority)

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP surface binds to
    pub bind_addr: SocketAddr,

    /// Search cluster base URL
    pub elasticsearch_url: String,

    /// API key for cluster authentication, if the cluster requires one
    pub elasticsearch_api_key: Option<String>,

    /// Alias queried when read-side requests omit one
    pub default_alias: String,

    /// Log level when RUST_LOG is unset: "trace", "debug", "info", "warn", "error"
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".parse().expect("static addr parses"),
            elasticsearch_url: "http://localhost:9200".to_string(),
            elasticsearch_api_key: None,
            default_alias: "products".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Config file structure (everything optional; unset fields fall through)
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    elasticsearch_url: Option<String>,
    elasticsearch_api_key: Option<String>,
    default_alias: Option<String>,
    log_level: Option<String>,
}

/// Environment overrides, read once so resolution stays a pure function.
#[derive(Debug, Default)]
struct EnvOverrides {
    port: Option<String>,
    elasticsearch_url: Option<String>,
    elasticsearch_api_key: Option<String>,
}

impl EnvOverrides {
    fn capture() -> Self {
        Self {
            port: std::env::var("PORT").ok(),
            elasticsearch_url: std::env::var("ELASTICSEARCH_URL").ok(),
            elasticsearch_api_key: std::env::var("ELASTICSEARCH_API_KEY").ok(),
        }
    }
}

impl Config {
    /// Path of the optional config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("switchyard").join("config.toml"))
    }

    /// Load configuration with env > file > defaults precedence.
    pub fn from_env() -> Self {
        let file = Self::load_file();
        Self::resolve(file, EnvOverrides::capture())
    }

    fn load_file() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return FileConfig::default();
        };

        match toml::from_str(&raw) {
            Ok(file) => file,
            Err(err) => {
                // Logging is not initialized yet when config loads
                eprintln!(
                    "warning: ignoring malformed config file {}: {}",
                    path.display(),
                    err
                );
                FileConfig::default()
            }
        }
    }

    fn resolve(file: FileConfig, env: EnvOverrides) -> Self {
        let defaults = Self::default();

        let port = env
            .port
            .and_then(|raw| raw.parse::<u16>().ok())
            .or(file.port)
            .unwrap_or_else(|| defaults.bind_addr.port());
        let bind_addr = SocketAddr::new(defaults.bind_addr.ip(), port);

        Self {
            bind_addr,
            elasticsearch_url: env
                .elasticsearch_url
                .or(file.elasticsearch_url)
                .unwrap_or(defaults.elasticsearch_url),
            elasticsearch_api_key: env.elasticsearch_api_key.or(file.elasticsearch_api_key),
            default_alias: file.default_alias.unwrap_or(defaults.default_alias),
            log_level: file.log_level.unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::resolve(FileConfig::default(), EnvOverrides::default());
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.elasticsearch_url, "http://localhost:9200");
        assert_eq!(config.default_alias, "products");
        assert!(config.elasticsearch_api_key.is_none());
    }

    #[test]
    fn test_env_beats_file() {
        let file = FileConfig {
            port: Some(4000),
            elasticsearch_url: Some("http://file:9200".to_string()),
            ..Default::default()
        };
        let env = EnvOverrides {
            port: Some("5000".to_string()),
            elasticsearch_url: Some("http://env:9200".to_string()),
            elasticsearch_api_key: None,
        };

        let config = Config::resolve(file, env);
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.elasticsearch_url, "http://env:9200");
    }

    #[test]
    fn test_file_fills_env_gaps() {
        let file = FileConfig {
            port: Some(4000),
            default_alias: Some("catalog".to_string()),
            ..Default::default()
        };

        let config = Config::resolve(file, EnvOverrides::default());
        assert_eq!(config.bind_addr.port(), 4000);
        assert_eq!(config.default_alias, "catalog");
    }

    #[test]
    fn test_unparseable_port_env_falls_through() {
        let env = EnvOverrides {
            port: Some("not-a-port".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(FileConfig::default(), env);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_file_config_parses() {
        let file: FileConfig = toml::from_str(
            r#"
            port = 8080
            elasticsearch_url = "http://search:9200"
            default_alias = "catalog"
            "#,
        )
        .unwrap();
        assert_eq!(file.port, Some(8080));
        assert_eq!(file.default_alias.as_deref(), Some("catalog"));
        assert!(file.log_level.is_none());
    }
}
