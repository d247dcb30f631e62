use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::TraversalLimits;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub critsvis: CritsvisConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Core storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CritsvisConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Relationship graph traversal limits
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Abort the request once this many nodes have been emitted.
    #[serde(default)]
    pub max_nodes: Option<usize>,
    /// Wall-clock budget for a single traversal.
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: None,
            time_budget_ms: None,
        }
    }
}

impl TraversalConfig {
    /// Limits handed to the traversal engine.
    pub fn limits(&self) -> TraversalLimits {
        TraversalLimits {
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
            time_budget: self.time_budget_ms.map(Duration::from_millis),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Environment variable holding an API key, mapped to the analyst that
    /// key authenticates as.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Accept requests without a key. Only then is the caller taken from the
    /// `X-Analyst` header or `default_analyst`.
    #[serde(default)]
    pub authless: bool,
    #[serde(default)]
    pub default_analyst: Option<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            api_keys: HashMap::new(),
            allowed_origins: Vec::new(),
            authless: false,
            default_analyst: None,
        }
    }
}

fn default_max_depth() -> usize {
    30
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_http_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in CRITSVIS_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("CRITSVIS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.critsvis.db_path.as_os_str().is_empty() {
            anyhow::bail!("critsvis.db_path must not be empty");
        }

        if self.traversal.max_depth == 0 {
            anyhow::bail!("traversal.max_depth must be at least 1");
        }

        if self.traversal.max_nodes == Some(0) {
            anyhow::bail!("traversal.max_nodes must be greater than 0 when set");
        }

        if self.traversal.time_budget_ms == Some(0) {
            anyhow::bail!("traversal.time_budget_ms must be greater than 0 when set");
        }

        if let Some((env_var, _)) = self.http_server.api_keys.iter().find(|(_, analyst)| analyst.trim().is_empty()) {
            anyhow::bail!("http_server.api_keys.{} must name an analyst", env_var);
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.critsvis.db_path
    }

    /// Get migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.critsvis.migrations_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[critsvis]
db_path = "./test.db"
"#;

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("CRITSVIS_CONFIG").ok();
        std::env::set_var("CRITSVIS_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("CRITSVIS_CONFIG");
        if let Some(val) = original {
            std::env::set_var("CRITSVIS_CONFIG", val);
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.traversal.max_depth, 30);
        assert_eq!(config.traversal.max_nodes, None);
        assert_eq!(config.critsvis.log_level, "info");
        assert_eq!(config.migrations_dir(), Path::new("migrations"));
        assert_eq!(config.http_server.port, 8080);
        assert!(config.http_server.api_keys.is_empty());
        assert!(!config.http_server.authless);
    }

    #[test]
    fn test_traversal_limits() {
        let config = Config::from_toml_str(
            r#"
[critsvis]
db_path = "./test.db"

[traversal]
max_depth = 4
max_nodes = 100
time_budget_ms = 250
"#,
        )
        .unwrap();
        let limits = config.traversal.limits();
        assert_eq!(limits.max_depth, 4);
        assert_eq!(limits.max_nodes, Some(100));
        assert_eq!(limits.time_budget, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = Config::from_toml_str(
            r#"
[critsvis]
db_path = "./test.db"

[traversal]
max_depth = 0
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("max_depth"));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = Config::from_toml_str(
            r#"
[critsvis]
db_path = "./test.db"

[traversal]
time_budget_ms = 0
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("time_budget_ms"));
    }

    #[test]
    fn test_api_key_without_analyst_rejected() {
        let err = Config::from_toml_str(
            r#"
[critsvis]
db_path = "./test.db"

[http_server.api_keys]
CRITSVIS_KEY_NOBODY = ""
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("CRITSVIS_KEY_NOBODY"));
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[critsvis]
db_path = "./vis.db"
log_level = "debug"

[http_server]
port = 9090
default_analyst = "analyst1"

[http_server.api_keys]
CRITSVIS_KEY_ALICE = "alice"
CRITSVIS_KEY_BOB = "bob"
"#,
        )
        .unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.critsvis.log_level, "debug");
            assert_eq!(config.http_server.port, 9090);
            assert_eq!(config.http_server.default_analyst.as_deref(), Some("analyst1"));
            assert_eq!(config.http_server.api_keys.len(), 2);
            assert_eq!(config.http_server.api_keys["CRITSVIS_KEY_BOB"], "bob");
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        with_config_env(&temp_dir.path().join("nonexistent.toml"), || {
            let config = Config::load();
            assert!(config.is_err());
        });
    }
}
