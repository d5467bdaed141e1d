use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_BASE_URL: &str = "https://datasets.imdbws.com/";

/// Pipeline configuration, loaded once at startup and passed by reference
/// into the components that need it. Values come from ~/.screenrank/config.toml
/// when present, overridden by SCREENRANK_* environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file. Falls back to ~/.screenrank/screenrank.db when unset.
    pub database: Option<PathBuf>,
    /// Working directory for downloaded dataset files.
    pub data_dir: PathBuf,
    /// Base URL the four dataset files are fetched from.
    pub base_url: String,
    /// Records per load transaction.
    pub batch_size: usize,
    /// Per-request network timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for opening the database at pipeline startup.
    pub max_retries: u32,
    /// Default page size for query commands.
    pub default_limit: usize,
    /// Hard cap on page size.
    pub max_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".screenrank").join("data"))
            .unwrap_or_else(|| PathBuf::from("data"));
        Config {
            database: None,
            data_dir,
            base_url: DEFAULT_BASE_URL.to_string(),
            batch_size: 500,
            timeout_secs: 30,
            max_retries: 3,
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

impl Config {
    /// Load config from the given path (or ~/.screenrank/config.toml),
    /// apply environment overrides, and validate. A missing file yields
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    // SCREENRANK_DB is handled by the CLI layer, not here.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_string("SCREENRANK_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("SCREENRANK_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env_parsed("SCREENRANK_BATCH_SIZE") {
            self.batch_size = v;
        }
        if let Some(v) = env_parsed("SCREENRANK_TIMEOUT_SECS") {
            self.timeout_secs = v;
        }
        if let Some(v) = env_parsed("SCREENRANK_MAX_RETRIES") {
            self.max_retries = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.batch_size == 0 {
            errors.push("batch_size must be positive".to_string());
        }
        if self.base_url.is_empty() {
            errors.push("base_url must not be empty".to_string());
        }
        if self.default_limit > self.max_limit {
            errors.push(format!(
                "default_limit ({}) cannot exceed max_limit ({})",
                self.default_limit, self.max_limit
            ));
        }
        if self.max_limit == 0 {
            errors.push("max_limit must be positive".to_string());
        }

        if !errors.is_empty() {
            bail!("Invalid configuration:\n  {}", errors.join("\n  "));
        }
        Ok(())
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}

/// Path to the config file: ~/.screenrank/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".screenrank").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn limit_inversion_rejected() {
        let config = Config {
            default_limit: 2000,
            max_limit: 1000,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn page_limit_clamps_to_max() {
        let config = Config::default();
        assert_eq!(config.page_limit(None), config.default_limit);
        assert_eq!(config.page_limit(Some(50)), 50);
        assert_eq!(config.page_limit(Some(10_000)), config.max_limit);
    }
}
