use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_base: String,
    pub credentials_path: PathBuf,
    pub log_path: PathBuf,
}

// On-disk shape of config.toml; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_base: Option<String>,
    credentials_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            credentials_path: data_dir.join("credentials.toml"),
            log_path: data_dir.join("teamboard.log"),
        }
    }
}

impl Config {
    /// Defaults, then `config.toml` from the user config dir, then the
    /// environment (`.env` included).
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = Config::default();
        if let Some(path) = config_file_path() {
            if path.exists() {
                config.apply_file(&path)?;
            }
        }
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(api_base) = file.api_base {
            self.api_base = api_base;
        }
        if let Some(credentials_path) = file.credentials_path {
            self.credentials_path = credentials_path;
        }
        if let Some(log_path) = file.log_path {
            self.log_path = log_path;
        }
        self.normalize();
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = var("TEAMBOARD_API_BASE").filter(|v| !v.is_empty()) {
            self.api_base = api_base;
        }
        if let Some(path) = var("TEAMBOARD_CREDENTIALS").filter(|v| !v.is_empty()) {
            self.credentials_path = PathBuf::from(path);
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        self.api_base = self.api_base.trim_end_matches('/').to_string();
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("teamboard")
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("teamboard").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_and_trims() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "TEAMBOARD_API_BASE" => Some("https://boards.example.com/".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base, "https://boards.example.com");
        assert_eq!(config.credentials_path, Config::default().credentials_path);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_file_values_apply() {
        let dir = env::temp_dir().join(format!("teamboard-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(
            &path,
            "api_base = \"http://10.0.0.2:8000/\"\nlog_path = \"/tmp/tb.log\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.api_base, "http://10.0.0.2:8000");
        assert_eq!(config.log_path, PathBuf::from("/tmp/tb.log"));

        fs::write(&path, "api_base = [").unwrap();
        assert!(matches!(
            Config::default().apply_file(&path),
            Err(ConfigError::Parse { .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
