use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use larder_core::{Charset, CodeFormat, ProviderRegistry};

use crate::store::Backend;

pub const ENV_BACKEND: &str = "LARDER_BACKEND";
pub const ENV_DATA_DIR: &str = "LARDER_DATA_DIR";
pub const ENV_DATABASE_PATH: &str = "LARDER_DATABASE_PATH";

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Files,
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Files => write!(f, "files"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "files" => Ok(BackendKind::Files),
            "sqlite" => Ok(BackendKind::Sqlite),
            _ => Err(format!(
                "Invalid backend '{}'. Valid options: files, sqlite",
                s
            )),
        }
    }
}

/// A price provider known to this installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    /// Number of code slots the provider fills
    pub arity: usize,
    #[serde(default)]
    pub charset: Charset,
}

/// Storage configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub backend: ConfigValue<BackendKind>,
    /// Directory holding the collection files
    pub data_dir: ConfigValue<PathBuf>,
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Providers product codes are validated against
    pub providers: Vec<ProviderConfig>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    backend: Option<BackendKind>,
    data_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    providers: Vec<ProviderConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut backend = ConfigValue::new(BackendKind::Files, ConfigSource::Default);
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut database_path = None;
        let mut config_file = None;
        let mut providers = Vec::new();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Read(path.clone(), e))?;
            let file_config: ConfigFile = if contents.trim().is_empty() {
                ConfigFile::default()
            } else {
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?
            };

            if let Some(kind) = file_config.backend {
                backend = ConfigValue::new(kind, ConfigSource::File);
            }
            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve(&path, dir), ConfigSource::File);
            }
            if let Some(db_path) = file_config.database_path {
                database_path = Some(ConfigValue::new(
                    resolve(&path, db_path),
                    ConfigSource::File,
                ));
            }
            providers = file_config.providers;

            config_file = Some(path);
        }

        if let Some(value) = env(ENV_BACKEND) {
            let kind = value.parse().map_err(|message| ConfigError::InvalidEnv {
                name: ENV_BACKEND,
                message,
            })?;
            backend = ConfigValue::new(kind, ConfigSource::Environment);
        }
        if let Some(dir) = env(ENV_DATA_DIR) {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(db_path) = env(ENV_DATABASE_PATH) {
            database_path = Some(ConfigValue::new(
                PathBuf::from(db_path),
                ConfigSource::Environment,
            ));
        }

        // The database lives in the data directory unless placed explicitly
        let database_path = database_path.unwrap_or_else(|| {
            ConfigValue::new(data_dir.value.join("larder.db"), ConfigSource::Default)
        });

        Ok(Self {
            backend,
            data_dir,
            database_path,
            config_file,
            providers,
        })
    }

    /// Builds the provider registry shared by the stores.
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for provider in &self.providers {
            registry.register(
                CodeFormat::new(&provider.id, provider.arity).with_charset(provider.charset),
            );
        }
        registry
    }

    /// The backend selected by this configuration.
    pub fn backend(&self) -> Backend {
        match self.backend.value {
            BackendKind::Files => Backend::Files {
                data_dir: self.data_dir.value.clone(),
            },
            BackendKind::Sqlite => Backend::Sqlite {
                database_path: self.database_path.value.clone(),
            },
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/larder/
    /// - macOS: ~/Library/Application Support/larder/
    /// - Windows: %APPDATA%/larder/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("larder")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/larder/
    /// - macOS: ~/Library/Application Support/larder/
    /// - Windows: %APPDATA%/larder/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("larder")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|parent| parent.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid value in {name}: {message}")]
    InvalidEnv { name: &'static str, message: String },
}
