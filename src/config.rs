use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
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

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Service account key file
    pub credentials_path: ConfigValue<Option<PathBuf>>,
    /// Realtime database URL
    pub database_url: ConfigValue<Option<String>>,
    /// Default root for realtime reads and writes
    pub root_path: ConfigValue<String>,
    /// Project id override for the document store
    pub project_id: ConfigValue<Option<String>>,
    /// Document store database id
    pub firestore_database: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Config file path that was looked up, whether or not it exists
    #[serde(skip)]
    pub searched_path: PathBuf,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    credentials_path: Option<PathBuf>,
    database_url: Option<String>,
    root_path: Option<String>,
    project_id: Option<String>,
    firestore_database: Option<String>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut credentials_path = ConfigValue::new(None, ConfigSource::Default);
        let mut database_url = ConfigValue::new(None, ConfigSource::Default);
        let mut root_path = ConfigValue::new("/".to_string(), ConfigSource::Default);
        let mut project_id = ConfigValue::new(None, ConfigSource::Default);
        let mut firestore_database = ConfigValue::new(
            fbkit_core::session::DEFAULT_FIRESTORE_DATABASE.to_string(),
            ConfigSource::Default,
        );
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(key_path) = file_config.credentials_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if key_path.is_relative() {
                    path.parent()
                        .map(|p| p.join(&key_path))
                        .unwrap_or(key_path)
                } else {
                    key_path
                };
                credentials_path = ConfigValue::new(Some(resolved_path), ConfigSource::File);
            }
            if let Some(url) = file_config.database_url {
                database_url = ConfigValue::new(Some(url), ConfigSource::File);
            }
            if let Some(root) = file_config.root_path {
                root_path = ConfigValue::new(root, ConfigSource::File);
            }
            if let Some(project) = file_config.project_id {
                project_id = ConfigValue::new(Some(project), ConfigSource::File);
            }
            if let Some(database) = file_config.firestore_database {
                firestore_database = ConfigValue::new(database, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Some(key_path) = std::env::var("FBKIT_CREDENTIALS")
            .or_else(|_| std::env::var("GOOGLE_APPLICATION_CREDENTIALS"))
            .ok()
        {
            credentials_path =
                ConfigValue::new(Some(PathBuf::from(key_path)), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("FBKIT_DATABASE_URL") {
            database_url = ConfigValue::new(Some(url), ConfigSource::Environment);
        }
        if let Ok(root) = std::env::var("FBKIT_ROOT_PATH") {
            root_path = ConfigValue::new(root, ConfigSource::Environment);
        }
        if let Ok(project) = std::env::var("FBKIT_PROJECT_ID") {
            project_id = ConfigValue::new(Some(project), ConfigSource::Environment);
        }

        Ok(Self {
            credentials_path,
            database_url,
            root_path,
            project_id,
            firestore_database,
            config_file,
            searched_path: path,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fbkit/
    /// - macOS: ~/Library/Application Support/fbkit/
    /// - Windows: %APPDATA%/fbkit/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fbkit")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(_, e) => Some(e),
            ConfigError::ParseError(_, e) => Some(e),
        }
    }
}
