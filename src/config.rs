use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;
use crate::intake::DEFAULT_EXTENSIONS;
use crate::selection::UserSelection;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "SUBTITLE_CLIENT_CONFIG";

/// Configuration for the subtitle client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings
    pub backend: BackendConfig,

    /// File selection rules
    pub intake: IntakeConfig,

    /// Initial language, format and translate choice
    pub selection: UserSelection,

    /// Where downloaded subtitle files land
    pub output: OutputConfig,

    /// Log filter settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin every request is sent to
    pub base_url: String,

    /// Whole-request timeout in seconds. None leaves it to the transport.
    pub request_timeout_seconds: Option<u64>,

    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Accepted media file extensions
    pub allowed_extensions: Vec<String>,

    /// Maximum file size in bytes (0 = no limit)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory downloaded subtitle files are written to
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, overridden by RUST_LOG
    pub level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_seconds: None,
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            max_file_size: 0, // No limit
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./subtitles"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config_paths: Vec<PathBuf> = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            config_paths.push(PathBuf::from(path));
        }
        config_paths.push(PathBuf::from("subtitle-client.toml"));
        config_paths.push(PathBuf::from("config/subtitle-client.toml"));

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Load configuration from one file, failing if it is missing or invalid
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env_overrides();
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SUBTITLE_CLIENT_BACKEND_URL") {
            self.backend.base_url = url;
        }

        if let Ok(timeout) = std::env::var("SUBTITLE_CLIENT_TIMEOUT") {
            match timeout.parse() {
                Ok(seconds) => self.backend.request_timeout_seconds = Some(seconds),
                Err(_) => tracing::warn!("Ignoring invalid SUBTITLE_CLIENT_TIMEOUT: {}", timeout),
            }
        }

        if let Ok(dir) = std::env::var("SUBTITLE_CLIENT_DOWNLOAD_DIR") {
            self.output.download_dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("SUBTITLE_CLIENT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.backend.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.backend.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.backend.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        if self.backend.connect_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("connect_timeout_seconds must be greater than 0".to_string()));
        }

        if self.intake.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid("allowed_extensions must not be empty".to_string()));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Subtitle Client Configuration:\n\
            - Backend: {}\n\
            - Request Timeout: {}\n\
            - Download Directory: {}\n\
            - Accepted Extensions: {}\n\
            - Selection: {}",
            self.backend.base_url,
            self.backend
                .request_timeout_seconds
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "transport default".to_string()),
            self.output.download_dir.display(),
            self.intake.allowed_extensions.join(", "),
            self.selection.summary()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend.base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.config.backend.request_timeout_seconds = Some(seconds);
        self
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.download_dir = dir;
        self
    }

    pub fn with_selection(mut self, selection: UserSelection) -> Self {
        self.config.selection = selection;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.config.intake.max_file_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
