use std::{path::Path, str::FromStr};

use serde_derive::Deserialize;

use crate::{
    error::{GatewayError, Result},
    util::logging::LogLevel,
};

pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "gateway.toml";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    /// `/analyze-road-marking`, answers with a zip bundle
    Bundle,
    /// `/analyze`, answers with per-frame JSON results
    Frames,
}

impl FromStr for InferenceMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bundle" | "zip" => Ok(InferenceMode::Bundle),
            "frames" | "json" => Ok(InferenceMode::Frames),
            other => Err(GatewayError::Config(format!("unknown inference mode {:?}", other))),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Mongodb,
    Memory,
}

impl FromStr for DatabaseBackend {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(DatabaseBackend::Mongodb),
            "memory" => Ok(DatabaseBackend::Memory),
            other => Err(GatewayError::Config(format!("unknown database backend {:?}", other))),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_mb: 512,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub mode: InferenceMode,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 300,
            mode: InferenceMode::Bundle,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub uri: String,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Mongodb,
            uri: "mongodb://localhost:27017".to_string(),
            name: "road_detector".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub static_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_dir: "static".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub enabled: bool,
    pub level: String,
    /// Components logged at VERBOSE regardless of `level`
    pub verbose: Vec<String>,
    /// Components that never log
    pub muted: Vec<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            verbose: Vec::new(),
            muted: Vec::new(),
        }
    }
}

impl LoggingSettings {
    pub fn log_level(&self) -> Result<LogLevel> {
        self.level.parse::<LogLevel>().map_err(GatewayError::Config)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingSettings,
}

impl Config {
    /// Reads the TOML file named by `GATEWAY_CONFIG` (a missing file means defaults),
    /// then applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Config::read_from_file(Path::new(&path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.logging.log_level()?;

        Ok(config)
    }

    pub fn read_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Config::from_toml_str(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(GatewayError::Config(format!(
                "unable to read {}: {}",
                path.display(),
                err
            ))),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str| get(key).and_then(|v| v.parse::<u64>().ok());

        if let Some(host) = get("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed("SERVER_PORT").and_then(|p| u16::try_from(p).ok()) {
            self.server.port = port;
        }
        if let Some(max_upload_mb) = parsed("MAX_UPLOAD_MB") {
            self.server.max_upload_mb = max_upload_mb;
        }

        if let Some(base_url) = get("PYTHON_API_BASE_URL") {
            self.inference.base_url = base_url;
        }
        if let Some(timeout) = parsed("PYTHON_API_TIMEOUT_SECONDS") {
            self.inference.timeout_seconds = timeout;
        }
        if let Some(mode) = get("INFERENCE_MODE") {
            self.inference.mode = mode.parse()?;
        }

        if let Some(backend) = get("DATABASE_BACKEND") {
            self.database.backend = backend.parse()?;
        }
        if let Some(uri) = get("MONGODB_URI") {
            self.database.uri = uri;
        }
        if let Some(name) = get("MONGODB_DATABASE") {
            self.database.name = name;
        }

        if let Some(static_dir) = get("STATIC_DIR") {
            self.storage.static_dir = static_dir;
        }

        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }
}
