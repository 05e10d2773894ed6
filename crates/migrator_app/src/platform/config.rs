use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::engine_info;
use migrator_engine::{CharacterId, FetchSettings, PublishSettings};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "./migrator.ron";

/// Contents of `migrator.ron`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The `result.json` written by the chat client's export.
    pub export_path: PathBuf,
    /// Where the progress record lives.
    pub state_dir: PathBuf,
    /// Public channel name used for the link back to each original post.
    pub channel: String,
    pub channel_prefix: String,
    pub character_id: Option<CharacterId>,
    pub storage: StorageConfig,
    pub ledger_path: PathBuf,
    pub fetch: FetchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("result.json"),
            state_dir: PathBuf::from("."),
            channel: String::new(),
            channel_prefix: PublishSettings::default().channel_prefix,
            character_id: None,
            storage: StorageConfig::default(),
            ledger_path: PathBuf::from("ledger"),
            fetch: FetchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StorageConfig {
    /// Content-addressed blobs in a local directory.
    Local(PathBuf),
    /// An IPFS upload relay endpoint.
    Relay(String),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local(PathBuf::from("content"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            max_bytes: settings.max_bytes,
        }
    }
}

impl AppConfig {
    /// Loads the config. Only an explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Relative media addresses in the export resolve against its directory.
    pub fn fetch_settings(&self) -> FetchSettings {
        let base_dir = self
            .export_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            max_bytes: self.fetch.max_bytes,
            base_dir,
        }
    }

    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            channel_prefix: self.channel_prefix.clone(),
            ..PublishSettings::default()
        }
    }
}
