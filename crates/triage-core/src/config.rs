use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub seek: SeekConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Reconciliation tick period. Clamped to at least one second.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekConfig {
    #[serde(default = "default_seek_delta_ms")]
    pub delta_ms: u64,
    /// Number of equal track divisions addressable by the digit keys.
    #[serde(default = "default_divisions")]
    pub divisions: u32,
}

/// Remote playback API endpoints. Credentials come from `SPOTIFY_CLIENT_ID`,
/// `SPOTIFY_CLIENT_SECRET` and `SPOTIFY_REFRESH_TOKEN`, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_accounts_base")]
    pub accounts_base: String,
}

/// Document-store tunables. Connection credentials come from the `MONGO_*`
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Track metadata cache. Tracks change far more often than playlists.
    #[serde(default = "default_track_capacity")]
    pub track_capacity: usize,
    /// Playlist classification / name cache.
    #[serde(default = "default_playlist_capacity")]
    pub playlist_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Sibling label that marks the overflow/"trash" playlist of a group.
    #[serde(default = "default_overflow_label")]
    pub overflow_label: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            delta_ms: default_seek_delta_ms(),
            divisions: default_divisions(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            accounts_base: default_accounts_base(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            track_capacity: default_track_capacity(),
            playlist_capacity: default_playlist_capacity(),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            overflow_label: default_overflow_label(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            seek: SeekConfig::default(),
            spotify: SpotifyConfig::default(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            classify: ClassifyConfig::default(),
        }
    }
}

fn default_tick_secs() -> u64 {
    5
}

fn default_seek_delta_ms() -> u64 {
    10_000
}

fn default_divisions() -> u32 {
    5
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_accounts_base() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_collection() -> String {
    "classification_groups".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_track_capacity() -> usize {
    100
}

fn default_playlist_capacity() -> usize {
    10
}

fn default_overflow_label() -> String {
    "trash".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("sptriage"))
        .unwrap_or_else(|| std::env::temp_dir().join("sptriage"))
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("sptriage"))
        .unwrap_or_else(|| std::env::temp_dir().join("sptriage"))
}
