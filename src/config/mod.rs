// Configuration management module
// TOML settings for the embedding server, chunking, retrieval and storage

pub mod settings;

pub use settings::{
    ChunkingSettings, Config, ConfigError, LoggingConfig, OllamaConfig, RetrievalConfig,
    StorageConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
