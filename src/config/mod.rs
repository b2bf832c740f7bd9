mod app_config;

pub use app_config::{
    AppConfig, ChunkingSettings, DatabaseConfig, EmbeddingConfig, LogFormat, LoggingConfig,
    RetrySettings, SearchConfig, StorageConfig,
};
