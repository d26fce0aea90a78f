use std::path::PathBuf;
use std::time::Duration;

use iroh::SecretKey;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DATA_DIR_NAME: &str = "threadline";
static THREADLINE_DB_NAME: &str = "threadline_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

// data_dir_path
// |- threadline
//    |- threadline_db.sqlite
//    |- config.json

fn default_secret_key() -> SecretKey {
    SecretKey::generate(&mut rand::rng())
}

fn default_operation_timeout_ms() -> u64 {
    5_000
}

fn default_log_filter() -> String {
    "threadline_core=info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no data directory on this platform")]
    NoDataDir,
    #[error("config io failed")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid json")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ThreadConfig {
    /// Secret key for the local node/instance.
    #[serde(default = "default_secret_key")]
    pub(crate) secret_key: SecretKey,

    /// Secret key for the in-process client endpoint.
    #[serde(default = "default_secret_key")]
    pub(crate) client_secret_key: SecretKey,

    pub(crate) database_path: PathBuf,

    /// Deadline applied to every RPC-driven operation.
    #[serde(default = "default_operation_timeout_ms")]
    pub(crate) operation_timeout_ms: u64,

    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub(crate) log_filter: String,
}

impl ThreadConfig {
    fn new(data_dir: PathBuf) -> Self {
        ThreadConfig {
            secret_key: default_secret_key(),
            client_secret_key: default_secret_key(),
            database_path: data_dir.join(THREADLINE_DB_NAME),
            operation_timeout_ms: default_operation_timeout_ms(),
            log_filter: default_log_filter(),
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.database_path
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }
}

/// Gets the existing config or initializes a new one if it doesn't exist
pub async fn get_or_init() -> Result<ThreadConfig, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    load_or_create(data_dir.join(DATA_DIR_NAME)).await
}

pub(crate) async fn load_or_create(threadline_dir: PathBuf) -> Result<ThreadConfig, ConfigError> {
    let config_path = threadline_dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(&threadline_dir).await?;

    if fs::try_exists(&config_path).await? {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let config: ThreadConfig = serde_json::from_str(&contents)?;
        Ok(config)
    } else {
        let config = ThreadConfig::new(threadline_dir);

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("threadline-config-{}", uuid::Uuid::now_v7()))
    }

    #[tokio::test]
    async fn creates_then_reloads_config() {
        let dir = scratch_dir();

        let created = load_or_create(dir.clone()).await.unwrap();
        assert_eq!(created.database_path, dir.join(THREADLINE_DB_NAME));
        assert_eq!(created.operation_timeout(), Duration::from_secs(5));

        let reloaded = load_or_create(dir.clone()).await.unwrap();
        assert_eq!(reloaded.database_path, created.database_path);
        assert_eq!(reloaded.secret_key.public(), created.secret_key.public());

        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_fields_fall_back_to_defaults() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(
            dir.join(CONFIG_FILE_NAME),
            r#"{ "database_path": "/tmp/threadline.sqlite" }"#,
        )
        .await
        .unwrap();

        let config = load_or_create(dir.clone()).await.unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/threadline.sqlite"));
        assert_eq!(config.operation_timeout_ms, 5_000);
        assert_eq!(config.log_filter, "threadline_core=info");

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
