use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Sqlite,
    Postgresql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseType,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    /// libpq-style connection string for the warehouse database
    #[serde(default = "default_postgresql_url")]
    pub postgresql_url: Option<String>,

    /// Connection string for a maintenance database on the same server,
    /// used when recreating the warehouse database itself.
    #[serde(default = "default_postgresql_admin_url")]
    pub postgresql_admin_url: Option<String>,
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("songplay-etl")
        .join("sparkify.db")
}

fn default_postgresql_url() -> Option<String> {
    Some("host=127.0.0.1 dbname=sparkifydb user=student password=student".to_string())
}

fn default_postgresql_admin_url() -> Option<String> {
    Some("host=127.0.0.1 dbname=studentdb user=student password=student".to_string())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseType::default(),
            sqlite_path: default_sqlite_path(),
            postgresql_url: default_postgresql_url(),
            postgresql_admin_url: default_postgresql_admin_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root of the song metadata tree
    #[serde(default = "default_song_data")]
    pub song_data: PathBuf,

    /// Root of the event log tree
    #[serde(default = "default_log_data")]
    pub log_data: PathBuf,

    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_song_data() -> PathBuf {
    PathBuf::from("data/song_data")
}

fn default_log_data() -> PathBuf {
    PathBuf::from("data/log_data")
}

fn default_extension() -> String {
    "json".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            song_data: default_song_data(),
            log_data: default_log_data(),
            extension: default_extension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files. Stderr only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Also send events to systemd-journald (Linux only)
    #[serde(default)]
    pub journald: bool,
}

impl Config {
    /// Load from the location named by `SONGPLAY_ETL_CONFIG`, or the default
    /// config path. A default file is written when none exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SONGPLAY_ETL_CONFIG") {
            return PathBuf::from(path);
        }

        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("songplay-etl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.backend, DatabaseType::Sqlite);
        assert_eq!(config.data.song_data, PathBuf::from("data/song_data"));
        assert_eq!(config.data.log_data, PathBuf::from("data/log_data"));
        assert_eq!(config.data.extension, "json");
        assert!(config.logging.dir.is_none());
        assert!(!config.logging.journald);
        assert_eq!(
            config.database.postgresql_url.as_deref(),
            Some("host=127.0.0.1 dbname=sparkifydb user=student password=student")
        );
        assert_eq!(
            config.database.postgresql_admin_url.as_deref(),
            Some("host=127.0.0.1 dbname=studentdb user=student password=student")
        );
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [database]
            backend = "postgresql"
            postgresql_url = "host=db dbname=sparkifydb"

            [data]
            log_data = "/srv/logs"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, DatabaseType::Postgresql);
        assert_eq!(
            config.database.postgresql_url.as_deref(),
            Some("host=db dbname=sparkifydb")
        );
        assert!(config
            .database
            .postgresql_admin_url
            .as_deref()
            .is_some_and(|url| url.contains("dbname=studentdb")));
        assert_eq!(config.data.log_data, PathBuf::from("/srv/logs"));
        assert_eq!(config.data.song_data, PathBuf::from("data/song_data"));
    }

    #[test]
    fn test_save_and_load_from() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.data.extension = "jsonl".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.data.extension, "jsonl");
    }

    #[test]
    fn test_load_from_rejects_bad_backend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\nbackend = \"oracle\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
