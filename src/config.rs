//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::search::indexer::DEFAULT_WRITER_HEAP_BYTES;
use crate::source::DEFAULT_FETCH_SIZE;

/// Default config file location / 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Index store configuration / 索引配置
    pub index: IndexConfig,
    /// Source database configuration / 源数据库配置
    pub source: SourceConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Index store configuration / 索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Store directory / 索引目录
    pub path: String,
    /// Rows buffered ahead of the indexer per table scan / 预取行数
    pub fetch_size: usize,
    /// Indexing memory budget in bytes / 写入内存预算
    pub writer_heap_bytes: usize,
}

/// Source database configuration / 源数据库配置
///
/// Either a full `url`, or MySQL connection parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Full connection URL (`mysql://...` or `sqlite:...`) / 完整连接URL
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "./data/index".to_string(),
            fetch_size: DEFAULT_FETCH_SIZE,
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 3306,
            database: None,
            username: None,
            password: None,
        }
    }
}

impl AppConfig {
    /// Get the index store directory / 获取索引目录
    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(&self.index.path)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the source database URL / 获取源数据库URL
    pub fn source_url(&self) -> Result<String> {
        self.source.url()
    }
}

impl SourceConfig {
    /// `url` when set, otherwise a MySQL URL built from the parts / 构建连接URL
    pub fn url(&self) -> Result<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().to_string());
        }

        let required = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::Config(format!("source.{} is required", name)))
        };
        let database = required(&self.database, "database")?;
        let username = required(&self.username, "username")?;
        let password = required(&self.password, "password")?;

        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            urlencoding::encode(&username),
            urlencoding::encode(&password),
            self.host,
            self.port,
            urlencoding::encode(&database)
        ))
    }
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config(path, &config)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
