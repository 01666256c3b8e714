use std::path::PathBuf;

use crate::session::DEFAULT_POOL_SIZE;

pub const DEFAULT_TABLE: &str = "de_en_vocabulary";
pub const DEFAULT_SOURCE: &str = "vocabulary.csv";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub table: String,
    pub source: String,
    pub pool_size: usize,
    pub log_level: String,
}

impl AppConfig {
    /// 读取环境变量（会先加载当前目录下的 `.env`）
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let db_path = std::env::var("WORTSCHATZ_DB_PATH")
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let table =
            std::env::var("WORTSCHATZ_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());

        let source =
            std::env::var("WORTSCHATZ_SOURCE").unwrap_or_else(|_| DEFAULT_SOURCE.to_string());

        let pool_size = std::env::var("WORTSCHATZ_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_POOL_SIZE);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            table,
            source,
            pool_size,
            log_level,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            table: DEFAULT_TABLE.to_string(),
            source: DEFAULT_SOURCE.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            log_level: "info".to_string(),
        }
    }
}

/// 默认数据库位置：系统数据目录下的 `wortschatz/vocabulary.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wortschatz")
        .join("vocabulary.db")
}
