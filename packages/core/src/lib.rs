//! Wortschatz 核心库
//!
//! - `storage`: SQLite 词表与学习进度存储
//! - `session`: 出题、判定与学习等级计算
//! - `source`: 从 CSV 文件或在线表格导入词表
//! - `config`: 环境变量配置

pub mod config;
pub mod session;
pub mod source;
pub mod storage;

pub use config::AppConfig;
pub use session::{AnswerOutcome, LearningSession, SessionError, SessionResult, SessionState};
pub use storage::{
    ProgressCounters, ProgressSnapshot, StorageError, StorageResult, VocabularySet,
    VocabularyStore, Word, WordRecord, MAX_LVL, NEVER_ATTEMPTED,
};
