//! SQLite 本地词表存储模块
//!
//! 提供本地 SQLite 数据库存储功能，支持：
//! - 从导入的词条整体重建词表
//! - 单词学习进度的持久化
//! - 从未掌握单词的候选池中随机抽词
//! - 学习进度统计

// ============================================================
// 子模块声明
// ============================================================

pub mod models;
pub mod progress;
pub mod vocabulary;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use models::*;
pub use progress::ProgressRepository;
pub use vocabulary::VocabularyRepository;

// ============================================================
// 依赖导入
// ============================================================

use rand::Rng;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::session::learned_level;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("参数无效: {0}")]
    InvalidArgument(String),

    #[error("数据未找到: {0}")]
    NotFound(String),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// 共享表结构
// ============================================================

/// 词表登记表，所有词表共用
const REGISTRY_SCHEMA: &str = include_str!("schema.sql");

/// 创建共享表（已存在则跳过）
pub(crate) fn ensure_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(REGISTRY_SCHEMA)?;
    Ok(())
}

/// 数据表是否存在
pub(crate) fn table_exists(conn: &Connection, table: &str) -> StorageResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

// ============================================================
// VocabularyTable - 词表对应的数据表名
// ============================================================

/// 一个词表对应的两张数据表：单词表与进度表（`<name>_progress`），按 id 一一对应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyTable {
    words: String,
    progress: String,
}

impl VocabularyTable {
    /// 校验表名并构造
    ///
    /// 表名会直接拼进 SQL，只允许 `[A-Za-z_][A-Za-z0-9_]*`。
    pub fn new(name: &str) -> StorageResult<Self> {
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_head || !valid_tail {
            return Err(StorageError::InvalidArgument(format!(
                "非法的词表名称: '{}'",
                name
            )));
        }

        Ok(Self {
            words: name.to_string(),
            progress: format!("{}_progress", name),
        })
    }

    /// 单词表名
    pub fn words(&self) -> &str {
        &self.words
    }

    /// 进度表名
    pub fn progress(&self) -> &str {
        &self.progress
    }
}

// ============================================================
// VocabularyStore - 统一存储入口
// ============================================================

/// 词表存储
///
/// 持有共享的数据库连接，每个公开操作都在连接锁内以单个事务完成，
/// 因此导入、重置与答题写入之间互斥，不会出现部分写入。
/// `Clone` 得到的句柄共享同一连接，可交给后台任务使用。
#[derive(Clone)]
pub struct VocabularyStore {
    conn: Arc<Mutex<Connection>>,
    table: VocabularyTable,
    db_path: String,
}

impl VocabularyStore {
    /// 打开（或创建）数据库文件
    ///
    /// 自动启用 WAL 模式并创建共享表。
    ///
    /// # Example
    /// ```ignore
    /// let store = VocabularyStore::open("./data/vocabulary.db", "de_en_vocabulary")?;
    /// ```
    pub fn open<P: AsRef<Path>>(db_path: P, table: &str) -> StorageResult<Self> {
        let table = VocabularyTable::new(table)?;
        let path = db_path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(path)?;

        // 启用 WAL 模式以提高并发性能
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        Self::from_connection(connection, table, path.to_string_lossy().to_string())
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory(table: &str) -> StorageResult<Self> {
        let table = VocabularyTable::new(table)?;
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::from_connection(connection, table, ":memory:".to_string())
    }

    fn from_connection(
        connection: Connection,
        table: VocabularyTable,
        db_path: String,
    ) -> StorageResult<Self> {
        ensure_schema(&connection)?;

        log::debug!("打开词表存储: {} ({})", db_path, table.words());

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            table,
            db_path,
        })
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 获取词表名
    pub fn table(&self) -> &VocabularyTable {
        &self.table
    }

    /// 获取连接锁
    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 执行事务
    ///
    /// 闭包返回错误时事务随 `Transaction` 的析构自动回滚。
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection, &VocabularyTable) -> StorageResult<T>,
    {
        let mut conn = self.get_conn()?;

        let tx = conn.transaction()?;
        let result = f(&*tx, &self.table)?;
        tx.commit()?;

        Ok(result)
    }

    // ========== 词表操作 ==========

    /// 用给定词条整体替换词表
    ///
    /// 先校验所有词条，任何一条不合格都不会写入。
    /// 单词 ID 按输入顺序从 1 开始分配，所有进度重置为未作答。
    pub fn initialize(&self, records: &[WordRecord], source: &str) -> StorageResult<usize> {
        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(|reason| {
                StorageError::InvalidArgument(format!("第 {} 条词条无效: {}", index + 1, reason))
            })?;
        }

        let inserted = self.transaction(|conn, table| {
            VocabularyRepository::new(conn, table).initialize(records, source)
        })?;

        log::info!(
            "词表 {} 已从 {} 导入 {} 个单词",
            self.table.words(),
            source,
            inserted
        );
        Ok(inserted)
    }

    /// 从未掌握单词的候选池中随机取一个
    ///
    /// 候选池为按 id 排序的前 `pool_size` 个未掌握单词；没有未掌握单词时返回 `None`。
    pub fn fetch_random_unmastered(&self, pool_size: usize) -> StorageResult<Option<Word>> {
        self.fetch_random_unmastered_with(pool_size, &mut rand::thread_rng())
    }

    /// 同 [`fetch_random_unmastered`](Self::fetch_random_unmastered)，使用指定的随机数生成器
    pub fn fetch_random_unmastered_with<R: Rng + ?Sized>(
        &self,
        pool_size: usize,
        rng: &mut R,
    ) -> StorageResult<Option<Word>> {
        if pool_size == 0 {
            return Err(StorageError::InvalidArgument(
                "候选池大小必须为正整数".to_string(),
            ));
        }

        self.transaction(|conn, table| {
            VocabularyRepository::new(conn, table).fetch_random_unmastered(pool_size, rng)
        })
    }

    /// 根据 ID 获取单词
    pub fn get_word(&self, id: i64) -> StorageResult<Option<Word>> {
        let conn = self.get_conn()?;
        VocabularyRepository::new(&conn, &self.table).get_word(id)
    }

    /// 按 ID 顺序获取全部单词
    pub fn all_words(&self) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        VocabularyRepository::new(&conn, &self.table).all_words()
    }

    /// 词表是否已导入
    pub fn is_initialized(&self) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        Ok(table_exists(&conn, self.table.words())?
            && table_exists(&conn, self.table.progress())?)
    }

    /// 获取词表登记信息
    pub fn vocabulary_set(&self) -> StorageResult<Option<VocabularySet>> {
        let conn = self.get_conn()?;
        VocabularyRepository::new(&conn, &self.table).vocabulary_set()
    }

    // ========== 进度操作 ==========

    /// 累加答题计数：释义、冠词各自在“对/错”中恰好加一
    pub fn update_counters(
        &self,
        id: i64,
        correct_translation: bool,
        correct_article: bool,
    ) -> StorageResult<()> {
        self.transaction(|conn, table| {
            ProgressRepository::new(conn, table).update_counters(
                id,
                correct_translation,
                correct_article,
            )
        })
    }

    /// 直接设置学习等级
    pub fn set_learned_lvl(&self, id: i64, lvl: i32) -> StorageResult<()> {
        self.transaction(|conn, table| ProgressRepository::new(conn, table).set_learned_lvl(id, lvl))
    }

    /// 记录一次作答，返回新的学习等级
    ///
    /// 在同一事务内读取库中计数、按作答前的计数计算等级、累加计数并写回等级，
    /// 等级因此始终与库中计数一致，不受其他句柄并发重置的影响。
    /// 释义与冠词按同一判定结果计数。
    pub fn record_answer(&self, id: i64, correct: bool) -> StorageResult<i32> {
        self.transaction(|conn, table| {
            let repo = ProgressRepository::new(conn, table);
            let counters = repo.get_counters(id)?;
            let lvl = learned_level(&counters, correct);
            repo.update_counters(id, correct, correct)?;
            repo.set_learned_lvl(id, lvl)?;
            Ok(lvl)
        })
    }

    /// 重置全部学习进度（保留单词）
    pub fn reset_all_progress(&self) -> StorageResult<()> {
        let affected =
            self.transaction(|conn, table| ProgressRepository::new(conn, table).reset_all())?;

        log::info!("已重置 {} 个单词的学习进度", affected);
        Ok(())
    }

    // ========== 统计 ==========

    /// 单词总数
    pub fn count_total(&self) -> StorageResult<i64> {
        let conn = self.get_conn()?;
        VocabularyRepository::new(&conn, &self.table).count_total()
    }

    /// 已学习过的单词数 (learned_lvl != -1)
    pub fn count_studied(&self) -> StorageResult<i64> {
        let conn = self.get_conn()?;
        ProgressRepository::new(&conn, &self.table).count_studied()
    }

    /// 指定等级的单词数
    pub fn count_at_level(&self, lvl: i32) -> StorageResult<i64> {
        let conn = self.get_conn()?;
        ProgressRepository::new(&conn, &self.table).count_at_level(lvl)
    }

    /// 各等级 (0..=MAX_LVL) 的单词数
    pub fn count_by_level(&self) -> StorageResult<Vec<i64>> {
        let conn = self.get_conn()?;
        ProgressRepository::new(&conn, &self.table).count_by_level()
    }

    /// 关闭数据库连接
    ///
    /// 仍有其他句柄共享连接时，连接在最后一个句柄析构时释放。
    pub fn close(self) -> StorageResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex
                    .into_inner()
                    .map_err(|e| StorageError::LockError(e.to_string()))?;
                conn.close().map_err(|(_, e)| StorageError::Database(e))?;
                log::debug!("词表存储已关闭: {}", self.db_path);
                Ok(())
            }
            Err(_) => {
                log::debug!("连接仍被其他句柄共享，延后释放: {}", self.db_path);
                Ok(())
            }
        }
    }
}

// ============================================================
// 测试
// ============================================================
