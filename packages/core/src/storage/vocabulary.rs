//! 单词表数据库操作
//!
//! 提供词表的整体导入、单词查询和候选池抽词。

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::models::{format_datetime, VocabularySet, Word, WordRecord, MAX_LVL, NEVER_ATTEMPTED};
use crate::storage::{StorageResult, VocabularyTable};

/// 单词表操作仓库
///
/// 借用连接使用，由 [`VocabularyStore`](crate::storage::VocabularyStore) 在锁和事务内创建。
pub struct VocabularyRepository<'a> {
    conn: &'a Connection,
    table: &'a VocabularyTable,
}

impl<'a> VocabularyRepository<'a> {
    /// 创建新的 VocabularyRepository 实例
    pub fn new(conn: &'a Connection, table: &'a VocabularyTable) -> Self {
        Self { conn, table }
    }

    /// 单词与进度联表查询的公共 SELECT 部分
    fn select_words_sql(&self) -> String {
        format!(
            r#"
            SELECT w.id, w.level, w.article, w.headword, w.plural,
                   w.translation, w.example_sentence,
                   p.learned_lvl, p.correct_translations, p.correct_articles,
                   p.incorrect_translations, p.incorrect_articles
            FROM {words} w
            INNER JOIN {progress} p ON p.id = w.id
            "#,
            words = self.table.words(),
            progress = self.table.progress(),
        )
    }

    /// 重建单词表与进度表并写入词条
    ///
    /// 调用方负责事务；返回写入的单词数。
    pub fn initialize(&self, records: &[WordRecord], source: &str) -> StorageResult<usize> {
        let words = self.table.words();
        let progress = self.table.progress();

        self.conn.execute_batch(&format!(
            r#"
            DROP TABLE IF EXISTS {progress};
            DROP TABLE IF EXISTS {words};

            CREATE TABLE {words} (
                id INTEGER PRIMARY KEY,
                level TEXT NOT NULL,
                article TEXT,
                headword TEXT NOT NULL,
                plural TEXT,
                translation TEXT NOT NULL,
                example_sentence TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE {progress} (
                id INTEGER PRIMARY KEY REFERENCES {words}(id),
                learned_lvl INTEGER NOT NULL DEFAULT {never}
                    CHECK (learned_lvl BETWEEN {never} AND {max}),
                correct_translations INTEGER NOT NULL DEFAULT 0,
                correct_articles INTEGER NOT NULL DEFAULT 0,
                incorrect_translations INTEGER NOT NULL DEFAULT 0,
                incorrect_articles INTEGER NOT NULL DEFAULT 0
            );
            "#,
            never = NEVER_ATTEMPTED,
            max = MAX_LVL,
        ))?;

        {
            let mut insert_word = self.conn.prepare(&format!(
                r#"
                INSERT INTO {words} (id, level, article, headword, plural, translation, example_sentence)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#
            ))?;
            let mut insert_progress = self.conn.prepare(&format!(
                "INSERT INTO {progress} (id, learned_lvl) VALUES (?1, ?2)"
            ))?;

            for (index, record) in records.iter().enumerate() {
                let id = index as i64 + 1;
                insert_word.execute(params![
                    id,
                    record.level,
                    record.article,
                    record.headword,
                    record.plural,
                    record.translation,
                    record.example_sentence,
                ])?;
                insert_progress.execute(params![id, NEVER_ATTEMPTED])?;
            }
        }

        self.conn.execute(
            r#"
            INSERT INTO vocabulary_set (name, source, word_count, imported_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(name) DO UPDATE SET
                source = excluded.source,
                word_count = excluded.word_count,
                imported_at = excluded.imported_at
            "#,
            params![
                words,
                source,
                records.len() as i64,
                format_datetime(Utc::now())
            ],
        )?;

        Ok(records.len())
    }

    /// 候选池：按 id 排序的前 `pool_size` 个未掌握单词的 id
    pub fn unmastered_pool(&self, pool_size: usize) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM {} WHERE learned_lvl < ?1 ORDER BY id LIMIT ?2",
            self.table.progress()
        ))?;

        let limit = i64::try_from(pool_size).unwrap_or(i64::MAX);
        let ids = stmt
            .query_map(params![MAX_LVL, limit], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// 在候选池中等概率抽取一个单词
    ///
    /// 候选池只取 id 最小的一段，抽样因此偏向靠前（通常更简单）的单词。
    pub fn fetch_random_unmastered<R: Rng + ?Sized>(
        &self,
        pool_size: usize,
        rng: &mut R,
    ) -> StorageResult<Option<Word>> {
        let pool = self.unmastered_pool(pool_size)?;

        match pool.choose(rng) {
            Some(&id) => {
                log::debug!("候选池 {} 个单词，抽中 id={}", pool.len(), id);
                self.get_word(id)
            }
            None => Ok(None),
        }
    }

    /// 根据 ID 获取单词
    pub fn get_word(&self, id: i64) -> StorageResult<Option<Word>> {
        let sql = format!("{} WHERE w.id = ?1", self.select_words_sql());

        let word = self
            .conn
            .query_row(&sql, params![id], |row| Word::from_row(row))
            .optional()?;

        Ok(word)
    }

    /// 按 ID 顺序获取全部单词
    pub fn all_words(&self) -> StorageResult<Vec<Word>> {
        let sql = format!("{} ORDER BY w.id ASC", self.select_words_sql());

        let mut stmt = self.conn.prepare(&sql)?;
        let words = stmt
            .query_map([], |row| Word::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    /// 单词总数
    pub fn count_total(&self) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table.words()),
            [],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 获取词表登记信息
    pub fn vocabulary_set(&self) -> StorageResult<Option<VocabularySet>> {
        let set = self
            .conn
            .query_row(
                r#"
                SELECT name, source, word_count, imported_at
                FROM vocabulary_set
                WHERE name = ?1
                "#,
                params![self.table.words()],
                |row| VocabularySet::from_row(row),
            )
            .optional()?;

        Ok(set)
    }
}
