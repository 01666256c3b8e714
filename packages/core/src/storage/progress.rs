//! 学习进度数据库操作模块
//!
//! 提供答题计数累加、学习等级写入、进度重置与按等级统计。

use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::models::{ProgressCounters, MAX_LVL, NEVER_ATTEMPTED};
use crate::storage::{StorageError, StorageResult, VocabularyTable};

/// 学习进度仓储
pub struct ProgressRepository<'a> {
    conn: &'a Connection,
    table: &'a VocabularyTable,
}

impl<'a> ProgressRepository<'a> {
    /// 创建新的仓储实例
    pub fn new(conn: &'a Connection, table: &'a VocabularyTable) -> Self {
        Self { conn, table }
    }

    /// 读取单词当前的进度计数
    pub fn get_counters(&self, id: i64) -> StorageResult<ProgressCounters> {
        self.conn
            .query_row(
                &format!(
                    r#"
                    SELECT learned_lvl, correct_translations, incorrect_translations,
                           correct_articles, incorrect_articles
                    FROM {} WHERE id = ?1
                    "#,
                    self.table.progress()
                ),
                params![id],
                |row| ProgressCounters::from_row(row),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("单词 id={}", id)))
    }

    // ========== 写操作 ==========

    /// 累加答题计数
    ///
    /// 释义与冠词各有一对“对/错”计数，每次各自恰好加一。
    pub fn update_counters(
        &self,
        id: i64,
        correct_translation: bool,
        correct_article: bool,
    ) -> StorageResult<()> {
        let rows_affected = self.conn.execute(
            &format!(
                r#"
                UPDATE {} SET
                    correct_translations = correct_translations + ?2,
                    incorrect_translations = incorrect_translations + ?3,
                    correct_articles = correct_articles + ?4,
                    incorrect_articles = incorrect_articles + ?5
                WHERE id = ?1
                "#,
                self.table.progress()
            ),
            params![
                id,
                correct_translation as i64,
                !correct_translation as i64,
                correct_article as i64,
                !correct_article as i64,
            ],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::NotFound(format!("单词 id={}", id)));
        }

        Ok(())
    }

    /// 设置学习等级
    pub fn set_learned_lvl(&self, id: i64, lvl: i32) -> StorageResult<()> {
        if !(NEVER_ATTEMPTED..=MAX_LVL).contains(&lvl) {
            return Err(StorageError::InvalidArgument(format!(
                "学习等级 {} 超出范围 [{}, {}]",
                lvl, NEVER_ATTEMPTED, MAX_LVL
            )));
        }

        let rows_affected = self.conn.execute(
            &format!(
                "UPDATE {} SET learned_lvl = ?2 WHERE id = ?1",
                self.table.progress()
            ),
            params![id, lvl],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::NotFound(format!("单词 id={}", id)));
        }

        Ok(())
    }

    /// 重置全部进度，返回受影响的行数
    pub fn reset_all(&self) -> StorageResult<usize> {
        let rows_affected = self.conn.execute(
            &format!(
                r#"
                UPDATE {} SET
                    learned_lvl = ?1,
                    correct_translations = 0,
                    correct_articles = 0,
                    incorrect_translations = 0,
                    incorrect_articles = 0
                "#,
                self.table.progress()
            ),
            params![NEVER_ATTEMPTED],
        )?;

        Ok(rows_affected)
    }

    // ========== 统计 ==========

    /// 已学习过的单词数
    pub fn count_studied(&self) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE learned_lvl != ?1",
                self.table.progress()
            ),
            params![NEVER_ATTEMPTED],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 指定等级的单词数
    pub fn count_at_level(&self, lvl: i32) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE learned_lvl = ?1",
                self.table.progress()
            ),
            params![lvl],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 各等级 (0..=MAX_LVL) 的单词数，下标即等级
    pub fn count_by_level(&self) -> StorageResult<Vec<i64>> {
        let mut counts = vec![0i64; (MAX_LVL + 1) as usize];

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT learned_lvl, COUNT(*) AS cnt
            FROM {}
            WHERE learned_lvl BETWEEN 0 AND ?1
            GROUP BY learned_lvl
            "#,
            self.table.progress()
        ))?;

        let rows = stmt
            .query_map(params![MAX_LVL], |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (lvl, count) in rows {
            counts[lvl as usize] = count;
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ensure_schema;
    use crate::storage::models::WordRecord;
    use crate::storage::VocabularyRepository;

    fn setup_test_db() -> (Connection, VocabularyTable) {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let table = VocabularyTable::new("vocab").unwrap();

        let records: Vec<WordRecord> = (0..5)
            .map(|i| WordRecord::new("A1", None, format!("Wort{}", i), None, format!("word{}", i), ""))
            .collect();
        VocabularyRepository::new(&conn, &table)
            .initialize(&records, "test.csv")
            .unwrap();

        (conn, table)
    }

    #[test]
    fn test_get_counters() {
        let (conn, table) = setup_test_db();
        let repo = ProgressRepository::new(&conn, &table);

        assert_eq!(repo.get_counters(1).unwrap(), ProgressCounters::default());

        repo.update_counters(1, true, false).unwrap();
        let counters = repo.get_counters(1).unwrap();
        assert_eq!(counters.correct_translations, 1);
        assert_eq!(counters.incorrect_articles, 1);

        assert!(matches!(repo.get_counters(42), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_counters_each_pair_incremented_once() {
        let (conn, table) = setup_test_db();
        let repo = ProgressRepository::new(&conn, &table);

        repo.update_counters(1, false, true).unwrap();

        let (ct, it, ca, ia): (i64, i64, i64, i64) = conn
            .query_row(
                "SELECT correct_translations, incorrect_translations, correct_articles, incorrect_articles FROM vocab_progress WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!((ct, it, ca, ia), (0, 1, 1, 0));
    }

    #[test]
    fn test_reset_all_returns_row_count() {
        let (conn, table) = setup_test_db();
        let repo = ProgressRepository::new(&conn, &table);

        repo.set_learned_lvl(3, 4).unwrap();
        assert_eq!(repo.reset_all().unwrap(), 5);
        assert_eq!(repo.count_studied().unwrap(), 0);
        assert_eq!(repo.count_at_level(NEVER_ATTEMPTED).unwrap(), 5);
    }

    #[test]
    fn test_count_by_level_ignores_never_attempted() {
        let (conn, table) = setup_test_db();
        let repo = ProgressRepository::new(&conn, &table);

        repo.set_learned_lvl(1, MAX_LVL).unwrap();
        repo.set_learned_lvl(2, 0).unwrap();

        let counts = repo.count_by_level().unwrap();
        assert_eq!(counts.len(), (MAX_LVL + 1) as usize);
        assert_eq!(counts, vec![1, 0, 0, 0, 0, 1]);
    }
}
