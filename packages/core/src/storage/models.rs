//! 数据模型定义
//!
//! 定义词表存储所需的数据结构，以及与数据库行之间的映射。
//! 所有行解析都按列名取值，列缺失或类型不符时直接返回 rusqlite 错误。

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

// ============================================================
// 学习等级常量
// ============================================================

/// 最高学习等级，达到后不再出题
pub const MAX_LVL: i32 = 5;

/// 从未作答过的单词的学习等级
pub const NEVER_ATTEMPTED: i32 = -1;

// ============================================================
// WordRecord - 导入用的词条
// ============================================================

/// 从数据源导入的一条词条（不含进度）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    /// CEFR 等级 (如 A1, B2)
    pub level: String,
    /// 冠词 (der / die / das)，可能为空
    pub article: Option<String>,
    /// 目标语言词形
    pub headword: String,
    /// 复数形式
    pub plural: Option<String>,
    /// 参考语言释义
    pub translation: String,
    /// 例句
    pub example_sentence: String,
}

impl WordRecord {
    /// 便捷构造（主要用于测试和导入）
    pub fn new(
        level: impl Into<String>,
        article: Option<&str>,
        headword: impl Into<String>,
        plural: Option<&str>,
        translation: impl Into<String>,
        example_sentence: impl Into<String>,
    ) -> Self {
        Self {
            level: level.into(),
            article: article.map(str::to_string),
            headword: headword.into(),
            plural: plural.map(str::to_string),
            translation: translation.into(),
            example_sentence: example_sentence.into(),
        }
    }

    /// 校验必填字段，返回第一个问题的描述
    pub fn validate(&self) -> Result<(), String> {
        if self.headword.trim().is_empty() {
            return Err("词条缺少 headword".to_string());
        }
        if self.translation.trim().is_empty() {
            return Err(format!("词条 '{}' 缺少 translation", self.headword));
        }
        Ok(())
    }
}

// ============================================================
// ProgressCounters - 单词学习进度
// ============================================================

/// 单词的学习进度计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    /// 学习等级 [-1, MAX_LVL]
    pub learned_lvl: i32,
    /// 释义答对次数
    pub correct_translations: i64,
    /// 释义答错次数
    pub incorrect_translations: i64,
    /// 冠词答对次数
    pub correct_articles: i64,
    /// 冠词答错次数
    pub incorrect_articles: i64,
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self {
            learned_lvl: NEVER_ATTEMPTED,
            correct_translations: 0,
            incorrect_translations: 0,
            correct_articles: 0,
            incorrect_articles: 0,
        }
    }
}

impl ProgressCounters {
    /// 从数据库行解析（需要 progress 表的列）
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            learned_lvl: row.get("learned_lvl")?,
            correct_translations: row.get("correct_translations")?,
            incorrect_translations: row.get("incorrect_translations")?,
            correct_articles: row.get("correct_articles")?,
            incorrect_articles: row.get("incorrect_articles")?,
        })
    }

    /// 是否至少作答过一次
    pub fn is_attempted(&self) -> bool {
        self.learned_lvl > NEVER_ATTEMPTED
    }

    /// 是否已掌握（不再出题）
    pub fn is_mastered(&self) -> bool {
        self.learned_lvl >= MAX_LVL
    }
}

// ============================================================
// Word - 单词快照
// ============================================================

/// 单词及其学习进度的快照
///
/// 每次出题时从数据库重新读取，不在会话之间共享。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// 单词 ID（按导入顺序从 1 开始）
    pub id: i64,
    /// CEFR 等级
    pub level: String,
    /// 冠词
    pub article: Option<String>,
    /// 目标语言词形
    pub headword: String,
    /// 复数形式
    pub plural: Option<String>,
    /// 参考语言释义
    pub translation: String,
    /// 例句
    pub example_sentence: String,
    /// 学习进度
    pub progress: ProgressCounters,
}

impl Word {
    /// 从 word 表与 progress 表的联表查询结果解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            level: row.get("level")?,
            article: row.get("article")?,
            headword: row.get("headword")?,
            plural: row.get("plural")?,
            translation: row.get("translation")?,
            example_sentence: row.get("example_sentence")?,
            progress: ProgressCounters::from_row(row)?,
        })
    }

    /// 期望的作答：有冠词时为 "冠词 词形"，否则为词形本身
    pub fn expected_answer(&self) -> String {
        match &self.article {
            Some(article) => format!("{} {}", article, self.headword),
            None => self.headword.clone(),
        }
    }

    /// 当前学习等级
    pub fn learned_lvl(&self) -> i32 {
        self.progress.learned_lvl
    }
}

// ============================================================
// VocabularySet - 词表登记信息
// ============================================================

/// 已导入词表的登记信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularySet {
    /// 词表（数据表）名称
    pub name: String,
    /// 导入来源（文件路径或 URL）
    pub source: String,
    /// 单词数量
    pub word_count: i64,
    /// 导入时间
    pub imported_at: DateTime<Utc>,
}

impl VocabularySet {
    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            name: row.get("name")?,
            source: row.get("source")?,
            word_count: row.get("word_count")?,
            imported_at: parse_datetime(row.get::<_, String>("imported_at")?),
        })
    }
}

// ============================================================
// ProgressSnapshot - 进度汇总
// ============================================================

/// 学习进度汇总（只用于展示，按需重新计算）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// 词表中的单词总数
    pub words_in_db: i64,
    /// 已学习过的单词数 (learned_lvl != -1)
    pub studied_words: i64,
    /// 当前单词的学习等级
    pub current_word_lvl: Option<i32>,
    /// 各等级 (0..=MAX_LVL) 的单词数
    pub words_in_lvl: Vec<i64>,
}

// ============================================================
// 时间格式辅助函数
// ============================================================

/// 将时间格式化为数据库存储格式
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 解析数据库中的时间字符串，失败时回退到当前时间
pub fn parse_datetime(s: String) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(article: Option<&str>, headword: &str) -> Word {
        Word {
            id: 1,
            level: "A1".to_string(),
            article: article.map(str::to_string),
            headword: headword.to_string(),
            plural: None,
            translation: "table".to_string(),
            example_sentence: String::new(),
            progress: ProgressCounters::default(),
        }
    }

    #[test]
    fn test_expected_answer_with_article() {
        assert_eq!(word(Some("der"), "Tisch").expected_answer(), "der Tisch");
    }

    #[test]
    fn test_expected_answer_without_article() {
        assert_eq!(word(None, "laufen").expected_answer(), "laufen");
    }

    #[test]
    fn test_default_counters_never_attempted() {
        let counters = ProgressCounters::default();
        assert_eq!(counters.learned_lvl, NEVER_ATTEMPTED);
        assert!(!counters.is_attempted());
        assert!(!counters.is_mastered());
    }

    #[test]
    fn test_record_validation() {
        let ok = WordRecord::new("A1", Some("der"), "Tisch", Some("Tische"), "table", "");
        assert!(ok.validate().is_ok());

        let missing_headword = WordRecord::new("A1", None, "  ", None, "table", "");
        assert!(missing_headword.validate().is_err());

        let missing_translation = WordRecord::new("A1", None, "Tisch", None, "", "");
        assert!(missing_translation.validate().is_err());
    }

    #[test]
    fn test_datetime_roundtrip() {
        let now = Utc::now();
        let parsed = parse_datetime(format_datetime(now));
        assert_eq!(parsed.timestamp(), now.timestamp());
    }

    #[test]
    fn test_word_from_row_missing_column() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 1 AS id, 'A1' AS level", [], |row| {
            Word::from_row(row)
        });
        assert!(matches!(result, Err(rusqlite::Error::InvalidColumnName(_))));
    }
}
