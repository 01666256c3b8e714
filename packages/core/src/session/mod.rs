//! 学习会话引擎
//!
//! 一次只持有一个当前单词：出题 → 作答 → 判定 → 写回进度 → 出下一题。
//! 当前单词是会话对象自己的状态，调用方通过 `&mut LearningSession` 驱动。

pub mod scoring;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{
    ProgressSnapshot, StorageError, VocabularyStore, Word, WordRecord, MAX_LVL,
};

pub use scoring::{is_correct_answer, learned_level};

/// 默认候选池大小
pub const DEFAULT_POOL_SIZE: usize = 20;

// ============================================================
// 错误类型定义
// ============================================================

/// 会话错误类型
#[derive(Error, Debug)]
pub enum SessionError {
    /// 底层存储故障，不自动重试
    #[error("存储故障: {0}")]
    Storage(StorageError),

    /// 没有未掌握的单词，需要重新导入词表
    #[error("没有可出题的单词，请重新导入词表")]
    Exhausted,

    #[error("参数无效: {0}")]
    InvalidArgument(String),

    #[error("状态不允许该操作: {0}")]
    InvariantViolation(String),
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidArgument(msg) => SessionError::InvalidArgument(msg),
            other => SessionError::Storage(other),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

// ============================================================
// 会话状态与作答结果
// ============================================================

/// 会话状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// 尚未出题
    Idle,
    /// 等待对当前单词作答
    AwaitingAnswer(Word),
    /// 候选池已空，需要重新导入词表
    Exhausted,
}

/// 一次作答的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
    /// 作答的单词 ID
    pub word_id: i64,
    /// 是否正确
    pub correct: bool,
    /// 期望作答（冠词 + 词形）
    pub expected_answer: String,
    /// 单词释义，作答后才展示
    pub translation: String,
    /// 例句
    pub example_sentence: String,
    /// 作答后的学习等级
    pub learned_lvl: i32,
    /// 下一题；`None` 表示候选池已空
    pub next: Option<Word>,
}

// ============================================================
// LearningSession - 学习会话
// ============================================================

/// 学习会话
pub struct LearningSession {
    store: VocabularyStore,
    pool_size: usize,
    state: SessionState,
}

impl LearningSession {
    /// 使用默认候选池大小创建会话
    pub fn new(store: VocabularyStore) -> Self {
        Self {
            store,
            pool_size: DEFAULT_POOL_SIZE,
            state: SessionState::Idle,
        }
    }

    /// 使用指定候选池大小创建会话
    pub fn with_pool_size(store: VocabularyStore, pool_size: usize) -> SessionResult<Self> {
        let mut session = Self::new(store);
        session.set_pool_size(pool_size)?;
        Ok(session)
    }

    /// 底层存储
    pub fn store(&self) -> &VocabularyStore {
        &self.store
    }

    /// 当前状态
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 当前单词
    pub fn current_word(&self) -> Option<&Word> {
        match &self.state {
            SessionState::AwaitingAnswer(word) => Some(word),
            _ => None,
        }
    }

    /// 候选池大小
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// 设置候选池大小，必须为正整数
    pub fn set_pool_size(&mut self, pool_size: usize) -> SessionResult<()> {
        if pool_size == 0 {
            return Err(SessionError::InvalidArgument(
                "候选池大小必须为正整数".to_string(),
            ));
        }
        self.pool_size = pool_size;
        Ok(())
    }

    /// 从候选池抽取下一题
    ///
    /// 候选池为空时进入 `Exhausted` 状态并返回 [`SessionError::Exhausted`]。
    /// 存储故障时保持原状态。
    pub fn load_next_word(&mut self) -> SessionResult<&Word> {
        match self.store.fetch_random_unmastered(self.pool_size)? {
            Some(word) => {
                log::debug!("出题: id={} ({})", word.id, word.translation);
                self.state = SessionState::AwaitingAnswer(word);
                self.require_current("load_next_word")
            }
            None => {
                log::info!("候选池已空，词表 {} 全部掌握", self.store.table().words());
                self.state = SessionState::Exhausted;
                Err(SessionError::Exhausted)
            }
        }
    }

    fn require_current(&self, action: &str) -> SessionResult<&Word> {
        self.current_word().ok_or_else(|| {
            SessionError::InvariantViolation(format!("{}: 当前没有待作答的单词", action))
        })
    }

    /// 判断作答是否正确（不写入进度）
    pub fn check_answer(&self, answer: &str) -> SessionResult<bool> {
        let word = self.require_current("check_answer")?;
        Ok(is_correct_answer(word, answer))
    }

    /// 提交作答并出下一题
    ///
    /// 新等级由存储在写入事务内按库中计数计算，会话缓存的计数只用于展示。
    /// 写入失败时当前单词保持不变。
    pub fn submit_and_advance(&mut self, answer: &str) -> SessionResult<AnswerOutcome> {
        let word = self.require_current("submit_answer")?;

        let correct = is_correct_answer(word, answer);
        let new_level = self.store.record_answer(word.id, correct)?;

        log::debug!(
            "作答 id={} correct={} 等级 {} -> {}",
            word.id,
            correct,
            word.learned_lvl(),
            new_level
        );

        let mut outcome = AnswerOutcome {
            word_id: word.id,
            correct,
            expected_answer: word.expected_answer(),
            translation: word.translation.clone(),
            example_sentence: word.example_sentence.clone(),
            learned_lvl: new_level,
            next: None,
        };

        self.state = SessionState::Idle;
        outcome.next = self.advance()?;
        Ok(outcome)
    }

    /// 不再询问当前单词
    ///
    /// 只允许对至少作答过一次的单词使用；直接将等级设为最高等级，然后出下一题。
    pub fn never_ask_again(&mut self) -> SessionResult<Option<Word>> {
        let word = self.require_current("never_ask_again")?;

        if !word.progress.is_attempted() {
            return Err(SessionError::InvariantViolation(format!(
                "单词 '{}' 尚未作答过，不能标记为不再询问",
                word.headword
            )));
        }

        let id = word.id;
        self.store.set_learned_lvl(id, MAX_LVL)?;
        log::info!("单词 id={} 标记为不再询问", id);

        self.state = SessionState::Idle;
        self.advance()
    }

    /// 出下一题，候选池为空时返回 `None`
    fn advance(&mut self) -> SessionResult<Option<Word>> {
        match self.load_next_word() {
            Ok(word) => Ok(Some(word.clone())),
            Err(SessionError::Exhausted) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 重置全部学习进度，并刷新当前单词快照
    pub fn reset_progress(&mut self) -> SessionResult<()> {
        self.store.reset_all_progress()?;

        let refreshed = match &self.state {
            SessionState::AwaitingAnswer(word) => self.store.get_word(word.id)?,
            _ => None,
        };

        self.state = match refreshed {
            Some(word) => SessionState::AwaitingAnswer(word),
            None => SessionState::Idle,
        };

        Ok(())
    }

    /// 用新的词条重新导入词表并出第一题
    pub fn reload_dictionary(
        &mut self,
        records: &[WordRecord],
        source: &str,
    ) -> SessionResult<Option<Word>> {
        self.store.initialize(records, source)?;
        self.restart()
    }

    /// 丢弃当前单词并出第一题
    ///
    /// 用于词表已通过其他句柄重新导入之后。
    pub fn restart(&mut self) -> SessionResult<Option<Word>> {
        self.state = SessionState::Idle;
        self.advance()
    }

    /// 当前学习进度汇总
    pub fn progress(&self) -> SessionResult<ProgressSnapshot> {
        Ok(ProgressSnapshot {
            words_in_db: self.store.count_total()?,
            studied_words: self.store.count_studied()?,
            current_word_lvl: self.current_word().map(Word::learned_lvl),
            words_in_lvl: self.store.count_by_level()?,
        })
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NEVER_ATTEMPTED;

    fn records() -> Vec<WordRecord> {
        vec![WordRecord::new(
            "A1",
            Some("der"),
            "Tisch",
            Some("Tische"),
            "table",
            "Der Tisch ist aus Holz.",
        )]
    }

    fn setup_session() -> LearningSession {
        let store = VocabularyStore::in_memory("de_en_vocabulary").unwrap();
        store.initialize(&records(), "test.csv").unwrap();
        LearningSession::new(store)
    }

    #[test]
    fn test_initial_state() {
        let session = setup_session();
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.pool_size(), DEFAULT_POOL_SIZE);
        assert!(session.current_word().is_none());
    }

    #[test]
    fn test_load_next_word() {
        let mut session = setup_session();
        let word = session.load_next_word().unwrap();
        assert_eq!(word.headword, "Tisch");
        assert!(matches!(session.state(), SessionState::AwaitingAnswer(_)));
    }

    #[test]
    fn test_check_answer_scenarios() {
        let mut session = setup_session();
        session.load_next_word().unwrap();

        assert!(session.check_answer("Der Tisch").unwrap());
        assert!(!session.check_answer("Tisch").unwrap());
    }

    #[test]
    fn test_check_answer_without_word() {
        let session = setup_session();
        assert!(matches!(
            session.check_answer("der Tisch"),
            Err(SessionError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_submit_correct_then_incorrect() {
        let store = VocabularyStore::in_memory("de_en_vocabulary").unwrap();
        let mut input = records();
        input.push(WordRecord::new("A1", Some("die"), "Tür", Some("Türen"), "door", ""));
        store.initialize(&input, "test.csv").unwrap();
        let mut session = LearningSession::with_pool_size(store.clone(), 1).unwrap();

        session.load_next_word().unwrap();
        let first = session.submit_and_advance("der tisch").unwrap();
        assert!(first.correct);
        assert_eq!(first.learned_lvl, MAX_LVL);
        assert_eq!(first.expected_answer, "der Tisch");
        assert_eq!(first.translation, "table");

        // 第一个单词已掌握，下一题是第二个单词
        let next = first.next.expect("second word available");
        assert_eq!(next.headword, "Tür");

        let second = session.submit_and_advance("Tür").unwrap();
        assert!(!second.correct);
        assert_eq!(second.learned_lvl, 0);

        let stored = store.get_word(2).unwrap().unwrap();
        assert_eq!(stored.progress.incorrect_translations, 1);
        assert_eq!(stored.progress.incorrect_articles, 1);
        assert_eq!(stored.learned_lvl(), 0);
    }

    #[test]
    fn test_submit_last_word_exhausts() {
        let mut session = setup_session();
        session.load_next_word().unwrap();

        let outcome = session.submit_and_advance("der Tisch").unwrap();
        assert!(outcome.next.is_none());
        assert_eq!(session.state(), &SessionState::Exhausted);

        // 作答已写入
        let word = session.store().get_word(1).unwrap().unwrap();
        assert_eq!(word.learned_lvl(), MAX_LVL);

        assert!(matches!(
            session.load_next_word(),
            Err(SessionError::Exhausted)
        ));
    }

    #[test]
    fn test_submit_without_current_word() {
        let mut session = setup_session();
        assert!(matches!(
            session.submit_and_advance("der Tisch"),
            Err(SessionError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_never_ask_again_rejected_for_new_word() {
        let mut session = setup_session();
        session.load_next_word().unwrap();

        let result = session.never_ask_again();
        assert!(matches!(result, Err(SessionError::InvariantViolation(_))));

        let word = session.store().get_word(1).unwrap().unwrap();
        assert_eq!(word.learned_lvl(), NEVER_ATTEMPTED);
        assert!(session.current_word().is_some());
    }

    #[test]
    fn test_never_ask_again_after_attempt() {
        let mut session = setup_session();
        session.load_next_word().unwrap();

        // 答错一次后等级为 0，仍在候选池中
        let outcome = session.submit_and_advance("Tisch").unwrap();
        assert_eq!(outcome.learned_lvl, 0);
        assert!(outcome.next.is_some());

        let next = session.never_ask_again().unwrap();
        assert!(next.is_none());
        assert_eq!(
            session.store().get_word(1).unwrap().unwrap().learned_lvl(),
            MAX_LVL
        );
    }

    #[test]
    fn test_set_pool_size() {
        let mut session = setup_session();
        assert!(matches!(
            session.set_pool_size(0),
            Err(SessionError::InvalidArgument(_))
        ));
        assert_eq!(session.pool_size(), DEFAULT_POOL_SIZE);

        session.set_pool_size(5).unwrap();
        assert_eq!(session.pool_size(), 5);

        let store = VocabularyStore::in_memory("de_en_vocabulary").unwrap();
        assert!(LearningSession::with_pool_size(store, 0).is_err());
    }

    #[test]
    fn test_progress_snapshot() {
        let mut session = setup_session();

        let empty = session.progress().unwrap();
        assert_eq!(empty.words_in_db, 1);
        assert_eq!(empty.studied_words, 0);
        assert_eq!(empty.current_word_lvl, None);
        assert_eq!(empty.words_in_lvl, vec![0; (MAX_LVL + 1) as usize]);

        session.load_next_word().unwrap();
        session.submit_and_advance("Tisch").unwrap();

        let snapshot = session.progress().unwrap();
        assert_eq!(snapshot.studied_words, 1);
        assert_eq!(snapshot.current_word_lvl, Some(0));
        assert_eq!(snapshot.words_in_lvl[0], 1);
    }

    #[test]
    fn test_reset_progress_refreshes_current_word() {
        let mut session = setup_session();
        session.load_next_word().unwrap();
        session.submit_and_advance("Tisch").unwrap();
        assert!(session.current_word().unwrap().progress.is_attempted());

        session.reset_progress().unwrap();

        let word = session.current_word().unwrap();
        assert_eq!(word.learned_lvl(), NEVER_ATTEMPTED);
        assert_eq!(word.progress.incorrect_translations, 0);
    }

    #[test]
    fn test_reload_dictionary_after_exhaustion() {
        let mut session = setup_session();
        session.load_next_word().unwrap();
        session.submit_and_advance("der Tisch").unwrap();
        assert_eq!(session.state(), &SessionState::Exhausted);

        let first = session
            .reload_dictionary(&records(), "test.csv")
            .unwrap()
            .expect("fresh dictionary has words");
        assert_eq!(first.learned_lvl(), NEVER_ATTEMPTED);
        assert!(matches!(session.state(), SessionState::AwaitingAnswer(_)));
    }

    #[test]
    fn test_restart_after_import_through_other_handle() {
        let mut session = setup_session();
        session.load_next_word().unwrap();
        session.submit_and_advance("Tisch").unwrap();

        let other = session.store().clone();
        other.initialize(&records(), "other.csv").unwrap();

        let first = session.restart().unwrap().expect("fresh dictionary has words");
        assert_eq!(first.learned_lvl(), NEVER_ATTEMPTED);
        assert_eq!(session.current_word(), Some(&first));
    }

    #[test]
    fn test_storage_invalid_argument_maps_to_session_error() {
        let mut session = setup_session();
        let bad = vec![WordRecord::new("A1", None, "", None, "", "")];
        assert!(matches!(
            session.reload_dictionary(&bad, "bad.csv"),
            Err(SessionError::InvalidArgument(_))
        ));
    }
}
