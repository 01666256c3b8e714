//! 作答判定与学习等级计算

use crate::storage::{ProgressCounters, Word, MAX_LVL};

/// 判断作答是否正确
///
/// 与期望作答（"冠词 词形"）做不区分大小写的完全匹配，不做额外的空白处理或模糊匹配。
pub fn is_correct_answer(word: &Word, answer: &str) -> bool {
    answer.to_lowercase() == word.expected_answer().to_lowercase()
}

/// 计算作答后的学习等级
///
/// `counters` 为本次作答之前的计数。本次结果在公式中按权重 2 计入：
///
/// ```text
/// correct   = 释义对 + 冠词对 + 2 * result
/// incorrect = 释义错 + 冠词错 + 2 * !result
/// level     = floor(MAX_LVL * correct / (correct + incorrect))
/// ```
///
/// 分母至少为 2，结果落在 `[0, MAX_LVL]`。
pub fn learned_level(counters: &ProgressCounters, result: bool) -> i32 {
    let correct =
        counters.correct_translations + counters.correct_articles + if result { 2 } else { 0 };
    let incorrect =
        counters.incorrect_translations + counters.incorrect_articles + if result { 0 } else { 2 };

    let level = MAX_LVL as i64 * correct / (correct + incorrect);
    level.clamp(0, MAX_LVL as i64) as i32
}
