use anyhow::{bail, Result};
use serde::Serialize;

use wortschatz_core::{LearningSession, ProgressSnapshot, VocabularySet, MAX_LVL};

use crate::app::App;
use crate::OutputFormat;

/// 进度报告：词表登记信息 + 进度汇总
#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub vocabulary: Option<VocabularySet>,
    #[serde(flatten)]
    pub progress: ProgressSnapshot,
}

impl ProgressReport {
    pub fn collect(session: &LearningSession) -> Result<Self> {
        Ok(Self {
            vocabulary: session.store().vocabulary_set()?,
            progress: session.progress()?,
        })
    }
}

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    if !app.store.is_initialized()? {
        bail!("词表 {} 尚未导入，请先运行 import", app.config.table);
    }

    let session = LearningSession::new(app.store.clone());
    print_report(&ProgressReport::collect(&session)?, format)
}

/// 输出学习进度
pub fn print_report(report: &ProgressReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Plain => {
            let snapshot = &report.progress;

            if let Some(set) = &report.vocabulary {
                println!(
                    "词表 {}: 来自 {}，导入于 {}",
                    set.name,
                    set.source,
                    set.imported_at.format("%Y-%m-%d %H:%M")
                );
            }
            println!(
                "已学习 {} / {} 个单词",
                snapshot.studied_words, snapshot.words_in_db
            );
            if let Some(lvl) = snapshot.current_word_lvl {
                println!("当前单词等级: {}", lvl);
            }

            let max_count = snapshot.words_in_lvl.iter().copied().max().unwrap_or(0).max(1);
            for (lvl, count) in snapshot.words_in_lvl.iter().enumerate() {
                let bar_len = (*count * 30 / max_count) as usize;
                let label = if lvl as i32 == MAX_LVL { " (已掌握)" } else { "" };
                println!(
                    "  等级 {} {:>6} {}{}",
                    lvl,
                    count,
                    "\u{2588}".repeat(bar_len),
                    label
                );
            }
        }
    }

    Ok(())
}
