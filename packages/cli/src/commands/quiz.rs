use std::io::{BufRead, Write};

use anyhow::Result;

use wortschatz_core::{AnswerOutcome, LearningSession, SessionError, Word};

use crate::app::App;
use crate::commands::progress::{print_report, ProgressReport};
use crate::OutputFormat;

/// 出题循环中的一行输入
#[derive(Debug, PartialEq, Eq)]
enum QuizInput {
    Answer(String),
    NeverAgain,
    Progress,
    Reset,
    Reload,
    Pool(Option<usize>),
    Help,
    Quit,
}

impl QuizInput {
    /// 以 `:` 开头的是命令，其余原样作为作答（只去掉行尾换行）
    fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(command) = line.strip_prefix(':') else {
            return QuizInput::Answer(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("never") | Some("n") => QuizInput::NeverAgain,
            Some("progress") | Some("p") => QuizInput::Progress,
            Some("reset") => QuizInput::Reset,
            Some("reload") => QuizInput::Reload,
            Some("pool") => QuizInput::Pool(parts.next().and_then(|n| n.parse().ok())),
            Some("quit") | Some("q") => QuizInput::Quit,
            _ => QuizInput::Help,
        }
    }
}

const HELP: &str = "\
命令:
  :never     不再询问当前单词（至少作答过一次）
  :progress  查看学习进度
  :reset     重置全部学习进度
  :reload    重新导入词表
  :pool N    设置候选池大小
  :quit      退出";

fn show_word(word: &Word) {
    let level = if word.progress.is_attempted() {
        format!("等级 {}", word.learned_lvl())
    } else {
        "新词".to_string()
    };
    println!();
    println!("[{}] {}  ({})", word.level, word.translation, level);
}

fn show_outcome(outcome: &AnswerOutcome) {
    if outcome.correct {
        println!("\u{2714} 正确: {}", outcome.expected_answer);
    } else {
        println!("\u{2718} 错误，正确答案: {}", outcome.expected_answer);
    }
    if !outcome.example_sentence.is_empty() {
        println!("  例句: {}", outcome.example_sentence);
    }
    println!("  新等级: {}", outcome.learned_lvl);
}

/// 重新导入词表并出第一题
///
/// 写库与 `import` 命令一样放在阻塞线程，完成后会话从新词表出题。
async fn reload(app: &App, session: &mut LearningSession) -> Result<Option<Word>> {
    let inserted = app.reload(&app.config.source).await?;
    println!("已重新导入 {} 个单词", inserted);
    Ok(session.restart()?)
}

pub async fn run(app: &App, pool_size: Option<usize>) -> Result<()> {
    app.ensure_ready().await?;

    let mut session =
        LearningSession::with_pool_size(app.store.clone(), pool_size.unwrap_or(app.config.pool_size))?;

    let first = session.load_next_word().cloned();
    let mut current = match first {
        Ok(word) => Some(word),
        Err(SessionError::Exhausted) => reload(app, &mut session).await?,
        Err(e) => return Err(e.into()),
    };

    println!("输入答案（冠词 + 单词），:help 查看命令");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(word) = current.as_ref() else {
            println!("全部单词已掌握，重新导入词表");
            current = reload(app, &mut session).await?;
            if current.is_none() {
                println!("词表为空，退出");
                return Ok(());
            }
            continue;
        };

        show_word(word);
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };

        match QuizInput::parse(&line?) {
            QuizInput::Answer(answer) => {
                let outcome = session.submit_and_advance(&answer)?;
                show_outcome(&outcome);
                current = outcome.next;
            }
            QuizInput::NeverAgain => match session.never_ask_again() {
                Ok(next) => {
                    println!("已标记为不再询问");
                    current = next;
                }
                Err(SessionError::InvariantViolation(reason)) => {
                    println!("{}", reason);
                }
                Err(e) => return Err(e.into()),
            },
            QuizInput::Progress => {
                print_report(&ProgressReport::collect(&session)?, &OutputFormat::Plain)?;
            }
            QuizInput::Reset => {
                session.reset_progress()?;
                current = session.current_word().cloned();
                println!("学习进度已重置");
            }
            QuizInput::Reload => {
                current = reload(app, &mut session).await?;
            }
            QuizInput::Pool(Some(size)) => match session.set_pool_size(size) {
                Ok(()) => println!("候选池大小: {}", session.pool_size()),
                Err(e) => println!("{}", e),
            },
            QuizInput::Pool(None) => {
                println!("用法: :pool N（当前 {}）", session.pool_size());
            }
            QuizInput::Help => println!("{}", HELP),
            QuizInput::Quit => break,
        }
    }

    let snapshot = session.progress()?;
    println!();
    println!(
        "本次结束，已学习 {} / {} 个单词",
        snapshot.studied_words, snapshot.words_in_db
    );

    Ok(())
}
