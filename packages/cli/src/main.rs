mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wortschatz_core::AppConfig;

#[derive(Parser)]
#[command(name = "wortschatz", about = "终端背单词：导入词表、出题、记录学习进度", version)]
struct Cli {
    /// 数据库文件路径（默认读取 WORTSCHATZ_DB_PATH）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 词表名称（默认读取 WORTSCHATZ_TABLE）
    #[arg(long, global = true)]
    table: Option<String>,

    /// 词表来源：CSV 文件路径或在线表格的 CSV 链接（默认读取 WORTSCHATZ_SOURCE）
    #[arg(long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// 开始出题（默认）
    Quiz {
        /// 候选池大小
        #[arg(long)]
        pool_size: Option<usize>,
    },

    /// 重新导入词表（会清空学习进度）
    Import {
        /// CSV 文件路径或 URL
        source: Option<String>,
    },

    /// 查看学习进度
    Progress {
        /// 输出格式
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },

    /// 重置全部学习进度
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(table) = cli.table {
        config.table = table;
    }
    if let Some(source) = cli.source {
        config.source = source;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let app = app::App::new(config)?;

    match cli.command.unwrap_or(Command::Quiz { pool_size: None }) {
        Command::Quiz { pool_size } => {
            commands::quiz::run(&app, pool_size).await?;
        }
        Command::Import { source } => {
            commands::import::run(&app, source.as_deref()).await?;
        }
        Command::Progress { format } => {
            commands::progress::run(&app, &format)?;
        }
        Command::Reset => {
            commands::reset::run(&app)?;
        }
    }

    let app::App { store, .. } = app;
    store.close()?;
    Ok(())
}
