use anyhow::{Context, Result};

use wortschatz_core::source;
use wortschatz_core::{AppConfig, VocabularyStore, WordRecord};

/// CLI 命令共享的应用状态
pub struct App {
    pub config: AppConfig,
    pub store: VocabularyStore,
}

impl App {
    /// 按配置打开词表存储
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = VocabularyStore::open(&config.db_path, &config.table).with_context(|| {
            format!("无法打开数据库 {}", config.db_path.display())
        })?;

        Ok(Self { config, store })
    }

    /// 读取词表来源（文件或 URL）
    pub async fn fetch_records(&self, location: &str) -> Result<Vec<WordRecord>> {
        source::load(location)
            .await
            .with_context(|| format!("无法读取词表 {}", location))
    }

    /// 从来源重新导入词表
    ///
    /// 下载/解析在异步上下文完成，写库放到阻塞线程，与其他写操作共用连接锁。
    pub async fn reload(&self, location: &str) -> Result<usize> {
        let records = self.fetch_records(location).await?;

        let store = self.store.clone();
        let location_owned = location.to_string();
        let inserted =
            tokio::task::spawn_blocking(move || store.initialize(&records, &location_owned))
                .await
                .context("导入任务异常退出")?
                .context("写入词表失败")?;

        Ok(inserted)
    }

    /// 启动时确保有可出题的单词：词表不存在或已全部掌握时重新导入
    pub async fn ensure_ready(&self) -> Result<()> {
        let ready = self.store.is_initialized()?
            && self.store.fetch_random_unmastered(1)?.is_some();

        if !ready {
            log::info!("词表 {} 不可用，从 {} 重新导入", self.config.table, self.config.source);
            let source = self.config.source.clone();
            self.reload(&source).await?;
        } else if let Some(set) = self.store.vocabulary_set()? {
            log::info!(
                "使用词表 {}（{} 个单词，来自 {}，导入于 {}）",
                set.name,
                set.word_count,
                set.source,
                set.imported_at.format("%Y-%m-%d %H:%M")
            );
        }

        Ok(())
    }
}
