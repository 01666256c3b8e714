use anyhow::{bail, Result};

use crate::app::App;

pub fn run(app: &App) -> Result<()> {
    if !app.store.is_initialized()? {
        bail!("词表 {} 尚未导入，无需重置", app.config.table);
    }

    app.store.reset_all_progress()?;
    println!("已重置词表 {} 的全部学习进度", app.config.table);
    Ok(())
}
