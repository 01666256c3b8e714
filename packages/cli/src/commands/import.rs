use anyhow::Result;

use crate::app::App;

pub async fn run(app: &App, source: Option<&str>) -> Result<()> {
    let location = source.unwrap_or(app.config.source.as_str());
    let inserted = app.reload(location).await?;

    println!(
        "已从 {} 导入 {} 个单词到词表 {}",
        location, inserted, app.config.table
    );
    Ok(())
}
