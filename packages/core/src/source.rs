//! 词表数据源
//!
//! 从本地 CSV 文件或在线发布的表格（CSV 导出链接）读取词条。
//! 只读取必需的六列，其余列忽略；空的冠词/复数单元格视为缺失。

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::storage::WordRecord;

/// CSV 中必需的列名
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Level",
    "Artikel",
    "Deutsch",
    "Plural",
    "Englisch",
    "Beispielsatz",
];

/// 数据源错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("下载词表失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV 缺少必需的列: {0}")]
    MissingColumn(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// CSV 中的一行
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Level")]
    level: String,
    #[serde(rename = "Artikel")]
    article: Option<String>,
    #[serde(rename = "Deutsch")]
    headword: String,
    #[serde(rename = "Plural")]
    plural: Option<String>,
    #[serde(rename = "Englisch")]
    translation: String,
    #[serde(rename = "Beispielsatz", default)]
    example_sentence: String,
}

/// 空白字符串视为缺失
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<CsvRow> for WordRecord {
    fn from(row: CsvRow) -> Self {
        WordRecord {
            level: row.level,
            article: non_empty(row.article),
            headword: row.headword,
            plural: non_empty(row.plural),
            translation: row.translation,
            example_sentence: row.example_sentence,
        }
    }
}

/// 从任意 reader 读取 CSV 词条
pub fn read_csv<R: Read>(reader: R) -> SourceResult<Vec<WordRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == *column))
    {
        return Err(SourceError::MissingColumn(missing.to_string()));
    }

    // 去掉 BOM 后的表头写回，保证按列名反序列化
    reader.set_headers(csv::StringRecord::from(headers));

    let records = reader
        .deserialize::<CsvRow>()
        .map(|row| row.map(WordRecord::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// 从本地 CSV 文件读取词条
pub fn read_from_file<P: AsRef<Path>>(path: P) -> SourceResult<Vec<WordRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    let records = read_csv(file)?;
    log::info!(
        "从 {} 读取 {} 个词条",
        path.as_ref().display(),
        records.len()
    );
    Ok(records)
}

/// 下载在线发布的 CSV 词表
pub async fn fetch_from_url(url: &str) -> SourceResult<Vec<WordRecord>> {
    let body = reqwest::get(url).await?.error_for_status()?.bytes().await?;
    let records = read_csv(body.as_ref())?;
    log::info!("从 {} 下载 {} 个词条", url, records.len());
    Ok(records)
}

/// 是否为远程地址
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// 按地址类型读取词表：URL 走下载，其余按本地文件处理
pub async fn load(location: &str) -> SourceResult<Vec<WordRecord>> {
    if is_remote(location) {
        fetch_from_url(location).await
    } else {
        read_from_file(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Level,Artikel,Deutsch,Plural,Englisch,Beispielsatz,Notiz
A1,der,Tisch,Tische,table,Der Tisch ist groß.,x
A1,,gehen,,to go,Wir gehen.,
B1,die,Umgebung,Umgebungen,surroundings,\"Die Umgebung ist schön, oder?\",
";

    #[test]
    fn test_read_csv() {
        let records = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(
            records[0],
            WordRecord::new("A1", Some("der"), "Tisch", Some("Tische"), "table", "Der Tisch ist groß.")
        );
        assert_eq!(records[1].article, None);
        assert_eq!(records[1].plural, None);
        assert_eq!(records[2].example_sentence, "Die Umgebung ist schön, oder?");
    }

    #[test]
    fn test_read_csv_with_bom() {
        let with_bom = format!("\u{feff}{}", SAMPLE);
        let records = read_csv(with_bom.as_bytes()).unwrap();
        assert_eq!(records[0].level, "A1");
    }

    #[test]
    fn test_missing_column() {
        let csv = "Level,Artikel,Deutsch,Plural,Beispielsatz\nA1,der,Tisch,Tische,x\n";
        match read_csv(csv.as_bytes()) {
            Err(SourceError::MissingColumn(column)) => assert_eq!(column, "Englisch"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://docs.google.com/spreadsheets/d/x/pub?output=csv"));
        assert!(is_remote("http://localhost/words.csv"));
        assert!(!is_remote("./words.csv"));
    }

    #[test]
    fn test_read_from_missing_file() {
        assert!(matches!(
            read_from_file("/nonexistent/words.csv"),
            Err(SourceError::Io(_))
        ));
    }
}
