//! Calibre メタデータ sidecar（`.metadata.calibre`）
//!
//! Calibre が書き出す JSON 配列のうち、Nickel の content テーブルへ
//! 反映する4項目だけを読む。未知のフィールドは無視し、欠落や `null` は
//! 空文字列 / 0 として扱う。

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// 1冊分のメタデータ
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookMetadata {
    /// ライブラリ相対パス（ContentID の末尾と照合するキー）
    #[serde(deserialize_with = "null_as_default")]
    pub lpath: String,

    #[serde(deserialize_with = "null_as_default")]
    pub series: String,

    #[serde(deserialize_with = "null_as_default")]
    pub series_index: f64,

    /// 説明文（Description 列へ）
    #[serde(deserialize_with = "null_as_default")]
    pub comments: String,
}

impl BookMetadata {
    /// SeriesNumber 列に書き込む文字列
    pub fn series_number(&self) -> String {
        format_series_index(self.series_index)
    }

    /// ContentID を照合する LIKE パターン。パスが空なら `None`
    pub fn content_pattern(&self) -> Option<String> {
        if self.lpath.is_empty() {
            None
        } else {
            Some(like_pattern(&self.lpath))
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// シリーズ番号を最短の10進表記にする
///
/// `3.0` → `"3"`、`2.5` → `"2.5"`。負数・NaN・無限大は `"0"`。
///
/// # Examples
/// ```
/// use krclone_common::format_series_index;
///
/// assert_eq!(format_series_index(3.0), "3");
/// assert_eq!(format_series_index(2.5), "2.5");
/// ```
pub fn format_series_index(index: f64) -> String {
    if !index.is_finite() || index <= 0.0 {
        return "0".to_string();
    }
    // f64 の Display は指数表記を使わず、往復可能な最短桁数で出力する
    format!("{}", index)
}

/// ContentID の後方一致パターン（`%` + パス）
pub fn like_pattern(lpath: &str) -> String {
    format!("%{}", lpath)
}

/// sidecar の JSON 文字列をパース
pub fn parse_sidecar(json: &str) -> Result<Vec<BookMetadata>> {
    let trimmed = json.trim();
    if !trimmed.starts_with('[') {
        return Err(Error::Sidecar("metadata file is not a JSON array".into()));
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// sidecar ファイルを読み込む
pub fn load_sidecar(path: &Path) -> Result<Vec<BookMetadata>> {
    let content = std::fs::read_to_string(path)?;
    parse_sidecar(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_series_index_minimal_decimal() {
        assert_eq!(format_series_index(3.0), "3");
        assert_eq!(format_series_index(2.5), "2.5");
        assert_eq!(format_series_index(10.25), "10.25");
        assert_eq!(format_series_index(0.0), "0");
    }

    #[test]
    fn test_format_series_index_rejects_negative_and_nan() {
        assert_eq!(format_series_index(-1.0), "0");
        assert_eq!(format_series_index(-0.0), "0");
        assert_eq!(format_series_index(f64::NAN), "0");
        assert_eq!(format_series_index(f64::INFINITY), "0");
    }

    #[test]
    fn test_parse_sidecar_calibre_fields() {
        let json = r#"[
            {
                "lpath": "Author/Book One.epub",
                "series": "Saga",
                "series_index": 2.0,
                "comments": "<p>First</p>",
                "title": "Book One",
                "authors": ["Author"]
            }
        ]"#;
        let records = parse_sidecar(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].lpath, "Author/Book One.epub");
        assert_eq!(records[0].series, "Saga");
        assert_eq!(records[0].series_number(), "2");
        assert_eq!(records[0].comments, "<p>First</p>");
    }

    #[test]
    fn test_parse_sidecar_nulls_and_missing_fields() {
        let json = r#"[{"lpath": "a.epub", "series": null, "series_index": null}]"#;
        let records = parse_sidecar(json).unwrap();
        assert_eq!(records[0].series, "");
        assert_eq!(records[0].series_index, 0.0);
        assert_eq!(records[0].comments, "");
    }

    #[test]
    fn test_parse_sidecar_empty_array() {
        assert!(parse_sidecar("[]").unwrap().is_empty());
        assert!(parse_sidecar("  []\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sidecar_rejects_non_array() {
        assert!(matches!(parse_sidecar("{}"), Err(Error::Sidecar(_))));
        assert!(matches!(parse_sidecar(""), Err(Error::Sidecar(_))));
        assert!(matches!(parse_sidecar("[{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_content_pattern() {
        let record = BookMetadata {
            lpath: "Author/Book.kepub.epub".to_string(),
            ..Default::default()
        };
        assert_eq!(
            record.content_pattern().as_deref(),
            Some("%Author/Book.kepub.epub")
        );
        assert_eq!(BookMetadata::default().content_pattern(), None);
    }
}
