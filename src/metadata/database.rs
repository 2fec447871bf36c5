//! Nickel データベース（KoboReader.sqlite）への書き込み

use crate::error::Result;
use krclone_common::BookMetadata;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, warn};

pub const UPDATE_CONTENT_SQL: &str =
    "UPDATE content SET Description=?, Series=?, SeriesNumber=? WHERE ContentID LIKE ?";

/// 更新結果の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// UPDATE を実行した件数
    pub attempted: usize,
    /// 変更された行数の合計
    pub updated_rows: usize,
    /// UPDATE が失敗した件数
    pub failed: usize,
    /// パスが空でスキップした件数
    pub skipped: usize,
}

pub struct NickelDatabase {
    conn: Connection,
}

impl NickelDatabase {
    /// 既存のデータベースを読み書きで開く（新規作成はしない）
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_SHARED_CACHE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// 各レコードを反映する。1件ごとの失敗はログに残して続行する
    pub fn apply(&self, records: &[BookMetadata]) -> Result<UpdateReport> {
        let mut stmt = self.conn.prepare(UPDATE_CONTENT_SQL)?;
        let mut report = UpdateReport::default();

        for record in records {
            let Some(pattern) = record.content_pattern() else {
                report.skipped += 1;
                continue;
            };
            report.attempted += 1;
            match stmt.execute(params![
                record.comments,
                record.series,
                record.series_number(),
                pattern
            ]) {
                Ok(rows) => {
                    debug!(lpath = %record.lpath, rows, "metadata updated");
                    report.updated_rows += rows;
                }
                Err(e) => {
                    warn!(lpath = %record.lpath, "metadata update failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}
