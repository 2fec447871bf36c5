//! マウント状態の監視
//!
//! Nickel によるマウント/アンマウントは完了通知がないため、
//! マウントテーブルを一定間隔でポーリングして待つ。

use crate::error::{KrcloneError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// マウントテーブルの読み取り
pub trait MountTable: Send + Sync {
    /// `device_id` を含むデバイスがマウントされているか
    fn is_mounted(&self, device_id: &str) -> Result<bool>;
}

/// /proc/mounts を毎回読み直すマウントテーブル
#[derive(Debug, Clone)]
pub struct ProcMounts {
    path: PathBuf,
}

impl Default for ProcMounts {
    fn default() -> Self {
        Self::with_path("/proc/mounts")
    }
}

impl ProcMounts {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MountTable for ProcMounts {
    fn is_mounted(&self, device_id: &str) -> Result<bool> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| KrcloneError::MountTable(format!("{}: {}", self.path.display(), e)))?;
        Ok(mount_table_contains(&content, device_id))
    }
}

/// マウントテーブルの内容に `device_id` のデバイスが含まれるか
pub fn mount_table_contains(content: &str, device_id: &str) -> bool {
    content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|device| device.contains(device_id))
}

/// タイムアウトまでのポーリング回数（切り上げ、最低1回）
pub fn poll_count(timeout: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return 1;
    }
    let count = timeout.as_nanos().div_ceil(interval.as_nanos());
    count.clamp(1, u32::MAX as u128) as u32
}

/// 内部ストレージのマウント状態を待つ
#[derive(Clone)]
pub struct MountWatcher {
    table: Arc<dyn MountTable>,
    device_id: String,
    poll_interval: Duration,
}

impl MountWatcher {
    pub fn new(table: Arc<dyn MountTable>, device_id: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            table,
            device_id: device_id.into(),
            poll_interval,
        }
    }

    pub fn is_unmounted(&self) -> Result<bool> {
        Ok(!self.table.is_mounted(&self.device_id)?)
    }

    pub async fn wait_for_unmount(&self, timeout: Duration) -> Result<()> {
        self.wait_until(true, timeout).await
    }

    pub async fn wait_for_mount(&self, timeout: Duration) -> Result<()> {
        self.wait_until(false, timeout).await
    }

    async fn wait_until(&self, unmounted: bool, timeout: Duration) -> Result<()> {
        let attempts = poll_count(timeout, self.poll_interval);
        for attempt in 1..=attempts {
            tokio::time::sleep(self.poll_interval).await;
            if self.is_unmounted()? == unmounted {
                debug!(device = %self.device_id, attempt, unmounted, "mount state reached");
                return Ok(());
            }
        }
        let what = if unmounted { "unmount" } else { "mount" };
        Err(KrcloneError::Timeout(format!(
            "internal memory did not {} within {:?}",
            what, timeout
        )))
    }
}
