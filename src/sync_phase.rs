//! 同期フェーズ
//!
//! rclone で本を取得し、USB 接続を装って Nickel に取り込ませる。
//! 成功したらマーカーを作成し、次回の実行でメタデータを反映する。

use crate::config::{Config, Paths};
use crate::device::PhaseContext;
use crate::error::{KrcloneError, Result};
use crate::hardware::press_connect_button;
use crate::marker::PhaseMarker;
use krclone_common::sync_args;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// 同期フェーズの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Running,
    Succeeded,
    Failed,
}

pub async fn run_sync_phase(ctx: &PhaseContext, paths: &Paths, config: &Config) -> Result<SyncState> {
    let status = &ctx.status;
    config.require_remote()?;
    let source = config.remote_source();
    let args = sync_args(&source, &paths.book_dir, &paths.rclone_config);

    info!(state = ?SyncState::Running, %source, dest = %paths.book_dir.display(), "starting sync");
    status.line("Starting Sync... Please wait.").await;

    if let Err(e) = run_rclone(ctx, &paths.rclone_bin, &args).await {
        warn!(state = ?SyncState::Failed, "{}", e);
        status.line("Rclone sync failed. Aborting!").await;
        return Err(e);
    }

    // 取り込み時間は新規ファイル数に比例するため、長い予算で待つ
    status.line("Simulating USB... Please wait.").await;
    ctx.signal_usb(true);
    status.line(" ").await;
    if let Err(e) =
        press_connect_button(status, ctx.timings.import_budget, Some("Waiting for Nickel")).await
    {
        if matches!(e, KrcloneError::ButtonNotFound { .. }) {
            status
                .line("We never got the connect screen! Nickel may not have imported content.")
                .await;
        }
        ctx.signal_usb(false);
        return Err(e);
    }

    tokio::time::sleep(ctx.timings.import_settle).await;
    ctx.signal_usb(false);
    status.line("Done! Please rerun to update metadata.").await;

    if let Err(e) = ctx.watcher().wait_for_mount(ctx.timings.mount_timeout).await {
        status.line("Nickel did not remount the filesystem.").await;
        return Err(e);
    }

    PhaseMarker::new(&paths.marker).create()?;
    info!(state = ?SyncState::Succeeded, "sync finished");
    status.line(" ").await;
    Ok(SyncState::Succeeded)
}

/// rclone を起動し、終了までスピナーを回す
async fn run_rclone(ctx: &PhaseContext, bin: &Path, args: &[OsString]) -> Result<()> {
    let child = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| KrcloneError::SyncFailed(format!("could not start {}: {}", bin.display(), e)))?;

    let (done_tx, mut done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = done_tx.send(child.wait_with_output().await);
    });

    ctx.status.line(" ").await;
    let mut ticker = tokio::time::interval(ctx.timings.spinner_interval);
    let output = loop {
        tokio::select! {
            result = &mut done_rx => {
                break result.map_err(|_| KrcloneError::SyncFailed("rclone task vanished".into()))?;
            }
            _ = ticker.tick() => ctx.status.spin("Waiting for Rclone").await,
        }
    };

    let output = output.map_err(|e| KrcloneError::SyncFailed(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        return Err(KrcloneError::SyncFailed(format!(
            "rclone exited with {}: {}",
            output.status,
            tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
        )));
    }
    Ok(())
}
