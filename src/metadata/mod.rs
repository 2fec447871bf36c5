//! メタデータ反映フェーズ
//!
//! 1. マーカー削除（途中で落ちても再実行しない）
//! 2. sidecar 読み込み
//! 3. USB 接続を装い、Nickel に内部ストレージをアンマウントさせる
//! 4. 内部ストレージを私的にマウントして content テーブルを更新
//! 5. アンマウントを確認してから USB 切断を通知

mod database;
mod remount;

pub use database::{NickelDatabase, UpdateReport, UPDATE_CONTENT_SQL};
pub use remount::{Mounter, PrivateMount, SyscallMounter};

use crate::config::{Paths, INTERNAL_DEVICE, INTERNAL_FS_TYPE, NICKEL_DB};
use crate::device::PhaseContext;
use crate::error::{KrcloneError, Result};
use crate::hardware::press_connect_button;
use crate::marker::PhaseMarker;
use krclone_common::{load_sidecar, BookMetadata};
use std::path::Path;
use tracing::{error, info, warn};

pub async fn run_metadata_phase(ctx: &PhaseContext, paths: &Paths) -> Result<UpdateReport> {
    let status = &ctx.status;

    // マウントポイント上に居座ると後のアンマウントを自分で妨げる
    if let Err(e) = std::env::set_current_dir(&paths.work_dir) {
        warn!(dir = %paths.work_dir.display(), "could not leave working directory: {}", e);
    }

    if let Err(e) = PhaseMarker::new(&paths.marker).clear() {
        warn!("could not remove phase marker: {}", e);
    }

    let records = match load_sidecar(&paths.sidecar) {
        Ok(records) => records,
        Err(e) => {
            status.line("Could not open Metadata File... Aborting!").await;
            return Err(KrcloneError::Metadata(format!(
                "{}: {}",
                paths.sidecar.display(),
                e
            )));
        }
    };

    if records.is_empty() {
        status.line("No metadata to update!").await;
        return Ok(UpdateReport::default());
    }

    info!(records = records.len(), "updating metadata");
    status.line("Updating Metadata...").await;
    ctx.signal_usb(true);

    if let Err(e) = press_connect_button(status, ctx.timings.connect_budget, None).await {
        if matches!(e, KrcloneError::ButtonNotFound { .. }) {
            status.line("The Connect screen never showed. Aborting!").await;
        }
        ctx.signal_usb(false);
        return Err(e);
    }

    let watcher = ctx.watcher();
    if let Err(e) = watcher.wait_for_unmount(ctx.timings.unmount_timeout).await {
        status.line("The filesystem did not unmount. Aborting!").await;
        ctx.signal_usb(false);
        return Err(e);
    }

    let outcome = update_on_private_mount(ctx, &paths.private_mount, &records);
    if let Err(e) = &outcome {
        status.line(e.user_message()).await;
    }

    // Nickel に戻す前に、私的マウントが外れたことを確認する
    if let Err(e) = watcher.wait_for_unmount(ctx.timings.unmount_timeout).await {
        status.line("The filesystem did not unmount. Aborting!").await;
        return Err(e);
    }
    ctx.signal_usb(false);

    let report = outcome?;
    info!(?report, "metadata update finished");
    status
        .line(format!(
            "Updated {} of {} books",
            report.attempted - report.failed,
            records.len()
        ))
        .await;
    status.line("Metadata update process complete!").await;
    Ok(report)
}

fn update_on_private_mount(
    ctx: &PhaseContext,
    mount_point: &Path,
    records: &[BookMetadata],
) -> Result<UpdateReport> {
    let mount = PrivateMount::acquire(
        ctx.device.mounter.clone(),
        Path::new(INTERNAL_DEVICE),
        mount_point,
        INTERNAL_FS_TYPE,
    )?;

    let written = write_records(&mount.path().join(NICKEL_DB), records);
    let released = mount.release();

    match (written, released) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), released) => {
            if let Err(release_error) = released {
                error!("{}", release_error);
            }
            Err(e)
        }
    }
}

fn write_records(db_path: &Path, records: &[BookMetadata]) -> Result<UpdateReport> {
    let db = NickelDatabase::open(db_path)?;
    let report = db.apply(records)?;
    db.close()?;
    Ok(report)
}
