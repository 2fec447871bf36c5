//! 実行フェーズの振り分け
//!
//! マーカーがあればメタデータ反映、なければ同期を行う。失敗したフェーズは
//! 自動で再試行しない。ユーザーが再実行すればマーカーに従って再開する。

use crate::cli::PhaseChoice;
use crate::config::{Config, Paths};
use crate::device::PhaseContext;
use crate::error::{KrcloneError, Result};
use crate::marker::PhaseMarker;
use crate::metadata::run_metadata_phase;
use crate::status::StatusHandle;
use crate::sync_phase::run_sync_phase;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sync,
    Metadata,
}

impl Phase {
    pub fn select(choice: PhaseChoice, marker: &PhaseMarker) -> Self {
        match choice {
            PhaseChoice::Sync => Phase::Sync,
            PhaseChoice::Metadata => Phase::Metadata,
            PhaseChoice::Auto if marker.exists() => Phase::Metadata,
            PhaseChoice::Auto => Phase::Sync,
        }
    }
}

/// 設定を読み込んでフェーズを実行する
pub async fn run(ctx: &PhaseContext, app_dir: &Path, choice: PhaseChoice) -> Result<Phase> {
    let config = Config::load(app_dir)?;
    let paths = Paths::resolve(app_dir, &config);
    info!(app_dir = %app_dir.display(), book_dir = %paths.book_dir.display(), "configuration loaded");
    run_with(ctx, &paths, &config, choice).await
}

pub async fn run_with(
    ctx: &PhaseContext,
    paths: &Paths,
    config: &Config,
    choice: PhaseChoice,
) -> Result<Phase> {
    let phase = Phase::select(choice, &PhaseMarker::new(&paths.marker));
    info!(?phase, ?choice, "running phase");
    match phase {
        Phase::Sync => {
            run_sync_phase(ctx, paths, config).await?;
        }
        Phase::Metadata => {
            let report = run_metadata_phase(ctx, paths).await?;
            info!(?report, "metadata phase finished");
        }
    }
    Ok(phase)
}

/// 実行結果の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// フェーズ単位の失敗（ログに残して正常終了）
    PhaseFailed,
    Fatal,
}

impl RunOutcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunOutcome::Completed | RunOutcome::PhaseFailed => ExitCode::SUCCESS,
            RunOutcome::Fatal => ExitCode::FAILURE,
        }
    }
}

/// 結果をログと画面に反映する
///
/// プロセス致命的なエラーは画面に表示したまま `linger` だけ待つ。
pub async fn finish(status: &StatusHandle, result: Result<Phase>, linger: Duration) -> RunOutcome {
    match result {
        Ok(phase) => {
            info!(?phase, "run complete");
            RunOutcome::Completed
        }
        Err(e) if e.is_process_fatal() => {
            error!("fatal: {}", e);
            status.line(e.user_message()).await;
            tokio::time::sleep(linger).await;
            RunOutcome::Fatal
        }
        Err(KrcloneError::ReporterClosed) => {
            error!("status reporter stopped unexpectedly");
            RunOutcome::Fatal
        }
        Err(e) => {
            warn!("phase aborted: {}", e);
            RunOutcome::PhaseFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusReporter;
    use crate::testing::FakeScreen;

    #[test]
    fn test_select_phase_by_marker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = PhaseMarker::new(dir.path().join("krmeta.lock"));
        assert_eq!(Phase::select(PhaseChoice::Auto, &marker), Phase::Sync);

        marker.create().unwrap();
        assert_eq!(Phase::select(PhaseChoice::Auto, &marker), Phase::Metadata);
        assert_eq!(Phase::select(PhaseChoice::Sync, &marker), Phase::Sync);
    }

    #[test]
    fn test_forced_metadata_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = PhaseMarker::new(dir.path().join("krmeta.lock"));
        assert_eq!(Phase::select(PhaseChoice::Metadata, &marker), Phase::Metadata);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_fatal_shows_message_and_lingers() {
        let screen = FakeScreen::new();
        let (status, reporter) = StatusReporter::spawn(screen.clone(), 5);
        let start = tokio::time::Instant::now();

        let outcome = finish(
            &status,
            Err(KrcloneError::MountTable("gone".into())),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome, RunOutcome::Fatal);
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        drop(status);
        reporter.await.unwrap();
        assert!(screen.shown("Mount status unavailable! Aborting."));
    }

    #[tokio::test]
    async fn test_finish_phase_failure_exits_cleanly() {
        let (status, reporter) = StatusReporter::spawn(FakeScreen::new(), 5);
        let outcome = finish(
            &status,
            Err(KrcloneError::ButtonNotFound { attempts: 10 }),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome, RunOutcome::PhaseFailed);
        drop(status);
        reporter.await.unwrap();
    }
}
