//! ログ出力（アプリディレクトリの krclone.log）

use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// tracing を初期化する。ファイル出力時は戻り値のガードを保持しておくこと
///
/// `log_file` が `None` の場合は標準エラーへ出力する。
pub fn init(log_file: Option<&Path>, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("krclone={level},krclone_rust={level}")));

    let Some(log_file) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("failed to initialize tracing")?;
        return Ok(None);
    };

    let dir = log_file
        .parent()
        .context("log file has no parent directory")?;
    let file_name = log_file
        .file_name()
        .context("log file has no file name")?
        .to_string_lossy()
        .to_string();

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("failed to open log file in {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .context("failed to initialize tracing")?;

    Ok(Some(guard))
}
