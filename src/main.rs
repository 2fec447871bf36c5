use clap::Parser;
use krclone_common::DEFAULT_WINDOW;
use krclone_rust::{cli, config, device, logging, screen, status, timings, workflow};
use cli::Cli;
use device::{Device, PhaseContext};
use screen::FbinkCli;
use status::StatusReporter;
use std::process::ExitCode;
use timings::Timings;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let app_dir = match cli.app_dir.clone() {
        Some(dir) => Ok(dir),
        None => config::discover_app_dir(),
    };

    let log_file = app_dir.as_ref().ok().map(|dir| config::log_file_path(dir));
    let _log_guard = match logging::init(log_file.as_deref(), cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログを初期化できません: {:#}", e);
            None
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "krclone starting");

    let (status, reporter) = StatusReporter::spawn(FbinkCli::default(), DEFAULT_WINDOW);
    let timings = Timings::default();
    let linger = timings.fatal_linger;
    let ctx = PhaseContext::new(status.clone(), Device::kobo(), timings);

    let result = match app_dir {
        Ok(dir) => workflow::run(&ctx, &dir, cli.phase).await,
        Err(e) => Err(e),
    };
    let outcome = workflow::finish(&status, result, linger).await;

    // 全ハンドルを手放すと表示タスクが画面を解放して終了する
    drop(ctx);
    drop(status);
    if let Err(e) = reporter.await {
        error!("status reporter failed: {}", e);
    }
    outcome.exit_code()
}
