use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "krclone", version)]
#[command(about = "Kobo 向け rclone 同期・メタデータ反映ツール", long_about = None)]
pub struct Cli {
    /// アプリディレクトリ（省略時は実行ファイルの場所）
    #[arg(long)]
    pub app_dir: Option<PathBuf>,

    /// 詳細ログを出力
    #[arg(short, long)]
    pub verbose: bool,

    /// 実行するフェーズ (auto/sync/metadata)
    #[arg(long, value_enum, default_value = "auto")]
    pub phase: PhaseChoice,
}

/// 実行フェーズの指定
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PhaseChoice {
    /// マーカーの有無で決める
    #[default]
    Auto,
    Sync,
    Metadata,
}
