use thiserror::Error;

#[derive(Error, Debug)]
pub enum KrcloneError {
    #[error("application directory unavailable: {0}")]
    AppDir(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("mount table unavailable: {0}")]
    MountTable(String),

    #[error("{0}")]
    Timeout(String),

    #[error("connect button not found after {attempts} attempts")]
    ButtonNotFound { attempts: u32 },

    #[error("touch device unavailable: {0}")]
    TouchUnavailable(String),

    #[error("rclone sync failed: {0}")]
    SyncFailed(String),

    #[error("metadata file unreadable: {0}")]
    Metadata(String),

    #[error("private remount failed: {0}")]
    Remount(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("status reporter has stopped")]
    ReporterClosed,

    #[error(transparent)]
    Common(#[from] krclone_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KrcloneError {
    /// プロセスを異常終了させるべきエラーか
    ///
    /// それ以外はフェーズ単位の失敗で、ログを残して正常終了する。
    pub fn is_process_fatal(&self) -> bool {
        matches!(
            self,
            KrcloneError::AppDir(_)
                | KrcloneError::Config(_)
                | KrcloneError::ConfigParse(_)
                | KrcloneError::MountTable(_)
                | KrcloneError::TouchUnavailable(_)
        )
    }

    /// 画面に出す短いメッセージ（詳細はログへ）
    pub fn user_message(&self) -> &'static str {
        match self {
            KrcloneError::AppDir(_) => "Could not get current directory. Aborting!",
            KrcloneError::Config(_) | KrcloneError::ConfigParse(_) => {
                "Couldn't read config file. Aborting!"
            }
            KrcloneError::MountTable(_) => "Mount status unavailable! Aborting.",
            KrcloneError::TouchUnavailable(_) => "Touch device unavailable. Aborting!",
            KrcloneError::Timeout(_) => "The filesystem did not respond in time. Aborting!",
            KrcloneError::ButtonNotFound { .. } => "The Connect screen never showed. Aborting!",
            KrcloneError::SyncFailed(_) => "Rclone sync failed. Aborting!",
            KrcloneError::Metadata(_) | KrcloneError::Common(_) => {
                "Could not open Metadata File... Aborting!"
            }
            KrcloneError::Remount(_) => "The sneaky remount failed. Aborting!",
            KrcloneError::Database(_) => "Could not open database. Metadata not updated",
            KrcloneError::ReporterClosed | KrcloneError::Io(_) => "Unexpected error. Aborting!",
        }
    }
}

pub type Result<T> = std::result::Result<T, KrcloneError>;
