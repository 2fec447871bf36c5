use crate::error::{KrcloneError, Result};
use krclone_common::remote_source;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Nickel が内部ストレージをマウントする場所
pub const ONBOARD_MOUNT: &str = "/mnt/onboard/";
/// Nickel に隠れて内部ストレージを再マウントする場所
pub const PRIVATE_MOUNT: &str = "/mnt/tmponboard/";
/// 内部ストレージのブロックデバイス
pub const INTERNAL_DEVICE: &str = "/dev/mmcblk0p3";
/// マウントテーブル上での識別子
pub const INTERNAL_DEVICE_ID: &str = "mmcblk0p3";
pub const INTERNAL_FS_TYPE: &str = "vfat";
/// 内部ストレージ上の Nickel データベース
pub const NICKEL_DB: &str = ".kobo/KoboReader.sqlite";
/// Nickel のハードウェア状態パイプ
pub const HARDWARE_PIPE: &str = "/tmp/nickel-hardware-status";

pub const CONFIG_FILE_NAME: &str = "krclone-cfg.toml";
pub const MARKER_FILE_NAME: &str = "krmeta.lock";
pub const LOG_FILE_NAME: &str = "krclone.log";
pub const SIDECAR_FILE_NAME: &str = ".metadata.calibre";
pub const RCLONE_BIN_NAME: &str = "rclone";

/// krclone-cfg.toml の内容
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同期先（/mnt/onboard からの相対パス）
    #[serde(alias = "krclone_book_dir")]
    pub book_dir: String,
    /// rclone 設定ファイル（アプリディレクトリからの相対パス）
    pub rclone_config: String,
    pub rclone_remote_name: String,
    pub rclone_root_dir: String,
}

impl Config {
    pub fn load(app_dir: &Path) -> Result<Self> {
        let config_path = Self::config_path(app_dir);
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            KrcloneError::Config(format!("{}: {}", config_path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// 未指定のキーは空文字列になる
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 同期にはリモート名が必須（メタデータ反映だけなら不要）
    pub fn require_remote(&self) -> Result<()> {
        if self.rclone_remote_name.trim().is_empty() {
            return Err(KrcloneError::Config("rclone_remote_name is not set".into()));
        }
        Ok(())
    }

    pub fn config_path(app_dir: &Path) -> PathBuf {
        app_dir.join(CONFIG_FILE_NAME)
    }

    /// rclone に渡す同期元
    pub fn remote_source(&self) -> String {
        remote_source(&self.rclone_remote_name, &self.rclone_root_dir)
    }
}

/// 実行時に使うパス一式
#[derive(Debug, Clone)]
pub struct Paths {
    pub app_dir: PathBuf,
    pub rclone_bin: PathBuf,
    pub rclone_config: PathBuf,
    pub book_dir: PathBuf,
    pub sidecar: PathBuf,
    pub marker: PathBuf,
    pub private_mount: PathBuf,
    /// メタデータ反映中のカレントディレクトリ
    pub work_dir: PathBuf,
}

impl Paths {
    pub fn resolve(app_dir: &Path, config: &Config) -> Self {
        let book_dir = Path::new(ONBOARD_MOUNT).join(config.book_dir.trim_start_matches('/'));
        Self {
            app_dir: app_dir.to_path_buf(),
            rclone_bin: app_dir.join(RCLONE_BIN_NAME),
            rclone_config: app_dir.join(&config.rclone_config),
            sidecar: book_dir.join(SIDECAR_FILE_NAME),
            book_dir,
            marker: app_dir.join(MARKER_FILE_NAME),
            private_mount: PathBuf::from(PRIVATE_MOUNT),
            work_dir: PathBuf::from("/"),
        }
    }
}

/// ログファイルの場所。設定の読み込み失敗も記録するため、設定より先に決まる
pub fn log_file_path(app_dir: &Path) -> PathBuf {
    app_dir.join(LOG_FILE_NAME)
}

/// 実行ファイルの置き場所からアプリディレクトリを求める
pub fn discover_app_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| KrcloneError::AppDir(e.to_string()))?;
    app_dir_from_exe(&exe)
}

/// 実行ファイルのパスが /mnt/onboard 配下でなければ付け替える
pub fn app_dir_from_exe(exe: &Path) -> Result<PathBuf> {
    let exe = if exe.starts_with(ONBOARD_MOUNT) {
        exe.to_path_buf()
    } else {
        let relative = exe.strip_prefix("/").unwrap_or(exe);
        Path::new(ONBOARD_MOUNT).join(relative)
    };
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| KrcloneError::AppDir(format!("no parent for {}", exe.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(
            r#"
            book_dir = "books"
            rclone_config = "rclone.conf"
            rclone_remote_name = "mydrive"
            rclone_root_dir = "Kobo"
            "#,
        )
        .unwrap();
        assert_eq!(config.book_dir, "books");
        assert_eq!(config.remote_source(), "mydrive:Kobo");
    }

    #[test]
    fn test_parse_config_legacy_book_dir_key() {
        let config = Config::parse(
            r#"
            krclone_book_dir = "krclone"
            rclone_remote_name = "mydrive:"
            "#,
        )
        .unwrap();
        assert_eq!(config.book_dir, "krclone");
        assert_eq!(config.rclone_config, "");
        assert_eq!(config.remote_source(), "mydrive:");
    }

    #[test]
    fn test_parse_config_without_remote() {
        let config = Config::parse("book_dir = \"books\"").unwrap();
        assert_eq!(config.rclone_remote_name, "");

        let err = config.require_remote().unwrap_err();
        assert!(matches!(err, KrcloneError::Config(_)));
        assert!(err.is_process_fatal());
    }

    #[test]
    fn test_parse_config_invalid_toml() {
        let result = Config::parse("book_dir = ");
        assert!(matches!(result, Err(KrcloneError::ConfigParse(_))));
    }

    #[test]
    fn test_load_missing_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, KrcloneError::Config(_)));
        assert!(err.is_process_fatal());
    }

    #[test]
    fn test_resolve_paths() {
        let config = Config {
            book_dir: "books".into(),
            rclone_config: "rclone.conf".into(),
            rclone_remote_name: "mydrive".into(),
            rclone_root_dir: String::new(),
        };
        let paths = Paths::resolve(Path::new("/mnt/onboard/.adds/krclone"), &config);
        assert_eq!(paths.rclone_bin, Path::new("/mnt/onboard/.adds/krclone/rclone"));
        assert_eq!(
            paths.rclone_config,
            Path::new("/mnt/onboard/.adds/krclone/rclone.conf")
        );
        assert_eq!(paths.book_dir, Path::new("/mnt/onboard/books"));
        assert_eq!(paths.sidecar, Path::new("/mnt/onboard/books/.metadata.calibre"));
        assert_eq!(paths.marker, Path::new("/mnt/onboard/.adds/krclone/krmeta.lock"));
    }

    #[test]
    fn test_log_file_path() {
        assert_eq!(
            log_file_path(Path::new("/mnt/onboard/.adds/krclone")),
            Path::new("/mnt/onboard/.adds/krclone/krclone.log")
        );
    }

    #[test]
    fn test_app_dir_from_exe() {
        assert_eq!(
            app_dir_from_exe(Path::new("/mnt/onboard/.adds/krclone/krclone")).unwrap(),
            Path::new("/mnt/onboard/.adds/krclone")
        );
        assert_eq!(
            app_dir_from_exe(Path::new("/.adds/krclone/krclone")).unwrap(),
            Path::new("/mnt/onboard/.adds/krclone")
        );
    }
}
