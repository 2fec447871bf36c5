//! rclone リモート指定と引数の組み立て

use std::ffi::OsString;
use std::path::Path;

/// rclone のリモート名区切り文字
pub const REMOTE_SEPARATOR: char = ':';

/// リモート名の末尾を必ず `:` にする
///
/// # Examples
/// ```
/// use krclone_common::normalize_remote;
///
/// assert_eq!(normalize_remote("mydrive"), "mydrive:");
/// assert_eq!(normalize_remote("mydrive:"), "mydrive:");
/// ```
pub fn normalize_remote(name: &str) -> String {
    let name = name.trim();
    if name.ends_with(REMOTE_SEPARATOR) {
        name.to_string()
    } else {
        format!("{}{}", name, REMOTE_SEPARATOR)
    }
}

/// 同期元（`<remote>:<root_dir>`）
pub fn remote_source(remote_name: &str, root_dir: &str) -> String {
    let root_dir = root_dir.trim().trim_start_matches('/');
    format!("{}{}", normalize_remote(remote_name), root_dir)
}

/// `rclone sync <source> <local> --config <config>` の引数
pub fn sync_args(source: &str, local_dir: &Path, config: &Path) -> Vec<OsString> {
    vec![
        OsString::from("sync"),
        OsString::from(source),
        local_dir.as_os_str().to_owned(),
        OsString::from("--config"),
        config.as_os_str().to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_remote() {
        assert_eq!(normalize_remote("mydrive"), "mydrive:");
        assert_eq!(normalize_remote("mydrive:"), "mydrive:");
        assert_eq!(normalize_remote(" mydrive "), "mydrive:");
    }

    #[test]
    fn test_remote_source_with_root_dir() {
        assert_eq!(remote_source("mydrive", ""), "mydrive:");
        assert_eq!(remote_source("mydrive:", "Books"), "mydrive:Books");
        assert_eq!(remote_source("mydrive", "/Books/Kobo"), "mydrive:Books/Kobo");
    }

    #[test]
    fn test_sync_args_order() {
        let args = sync_args(
            "mydrive:Books",
            Path::new("/mnt/onboard/books"),
            Path::new("/mnt/onboard/.adds/krclone/rclone.conf"),
        );
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "sync",
                "mydrive:Books",
                "/mnt/onboard/books",
                "--config",
                "/mnt/onboard/.adds/krclone/rclone.conf",
            ]
        );
    }
}
