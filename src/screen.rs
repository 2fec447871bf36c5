//! 画面描画・ボタン探索（FBInk）
//!
//! 画面とタッチは同じデバイスハンドルを共有するため、[`Screen`] は
//! ステータス表示タスクだけが所有する。

use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// ボタン探索の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonScan {
    /// 接続ボタンを見つけて押した
    Pressed,
    /// ボタンがまだ表示されていない
    Absent,
    /// タッチデバイスが使えない（リトライしない）
    Unavailable(String),
}

/// 画面デバイス
pub trait Screen: Send + 'static {
    /// `row` 行目から `text` を描画し、使った行数を返す
    fn print(&mut self, text: &str, row: u16) -> std::io::Result<u16>;

    /// 接続ボタンを探し、`press` なら押す
    fn button_scan(&mut self, press: bool) -> ButtonScan;
}

/// `fbink` コマンド経由の画面
#[derive(Debug, Clone)]
pub struct FbinkCli {
    bin: PathBuf,
    font_mult: u8,
}

impl Default for FbinkCli {
    fn default() -> Self {
        Self::new("fbink", 3)
    }
}

impl FbinkCli {
    pub fn new(bin: impl Into<PathBuf>, font_mult: u8) -> Self {
        Self {
            bin: bin.into(),
            font_mult,
        }
    }
}

impl Screen for FbinkCli {
    fn print(&mut self, text: &str, row: u16) -> std::io::Result<u16> {
        let output = Command::new(&self.bin)
            .args(["-q", "-l", "-x", "1"])
            .arg("-y")
            .arg(row.to_string())
            .arg("-S")
            .arg(self.font_mult.to_string())
            .arg(text)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(std::io::Error::other(format!(
                "fbink failed (code {:?}): {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_line_count(&stdout))
    }

    fn button_scan(&mut self, press: bool) -> ButtonScan {
        let mode = if press { "--button_scan=press" } else { "--button_scan" };
        match Command::new(&self.bin).args(["-q", mode]).status() {
            Ok(status) => {
                let outcome = classify_scan_exit(status.code());
                debug!(code = ?status.code(), ?outcome, "button scan");
                outcome
            }
            Err(e) => {
                warn!("could not run fbink: {}", e);
                ButtonScan::Unavailable(e.to_string())
            }
        }
    }
}

/// `fbink -l` の出力から行数を読む（最終行）。読めなければ1行とみなす
pub fn parse_line_count(stdout: &str) -> u16 {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().parse::<u16>().ok())
        .filter(|&rows| rows > 0)
        .unwrap_or(1)
}

/// ボタン探索の終了コードを分類
///
/// FBInk は `-errno` を返すため、終了コードは `errno` そのものか
/// 256 から引いた値になる。
pub fn classify_scan_exit(code: Option<i32>) -> ButtonScan {
    let is_errno = |errno: i32, code: i32| code == errno || code == 256 - errno;
    match code {
        Some(0) => ButtonScan::Pressed,
        Some(c) if is_errno(libc::ENODEV, c) => {
            ButtonScan::Unavailable("touch event failure (ENODEV)".into())
        }
        Some(c) if is_errno(libc::ENOTSUP, c) => {
            ButtonScan::Unavailable("button press unsupported (ENOTSUP)".into())
        }
        Some(_) => ButtonScan::Absent,
        // シグナルで終了
        None => ButtonScan::Absent,
    }
}
