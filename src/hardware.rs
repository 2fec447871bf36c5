//! USB 接続の疑似イベントと接続ボタンの押下
//!
//! Nickel はハードウェア状態パイプを監視しており、`usb plug add` を
//! 書き込むと USB ケーブルが挿されたと判断して「接続」ボタンを表示する。

use crate::error::{KrcloneError, Result};
use crate::screen::ButtonScan;
use crate::status::StatusHandle;
use crate::timings::RetryBudget;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbEvent {
    Plug,
    Unplug,
}

impl UsbEvent {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            UsbEvent::Plug
        } else {
            UsbEvent::Unplug
        }
    }

    /// パイプに書き込む制御文字列
    pub fn command(&self) -> &'static str {
        match self {
            UsbEvent::Plug => "usb plug add",
            UsbEvent::Unplug => "usb plug remove",
        }
    }
}

/// Nickel への制御チャネル（書き込み専用、応答なし）
pub trait UsbChannel: Send + Sync {
    fn send(&self, event: UsbEvent) -> std::io::Result<()>;
}

/// 名前付きパイプ /tmp/nickel-hardware-status
#[derive(Debug, Clone)]
pub struct NickelPipe {
    path: PathBuf,
}

impl Default for NickelPipe {
    fn default() -> Self {
        Self::new(crate::config::HARDWARE_PIPE)
    }
}

impl NickelPipe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UsbChannel for NickelPipe {
    fn send(&self, event: UsbEvent) -> std::io::Result<()> {
        // 読み書き両用で開けば、読み手がいなくてもブロックしない
        let mut pipe = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)?;
        pipe.write_all(event.command().as_bytes())?;
        Ok(())
    }
}

/// USB の抜き差しを通知する。失敗はログのみ
pub fn signal_usb(channel: &dyn UsbChannel, connected: bool) {
    let event = UsbEvent::from_connected(connected);
    match channel.send(event) {
        Ok(()) => info!(command = event.command(), "hardware event sent"),
        Err(e) => warn!(command = event.command(), "hardware event not delivered: {}", e),
    }
}

/// 接続ボタンが出るまで探して押す
///
/// ボタン未表示ならリトライ、タッチデバイス不可なら即中断する。
/// `spinner` を渡すと試行ごとにスピナー行を更新する。
/// 成功時は押下できた試行回数を返す。
pub async fn press_connect_button(
    status: &StatusHandle,
    budget: RetryBudget,
    spinner: Option<&str>,
) -> Result<u32> {
    for attempt in 1..=budget.attempts {
        match status.button_scan(true).await? {
            ButtonScan::Pressed => {
                info!(attempt, "connect button pressed");
                return Ok(attempt);
            }
            ButtonScan::Unavailable(reason) => {
                return Err(KrcloneError::TouchUnavailable(reason));
            }
            ButtonScan::Absent => {
                debug!(attempt, "connect button not shown yet");
                if let Some(label) = spinner {
                    status.spin(label).await;
                }
                if attempt < budget.attempts {
                    tokio::time::sleep(budget.delay).await;
                }
            }
        }
    }
    Err(KrcloneError::ButtonNotFound {
        attempts: budget.attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusReporter;
    use crate::testing::FakeScreen;
    use std::time::Duration;

    fn budget(attempts: u32) -> RetryBudget {
        RetryBudget::new(attempts, Duration::from_millis(500))
    }

    #[test]
    fn test_usb_commands() {
        assert_eq!(UsbEvent::from_connected(true).command(), "usb plug add");
        assert_eq!(UsbEvent::from_connected(false).command(), "usb plug remove");
    }

    #[test]
    fn test_nickel_pipe_writes_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nickel-hardware-status");
        std::fs::write(&path, "").unwrap();

        NickelPipe::new(&path).send(UsbEvent::Plug).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "usb plug add");
    }

    #[test]
    fn test_missing_pipe_is_not_fatal() {
        let pipe = NickelPipe::new("/nonexistent/nickel-hardware-status");
        assert!(pipe.send(UsbEvent::Unplug).is_err());
        // ログのみでパニックしない
        signal_usb(&pipe, false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_succeeds_after_retries() {
        let screen = FakeScreen::with_scans([ButtonScan::Absent, ButtonScan::Absent, ButtonScan::Pressed]);
        let (status, reporter) = StatusReporter::spawn(screen.clone(), 5);

        let attempts = press_connect_button(&status, budget(10), None).await.unwrap();
        assert_eq!(attempts, 3);

        drop(status);
        reporter.await.unwrap();
        assert_eq!(screen.scan_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_exhausts_budget() {
        let screen = FakeScreen::new();
        let (status, reporter) = StatusReporter::spawn(screen.clone(), 5);
        let start = tokio::time::Instant::now();

        let err = press_connect_button(&status, budget(4), None).await.unwrap_err();
        assert!(matches!(err, KrcloneError::ButtonNotFound { attempts: 4 }));
        assert!(!err.is_process_fatal());
        // 最後の試行の後は待たない
        assert_eq!(start.elapsed(), Duration::from_millis(1500));

        drop(status);
        reporter.await.unwrap();
        assert_eq!(screen.scan_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_stops_on_unavailable_touch() {
        let screen = FakeScreen::with_scans([ButtonScan::Unavailable("ENODEV".into())]);
        let (status, reporter) = StatusReporter::spawn(screen.clone(), 5);

        let err = press_connect_button(&status, budget(120), None).await.unwrap_err();
        assert!(matches!(err, KrcloneError::TouchUnavailable(_)));
        assert!(err.is_process_fatal());

        drop(status);
        reporter.await.unwrap();
        assert_eq!(screen.scan_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_updates_spinner_each_attempt() {
        let screen = FakeScreen::with_scans([ButtonScan::Absent, ButtonScan::Pressed]);
        let (status, reporter) = StatusReporter::spawn(screen.clone(), 5);

        status.line(" ").await;
        press_connect_button(&status, budget(10), Some("Waiting for Nickel"))
            .await
            .unwrap();

        drop(status);
        reporter.await.unwrap();
        assert_eq!(screen.last_frame(), vec!["Waiting for Nickel ( \\ )".to_string()]);
    }
}
