//! テスト用の偽デバイス
//!
//! 実機なしで両フェーズを通しで動かすための画面・Nickel・ストレージの代役。

use crate::error::Result;
use crate::hardware::{UsbChannel, UsbEvent};
use crate::metadata::Mounter;
use crate::mount::MountTable;
use crate::screen::{ButtonScan, Screen};
use crate::status::TOP_ROW;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ScreenState {
    prints: Vec<(String, u16)>,
    scans: VecDeque<ButtonScan>,
    scan_count: u32,
    rows_per_line: u16,
}

/// 描画内容を記録し、ボタン探索の結果を台本どおりに返す画面。
/// 台本が尽きたら `Absent` を返す
#[derive(Debug, Clone)]
pub struct FakeScreen {
    state: Arc<Mutex<ScreenState>>,
}

impl Default for FakeScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeScreen {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScreenState {
                rows_per_line: 1,
                ..Default::default()
            })),
        }
    }

    pub fn with_scans(scans: impl IntoIterator<Item = ButtonScan>) -> Self {
        let screen = Self::new();
        screen.lock().scans.extend(scans);
        screen
    }

    pub fn with_rows_per_line(self, rows: u16) -> Self {
        self.lock().rows_per_line = rows;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn prints(&self) -> Vec<(String, u16)> {
        self.lock().prints.clone()
    }

    /// 最後に描き直された画面の行
    pub fn last_frame(&self) -> Vec<String> {
        let state = self.lock();
        let start = state
            .prints
            .iter()
            .rposition(|(_, row)| *row == TOP_ROW)
            .unwrap_or(state.prints.len());
        state.prints[start..].iter().map(|(text, _)| text.clone()).collect()
    }

    /// 画面に一度でも表示された行
    pub fn shown(&self, text: &str) -> bool {
        self.lock().prints.iter().any(|(line, _)| line == text)
    }

    pub fn scan_count(&self) -> u32 {
        self.lock().scan_count
    }
}

impl Screen for FakeScreen {
    fn print(&mut self, text: &str, row: u16) -> std::io::Result<u16> {
        let mut state = self.lock();
        state.prints.push((text.to_string(), row));
        Ok(state.rows_per_line)
    }

    fn button_scan(&mut self, _press: bool) -> ButtonScan {
        let mut state = self.lock();
        state.scan_count += 1;
        state.scans.pop_front().unwrap_or(ButtonScan::Absent)
    }
}

#[derive(Debug)]
struct DeviceState {
    nickel_mounted: bool,
    private_mounted: bool,
    responsive: bool,
    mount_fails: bool,
    unmount_fails: bool,
    events: Vec<String>,
}

/// Nickel と内部ストレージの代役
///
/// `usb plug add` で Nickel がアンマウントし、`usb plug remove` で
/// 再マウントする。私的マウント中もマウントテーブルに現れる。
#[derive(Debug, Clone)]
pub struct FakeKobo {
    state: Arc<Mutex<DeviceState>>,
}

impl Default for FakeKobo {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeKobo {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                nickel_mounted: true,
                private_mounted: false,
                responsive: true,
                mount_fails: false,
                unmount_fails: false,
                events: Vec::new(),
            })),
        }
    }

    /// USB イベントに反応しない Nickel
    pub fn unresponsive(self) -> Self {
        self.lock().responsive = false;
        self
    }

    /// 私的マウントが失敗するストレージ
    pub fn failing_mount(self) -> Self {
        self.lock().mount_fails = true;
        self
    }

    /// 私的マウントを外せないストレージ
    pub fn failing_unmount(self) -> Self {
        self.lock().unmount_fails = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 発生したイベントの記録（USB コマンドと mount/umount）
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn nickel_mounted(&self) -> bool {
        self.lock().nickel_mounted
    }

    pub fn private_mounted(&self) -> bool {
        self.lock().private_mounted
    }
}

impl MountTable for FakeKobo {
    fn is_mounted(&self, _device_id: &str) -> Result<bool> {
        let state = self.lock();
        Ok(state.nickel_mounted || state.private_mounted)
    }
}

impl UsbChannel for FakeKobo {
    fn send(&self, event: UsbEvent) -> std::io::Result<()> {
        let mut state = self.lock();
        state.events.push(event.command().to_string());
        if state.responsive {
            state.nickel_mounted = event == UsbEvent::Unplug;
        }
        Ok(())
    }
}

impl Mounter for FakeKobo {
    fn mount(&self, _device: &Path, target: &Path, fs_type: &str) -> std::io::Result<()> {
        let mut state = self.lock();
        if state.mount_fails {
            return Err(std::io::Error::from_raw_os_error(libc::EBUSY));
        }
        state.events.push(format!("mount {} {}", fs_type, target.display()));
        state.private_mounted = true;
        Ok(())
    }

    fn unmount(&self, target: &Path) -> std::io::Result<()> {
        let mut state = self.lock();
        if state.unmount_fails {
            return Err(std::io::Error::from_raw_os_error(libc::EBUSY));
        }
        state.events.push(format!("umount {}", target.display()));
        state.private_mounted = false;
        Ok(())
    }
}
