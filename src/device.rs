//! 端末へのアクセス口とフェーズ共通の実行コンテキスト

use crate::config::INTERNAL_DEVICE_ID;
use crate::hardware::{signal_usb, NickelPipe, UsbChannel};
use crate::metadata::{Mounter, SyscallMounter};
use crate::mount::{MountTable, MountWatcher, ProcMounts};
use crate::status::StatusHandle;
use crate::timings::Timings;
use std::sync::Arc;

/// 内部ストレージと Nickel への操作
#[derive(Clone)]
pub struct Device {
    pub mount_table: Arc<dyn MountTable>,
    pub usb: Arc<dyn UsbChannel>,
    pub mounter: Arc<dyn Mounter>,
}

impl Device {
    /// 実機（/proc/mounts・ハードウェアパイプ・mount(2)）
    pub fn kobo() -> Self {
        Self {
            mount_table: Arc::new(ProcMounts::default()),
            usb: Arc::new(NickelPipe::default()),
            mounter: Arc::new(SyscallMounter),
        }
    }

    /// 1つのオブジェクトが全ポートを兼ねる場合
    pub fn from_shared<T>(device: Arc<T>) -> Self
    where
        T: MountTable + UsbChannel + Mounter + 'static,
    {
        Self {
            mount_table: device.clone(),
            usb: device.clone(),
            mounter: device,
        }
    }
}

/// 各フェーズに渡す実行コンテキスト
#[derive(Clone)]
pub struct PhaseContext {
    pub status: StatusHandle,
    pub device: Device,
    pub timings: Timings,
}

impl PhaseContext {
    pub fn new(status: StatusHandle, device: Device, timings: Timings) -> Self {
        Self {
            status,
            device,
            timings,
        }
    }

    pub fn watcher(&self) -> MountWatcher {
        MountWatcher::new(
            self.device.mount_table.clone(),
            INTERNAL_DEVICE_ID,
            self.timings.poll_interval,
        )
    }

    pub fn signal_usb(&self, connected: bool) {
        signal_usb(self.device.usb.as_ref(), connected);
    }
}
