//! 内部ストレージの私的マウント
//!
//! Nickel が USB 接続中と信じてアンマウントしている間に、内部ストレージを
//! 別の場所へマウントしてデータベースへ直接書き込む。[`PrivateMount`] は
//! どの経路で抜けても必ずアンマウントする。

use crate::error::{KrcloneError, Result};
use nix::mount::{mount, umount2, MntFlags, MsFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

pub trait Mounter: Send + Sync {
    fn mount(&self, device: &Path, target: &Path, fs_type: &str) -> std::io::Result<()>;
    fn unmount(&self, target: &Path) -> std::io::Result<()>;
}

/// mount(2)/umount2(2) を直接呼ぶ
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallMounter;

impl Mounter for SyscallMounter {
    fn mount(&self, device: &Path, target: &Path, fs_type: &str) -> std::io::Result<()> {
        mount(Some(device), target, Some(fs_type), MsFlags::empty(), None::<&str>)
            .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
    }

    fn unmount(&self, target: &Path) -> std::io::Result<()> {
        umount2(target, MntFlags::empty())
            .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
    }
}

/// 私的マウントのスコープ
pub struct PrivateMount {
    mounter: Arc<dyn Mounter>,
    target: PathBuf,
    mounted: bool,
}

impl PrivateMount {
    pub fn acquire(
        mounter: Arc<dyn Mounter>,
        device: &Path,
        target: &Path,
        fs_type: &str,
    ) -> Result<Self> {
        std::fs::create_dir_all(target)
            .map_err(|e| KrcloneError::Remount(format!("{}: {}", target.display(), e)))?;
        mounter.mount(device, target, fs_type).map_err(|e| {
            KrcloneError::Remount(format!(
                "mount {} on {}: {}",
                device.display(),
                target.display(),
                e
            ))
        })?;
        info!(device = %device.display(), target = %target.display(), "private mount acquired");
        Ok(Self {
            mounter,
            target: target.to_path_buf(),
            mounted: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.target
    }

    /// アンマウントして結果を返す
    pub fn release(mut self) -> Result<()> {
        self.mounted = false;
        self.mounter.unmount(&self.target).map_err(|e| {
            KrcloneError::Remount(format!("umount {}: {}", self.target.display(), e))
        })?;
        info!(target = %self.target.display(), "private mount released");
        Ok(())
    }
}

impl Drop for PrivateMount {
    fn drop(&mut self) {
        if self.mounted {
            if let Err(e) = self.mounter.unmount(&self.target) {
                error!(target = %self.target.display(), "could not release private mount: {}", e);
            }
        }
    }
}
