//! フェーズ切り替えマーカー（krmeta.lock）
//!
//! ファイルが存在すれば次回はメタデータ反映、なければ同期を行う。

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PhaseMarker {
    path: PathBuf,
}

impl PhaseMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn create(&self) -> Result<()> {
        std::fs::File::create(&self.path)?;
        debug!(path = %self.path.display(), "phase marker created");
        Ok(())
    }

    /// マーカーを削除する。存在しなければ何もしない
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "phase marker cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
