//! krclone: Kobo 向け rclone 同期・メタデータ反映
//!
//! 1回目の実行で本を同期して Nickel に取り込ませ、2回目の実行で
//! シリーズ名・説明文を Nickel のデータベースへ直接書き込む。

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod marker;
pub mod metadata;
pub mod mount;
pub mod screen;
pub mod status;
pub mod sync_phase;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timings;
pub mod workflow;
