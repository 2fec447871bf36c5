//! krclone Common Library
//!
//! 端末に触れない純粋なロジック（sidecar 解析・rclone 引数・ステータス表示バッファ）

pub mod error;
pub mod metadata;
pub mod remote;
pub mod status;

pub use error::{Error, Result};
pub use metadata::{format_series_index, like_pattern, load_sidecar, parse_sidecar, BookMetadata};
pub use remote::{normalize_remote, remote_source, sync_args, REMOTE_SEPARATOR};
pub use status::{RollingLog, StatusMessage, DEFAULT_WINDOW, SPINNER_ICONS};
