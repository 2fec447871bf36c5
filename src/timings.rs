//! 待ち時間・リトライ回数の定義

use std::time::Duration;

/// ボタン探索のリトライ予算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryBudget {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// 端末操作のタイミング一式
#[derive(Debug, Clone)]
pub struct Timings {
    /// マウント状態のポーリング間隔
    pub poll_interval: Duration,
    /// メタデータ反映時のアンマウント待ち
    pub unmount_timeout: Duration,
    /// 同期後の再マウント待ち
    pub mount_timeout: Duration,
    /// スピナー更新間隔
    pub spinner_interval: Duration,
    /// ボタン押下後、Nickel の取り込み完了を待つ時間
    pub import_settle: Duration,
    /// メタデータ反映開始時（短い）
    pub connect_budget: RetryBudget,
    /// 同期後の取り込み待ち（長い）。取り込み時間は新規ファイル数に比例する
    pub import_budget: RetryBudget,
    /// 致命的エラー表示後の待機
    pub fatal_linger: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            unmount_timeout: Duration::from_secs(10),
            mount_timeout: Duration::from_secs(30),
            spinner_interval: Duration::from_millis(500),
            import_settle: Duration::from_secs(5),
            connect_budget: RetryBudget::new(10, Duration::from_millis(500)),
            import_budget: RetryBudget::new(120, Duration::from_millis(500)),
            fatal_linger: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets_cover_expected_wall_time() {
        let t = Timings::default();
        assert_eq!(t.connect_budget.delay * t.connect_budget.attempts, Duration::from_secs(5));
        assert_eq!(t.import_budget.delay * t.import_budget.attempts, Duration::from_secs(60));
    }
}
