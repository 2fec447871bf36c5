//! ステータス表示の行バッファ
//!
//! 画面には直近 [`DEFAULT_WINDOW`] 行だけを表示する。スピナー用の
//! 「最終行の置き換え」メッセージは行数を増やさない。

use std::collections::VecDeque;

/// 表示ウィンドウの既定行数
pub const DEFAULT_WINDOW: usize = 5;

/// スピナーのアイコン列
pub const SPINNER_ICONS: [&str; 4] = ["( \\ )", "( | )", "( / )", "( - )"];

/// ステータスメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    /// true: 最終行を置き換える（スピナー）/ false: 新しい行を追加
    pub replace_last: bool,
}

impl StatusMessage {
    /// 新しい行を追加するメッセージ
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            replace_last: false,
        }
    }

    /// 最終行を置き換えるスピナーメッセージ
    pub fn spinner(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            replace_last: true,
        }
    }
}

/// 固定長のローリング行バッファ
#[derive(Debug, Clone)]
pub struct RollingLog {
    lines: VecDeque<String>,
    capacity: usize,
    spin_index: usize,
}

impl Default for RollingLog {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RollingLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            spin_index: 0,
        }
    }

    /// メッセージを反映する。画面の再描画が必要なら true
    pub fn apply(&mut self, message: &StatusMessage) -> bool {
        if message.replace_last {
            let icon = SPINNER_ICONS[self.spin_index % SPINNER_ICONS.len()];
            self.spin_index = (self.spin_index + 1) % SPINNER_ICONS.len();
            match self.lines.back_mut() {
                Some(last) => {
                    *last = format!("{} {}", message.text.trim_end(), icon);
                    true
                }
                // 置き換える行がない
                None => false,
            }
        } else {
            if self.lines.len() >= self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(message.text.clone());
            true
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
