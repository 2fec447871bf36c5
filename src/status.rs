//! ステータス表示タスク
//!
//! 画面デバイスを唯一所有する並行タスク。ワークフローからの表示要求と
//! ボタン探索要求を同じタスクで直列に処理するため、描画とタッチ操作が
//! 交錯しない。入力チャネルが閉じるとタスクは終了し、画面を返す。
//!
//! 画面操作はブロッキングなので、1回ごとに `spawn_blocking` へ渡す。
//! 非同期ワーカーが1本しかなくても他のタスクは止まらない。

use crate::error::{KrcloneError, Result};
use crate::screen::{ButtonScan, Screen};
use krclone_common::{RollingLog, StatusMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 表示開始行
pub const TOP_ROW: u16 = 4;

const MESSAGE_BUFFER: usize = 16;

type ScanRequest = (bool, oneshot::Sender<ButtonScan>);

/// ステータス表示タスクへの送信側
#[derive(Debug, Clone)]
pub struct StatusHandle {
    messages: mpsc::Sender<StatusMessage>,
    scans: mpsc::Sender<ScanRequest>,
}

impl StatusHandle {
    /// 新しい行を表示
    pub async fn line(&self, text: impl Into<String>) {
        self.send(StatusMessage::line(text)).await;
    }

    /// 最終行をスピナー付きで置き換え
    pub async fn spin(&self, text: impl Into<String>) {
        self.send(StatusMessage::spinner(text)).await;
    }

    async fn send(&self, message: StatusMessage) {
        // 表示は補助的なもの。タスクが終了していても処理は続ける
        if self.messages.send(message).await.is_err() {
            debug!("status reporter has stopped; message dropped");
        }
    }

    /// 表示タスク経由でボタン探索を行う
    pub async fn button_scan(&self, press: bool) -> Result<ButtonScan> {
        let (reply, response) = oneshot::channel();
        self.scans
            .send((press, reply))
            .await
            .map_err(|_| KrcloneError::ReporterClosed)?;
        response.await.map_err(|_| KrcloneError::ReporterClosed)
    }
}

pub struct StatusReporter;

impl StatusReporter {
    /// 表示タスクを起動する。タスクは全ハンドルが破棄されると画面を返して終了する
    pub fn spawn<S: Screen>(screen: S, window: usize) -> (StatusHandle, JoinHandle<S>) {
        let (message_tx, message_rx) = mpsc::channel(MESSAGE_BUFFER);
        let (scan_tx, scan_rx) = mpsc::channel(1);
        let task = tokio::spawn(run(screen, RollingLog::new(window), message_rx, scan_rx));
        let handle = StatusHandle {
            messages: message_tx,
            scans: scan_tx,
        };
        (handle, task)
    }
}

async fn run<S: Screen>(
    mut screen: S,
    mut log: RollingLog,
    mut messages: mpsc::Receiver<StatusMessage>,
    mut scans: mpsc::Receiver<ScanRequest>,
) -> S {
    loop {
        tokio::select! {
            biased;
            message = messages.recv() => match message {
                Some(message) => {
                    if !message.replace_last {
                        info!(status = %message.text, "status");
                    }
                    if log.apply(&message) {
                        let lines: Vec<String> = log.lines().map(str::to_string).collect();
                        let (returned, ()) =
                            off_thread(screen, move |screen| render(screen, &lines)).await;
                        screen = returned;
                    }
                }
                None => break,
            },
            Some((press, reply)) = scans.recv() => {
                let (returned, outcome) =
                    off_thread(screen, move |screen| screen.button_scan(press)).await;
                screen = returned;
                if reply.send(outcome).is_err() {
                    debug!("button scan requester went away");
                }
            }
        }
    }
    screen
}

/// 画面を専用スレッドへ渡して操作し、終わったら取り戻す
async fn off_thread<S, T, F>(screen: S, op: F) -> (S, T)
where
    S: Screen,
    T: Send + 'static,
    F: FnOnce(&mut S) -> T + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let mut screen = screen;
        let outcome = op(&mut screen);
        (screen, outcome)
    });
    match task.await {
        Ok(done) => done,
        // blocking タスクは中断されないので、失敗は画面実装のパニックだけ
        Err(e) => std::panic::resume_unwind(e.into_panic()),
    }
}

/// 表示中の全行を上から描き直す。折り返しに応じて次の行位置をずらす
fn render<S: Screen>(screen: &mut S, lines: &[String]) {
    let mut row = TOP_ROW;
    for line in lines {
        match screen.print(line, row) {
            Ok(rows) => row = row.saturating_add(rows),
            Err(e) => warn!("screen print failed: {}", e),
        }
    }
}
