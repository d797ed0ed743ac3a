//! Shutdown signal helpers (watch channel).
//!
//! - `true` が送られたら停止要求
//! - sender が drop されても停止要求とはみなさない

use tokio::sync::watch;

/// 停止要求を出す側と受ける側を作る
pub fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub fn is_requested(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

/// 停止要求が来るまで待つ
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // sender が消えた: 以後は要求が来ないので永遠に待つ
            std::future::pending::<()>().await;
        }
    }
}
