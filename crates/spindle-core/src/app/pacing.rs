//! Pacing - 送信の間に挟む待ち時間
//!
//! 正しさの要件ではなく運用上の調整つまみです（ブローカーを詰まらせない、
//! ダッシュボードで流れを目視できるようにする）。テストでは `Pacing::None`。

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    None,
    Fixed(Duration),
}

impl Pacing {
    /// 0 ms は None 扱い
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Pacing::None
        } else {
            Pacing::Fixed(Duration::from_millis(ms))
        }
    }

    pub fn interval(self) -> Option<Duration> {
        match self {
            Pacing::None => None,
            Pacing::Fixed(d) => Some(d),
        }
    }

    pub async fn pause(self) {
        if let Some(d) = self.interval() {
            tokio::time::sleep(d).await;
        }
    }
}
