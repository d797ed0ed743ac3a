//! IdGenerator port - ID 生成の抽象化
//!
//! 呼び出し側が ID を持っていないとき（`spindle publish` で `--id` 省略）だけ使います。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::TaskId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はタスク ID を生成
///
/// # ULID の特性
/// - 時刻でソート可能
/// - 分散環境で生成可能（調整不要）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使うと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskId::from_ulid(ulid)
    }
}
