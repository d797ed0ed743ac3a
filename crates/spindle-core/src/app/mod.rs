//! App - アプリケーション層
//!
//! ports を組み合わせて publish 実行を組み立てます。
//!
//! # 主要コンポーネント
//! - **Producer**: envelope の確定と永続送信、type ごとの一括送信
//! - **Pacing**: 送信間の待ち時間（注入可能）
//! - **StatsClient**: publish 後の統計取得（表示専用）
//! - **run_seed**: 接続 → 送信 → 切断 → stats の一連の流れ

pub mod batch;
pub mod catalog;
pub mod pacing;
pub mod producer;
pub mod seed;
pub mod shutdown;
pub mod stats;

pub use self::batch::{TypeGroup, group_by_type};
pub use self::catalog::sample_catalog;
pub use self::pacing::Pacing;
pub use self::producer::{BatchReport, Producer, SendFailure, SendFailurePolicy};
pub use self::seed::{SeedError, SeedSummary, StatsOutcome, run_seed};
pub use self::stats::{StatsClient, StatsError};
