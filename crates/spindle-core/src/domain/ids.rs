//! Task identifiers.
//!
//! # v2: 呼び出し側が決める不透明な ID
//! タスク ID は producer が採番するものではなく、呼び出し側が渡す文字列です
//! （例: `email-001`）。producer は中身を解釈せず、そのまま envelope の `id` と
//! メッセージキーに使います。
//!
//! 呼び出し側が ID を持っていない場合だけ、`IdGenerator`（ports）が
//! `task-<ULID>` 形式の ID を生成します。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::EnvelopeError;

/// Display / 生成 ID に付けるプレフィックス
pub const GENERATED_PREFIX: &str = "task-";

/// タスク ID（タスクの生存期間中ずっと不変）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// 呼び出し側の ID を検証して TaskId にする
    ///
    /// 空文字列・空白のみは拒否します。それ以外は中身を解釈しません。
    pub fn new(value: impl Into<String>) -> Result<Self, EnvelopeError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EnvelopeError::EmptyTaskId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// IdGenerator 専用: ULID から `task-<ULID>` を作る
    pub(crate) fn from_ulid(ulid: ulid::Ulid) -> Self {
        Self(format!("{GENERATED_PREFIX}{ulid}"))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for TaskId {
    type Error = EnvelopeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
