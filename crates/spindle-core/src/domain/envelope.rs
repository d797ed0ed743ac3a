//! TaskEnvelope - キューに載せる 1 件分の作業単位
//!
//! # 設計原則
//! - producer は一発送信するだけ（publish 後のタスク状態の持ち主ではない）
//! - すべてのフィールドは生成時に確定し、以後は読み取り専用
//! - `retryCount` は常に 0 で生成する（増やすのは下流の executor だけ）
//! - `payload` の中身は `type` ごとに下流が決める。producer は解釈しない
//!
//! # 学習ポイント
//! - 値オブジェクト（Priority, MaxRetries）で範囲チェックを生成時に閉じ込める
//! - `#[serde(rename_all = "camelCase")]` でワイヤ上のフィールド名を固定する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::EnvelopeError;
use super::ids::TaskId;
use super::task_type::TaskType;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;

/// payload は不透明な key-value ドキュメント
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// JSON 文字列から payload を作る（オブジェクト以外は拒否）
pub fn payload_from_json(raw: &str) -> Result<Payload, EnvelopeError> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(EnvelopeError::InvalidPayload(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(EnvelopeError::InvalidPayload(e.to_string())),
    }
}

/// 下流スケジューラが並び替えに使う優先度（1..=5）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const DEFAULT: Priority = Priority(3);

    pub fn new(value: u8) -> Result<Self, EnvelopeError> {
        if (MIN_PRIORITY..=MAX_PRIORITY).contains(&value) {
            Ok(Self(value))
        } else {
            Err(EnvelopeError::PriorityOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Priority {
    type Error = EnvelopeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

/// executor に伝えるリトライ上限（常に 1 以上）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxRetries(u32);

impl MaxRetries {
    pub const DEFAULT: MaxRetries = MaxRetries(3);

    pub fn new(value: u32) -> Result<Self, EnvelopeError> {
        if value == 0 {
            return Err(EnvelopeError::ZeroMaxRetries);
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for MaxRetries {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for MaxRetries {
    type Error = EnvelopeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaxRetries> for u32 {
    fn from(value: MaxRetries) -> Self {
        value.0
    }
}

/// TaskDraft は呼び出し側の入力（時刻はまだ持たない）
///
/// # 使用例
/// ```ignore
/// let draft = TaskDraft::new(TaskId::new("email-001")?, TaskType::Email, payload)
///     .with_priority(Priority::new(3)?)
///     .with_max_retries(MaxRetries::new(3)?);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub id: TaskId,
    pub task_type: TaskType,
    pub payload: Payload,
    pub priority: Priority,
    pub max_retries: MaxRetries,
    /// 作成時刻から実行可能時刻までの遅延
    pub delay: Duration,
}

impl TaskDraft {
    pub fn new(id: TaskId, task_type: TaskType, payload: Payload) -> Self {
        Self {
            id,
            task_type,
            payload,
            priority: Priority::DEFAULT,
            max_retries: MaxRetries::DEFAULT,
            delay: Duration::ZERO,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: MaxRetries) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// TaskEnvelope はワイヤに載る完全なメッセージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnvelope {
    id: TaskId,
    #[serde(rename = "type")]
    task_type: TaskType,
    payload: Payload,
    priority: Priority,
    created_at: DateTime<Utc>,
    scheduled_at: DateTime<Utc>,
    retry_count: u32,
    max_retries: MaxRetries,
}

impl TaskEnvelope {
    /// draft と publish 時刻から envelope を確定する
    ///
    /// `scheduledAt = createdAt + delay` なので `scheduledAt >= createdAt` は常に成り立つ。
    /// 遅延が chrono で表せないほど大きい場合は createdAt に丸めずに上限で止める。
    pub fn seal(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        let delay = chrono::Duration::from_std(draft.delay).unwrap_or(chrono::Duration::MAX);
        let scheduled_at = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: draft.id,
            task_type: draft.task_type,
            payload: draft.payload,
            priority: draft.priority,
            created_at: now,
            scheduled_at,
            retry_count: 0,
            max_retries: draft.max_retries,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> MaxRetries {
        self.max_retries
    }

    /// ワイヤ形式（JSON bytes）
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
