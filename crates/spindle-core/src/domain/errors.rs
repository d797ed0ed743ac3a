//! Errors - envelope 構築時のエラー
//!
//! ブローカーや送信のエラーは ports::broker 側にあります。
//! ここは「envelope として成立しない入力」だけを扱います。

use thiserror::Error;

use super::envelope::{MAX_PRIORITY, MIN_PRIORITY};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("task id must not be empty")]
    EmptyTaskId,

    #[error("priority {0} is outside {MIN_PRIORITY}..={MAX_PRIORITY}")]
    PriorityOutOfRange(u8),

    #[error("maxRetries must be a positive integer")]
    ZeroMaxRetries,

    #[error("payload must be a JSON object: {0}")]
    InvalidPayload(String),
}
