//! Broker port - メッセージキューへの送信口
//!
//! Broker は「既に存在する」キューへメッセージを送るだけです。
//! キューの作成・設定はしません（外部の所有物）。
//!
//! # エラーの分け方
//! - **BrokerError**: 接続レベル。publish 実行全体にとって致命的
//! - **PublishError**: 1 メッセージ単位。ログに残し、続行するかは policy が決める

use async_trait::async_trait;
use thiserror::Error;

/// ブローカーに要求する配送モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// ブローカー再起動で消えてよい
    Transient,
    /// ブローカー再起動後も残す（producer は常にこちら）
    Persistent,
}

/// OutboundMessage はブローカーに渡す 1 件分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// 送信先のキュー名
    pub target: String,
    /// メッセージキー（タスク ID）
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub delivery: DeliveryMode,
    pub priority: u8,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("cannot connect to broker at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("target queue '{0}' does not exist on the broker")]
    MissingTarget(String),

    #[error("failed to close broker connection: {0}")]
    Close(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("send failed: {0}")]
    Send(String),

    #[error("broker rejected the message")]
    Rejected,

    /// キューに届かず broker から戻された
    #[error("message was not routed to any queue: {reply_code} {reply_text}")]
    Unroutable { reply_code: u16, reply_text: String },

    #[error("no publisher confirm within {0:?}")]
    Unconfirmed(std::time::Duration),
}

/// Broker は接続済みの送信チャネル
///
/// # 設計原則
/// - `publish` はブローカーの受領確認まで待つ（確認前に次を送らない）
/// - `close` は publish 実行のすべての終了経路で呼ばれる
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

/// Connector は Broker を開く
///
/// 接続失敗は BrokerError として返し、1 通も送らずに実行を止めます。
#[async_trait]
pub trait Connector: Send + Sync {
    type Broker: Broker;

    async fn connect(&self) -> Result<Self::Broker, BrokerError>;
}
