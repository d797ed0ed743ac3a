//! spindle-core
//!
//! Reliable task distribution: envelope schema + durable publish contract.
//!
//! # モジュール構成
//! - **domain**: ワイヤ契約（TaskEnvelope, TaskDraft, TaskId, TaskType, Priority, MaxRetries）
//! - **ports**: 抽象化レイヤー（Broker, Connector, Clock, IdGenerator）
//! - **impls**: 実装（AMQP / InMemory）
//! - **app**: アプリケーションロジック（Producer, pacing, stats, seed run）
//! - **config**: 起動時に組み立てる不変の設定
//! - **observability**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
