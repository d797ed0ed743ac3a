//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **AmqpConnector / AmqpBroker**: RabbitMQ（本番用）
//! - **InMemoryConnector / InMemoryBroker**: 開発・テスト用

pub mod amqp;
pub mod inmem_broker;

pub use self::amqp::{AmqpBroker, AmqpConnector};
pub use self::inmem_broker::{InMemoryBroker, InMemoryConnector};
