//! Ports - 抽象化レイヤー
//!
//! 外部システム（メッセージブローカー、時計、ID 採番）へのインターフェース。
//! producer はここの trait だけに依存し、AMQP かテスト用のメモリ実装かを知りません。

pub mod broker;
pub mod clock;
pub mod id_generator;

pub use self::broker::{
    Broker, BrokerError, Connector, DeliveryMode, OutboundMessage, PublishError,
};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
