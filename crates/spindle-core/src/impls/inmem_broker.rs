//! InMemoryBroker - 開発・テスト用のブローカー
//!
//! # 学習ポイント
//! - Clone で状態（Arc<Mutex<..>>）を共有し、テストから送信結果を覗く
//! - 失敗注入（特定キーの reject、接続不能）で producer のエラー経路を確かめる

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ports::{Broker, BrokerError, Connector, OutboundMessage, PublishError};

#[derive(Default)]
struct BrokerState {
    published: Vec<OutboundMessage>,
    reject_keys: HashSet<String>,
    close_calls: usize,
}

/// InMemoryBroker は送られたメッセージを順番に記録する
///
/// # 使用例
/// ```ignore
/// let broker = InMemoryBroker::new();
/// let producer = Producer::new(broker.clone(), SystemClock, settings);
/// producer.publish(draft).await?;
/// assert_eq!(broker.published().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// このキーのメッセージは reject する
    pub fn reject_key(&self, key: impl Into<String>) {
        self.lock().reject_keys.insert(key.into());
    }

    pub fn published(&self) -> Vec<OutboundMessage> {
        self.lock().published.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        // テスト中の panic で poison されても記録は読めるようにする
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError> {
        let mut state = self.lock();
        if state.reject_keys.contains(&message.key) {
            return Err(PublishError::Rejected);
        }
        state.published.push(message);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.lock().close_calls += 1;
        Ok(())
    }
}

/// InMemoryConnector は同じ InMemoryBroker を返す（または接続に失敗する）
#[derive(Clone)]
pub struct InMemoryConnector {
    broker: InMemoryBroker,
    reachable: bool,
}

impl InMemoryConnector {
    pub fn new(broker: InMemoryBroker) -> Self {
        Self {
            broker,
            reachable: true,
        }
    }

    /// 接続が必ず失敗する connector
    pub fn unreachable(broker: InMemoryBroker) -> Self {
        Self {
            broker,
            reachable: false,
        }
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Broker = InMemoryBroker;

    async fn connect(&self) -> Result<InMemoryBroker, BrokerError> {
        if !self.reachable {
            return Err(BrokerError::Connect {
                endpoint: "in-memory".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.broker.clone())
    }
}
